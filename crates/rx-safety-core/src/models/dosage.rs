//! Dosage verification results.

use serde::{Deserialize, Serialize};

use super::AgeGroup;

/// Outcome of comparing a prescribed dose against the reference DDD.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DosageStatus {
    Safe,
    Low,
    High,
    VeryHigh,
    /// No reference DDD for the medication
    Unknown,
    /// Dose unit could not be converted to the DDD unit
    Error,
}

impl DosageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DosageStatus::Safe => "safe",
            DosageStatus::Low => "low",
            DosageStatus::High => "high",
            DosageStatus::VeryHigh => "very_high",
            DosageStatus::Unknown => "unknown",
            DosageStatus::Error => "error",
        }
    }
}

/// Verdict for one prescribed dose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DosageVerdict {
    pub status: DosageStatus,
    pub message: String,
    /// Prescribed dose as given, e.g. "2000mg"
    pub prescribed_dose: String,
    /// Reference DDD with unit, e.g. "2g"; absent when no DDD is known
    pub ddd: Option<String>,
    /// Converted dose over DDD, rounded to two decimals
    pub dose_ratio: Option<f64>,
    pub age_group: Option<AgeGroup>,
    pub age_adjustment: Option<String>,
    pub recommendation: String,
}

/// A dose verification request, used for batch checks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DosageRequest {
    pub medication: String,
    pub dose: f64,
    pub unit: String,
    #[serde(default)]
    pub patient: super::PatientInfo,
}

/// A verdict tagged with the medication it was computed for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationDosageVerdict {
    pub medication: String,
    #[serde(flatten)]
    pub verdict: DosageVerdict,
}
