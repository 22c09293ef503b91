//! Risk prediction models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{AgeGroup, DosageStatus, Severity};

/// A medication in a risk prediction request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescribedMedication {
    pub name: String,
    pub dose: Option<f64>,
    pub unit: Option<String>,
}

impl PrescribedMedication {
    /// A medication with a dose.
    pub fn dosed(name: &str, dose: f64, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            dose: Some(dose),
            unit: Some(unit.to_string()),
        }
    }

    /// A medication without dose data.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dose: None,
            unit: None,
        }
    }
}

/// Risk band derived from the safety score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RiskLevel {
    #[serde(rename = "SAFE")]
    Safe,
    #[serde(rename = "LOW RISK")]
    LowRisk,
    #[serde(rename = "MODERATE RISK")]
    ModerateRisk,
    #[serde(rename = "HIGH RISK")]
    HighRisk,
    #[serde(rename = "CRITICAL")]
    Critical,
}

impl RiskLevel {
    /// Band a 0-10 safety score (10 = safe).
    pub fn from_safety_score(score: f64) -> Self {
        if score >= 8.0 {
            RiskLevel::Safe
        } else if score >= 6.0 {
            RiskLevel::LowRisk
        } else if score >= 4.0 {
            RiskLevel::ModerateRisk
        } else if score >= 2.0 {
            RiskLevel::HighRisk
        } else {
            RiskLevel::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "SAFE",
            RiskLevel::LowRisk => "LOW RISK",
            RiskLevel::ModerateRisk => "MODERATE RISK",
            RiskLevel::HighRisk => "HIGH RISK",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

/// The three factors combined into the safety score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    InteractionRisk,
    DosageRisk,
    PolypharmacyRisk,
}

impl FactorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactorKind::InteractionRisk => "interaction_risk",
            FactorKind::DosageRisk => "dosage_risk",
            FactorKind::PolypharmacyRisk => "polypharmacy_risk",
        }
    }
}

/// A medication whose dose status contributes a dosage issue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DosageIssue {
    pub medication: String,
    pub status: DosageStatus,
    pub message: String,
    /// Danger weight of the status (0-100)
    pub score: f64,
}

/// Factor-specific explanation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FactorDetails {
    Interaction {
        total_interactions: u32,
        max_severity: Option<Severity>,
        severity_counts: BTreeMap<Severity, u32>,
    },
    Dosage {
        medications_checked: u32,
        issues: Vec<DosageIssue>,
    },
    Polypharmacy {
        medication_count: u32,
        age_adjusted: bool,
    },
}

/// One weighted contributor to the aggregate danger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskFactor {
    /// Danger sub-score on the internal 0-100 scale (higher is worse)
    pub score: f64,
    /// Weight in the aggregate, e.g. 0.6
    pub weight: f64,
    pub message: String,
    pub details: FactorDetails,
}

/// Patient summary echoed back with the result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientContext {
    pub age: u32,
    pub age_group: AgeGroup,
    pub medication_count: u32,
}

/// Aggregate prescription safety verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskResult {
    /// 0-10, where 10 is fully safe
    pub safety_score: f64,
    pub risk_level: RiskLevel,
    pub factors: BTreeMap<FactorKind, RiskFactor>,
    pub recommendations: Vec<String>,
    pub patient_context: PatientContext,
}

impl RiskResult {
    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
