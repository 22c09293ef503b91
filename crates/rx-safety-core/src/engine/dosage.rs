//! Dose verification against WHO Defined Daily Doses.
//!
//! Bands on `ratio = converted dose / DDD`:
//! - below 0.5: low
//! - 0.5 to 1.5: safe
//! - above 1.5 up to 2.0: high
//! - above 2.0: very high
//!
//! Infants, pediatric and geriatric patients above 1.0 are escalated.

use tracing::debug;

use crate::models::{
    AgeGroup, DosageRequest, DosageStatus, DosageVerdict, MedicationDosageVerdict, PatientInfo,
};
use crate::normalizer::{convert_dose, normalize_name};
use crate::repository::ReferenceRepository;

const LOW_RATIO: f64 = 0.5;
const SAFE_RATIO: f64 = 1.5;
const HIGH_RATIO: f64 = 2.0;
const AGE_ESCALATION_RATIO: f64 = 1.0;

/// Compares prescribed doses with the reference DDD table.
pub struct DosageVerifier<'a> {
    repository: &'a ReferenceRepository,
}

impl<'a> DosageVerifier<'a> {
    pub fn new(repository: &'a ReferenceRepository) -> Self {
        Self { repository }
    }

    /// Verify one prescribed dose for a patient.
    pub fn verify(
        &self,
        patient: &PatientInfo,
        medication: &str,
        dose: f64,
        unit: &str,
    ) -> DosageVerdict {
        let age_group = patient.age_group();
        let prescribed_dose = format!("{}{}", dose, unit);
        let normalized = normalize_name(medication);
        let age_adjustment = self.age_adjustment(&normalized, age_group);

        let Some((ddd, ddd_unit)) = self
            .repository
            .ddd_for(&normalized)
            .and_then(|r| r.daily_dose())
        else {
            return DosageVerdict {
                status: DosageStatus::Unknown,
                message: format!("No DDD data available for {}", medication),
                prescribed_dose,
                ddd: None,
                dose_ratio: None,
                age_group: Some(age_group),
                age_adjustment: Some(age_adjustment),
                recommendation: "Verify dosage with formulary or physician".to_string(),
            };
        };

        let Some(converted) = convert_dose(dose, unit, ddd_unit) else {
            return DosageVerdict {
                status: DosageStatus::Error,
                message: format!("Cannot convert {} to {}", unit, ddd_unit),
                prescribed_dose,
                ddd: Some(format!("{}{}", ddd, ddd_unit)),
                dose_ratio: None,
                age_group: Some(age_group),
                age_adjustment: Some(age_adjustment),
                recommendation: "Unit conversion failed".to_string(),
            };
        };

        let ratio = converted / ddd;
        let (status, message, recommendation) = classify(ratio, age_group, &age_adjustment);

        debug!(
            status = status.as_str(),
            ratio,
            age_group = age_group.as_str(),
            "Dosage verified"
        );

        DosageVerdict {
            status,
            message,
            prescribed_dose,
            ddd: Some(format!("{}{}", ddd, ddd_unit)),
            dose_ratio: Some(round2(ratio)),
            age_group: Some(age_group),
            age_adjustment: Some(age_adjustment),
            recommendation,
        }
    }

    /// Verify a batch; each verdict is tagged with its medication.
    pub fn verify_batch(&self, requests: &[DosageRequest]) -> Vec<MedicationDosageVerdict> {
        requests
            .iter()
            .map(|r| MedicationDosageVerdict {
                medication: r.medication.clone(),
                verdict: self.verify(&r.patient, &r.medication, r.dose, &r.unit),
            })
            .collect()
    }

    /// Drug-specific usage pattern for the age group, else the group default.
    fn age_adjustment(&self, normalized: &str, age_group: AgeGroup) -> String {
        self.repository
            .age_adjustment_for(normalized, age_group)
            .map(|r| r.usage_pattern.clone())
            .unwrap_or_else(|| age_group.default_adjustment().to_string())
    }
}

/// Band a ratio and apply age escalation.
fn classify(ratio: f64, age_group: AgeGroup, age_adjustment: &str) -> (DosageStatus, String, String) {
    let (mut status, message, mut recommendation) = if ratio < LOW_RATIO {
        (
            DosageStatus::Low,
            format!("Dose is below 50% of standard DDD (ratio: {:.2})", ratio),
            "Verify therapeutic efficacy. May be subtherapeutic.".to_string(),
        )
    } else if ratio <= SAFE_RATIO {
        (
            DosageStatus::Safe,
            format!("Dose within acceptable range (ratio: {:.2})", ratio),
            "Continue as prescribed. Monitor patient response.".to_string(),
        )
    } else if ratio <= HIGH_RATIO {
        (
            DosageStatus::High,
            format!("Dose above standard DDD (ratio: {:.2})", ratio),
            "Monitor for adverse effects. Dose may be intentionally high for specific indication."
                .to_string(),
        )
    } else {
        (
            DosageStatus::VeryHigh,
            format!("Dose significantly above standard DDD (ratio: {:.2})", ratio),
            "VERIFY PRESCRIPTION. Consult physician. Risk of toxicity.".to_string(),
        )
    };

    if age_group.is_dose_sensitive() && ratio > AGE_ESCALATION_RATIO {
        status = if ratio > SAFE_RATIO {
            DosageStatus::VeryHigh
        } else {
            DosageStatus::High
        };
        recommendation = format!(
            "CAUTION: {} patient. {} Age adjustment: {}",
            age_group.as_str(),
            recommendation,
            age_adjustment
        );
    }

    (status, message, recommendation)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
