//! Prescription-level risk prediction.
//!
//! Three danger sub-scores on a 0-100 scale are combined:
//! - Interactions: 60%
//! - Dosage deviation: 30%
//! - Polypharmacy: 10%
//!
//! The aggregate danger maps to a 0-10 safety score (10 = safe).

use std::collections::BTreeMap;

use tracing::debug;

use crate::models::{
    DosageIssue, DosageStatus, FactorDetails, FactorKind, PatientContext,
    PatientInfo, PrescribedMedication, RiskFactor, RiskLevel, RiskResult, Severity,
};

use super::{DosageVerifier, InteractionChecker};
use crate::repository::ReferenceRepository;

const INTERACTION_WEIGHT: f64 = 0.6;
const DOSAGE_WEIGHT: f64 = 0.3;
const POLYPHARMACY_WEIGHT: f64 = 0.1;

const MAX_DANGER: f64 = 100.0;

fn severity_danger(severity: Severity) -> f64 {
    match severity {
        Severity::Major => 80.0,
        Severity::Moderate => 40.0,
        Severity::Minor | Severity::Unknown => 10.0,
    }
}

fn status_danger(status: DosageStatus) -> f64 {
    match status {
        DosageStatus::Safe => 0.0,
        DosageStatus::Low => 10.0,
        DosageStatus::High => 40.0,
        DosageStatus::VeryHigh => 75.0,
        DosageStatus::Unknown | DosageStatus::Error => 5.0,
    }
}

/// Statuses reported as dosage issues.
fn is_dosage_issue(status: DosageStatus) -> bool {
    matches!(
        status,
        DosageStatus::Low | DosageStatus::High | DosageStatus::VeryHigh
    )
}

/// Combines interaction, dosage and polypharmacy factors into a safety score.
pub struct RiskAggregator<'a> {
    interactions: InteractionChecker<'a>,
    dosage: DosageVerifier<'a>,
}

impl<'a> RiskAggregator<'a> {
    pub fn new(repository: &'a ReferenceRepository) -> Self {
        Self {
            interactions: InteractionChecker::new(repository),
            dosage: DosageVerifier::new(repository),
        }
    }

    pub fn predict(&self, medications: &[PrescribedMedication], patient: &PatientInfo) -> RiskResult {
        let patient_context = PatientContext {
            age: patient.age,
            age_group: patient.age_group(),
            medication_count: medications.len() as u32,
        };

        if medications.is_empty() {
            return RiskResult {
                safety_score: 10.0,
                risk_level: RiskLevel::Safe,
                factors: BTreeMap::new(),
                recommendations: vec!["No medications to analyze".to_string()],
                patient_context,
            };
        }

        let interaction = self.interaction_factor(medications);
        let dosage = self.dosage_factor(medications, patient);
        let polypharmacy = polypharmacy_factor(medications.len(), patient.age);

        let danger = interaction.score * INTERACTION_WEIGHT
            + dosage.score * DOSAGE_WEIGHT
            + polypharmacy.score * POLYPHARMACY_WEIGHT;
        // Band before rounding so 7.96 stays LowRisk
        let unrounded = (10.0 - danger / 10.0).clamp(0.0, 10.0);
        let risk_level = RiskLevel::from_safety_score(unrounded);
        let safety_score = round1(unrounded);

        let recommendations = recommendations(&interaction, &dosage, medications.len(), patient.age);

        debug!(
            medications = medications.len(),
            danger,
            safety_score,
            "Risk predicted"
        );

        let mut factors = BTreeMap::new();
        factors.insert(FactorKind::InteractionRisk, round_factor(interaction));
        factors.insert(FactorKind::DosageRisk, round_factor(dosage));
        factors.insert(FactorKind::PolypharmacyRisk, round_factor(polypharmacy));

        RiskResult {
            safety_score,
            risk_level,
            factors,
            recommendations,
            patient_context,
        }
    }

    fn interaction_factor(&self, medications: &[PrescribedMedication]) -> RiskFactor {
        let quiet = |message: &str| RiskFactor {
            score: 0.0,
            weight: INTERACTION_WEIGHT,
            message: message.to_string(),
            details: FactorDetails::Interaction {
                total_interactions: 0,
                max_severity: None,
                severity_counts: BTreeMap::new(),
            },
        };

        if medications.len() < 2 {
            return quiet("Single medication - no interaction risk");
        }

        let names: Vec<String> = medications.iter().map(|m| m.name.clone()).collect();
        let report = self.interactions.check(&names);
        if report.ok {
            return quiet("No interactions detected");
        }

        let total: f64 = report.issues.iter().map(|i| severity_danger(i.severity)).sum();
        let score = (total / report.issues.len() as f64).min(MAX_DANGER);

        // Unknown tags never outrank Minor
        let max_severity = report
            .highest_severity()
            .filter(|s| s.rank() >= Severity::Minor.rank())
            .unwrap_or(Severity::Minor);

        RiskFactor {
            score,
            weight: INTERACTION_WEIGHT,
            message: format!(
                "{} interaction(s) - highest: {}",
                report.total,
                max_severity.as_str()
            ),
            details: FactorDetails::Interaction {
                total_interactions: report.total,
                max_severity: Some(max_severity),
                severity_counts: report.severity_counts,
            },
        }
    }

    fn dosage_factor(&self, medications: &[PrescribedMedication], patient: &PatientInfo) -> RiskFactor {
        let mut scores = Vec::new();
        let mut issues = Vec::new();

        for medication in medications {
            let (Some(dose), Some(unit)) = (medication.dose, medication.unit.as_deref()) else {
                continue;
            };

            let verdict = self.dosage.verify(patient, &medication.name, dose, unit);
            let score = status_danger(verdict.status);
            scores.push(score);

            if is_dosage_issue(verdict.status) {
                issues.push(DosageIssue {
                    medication: medication.name.clone(),
                    status: verdict.status,
                    message: verdict.message,
                    score,
                });
            }
        }

        let (score, message) = if scores.is_empty() {
            (0.0, "No dosage data available".to_string())
        } else if issues.is_empty() {
            (mean(&scores), "All dosages within range".to_string())
        } else {
            (
                mean(&scores),
                format!("{} dosage issue(s) detected", issues.len()),
            )
        };

        RiskFactor {
            score,
            weight: DOSAGE_WEIGHT,
            message,
            details: FactorDetails::Dosage {
                medications_checked: scores.len() as u32,
                issues,
            },
        }
    }
}

fn polypharmacy_factor(count: usize, age: u32) -> RiskFactor {
    let (mut score, mut message) = match count {
        0..=1 => (0.0, "Single medication - no polypharmacy risk".to_string()),
        2..=4 => (5.0, format!("{} medications - minimal polypharmacy risk", count)),
        5..=6 => (25.0, format!("{} medications - moderate polypharmacy risk", count)),
        7..=8 => (50.0, format!("{} medications - increased polypharmacy risk", count)),
        _ => (70.0, format!("{} medications - high polypharmacy risk", count)),
    };

    let geriatric = age > 65;
    let pediatric = age > 0 && age < 12;
    if geriatric {
        score = (score * 1.15_f64).min(MAX_DANGER);
        message.push_str(" (increased for geriatric patient)");
    }
    if pediatric {
        score = (score * 1.1_f64).min(MAX_DANGER);
        message.push_str(" (increased for pediatric patient)");
    }

    RiskFactor {
        score,
        weight: POLYPHARMACY_WEIGHT,
        message,
        details: FactorDetails::Polypharmacy {
            medication_count: count as u32,
            age_adjusted: geriatric || pediatric,
        },
    }
}

/// Deterministic advice list; falls back to a single all-clear line.
fn recommendations(
    interaction: &RiskFactor,
    dosage: &RiskFactor,
    medication_count: usize,
    age: u32,
) -> Vec<String> {
    let mut out = Vec::new();

    if let FactorDetails::Interaction {
        total_interactions,
        max_severity,
        ..
    } = &interaction.details
    {
        if *total_interactions > 0 {
            match max_severity {
                Some(Severity::Major) => {
                    out.push(
                        "URGENT: Major drug interaction detected. Consult physician immediately."
                            .to_string(),
                    );
                    out.push(
                        "Consider alternative medications to avoid dangerous interactions."
                            .to_string(),
                    );
                }
                Some(Severity::Moderate) => out.push(
                    "Moderate interactions present. Monitor patient closely for adverse effects."
                        .to_string(),
                ),
                _ => out.push("Minor interactions detected. Continue monitoring.".to_string()),
            }
        }
    }

    if let FactorDetails::Dosage { issues, .. } = &dosage.details {
        for issue in issues {
            match issue.status {
                DosageStatus::VeryHigh => out.push(format!(
                    "VERIFY: {} dose is significantly high. Check prescription.",
                    issue.medication
                )),
                DosageStatus::High => out.push(format!(
                    "Monitor {} for potential adverse effects.",
                    issue.medication
                )),
                DosageStatus::Low => out.push(format!(
                    "{} dose may be subtherapeutic. Verify efficacy.",
                    issue.medication
                )),
                _ => {}
            }
        }
    }

    if medication_count > 6 {
        out.push(format!(
            "High medication count ({}). Review for potential deprescribing opportunities.",
            medication_count
        ));
    } else if medication_count > 4 {
        out.push("Consider medication reconciliation to reduce polypharmacy risks.".to_string());
    }

    if age > 65 {
        out.push("Geriatric patient: Consider renal/hepatic function monitoring.".to_string());
    }
    if age > 0 && age < 12 {
        out.push("Pediatric patient: Ensure all doses are weight-based and verified.".to_string());
    }

    if out.is_empty() {
        out.push(
            "No major issues identified. Continue as prescribed with routine monitoring."
                .to_string(),
        );
    }
    out
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round_factor(mut factor: RiskFactor) -> RiskFactor {
    factor.score = (factor.score * 100.0).round() / 100.0;
    factor
}
