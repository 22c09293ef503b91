//! Rx Safety Core Library
//!
//! Prescription safety scoring: drug-drug interactions, dose verification
//! against WHO Defined Daily Doses, therapeutic alternatives and an aggregate
//! 0-10 safety score.
//!
//! # Architecture
//!
//! ```text
//!            ETL output (reference.db + canonical_drugs.json)
//!                                  │
//!                      ┌───────────▼───────────┐
//!                      │  ReferenceRepository  │  lazy, memoized, read-only
//!                      └───────────┬───────────┘
//!          ┌───────────────┬───────┴───────┬────────────────┐
//!          ▼               ▼               ▼                ▼
//!   Interaction       Dosage          Alternative        Risk
//!   Checker           Verifier        Matcher            Aggregator
//!          │               │               │                │
//!          └───────────────┴───────┬───────┴────────────────┘
//!                                  ▼
//!                     SafetyEngine / RxSafetyCore (FFI)
//! ```
//!
//! # Core Principle
//!
//! **Nothing is fatal.** Missing reference data, unknown drugs and
//! unconvertible units all produce structured results, never errors.
//!
//! # Modules
//!
//! - [`normalizer`]: Name canonicalization and dose unit conversion
//! - [`models`]: Domain types (reference rows, reports, verdicts, risk result)
//! - [`db`]: SQLite access to the reference tables
//! - [`repository`]: Reference sources, memoized tables, vocabulary, interaction index
//! - [`engine`]: Interaction, dosage, alternative and risk components
//! - [`config`]: Engine configuration and tracing setup

pub mod config;
pub mod db;
pub mod engine;
pub mod models;
pub mod normalizer;
pub mod repository;

// Re-export commonly used types
pub use config::EngineConfig;
pub use db::Database;
pub use engine::{
    AlternativeMatcher, DosageVerifier, InteractionChecker, RiskAggregator, SafetyEngine,
};
pub use models::{
    AgeGroup, AlternativeCandidate, AlternativeReport, DosageStatus, DosageVerdict,
    InteractionReport, PatientInfo, PrescribedMedication, RiskLevel, RiskResult, Severity,
};
pub use normalizer::normalize_name;
pub use repository::{ReferenceRepository, ReferenceSource, ReferenceTables};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::collections::HashMap;
use std::sync::Arc;

/// Oldest accepted patient age, in years.
const MAX_PATIENT_AGE: u32 = 120;

/// Alternatives reason meaning "no particular context".
const GENERAL_REASON: &str = "general";

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum RxSafetyError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<db::DbError> for RxSafetyError {
    fn from(e: db::DbError) -> Self {
        RxSafetyError::DatabaseError(e.to_string())
    }
}

impl From<repository::SourceError> for RxSafetyError {
    fn from(e: repository::SourceError) -> Self {
        RxSafetyError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for RxSafetyError {
    fn from(e: serde_json::Error) -> Self {
        RxSafetyError::SerializationError(e.to_string())
    }
}

impl From<config::ConfigError> for RxSafetyError {
    fn from(e: config::ConfigError) -> Self {
        RxSafetyError::ConfigError(e.to_string())
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open an engine over the ETL output in `data_dir`.
///
/// A missing or unreadable reference database yields a working engine with
/// empty tables.
#[uniffi::export]
pub fn open_engine(data_dir: String) -> Result<Arc<RxSafetyCore>, RxSafetyError> {
    let config = EngineConfig::with_data_dir(data_dir);
    config.validate()?;
    Ok(RxSafetyCore::from_config(&config))
}

/// Open an engine from a JSON configuration document.
#[uniffi::export]
pub fn open_engine_from_config(json: String) -> Result<Arc<RxSafetyCore>, RxSafetyError> {
    let config = EngineConfig::from_json_str(&json)?;
    Ok(RxSafetyCore::from_config(&config))
}

/// Open an engine configured from `RX_SAFETY_DATA_DIR` / `RX_SAFETY_MAX_ALTERNATIVES`.
#[uniffi::export]
pub fn open_engine_from_env() -> Result<Arc<RxSafetyCore>, RxSafetyError> {
    let config = EngineConfig::from_env()?;
    Ok(RxSafetyCore::from_config(&config))
}

/// Engine without reference data (for testing).
#[uniffi::export]
pub fn open_engine_in_memory() -> Arc<RxSafetyCore> {
    Arc::new(RxSafetyCore {
        engine: SafetyEngine::from_tables(ReferenceTables::new()),
    })
}

/// First dose written in free text ("take 2.5 mg daily").
#[uniffi::export]
pub fn parse_dose_text(text: String) -> Option<FfiTextDosage> {
    normalizer::extract_dosage_from_text(&text).map(|d| FfiTextDosage {
        value: d.value,
        unit: d.unit,
    })
}

/// Install the default tracing subscriber. Later calls are no-ops.
#[uniffi::export]
pub fn init_logging() {
    config::init_tracing();
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe engine wrapper for FFI.
#[derive(uniffi::Object)]
pub struct RxSafetyCore {
    engine: SafetyEngine,
}

impl RxSafetyCore {
    fn from_config(config: &EngineConfig) -> Arc<Self> {
        Arc::new(Self {
            engine: SafetyEngine::from_config(config),
        })
    }

    /// Wrap an existing engine (e.g. over synthetic tables).
    pub fn with_engine(engine: SafetyEngine) -> Arc<Self> {
        Arc::new(Self { engine })
    }
}

#[uniffi::export]
impl RxSafetyCore {
    // =========================================================================
    // Interactions
    // =========================================================================

    /// Check every pair of medications for known interactions.
    pub fn check_interactions(
        &self,
        medications: Vec<String>,
    ) -> Result<FfiInteractionReport, RxSafetyError> {
        if medications.is_empty() {
            return Err(RxSafetyError::InvalidInput(
                "medications must not be empty".to_string(),
            ));
        }
        Ok(self.engine.check_interactions(&medications).into())
    }

    /// Plain-text interaction summary (for speech output).
    pub fn interaction_summary(&self, medications: Vec<String>) -> String {
        self.engine.interaction_summary(&medications)
    }

    // =========================================================================
    // Dosage
    // =========================================================================

    /// Verify one prescribed dose.
    pub fn check_dosage(
        &self,
        request: FfiDosageRequest,
    ) -> Result<FfiDosageVerdict, RxSafetyError> {
        let request = request.into_domain()?;
        let verdict = self.engine.verify_dosage(
            &request.patient,
            &request.medication,
            request.dose,
            &request.unit,
        );
        Ok(FfiDosageVerdict::new(request.medication, verdict))
    }

    /// Verify several prescribed doses in one call.
    pub fn check_dosages(
        &self,
        requests: Vec<FfiDosageRequest>,
    ) -> Result<Vec<FfiDosageVerdict>, RxSafetyError> {
        let requests = requests
            .into_iter()
            .map(FfiDosageRequest::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self
            .engine
            .batch_verify_dosages(&requests)
            .into_iter()
            .map(|r| FfiDosageVerdict::new(r.medication, r.verdict))
            .collect())
    }

    // =========================================================================
    // Alternatives
    // =========================================================================

    /// Suggest alternatives. A `reason` other than "general" is treated as
    /// prescription context ("for headache", "75mg for heart").
    pub fn suggest_alternatives(
        &self,
        medication: String,
        reason: Option<String>,
    ) -> Result<FfiAlternativesResult, RxSafetyError> {
        if medication.trim().is_empty() {
            return Err(RxSafetyError::InvalidInput(
                "medication must not be empty".to_string(),
            ));
        }

        let context = match reason.as_deref().map(str::trim) {
            Some(r) if !r.is_empty() && r != GENERAL_REASON => format!("{} {}", medication, r),
            _ => medication.clone(),
        };
        Ok(self
            .engine
            .alternatives_report(&medication, Some(&context))
            .into())
    }

    /// Canonical vocabulary entry for a name, if known.
    pub fn canonical_drug(&self, name: String) -> Option<FfiCanonicalDrug> {
        self.engine
            .repository()
            .canonical_drug(&name)
            .map(|entry| FfiCanonicalDrug {
                id: entry.id.clone(),
                primary_name: entry.primary_name.clone(),
                normalized_key: entry.normalized_key.clone(),
                synonyms: entry.synonyms.clone(),
            })
    }

    // =========================================================================
    // Risk
    // =========================================================================

    /// Aggregate 0-10 safety score for a prescription.
    pub fn predict_risk(
        &self,
        medications: Vec<FfiMedication>,
        patient: FfiPatientInfo,
    ) -> Result<FfiRiskResult, RxSafetyError> {
        let (medications, patient) = risk_inputs(medications, patient)?;
        FfiRiskResult::try_from(self.engine.predict_risk(&medications, &patient))
    }

    /// Same as `predict_risk`, serialized as JSON with full factor details.
    pub fn predict_risk_json(
        &self,
        medications: Vec<FfiMedication>,
        patient: FfiPatientInfo,
    ) -> Result<String, RxSafetyError> {
        let (medications, patient) = risk_inputs(medications, patient)?;
        Ok(self.engine.predict_risk(&medications, &patient).to_json()?)
    }
}

fn risk_inputs(
    medications: Vec<FfiMedication>,
    patient: FfiPatientInfo,
) -> Result<(Vec<PrescribedMedication>, PatientInfo), RxSafetyError> {
    let patient = patient.into_domain()?;
    let medications = medications
        .into_iter()
        .map(FfiMedication::into_domain)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((medications, patient))
}

fn validate_dose(dose: f64) -> Result<(), RxSafetyError> {
    if !dose.is_finite() || dose < 0.0 {
        return Err(RxSafetyError::InvalidInput(format!(
            "dose must be a non-negative number, got {}",
            dose
        )));
    }
    Ok(())
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe dose parsed from text.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTextDosage {
    pub value: f64,
    pub unit: String,
}

/// FFI-safe patient information. Absent fields take the defaults (age 0, 70 kg).
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiPatientInfo {
    pub age: Option<u32>,
    pub weight_kg: Option<f64>,
}

impl FfiPatientInfo {
    fn into_domain(self) -> Result<PatientInfo, RxSafetyError> {
        let mut patient = PatientInfo::default();
        if let Some(age) = self.age {
            if age > MAX_PATIENT_AGE {
                return Err(RxSafetyError::InvalidInput(format!(
                    "patient age must be at most {}, got {}",
                    MAX_PATIENT_AGE, age
                )));
            }
            patient.age = age;
        }
        if let Some(weight) = self.weight_kg {
            if !weight.is_finite() || weight < 0.0 {
                return Err(RxSafetyError::InvalidInput(format!(
                    "patient weight must be non-negative, got {}",
                    weight
                )));
            }
            patient.weight_kg = weight;
        }
        Ok(patient)
    }
}

/// FFI-safe interaction issue.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiInteractionIssue {
    pub drug_1: String,
    pub drug_2: String,
    pub severity: String,
    pub description: String,
    pub recommendation: String,
}

/// FFI-safe interaction report.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiInteractionReport {
    pub ok: bool,
    pub issues: Vec<FfiInteractionIssue>,
    pub severity_counts: HashMap<String, u32>,
    pub total: u32,
    pub summary: String,
}

impl From<InteractionReport> for FfiInteractionReport {
    fn from(report: InteractionReport) -> Self {
        let summary = report.summary();
        Self {
            ok: report.ok,
            issues: report
                .issues
                .into_iter()
                .map(|i| FfiInteractionIssue {
                    drug_1: i.drug_1,
                    drug_2: i.drug_2,
                    severity: i.severity.as_str().to_string(),
                    description: i.description,
                    recommendation: i.recommendation,
                })
                .collect(),
            severity_counts: report
                .severity_counts
                .iter()
                .map(|(s, n)| (s.as_str().to_string(), *n))
                .collect(),
            total: report.total,
            summary,
        }
    }
}

/// FFI-safe dose verification request.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDosageRequest {
    pub medication: String,
    pub dose: f64,
    pub unit: String,
    pub patient: FfiPatientInfo,
}

impl FfiDosageRequest {
    fn into_domain(self) -> Result<models::DosageRequest, RxSafetyError> {
        if self.medication.trim().is_empty() {
            return Err(RxSafetyError::InvalidInput(
                "medication must not be empty".to_string(),
            ));
        }
        validate_dose(self.dose)?;
        Ok(models::DosageRequest {
            medication: self.medication,
            dose: self.dose,
            unit: self.unit,
            patient: self.patient.into_domain()?,
        })
    }
}

/// FFI-safe dose verdict.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDosageVerdict {
    pub medication: String,
    pub status: String,
    pub message: String,
    pub prescribed_dose: String,
    pub ddd: Option<String>,
    pub dose_ratio: Option<f64>,
    pub age_group: Option<String>,
    pub age_adjustment: Option<String>,
    pub recommendation: String,
}

impl FfiDosageVerdict {
    fn new(medication: String, verdict: DosageVerdict) -> Self {
        Self {
            medication,
            status: verdict.status.as_str().to_string(),
            message: verdict.message,
            prescribed_dose: verdict.prescribed_dose,
            ddd: verdict.ddd,
            dose_ratio: verdict.dose_ratio,
            age_group: verdict.age_group.map(|g| g.as_str().to_string()),
            age_adjustment: verdict.age_adjustment,
            recommendation: verdict.recommendation,
        }
    }
}

/// FFI-safe alternative.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAlternative {
    pub name: String,
    pub atc_code: Option<String>,
    pub source: String,
    pub is_eml: bool,
    pub priority: u8,
    pub rationale: String,
}

impl From<AlternativeCandidate> for FfiAlternative {
    fn from(candidate: AlternativeCandidate) -> Self {
        Self {
            name: candidate.name,
            atc_code: candidate.atc_code,
            source: candidate.source.label().to_string(),
            is_eml: candidate.source == models::AlternativeSource::EssentialMedicinesList,
            priority: candidate.priority,
            rationale: candidate.rationale,
        }
    }
}

/// FFI-safe alternatives result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAlternativesResult {
    pub medication: String,
    pub dose_mg: Option<f64>,
    pub therapeutic_intent: String,
    pub target_atc_codes: Vec<String>,
    pub alternatives: Vec<FfiAlternative>,
    pub total_found: u32,
    pub explanation: String,
}

impl From<AlternativeReport> for FfiAlternativesResult {
    fn from(report: AlternativeReport) -> Self {
        Self {
            medication: report.medication,
            dose_mg: report.dose_mg,
            therapeutic_intent: report.therapeutic_intent.label().to_string(),
            target_atc_codes: report.target_atc_codes,
            total_found: report.alternatives.len() as u32,
            alternatives: report.alternatives.into_iter().map(|a| a.into()).collect(),
            explanation: report.explanation,
        }
    }
}

/// FFI-safe canonical drug.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCanonicalDrug {
    pub id: String,
    pub primary_name: String,
    pub normalized_key: String,
    pub synonyms: Vec<String>,
}

/// FFI-safe prescribed medication.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedication {
    pub name: String,
    pub dose: Option<f64>,
    pub unit: Option<String>,
}

impl FfiMedication {
    fn into_domain(self) -> Result<PrescribedMedication, RxSafetyError> {
        if let Some(dose) = self.dose {
            validate_dose(dose)?;
        }
        Ok(PrescribedMedication {
            name: self.name,
            dose: self.dose,
            unit: self.unit,
        })
    }
}

/// FFI-safe risk factor. Structured details are carried as JSON.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRiskFactor {
    pub kind: String,
    pub score: f64,
    pub weight: f64,
    pub message: String,
    pub details_json: String,
}

/// FFI-safe risk result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRiskResult {
    pub safety_score: f64,
    pub risk_level: String,
    pub factors: Vec<FfiRiskFactor>,
    pub recommendations: Vec<String>,
    pub patient_age: u32,
    pub age_group: String,
    pub medication_count: u32,
}

impl TryFrom<RiskResult> for FfiRiskResult {
    type Error = RxSafetyError;

    fn try_from(result: RiskResult) -> Result<Self, Self::Error> {
        let factors = result
            .factors
            .into_iter()
            .map(|(kind, factor)| -> Result<FfiRiskFactor, RxSafetyError> {
                Ok(FfiRiskFactor {
                    kind: kind.as_str().to_string(),
                    score: factor.score,
                    weight: factor.weight,
                    details_json: serde_json::to_string(&factor.details)?,
                    message: factor.message,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            safety_score: result.safety_score,
            risk_level: result.risk_level.as_str().to_string(),
            factors,
            recommendations: result.recommendations,
            patient_age: result.patient_context.age,
            age_group: result.patient_context.age_group.as_str().to_string(),
            medication_count: result.patient_context.medication_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core() -> Arc<RxSafetyCore> {
        RxSafetyCore::with_engine(SafetyEngine::from_tables(
            ReferenceTables::new()
                .interaction("Aspirin", "Warfarin", Severity::Major, "Bleeding risk")
                .ddd("A10BA02", "Metformin", 2.0, "g")
                .ddd("B01AC04", "Clopidogrel", 75.0, "mg"),
        ))
    }

    #[test]
    fn test_interaction_report_mapping() {
        let report = core()
            .check_interactions(vec!["Aspirin".into(), "Warfarin".into()])
            .unwrap();

        assert!(!report.ok);
        assert_eq!(report.issues[0].severity, "Major");
        assert_eq!(report.severity_counts.get("Major"), Some(&1));
        assert_eq!(report.severity_counts.get("Minor"), Some(&0));
        assert!(report.summary.contains("1 MAJOR"));
    }

    #[test]
    fn test_empty_medication_list_rejected() {
        assert!(matches!(
            core().check_interactions(vec![]),
            Err(RxSafetyError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_dosage_validation() {
        let request = |dose: f64, age: Option<u32>| FfiDosageRequest {
            medication: "Metformin".into(),
            dose,
            unit: "mg".into(),
            patient: FfiPatientInfo {
                age,
                weight_kg: None,
            },
        };

        let verdict = core().check_dosage(request(2000.0, Some(40))).unwrap();
        assert_eq!(verdict.status, "safe");
        assert_eq!(verdict.dose_ratio, Some(1.0));
        assert_eq!(verdict.age_group.as_deref(), Some("Adult"));

        assert!(core().check_dosage(request(-1.0, Some(40))).is_err());
        assert!(core().check_dosage(request(f64::NAN, Some(40))).is_err());
        assert!(core().check_dosage(request(500.0, Some(121))).is_err());
    }

    #[test]
    fn test_general_reason_is_not_context() {
        let result = core()
            .suggest_alternatives("Aspirin".into(), Some("general".into()))
            .unwrap();
        assert_eq!(result.therapeutic_intent, "antiplatelet");
        assert_eq!(result.explanation, "Therapeutic intent: antiplatelet | Target ATC classes: B01AC");
        assert_eq!(result.total_found, 1);
        assert_eq!(result.alternatives[0].name, "Clopidogrel");

        let result = core()
            .suggest_alternatives("Aspirin".into(), Some("500mg for headache".into()))
            .unwrap();
        assert_eq!(result.therapeutic_intent, "analgesic/antipyretic");
        assert_eq!(result.dose_mg, Some(500.0));
    }

    #[test]
    fn test_risk_result_mapping() {
        let core = core();
        let medications = vec![
            FfiMedication {
                name: "Aspirin".into(),
                dose: None,
                unit: None,
            },
            FfiMedication {
                name: "Warfarin".into(),
                dose: None,
                unit: None,
            },
        ];

        let result = core
            .predict_risk(medications.clone(), FfiPatientInfo::default())
            .unwrap();
        assert_eq!(result.factors.len(), 3);
        assert_eq!(result.factors[0].kind, "interaction_risk");
        assert!(result.factors[0].details_json.contains("\"kind\":\"interaction\""));
        assert_eq!(result.risk_level, "MODERATE RISK");

        let json = core
            .predict_risk_json(medications, FfiPatientInfo::default())
            .unwrap();
        let parsed: RiskResult = serde_json::from_str(&json).unwrap();
        assert!((parsed.safety_score - result.safety_score).abs() < 1e-9);
        assert_eq!(parsed.factors.len(), 3);
    }

    #[test]
    fn test_parse_dose_text() {
        let dose = parse_dose_text("Amoxicillin 250 MG capsule".into()).unwrap();
        assert_eq!(dose.value, 250.0);
        assert_eq!(dose.unit, "mg");
        assert!(parse_dose_text("as needed".into()).is_none());
    }

    #[test]
    fn test_in_memory_engine_is_degraded() {
        let core = open_engine_in_memory();
        let verdict = core
            .check_dosage(FfiDosageRequest {
                medication: "Metformin".into(),
                dose: 500.0,
                unit: "mg".into(),
                patient: FfiPatientInfo::default(),
            })
            .unwrap();
        assert_eq!(verdict.status, "unknown");
        assert!(core.canonical_drug("aspirin".into()).is_none());
    }
}
