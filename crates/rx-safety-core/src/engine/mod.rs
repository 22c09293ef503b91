//! Prescription safety engine.
//!
//! Components borrow the reference repository for the duration of a call:
//! InteractionChecker → DosageVerifier → AlternativeMatcher → RiskAggregator.
//! [`SafetyEngine`] owns the shared repository and hands it to them.

mod alternatives;
mod dosage;
mod intent;
mod interactions;
mod risk;

pub use alternatives::*;
pub use dosage::*;
pub use intent::{extract_context, extract_mg_dose, resolve_intent};
pub use interactions::*;
pub use risk::*;

use std::sync::Arc;

use tracing::warn;

use crate::config::EngineConfig;
use crate::models::{
    AlternativeCandidate, AlternativeReport, DosageRequest, DosageVerdict, InteractionReport,
    MedicationDosageVerdict, PatientInfo, PrescribedMedication, RiskResult,
};
use crate::repository::{ReferenceRepository, ReferenceTables, SqliteReferenceSource};

/// Facade over the components, holding the shared reference data.
///
/// Cloning is cheap; every clone reads the same memoized tables.
#[derive(Clone)]
pub struct SafetyEngine {
    repository: Arc<ReferenceRepository>,
    max_alternatives: usize,
}

impl SafetyEngine {
    pub fn new(repository: Arc<ReferenceRepository>, max_alternatives: usize) -> Self {
        Self {
            repository,
            max_alternatives,
        }
    }

    /// Engine over synthetic tables.
    pub fn from_tables(tables: ReferenceTables) -> Self {
        Self::new(
            ReferenceRepository::new(tables).shared(),
            crate::config::DEFAULT_MAX_ALTERNATIVES,
        )
    }

    /// Engine over the ETL output named by `config`.
    ///
    /// An unreadable reference database does not fail construction: the
    /// engine runs with empty tables and every lookup degrades.
    pub fn from_config(config: &EngineConfig) -> Self {
        let repository = match SqliteReferenceSource::open(config) {
            Ok(source) => ReferenceRepository::new(source),
            Err(e) => {
                warn!(
                    path = %config.reference_db_path().display(),
                    error = %e,
                    "Reference database unavailable, running without reference data"
                );
                ReferenceRepository::empty()
            }
        };
        Self::new(repository.shared(), config.max_alternatives)
    }

    pub fn repository(&self) -> &ReferenceRepository {
        &self.repository
    }

    pub fn max_alternatives(&self) -> usize {
        self.max_alternatives
    }

    pub fn check_interactions(&self, medications: &[String]) -> InteractionReport {
        InteractionChecker::new(&self.repository).check(medications)
    }

    pub fn interaction_summary(&self, medications: &[String]) -> String {
        InteractionChecker::new(&self.repository).summary(medications)
    }

    pub fn verify_dosage(
        &self,
        patient: &PatientInfo,
        medication: &str,
        dose: f64,
        unit: &str,
    ) -> DosageVerdict {
        DosageVerifier::new(&self.repository).verify(patient, medication, dose, unit)
    }

    pub fn batch_verify_dosages(&self, requests: &[DosageRequest]) -> Vec<MedicationDosageVerdict> {
        DosageVerifier::new(&self.repository).verify_batch(requests)
    }

    /// Ranked alternatives, bounded by the configured limit.
    pub fn suggest_alternatives(
        &self,
        medication: &str,
        context: Option<&str>,
    ) -> Vec<AlternativeCandidate> {
        AlternativeMatcher::new(&self.repository).suggest(
            medication,
            context,
            self.max_alternatives,
        )
    }

    pub fn alternatives_report(&self, medication: &str, context: Option<&str>) -> AlternativeReport {
        AlternativeMatcher::new(&self.repository).report(
            medication,
            context,
            self.max_alternatives,
        )
    }

    pub fn predict_risk(
        &self,
        medications: &[PrescribedMedication],
        patient: &PatientInfo,
    ) -> RiskResult {
        RiskAggregator::new(&self.repository).predict(medications, patient)
    }
}
