//! Reference data sources.
//!
//! A source only knows how to read raw tables; memoization and degraded-mode
//! handling live in [`super::ReferenceRepository`].

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::EngineConfig;
use crate::db::Database;
use crate::models::{
    AgeAdjustmentRecord, AgeGroup, CanonicalDrugEntry, DddRecord, EssentialMedicine,
    InteractionRecord, MedicineComposition, Severity,
};
use crate::normalizer::normalize_name;

use super::{SourceError, SourceResult, Vocabulary};

/// Supplier of the immutable reference tables.
pub trait ReferenceSource: Send + Sync {
    /// Short description used in log events.
    fn describe(&self) -> String;

    fn load_vocabulary(&self) -> SourceResult<Vocabulary>;
    fn load_interactions(&self) -> SourceResult<Vec<InteractionRecord>>;
    fn load_ddd_records(&self) -> SourceResult<Vec<DddRecord>>;
    fn load_age_adjustments(&self) -> SourceResult<Vec<AgeAdjustmentRecord>>;
    fn load_essential_medicines(&self) -> SourceResult<Vec<EssentialMedicine>>;
    fn load_compositions(&self) -> SourceResult<Vec<MedicineComposition>>;
}

// =============================================================================
// SQLite + JSON (ETL output)
// =============================================================================

/// Tables from the ETL's SQLite database plus its vocabulary JSON file.
pub struct SqliteReferenceSource {
    db: Mutex<Database>,
    vocabulary_path: Option<PathBuf>,
}

impl SqliteReferenceSource {
    pub fn new(db: Database, vocabulary_path: Option<PathBuf>) -> Self {
        Self {
            db: Mutex::new(db),
            vocabulary_path,
        }
    }

    /// Open the reference database named by the configuration, read-only.
    pub fn open(config: &EngineConfig) -> SourceResult<Self> {
        let db_path = config.reference_db_path();
        if !db_path.exists() {
            return Err(SourceError::MissingFile(db_path));
        }
        let db = Database::open_read_only(&db_path)?;
        Ok(Self::new(db, Some(config.vocabulary_path())))
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> crate::db::DbResult<T>) -> SourceResult<T> {
        let db = self.db.lock().map_err(|_| SourceError::LockPoisoned)?;
        Ok(f(&db)?)
    }
}

fn read_vocabulary_file(path: &Path) -> SourceResult<Vocabulary> {
    if !path.exists() {
        return Err(SourceError::MissingFile(path.to_path_buf()));
    }
    let json = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Vocabulary::from_json_str(&json)?)
}

impl ReferenceSource for SqliteReferenceSource {
    fn describe(&self) -> String {
        match &self.vocabulary_path {
            Some(path) => format!("sqlite (vocabulary: {})", path.display()),
            None => "sqlite".to_string(),
        }
    }

    fn load_vocabulary(&self) -> SourceResult<Vocabulary> {
        match &self.vocabulary_path {
            Some(path) => read_vocabulary_file(path),
            None => Ok(Vocabulary::empty()),
        }
    }

    fn load_interactions(&self) -> SourceResult<Vec<InteractionRecord>> {
        self.with_db(|db| db.load_interactions())
    }

    fn load_ddd_records(&self) -> SourceResult<Vec<DddRecord>> {
        self.with_db(|db| db.load_ddd_records())
    }

    fn load_age_adjustments(&self) -> SourceResult<Vec<AgeAdjustmentRecord>> {
        self.with_db(|db| db.load_age_adjustments())
    }

    fn load_essential_medicines(&self) -> SourceResult<Vec<EssentialMedicine>> {
        self.with_db(|db| db.load_essential_medicines())
    }

    fn load_compositions(&self) -> SourceResult<Vec<MedicineComposition>> {
        self.with_db(|db| db.load_compositions())
    }
}

// =============================================================================
// In-memory tables
// =============================================================================

/// Synthetic reference tables, built in code.
///
/// Builder methods normalize display names the same way the ETL does, so
/// tests can write `Aspirin 75mg` and still match `aspirin`.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub vocabulary: Vec<CanonicalDrugEntry>,
    pub interactions: Vec<InteractionRecord>,
    pub ddd_records: Vec<DddRecord>,
    pub age_adjustments: Vec<AgeAdjustmentRecord>,
    pub essential_medicines: Vec<EssentialMedicine>,
    pub compositions: Vec<MedicineComposition>,
}

impl ReferenceTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a canonical drug with its synonyms.
    pub fn drug(mut self, id: &str, primary_name: &str, synonyms: &[&str]) -> Self {
        self.vocabulary.push(CanonicalDrugEntry {
            id: id.to_string(),
            primary_name: primary_name.to_string(),
            normalized_key: normalize_name(primary_name),
            synonyms: synonyms.iter().map(|s| normalize_name(s)).collect(),
        });
        self
    }

    pub fn interaction(
        mut self,
        drug_a: &str,
        drug_b: &str,
        severity: Severity,
        description: &str,
    ) -> Self {
        self.interactions.push(InteractionRecord {
            drug_a: drug_a.to_string(),
            drug_b: drug_b.to_string(),
            severity,
            description: description.to_string(),
            drug_a_normalized: normalize_name(drug_a),
            drug_b_normalized: normalize_name(drug_b),
        });
        self
    }

    pub fn ddd(mut self, atc_code: &str, drug_name: &str, ddd: f64, unit: &str) -> Self {
        self.ddd_records.push(DddRecord {
            atc_code: atc_code.to_string(),
            drug_name: drug_name.to_string(),
            drug_name_normalized: normalize_name(drug_name),
            ddd: Some(ddd),
            unit: Some(unit.to_string()),
            route: Some("O".to_string()),
        });
        self
    }

    /// An ATC entry with no Defined Daily Dose.
    pub fn atc_entry(mut self, atc_code: &str, drug_name: &str) -> Self {
        self.ddd_records.push(DddRecord {
            atc_code: atc_code.to_string(),
            drug_name: drug_name.to_string(),
            drug_name_normalized: normalize_name(drug_name),
            ddd: None,
            unit: None,
            route: None,
        });
        self
    }

    pub fn age_adjustment(mut self, drug: &str, age_group: AgeGroup, usage_pattern: &str) -> Self {
        self.age_adjustments.push(AgeAdjustmentRecord {
            drug: drug.to_string(),
            drug_normalized: normalize_name(drug),
            age_group,
            usage_pattern: usage_pattern.to_string(),
        });
        self
    }

    pub fn essential(mut self, medicine: &str, atc_code: &str) -> Self {
        self.essential_medicines.push(EssentialMedicine {
            medicine: medicine.to_string(),
            medicine_normalized: normalize_name(medicine),
            atc_code: atc_code.to_string(),
            category: None,
        });
        self
    }

    pub fn composition(mut self, medicine_name: &str, composition: &str) -> Self {
        self.compositions.push(MedicineComposition {
            medicine_name: medicine_name.to_string(),
            composition: composition.to_string(),
        });
        self
    }
}

impl ReferenceSource for ReferenceTables {
    fn describe(&self) -> String {
        "in-memory".to_string()
    }

    fn load_vocabulary(&self) -> SourceResult<Vocabulary> {
        Ok(Vocabulary::from_entries(self.vocabulary.clone()))
    }

    fn load_interactions(&self) -> SourceResult<Vec<InteractionRecord>> {
        Ok(self.interactions.clone())
    }

    fn load_ddd_records(&self) -> SourceResult<Vec<DddRecord>> {
        Ok(self.ddd_records.clone())
    }

    fn load_age_adjustments(&self) -> SourceResult<Vec<AgeAdjustmentRecord>> {
        Ok(self.age_adjustments.clone())
    }

    fn load_essential_medicines(&self) -> SourceResult<Vec<EssentialMedicine>> {
        Ok(self.essential_medicines.clone())
    }

    fn load_compositions(&self) -> SourceResult<Vec<MedicineComposition>> {
        Ok(self.compositions.clone())
    }
}
