//! Reference data repository.
//!
//! Handles:
//! - Lazy, memoized loading of each reference table (at most once per repository)
//! - Degraded mode: a table that fails to load is served as empty
//! - Derived lookups (interaction index, first-wins DDD, canonical vocabulary)

mod index;
mod source;
mod vocabulary;

pub use index::*;
pub use source::*;
pub use vocabulary::*;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use thiserror::Error;
use tracing::{info, warn};

use crate::db::DbError;
use crate::models::{
    AgeAdjustmentRecord, AgeGroup, CanonicalDrugEntry, DddRecord, EssentialMedicine,
    InteractionRecord, MedicineComposition,
};
use crate::normalizer::normalize_name;

/// Reference source errors.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Reference file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid vocabulary JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reference database lock poisoned")]
    LockPoisoned,
}

pub type SourceResult<T> = Result<T, SourceError>;

/// ATC/DDD rows with a first-wins index over the rows that carry a usable DDD.
#[derive(Debug, Default)]
struct DddTable {
    records: Vec<DddRecord>,
    by_name: HashMap<String, usize>,
}

impl DddTable {
    fn build(records: Vec<DddRecord>) -> Self {
        let mut by_name = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if record.daily_dose().is_none() {
                continue;
            }
            by_name
                .entry(record.drug_name_normalized.clone())
                .or_insert(i);
        }
        Self { records, by_name }
    }
}

/// Read-only accessors over the reference tables.
///
/// Every table is pulled from the source on first access and kept for the
/// repository's lifetime. Concurrent first accesses load once.
pub struct ReferenceRepository {
    source: Box<dyn ReferenceSource>,
    vocabulary: OnceLock<Vocabulary>,
    interactions: OnceLock<Vec<InteractionRecord>>,
    interaction_index: OnceLock<InteractionIndex>,
    ddd: OnceLock<DddTable>,
    age_adjustments: OnceLock<Vec<AgeAdjustmentRecord>>,
    essential_medicines: OnceLock<Vec<EssentialMedicine>>,
    compositions: OnceLock<Vec<MedicineComposition>>,
}

impl ReferenceRepository {
    pub fn new(source: impl ReferenceSource + 'static) -> Self {
        Self::from_boxed(Box::new(source))
    }

    pub fn from_boxed(source: Box<dyn ReferenceSource>) -> Self {
        Self {
            source,
            vocabulary: OnceLock::new(),
            interactions: OnceLock::new(),
            interaction_index: OnceLock::new(),
            ddd: OnceLock::new(),
            age_adjustments: OnceLock::new(),
            essential_medicines: OnceLock::new(),
            compositions: OnceLock::new(),
        }
    }

    /// Repository with no reference data at all.
    pub fn empty() -> Self {
        Self::new(ReferenceTables::new())
    }

    /// Shared handle, as components and the FFI layer hold it.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Force every table to load now instead of on first use.
    pub fn preload(&self) {
        self.vocabulary();
        self.interaction_index();
        self.ddd_records();
        self.age_adjustments();
        self.essential_medicines();
        self.compositions();
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        self.vocabulary.get_or_init(|| match self.source.load_vocabulary() {
            Ok(vocab) => {
                info!(
                    table = "vocabulary",
                    drugs = vocab.len(),
                    keys = vocab.key_count(),
                    "Loaded reference table"
                );
                vocab
            }
            Err(e) => {
                warn!(
                    table = "vocabulary",
                    source = %self.source.describe(),
                    error = %e,
                    "Reference table unavailable, continuing without it"
                );
                Vocabulary::empty()
            }
        })
    }

    pub fn interactions(&self) -> &[InteractionRecord] {
        self.interactions
            .get_or_init(|| self.load_or_empty("interactions", self.source.load_interactions()))
    }

    pub fn interaction_index(&self) -> &InteractionIndex {
        self.interaction_index
            .get_or_init(|| InteractionIndex::build(self.interactions()))
    }

    pub fn ddd_records(&self) -> &[DddRecord] {
        &self.ddd_table().records
    }

    /// Authoritative DDD for a normalized name: the first row in table order
    /// with a usable dose. Entries without a DDD are skipped.
    pub fn ddd_for(&self, normalized: &str) -> Option<&DddRecord> {
        let table = self.ddd_table();
        table
            .by_name
            .get(normalized)
            .and_then(|&i| table.records.get(i))
    }

    pub fn age_adjustments(&self) -> &[AgeAdjustmentRecord] {
        self.age_adjustments.get_or_init(|| {
            self.load_or_empty("age_specific", self.source.load_age_adjustments())
        })
    }

    /// Drug-specific age guidance, first matching row.
    pub fn age_adjustment_for(
        &self,
        normalized: &str,
        age_group: AgeGroup,
    ) -> Option<&AgeAdjustmentRecord> {
        self.age_adjustments()
            .iter()
            .find(|r| r.drug_normalized == normalized && r.age_group == age_group)
    }

    pub fn essential_medicines(&self) -> &[EssentialMedicine] {
        self.essential_medicines
            .get_or_init(|| self.load_or_empty("eml", self.source.load_essential_medicines()))
    }

    pub fn compositions(&self) -> &[MedicineComposition] {
        self.compositions.get_or_init(|| {
            self.load_or_empty("medicine_details", self.source.load_compositions())
        })
    }

    /// Canonical drug for a free-text name, via the vocabulary.
    pub fn canonical_drug(&self, name: &str) -> Option<Arc<CanonicalDrugEntry>> {
        let key = normalize_name(name);
        self.vocabulary().lookup(&key).cloned()
    }

    fn ddd_table(&self) -> &DddTable {
        self.ddd.get_or_init(|| {
            DddTable::build(self.load_or_empty("atc_ddd", self.source.load_ddd_records()))
        })
    }

    fn load_or_empty<T>(&self, table: &str, result: SourceResult<Vec<T>>) -> Vec<T> {
        match result {
            Ok(rows) => {
                info!(table, rows = rows.len(), "Loaded reference table");
                rows
            }
            Err(e) => {
                warn!(
                    table,
                    source = %self.source.describe(),
                    error = %e,
                    "Reference table unavailable, continuing without it"
                );
                Vec::new()
            }
        }
    }
}
