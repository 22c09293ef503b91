//! Canonical drug vocabulary.
//!
//! The ETL writes a JSON object keyed by normalized name. Primary keys and
//! synonym keys both appear, each carrying a copy of the canonical entry:
//!
//! ```json
//! {
//!   "acetylsalicylic acid": {"id": "DB00945", "primary_name": "Acetylsalicylic acid",
//!                            "normalized": "acetylsalicylic acid", "synonyms": ["aspirin"]},
//!   "aspirin": {"id": "DB00945", "primary_name": "Acetylsalicylic acid",
//!               "normalized": "acetylsalicylic acid", "synonyms": ["aspirin"]}
//! }
//! ```
//!
//! Loading collapses those copies so every key of one drug shares a single
//! [`CanonicalDrugEntry`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Deserialize;

use crate::models::CanonicalDrugEntry;
use crate::normalizer::normalize_name;

/// Entry as serialized by the ETL.
#[derive(Debug, Deserialize)]
struct RawVocabularyEntry {
    #[serde(default)]
    id: serde_json::Value,
    #[serde(default)]
    primary_name: String,
    #[serde(default)]
    normalized: String,
    #[serde(default)]
    synonyms: Vec<String>,
}

impl RawVocabularyEntry {
    fn id_string(&self) -> String {
        match &self.id {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Lookup from any normalized key (primary or synonym) to its canonical drug.
#[derive(Debug, Default)]
pub struct Vocabulary {
    by_key: HashMap<String, Arc<CanonicalDrugEntry>>,
    drug_count: usize,
}

impl Vocabulary {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from canonical entries.
    ///
    /// A primary key always resolves to its own entry. A synonym claimed by
    /// several drugs resolves to the first one seen.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = CanonicalDrugEntry>,
    {
        let shared: Vec<Arc<CanonicalDrugEntry>> = entries
            .into_iter()
            .filter(|e| !e.normalized_key.is_empty())
            .map(Arc::new)
            .collect();

        let mut by_key = HashMap::new();
        for entry in &shared {
            by_key.insert(entry.normalized_key.clone(), Arc::clone(entry));
        }
        for entry in &shared {
            for synonym in &entry.synonyms {
                if synonym.is_empty() {
                    continue;
                }
                by_key
                    .entry(synonym.clone())
                    .or_insert_with(|| Arc::clone(entry));
            }
        }

        Self {
            drug_count: shared.len(),
            by_key,
        }
    }

    /// Parse the ETL's vocabulary document.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        // BTreeMap keeps the collapse deterministic
        let raw: BTreeMap<String, RawVocabularyEntry> = serde_json::from_str(json)?;

        let mut entries: BTreeMap<String, CanonicalDrugEntry> = BTreeMap::new();
        for (key, item) in raw {
            let primary = if item.normalized.is_empty() {
                normalize_name(&key)
            } else {
                item.normalized.to_lowercase()
            };
            if primary.is_empty() {
                continue;
            }

            let entry = entries
                .entry(primary.clone())
                .or_insert_with(|| CanonicalDrugEntry {
                    id: item.id_string(),
                    primary_name: if item.primary_name.is_empty() {
                        primary.clone()
                    } else {
                        item.primary_name.clone()
                    },
                    normalized_key: primary.clone(),
                    synonyms: Vec::new(),
                });

            for synonym in item.synonyms.iter().map(|s| s.to_lowercase()) {
                if !synonym.is_empty() && !entry.synonyms.contains(&synonym) {
                    entry.synonyms.push(synonym);
                }
            }
            let key = key.to_lowercase();
            if key != primary && !entry.synonyms.contains(&key) {
                entry.synonyms.push(key);
            }
        }

        Ok(Self::from_entries(entries.into_values()))
    }

    /// Canonical entry for a normalized key.
    pub fn lookup(&self, normalized: &str) -> Option<&Arc<CanonicalDrugEntry>> {
        self.by_key.get(normalized)
    }

    /// Primary normalized key for a normalized key, if the vocabulary knows it.
    pub fn canonical_key(&self, normalized: &str) -> Option<&str> {
        self.lookup(normalized).map(|e| e.normalized_key.as_str())
    }

    /// Number of distinct canonical drugs.
    pub fn len(&self) -> usize {
        self.drug_count
    }

    pub fn is_empty(&self) -> bool {
        self.drug_count == 0
    }

    /// Number of lookup keys (primaries plus synonyms).
    pub fn key_count(&self) -> usize {
        self.by_key.len()
    }
}
