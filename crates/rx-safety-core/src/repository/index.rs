//! Order-independent interaction lookup.

use std::collections::HashMap;

use crate::models::{InteractionRecord, Severity};

/// Severity and description stored for one drug pair.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionEntry {
    pub severity: Severity,
    pub description: String,
}

/// Hash index keyed by the lexicographically sorted normalized pair.
#[derive(Debug, Default)]
pub struct InteractionIndex {
    pairs: HashMap<(String, String), InteractionEntry>,
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl InteractionIndex {
    /// Index interaction records. A later row for the same pair replaces an earlier one.
    pub fn build(records: &[InteractionRecord]) -> Self {
        let mut pairs = HashMap::with_capacity(records.len());
        for record in records {
            if record.drug_a_normalized.is_empty() || record.drug_b_normalized.is_empty() {
                continue;
            }
            pairs.insert(
                pair_key(&record.drug_a_normalized, &record.drug_b_normalized),
                InteractionEntry {
                    severity: record.severity,
                    description: record.description.clone(),
                },
            );
        }
        Self { pairs }
    }

    /// Find the interaction between two normalized names, in either order.
    pub fn find(&self, a: &str, b: &str) -> Option<&InteractionEntry> {
        if a.is_empty() || b.is_empty() {
            return None;
        }
        self.pairs.get(&pair_key(a, b))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(a: &str, b: &str, severity: Severity, description: &str) -> InteractionRecord {
        InteractionRecord {
            drug_a: a.into(),
            drug_b: b.into(),
            severity,
            description: description.into(),
            drug_a_normalized: a.into(),
            drug_b_normalized: b.into(),
        }
    }

    #[test]
    fn test_lookup_is_symmetric() {
        let index = InteractionIndex::build(&[record(
            "warfarin",
            "aspirin",
            Severity::Major,
            "Bleeding risk",
        )]);

        let forward = index.find("aspirin", "warfarin").unwrap();
        let backward = index.find("warfarin", "aspirin").unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.severity, Severity::Major);
    }

    #[test]
    fn test_later_duplicate_replaces_earlier() {
        let index = InteractionIndex::build(&[
            record("aspirin", "ibuprofen", Severity::Minor, "first"),
            record("ibuprofen", "aspirin", Severity::Moderate, "second"),
        ]);

        assert_eq!(index.len(), 1);
        let entry = index.find("aspirin", "ibuprofen").unwrap();
        assert_eq!(entry.severity, Severity::Moderate);
        assert_eq!(entry.description, "second");
    }

    #[test]
    fn test_empty_keys_never_match() {
        let index = InteractionIndex::build(&[record("", "aspirin", Severity::Major, "x")]);
        assert!(index.is_empty());
        assert!(index.find("", "aspirin").is_none());
        assert!(index.find("aspirin", "").is_none());
    }
}
