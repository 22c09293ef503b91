//! Pairwise drug-drug interaction checking.

use tracing::debug;

use crate::models::{InteractionIssue, InteractionReport};
use crate::normalizer::normalize_name;
use crate::repository::{InteractionEntry, ReferenceRepository, Vocabulary};

/// Checks every unordered pair of a medication list against the interaction index.
pub struct InteractionChecker<'a> {
    repository: &'a ReferenceRepository,
}

impl<'a> InteractionChecker<'a> {
    pub fn new(repository: &'a ReferenceRepository) -> Self {
        Self { repository }
    }

    /// Check a medication list. Issues keep the caller's spelling of each name.
    pub fn check(&self, medications: &[String]) -> InteractionReport {
        if medications.len() < 2 {
            return InteractionReport::empty();
        }

        let normalized: Vec<String> = medications.iter().map(|m| normalize_name(m)).collect();

        let mut issues = Vec::new();
        for i in 0..normalized.len() {
            for j in (i + 1)..normalized.len() {
                if let Some(entry) = self.find(&normalized[i], &normalized[j]) {
                    issues.push(InteractionIssue {
                        drug_1: medications[i].clone(),
                        drug_2: medications[j].clone(),
                        severity: entry.severity,
                        description: entry.description.clone(),
                        recommendation: entry.severity.recommendation().to_string(),
                    });
                }
            }
        }

        let report = InteractionReport::from_issues(issues);
        debug!(
            medications = medications.len(),
            interactions = report.total,
            "Interaction check complete"
        );
        report
    }

    /// Plain-text summary of [`InteractionChecker::check`].
    pub fn summary(&self, medications: &[String]) -> String {
        self.check(medications).summary()
    }

    /// Direct pair lookup, then every vocabulary key (primary and synonyms)
    /// of both drugs.
    fn find(&self, a: &str, b: &str) -> Option<&'a InteractionEntry> {
        let index = self.repository.interaction_index();
        if let Some(entry) = index.find(a, b) {
            return Some(entry);
        }

        let vocabulary = self.repository.vocabulary();
        let keys_a = known_keys(vocabulary, a);
        let keys_b = known_keys(vocabulary, b);
        if keys_a.len() == 1 && keys_b.len() == 1 {
            return None;
        }
        keys_a
            .iter()
            .flat_map(|ka| keys_b.iter().map(move |kb| (*ka, *kb)))
            .find_map(|(ka, kb)| index.find(ka, kb))
    }
}

/// The name itself followed by the other keys of its canonical drug.
fn known_keys<'v>(vocabulary: &'v Vocabulary, name: &'v str) -> Vec<&'v str> {
    let mut keys = vec![name];
    if let Some(entry) = vocabulary.lookup(name) {
        for key in std::iter::once(&entry.normalized_key).chain(&entry.synonyms) {
            if !key.is_empty() && !keys.contains(&key.as_str()) {
                keys.push(key.as_str());
            }
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use crate::repository::ReferenceTables;

    fn repository() -> ReferenceRepository {
        ReferenceRepository::new(
            ReferenceTables::new()
                .drug("DB00945", "Acetylsalicylic acid", &["Aspirin"])
                .interaction("Aspirin", "Warfarin", Severity::Major, "Increased bleeding risk")
                .interaction("Ibuprofen", "Lisinopril", Severity::Moderate, "Reduced antihypertensive effect")
                .interaction("Acetylsalicylic acid", "Ibuprofen", Severity::Minor, "Reduced antiplatelet effect"),
        )
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fewer_than_two_is_ok() {
        let repo = repository();
        let checker = InteractionChecker::new(&repo);

        assert_eq!(checker.check(&[]), InteractionReport::empty());
        assert_eq!(checker.check(&names(&["Warfarin"])), InteractionReport::empty());
    }

    #[test]
    fn test_major_interaction_keeps_caller_names() {
        let repo = repository();
        let checker = InteractionChecker::new(&repo);

        let report = checker.check(&names(&["Aspirin 75mg", "Warfarin Tablet"]));
        assert!(!report.ok);
        assert_eq!(report.total, 1);
        assert_eq!(report.issues[0].drug_1, "Aspirin 75mg");
        assert_eq!(report.issues[0].drug_2, "Warfarin Tablet");
        assert_eq!(report.issues[0].severity, Severity::Major);
        assert!(report.issues[0].recommendation.starts_with("AVOID"));
        assert_eq!(report.count(Severity::Major), 1);
    }

    #[test]
    fn test_every_pair_checked_once() {
        let repo = repository();
        let checker = InteractionChecker::new(&repo);

        let report = checker.check(&names(&["Warfarin", "Ibuprofen", "Lisinopril", "Aspirin"]));
        // warfarin+aspirin (Major), ibuprofen+lisinopril (Moderate),
        // ibuprofen+aspirin via the vocabulary (Minor)
        assert_eq!(report.total, 3);
        assert_eq!(report.count(Severity::Major), 1);
        assert_eq!(report.count(Severity::Moderate), 1);
        assert_eq!(report.count(Severity::Minor), 1);
    }

    #[test]
    fn test_vocabulary_fallback() {
        let repo = repository();
        let checker = InteractionChecker::new(&repo);

        let report = checker.check(&names(&["Aspirin", "Ibuprofen"]));
        assert_eq!(report.total, 1);
        assert_eq!(report.issues[0].severity, Severity::Minor);
    }

    #[test]
    fn test_pair_stored_under_synonym_matches_primary_name() {
        let repo = ReferenceRepository::new(
            ReferenceTables::new()
                .drug("DB00682", "Warfarin", &["Coumadin"])
                .interaction("Coumadin", "Aspirin", Severity::Major, "Bleeding"),
        );
        let checker = InteractionChecker::new(&repo);

        let report = checker.check(&names(&["Warfarin", "Aspirin"]));
        assert_eq!(report.total, 1);
        assert_eq!(report.issues[0].drug_1, "Warfarin");
        assert_eq!(report.issues[0].severity, Severity::Major);
    }

    #[test]
    fn test_no_interactions() {
        let repo = repository();
        let checker = InteractionChecker::new(&repo);

        let report = checker.check(&names(&["Metformin", "Atorvastatin"]));
        assert!(report.ok);
        assert!(report.issues.is_empty());
        assert_eq!(
            checker.summary(&names(&["Metformin", "Atorvastatin"])),
            "No known drug interactions detected."
        );
    }

    #[test]
    fn test_empty_names_never_match() {
        let repo = repository();
        let checker = InteractionChecker::new(&repo);

        let report = checker.check(&names(&["500mg", "Tablet"]));
        assert!(report.ok);
    }
}
