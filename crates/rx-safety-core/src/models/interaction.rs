//! Interaction check results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Severity;

/// An interaction found between two medications of a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionIssue {
    /// First medication, as the caller wrote it
    pub drug_1: String,
    /// Second medication, as the caller wrote it
    pub drug_2: String,
    pub severity: Severity,
    pub description: String,
    pub recommendation: String,
}

/// Result of checking a medication list for pairwise interactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionReport {
    /// True iff no interaction was found
    pub ok: bool,
    pub issues: Vec<InteractionIssue>,
    /// Occurrences per severity tag
    pub severity_counts: BTreeMap<Severity, u32>,
    pub total: u32,
}

impl InteractionReport {
    /// Report for a list with nothing to compare.
    pub fn empty() -> Self {
        Self {
            ok: true,
            issues: Vec::new(),
            severity_counts: BTreeMap::new(),
            total: 0,
        }
    }

    /// Build a report from the issues found, tallying severities.
    pub fn from_issues(issues: Vec<InteractionIssue>) -> Self {
        let mut severity_counts: BTreeMap<Severity, u32> = [
            (Severity::Major, 0),
            (Severity::Moderate, 0),
            (Severity::Minor, 0),
        ]
        .into_iter()
        .collect();

        for issue in &issues {
            *severity_counts.entry(issue.severity).or_insert(0) += 1;
        }

        Self {
            ok: issues.is_empty(),
            total: issues.len() as u32,
            issues,
            severity_counts,
        }
    }

    /// Most severe tag among the issues, if any.
    pub fn highest_severity(&self) -> Option<Severity> {
        self.issues
            .iter()
            .map(|i| i.severity)
            .max_by_key(|s| s.rank())
    }

    pub fn count(&self, severity: Severity) -> u32 {
        self.severity_counts.get(&severity).copied().unwrap_or(0)
    }

    /// Human-readable summary for spoken or plain-text output.
    pub fn summary(&self) -> String {
        if self.ok {
            return "No known drug interactions detected.".to_string();
        }

        let mut parts = vec![format!("{} interaction(s) detected:", self.total)];
        let major = self.count(Severity::Major);
        let moderate = self.count(Severity::Moderate);
        let minor = self.count(Severity::Minor);
        if major > 0 {
            parts.push(format!("  - {} MAJOR (avoid combination)", major));
        }
        if moderate > 0 {
            parts.push(format!("  - {} Moderate (use with caution)", moderate));
        }
        if minor > 0 {
            parts.push(format!("  - {} Minor (monitor)", minor));
        }
        parts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(severity: Severity) -> InteractionIssue {
        InteractionIssue {
            drug_1: "A".into(),
            drug_2: "B".into(),
            severity,
            description: "test".into(),
            recommendation: severity.recommendation().into(),
        }
    }

    #[test]
    fn test_from_issues_tallies() {
        let report = InteractionReport::from_issues(vec![
            issue(Severity::Major),
            issue(Severity::Minor),
            issue(Severity::Major),
        ]);

        assert!(!report.ok);
        assert_eq!(report.total, 3);
        assert_eq!(report.count(Severity::Major), 2);
        assert_eq!(report.count(Severity::Moderate), 0);
        assert_eq!(report.count(Severity::Minor), 1);
        assert_eq!(report.highest_severity(), Some(Severity::Major));
    }

    #[test]
    fn test_unknown_severity_is_tallied_separately() {
        let report = InteractionReport::from_issues(vec![issue(Severity::Unknown)]);
        assert_eq!(report.count(Severity::Unknown), 1);
        assert_eq!(report.highest_severity(), Some(Severity::Unknown));
    }

    #[test]
    fn test_summary() {
        assert_eq!(
            InteractionReport::empty().summary(),
            "No known drug interactions detected."
        );

        let report =
            InteractionReport::from_issues(vec![issue(Severity::Major), issue(Severity::Minor)]);
        let summary = report.summary();
        assert!(summary.starts_with("2 interaction(s) detected:"));
        assert!(summary.contains("1 MAJOR"));
        assert!(summary.contains("1 Minor"));
        assert!(!summary.contains("Moderate"));
    }
}
