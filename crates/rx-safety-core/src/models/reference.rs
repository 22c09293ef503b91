//! Reference table models (immutable after load).

use serde::{Deserialize, Serialize};

use super::AgeGroup;

/// One canonical drug from the vocabulary table.
///
/// The primary key and every synonym key resolve to the same shared entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalDrugEntry {
    /// Vocabulary identifier (e.g. DrugBank ID)
    pub id: String,
    /// Display name of the drug
    pub primary_name: String,
    /// Normalized primary name
    pub normalized_key: String,
    /// Normalized synonym keys
    pub synonyms: Vec<String>,
}

/// Interaction severity tag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Major,
    Moderate,
    Minor,
    /// Tag present in the data but not one of the three known levels
    Unknown,
}

impl Severity {
    /// Parse a severity tag from the interaction table (case-insensitive).
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "major" => Severity::Major,
            "moderate" => Severity::Moderate,
            "minor" => Severity::Minor,
            _ => Severity::Unknown,
        }
    }

    /// Tag as written in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Major => "Major",
            Severity::Moderate => "Moderate",
            Severity::Minor => "Minor",
            Severity::Unknown => "Unknown",
        }
    }

    /// Ordering rank, higher is more severe.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Major => 3,
            Severity::Moderate => 2,
            Severity::Minor => 1,
            Severity::Unknown => 0,
        }
    }

    /// Fixed advisory text for an interaction of this severity.
    pub fn recommendation(&self) -> &'static str {
        match self {
            Severity::Major => {
                "AVOID combination. Consult physician immediately. Alternative therapy recommended."
            }
            Severity::Moderate => {
                "USE WITH CAUTION. Monitor patient closely. Dosage adjustment may be needed."
            }
            Severity::Minor => "Monitor patient. Generally safe but be aware of potential effects.",
            Severity::Unknown => "Interaction severity unknown. Consult physician or pharmacist.",
        }
    }
}

/// A row of the drug-drug interaction table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionRecord {
    pub drug_a: String,
    pub drug_b: String,
    pub severity: Severity,
    pub description: String,
    /// Normalized `drug_a`
    pub drug_a_normalized: String,
    /// Normalized `drug_b`
    pub drug_b_normalized: String,
}

/// A WHO ATC/DDD row.
///
/// Many ATC entries (combinations, topical products) carry no DDD. They still
/// belong to their therapeutic class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DddRecord {
    pub atc_code: String,
    pub drug_name: String,
    pub drug_name_normalized: String,
    /// Defined Daily Dose, in `unit`
    pub ddd: Option<f64>,
    pub unit: Option<String>,
    pub route: Option<String>,
}

impl DddRecord {
    /// The DDD and its unit, when the row has a usable positive dose.
    pub fn daily_dose(&self) -> Option<(f64, &str)> {
        let ddd = self.ddd.filter(|d| d.is_finite() && *d > 0.0)?;
        Some((ddd, self.unit.as_deref()?))
    }
}

/// Age-specific usage guidance for a drug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgeAdjustmentRecord {
    pub drug: String,
    pub drug_normalized: String,
    pub age_group: AgeGroup,
    pub usage_pattern: String,
}

/// A WHO Essential Medicines List row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EssentialMedicine {
    pub medicine: String,
    pub medicine_normalized: String,
    pub atc_code: String,
    pub category: Option<String>,
}

/// A branded product with its composition string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicineComposition {
    pub medicine_name: String,
    /// e.g. "Paracetamol (500mg) + Caffeine (30mg)"
    pub composition: String,
}
