//! Medication name and dose normalizer.
//!
//! Handles:
//! - Name canonicalization ("Metformin 500mg Tablet" → "metformin")
//! - Dose unit conversion (g→mg, mcg→mg)
//! - Dose extraction from free text ("take 2.5 mg daily" → 2.5 mg)

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Numeric dose tokens: "500mg", "10 ml", "2.5g", "100 units", "5%".
static DOSE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d+(?:\.\d+)?\s*(?:mg|g|ml|mcg|iu|%|units?)").expect("valid regex")
});

/// Formulation words that carry no identity information.
static FORMULATION_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:tablet|capsule|injection|syrup|suspension|cream|ointment|solution|drops)\b",
    )
    .expect("valid regex")
});

/// First number+unit token in free text.
static DOSAGE_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(mg|g|ml|mcg|iu|units?|%)").expect("valid regex")
});

/// Canonicalize a free-text medication name into a lookup key.
///
/// The pass is repeated until the key stops changing, so stripping a
/// formulation word can never expose a dose token that survives into the
/// result. That makes `normalize_name(normalize_name(x)) == normalize_name(x)`.
pub fn normalize_name(raw: &str) -> String {
    let mut current = normalize_pass(raw);
    loop {
        let next = normalize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_pass(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let without_doses = DOSE_TOKEN.replace_all(&lower, "");
    let without_forms = FORMULATION_WORD.replace_all(&without_doses, "");
    without_forms.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Mass units understood by dose conversion, with their factor relative to mg.
const MASS_UNITS: &[(&str, f64)] = &[
    ("mg", 1.0),
    ("g", 1000.0),
    ("mcg", 0.001),
    ("ug", 0.001),
    ("µg", 0.001),
];

/// Factor of a unit relative to milligrams, if it is a supported mass unit.
pub fn mg_factor(unit: &str) -> Option<f64> {
    let lower = unit.trim().to_lowercase();
    MASS_UNITS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, factor)| *factor)
}

/// Convert `value` expressed in `unit` into `target_unit`.
///
/// Returns `None` when either unit is outside the conversion table.
pub fn convert_dose(value: f64, unit: &str, target_unit: &str) -> Option<f64> {
    let from = mg_factor(unit)?;
    let to = mg_factor(target_unit)?;
    Some(value * from / to)
}

/// A dose found in free text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextDosage {
    pub value: f64,
    /// Lowercased unit as written ("mg", "units", "%")
    pub unit: String,
}

/// Extract the first number+unit token from free text.
pub fn extract_dosage_from_text(text: &str) -> Option<TextDosage> {
    let caps = DOSAGE_IN_TEXT.captures(text)?;
    let value = caps.get(1)?.as_str().parse::<f64>().ok()?;
    let unit = caps.get(2)?.as_str().to_lowercase();
    Some(TextDosage { value, unit })
}
