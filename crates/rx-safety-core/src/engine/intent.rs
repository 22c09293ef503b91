//! Therapeutic intent resolution.
//!
//! The same molecule can serve different purposes depending on dose: aspirin
//! at 75 mg is an antiplatelet, at 500 mg an analgesic. Intent decides which
//! ATC classes count as substitutes.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{ContextTag, IntentResolution, TherapeuticIntent};

/// Numeric milligram dose in free text: "81mg", "75 mg", "2.5 MG".
static MG_DOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*mg").expect("valid regex"));

/// Milligram dose written in the text, if any.
pub fn extract_mg_dose(text: &str) -> Option<f64> {
    MG_DOSE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Keywords that tag the prescription context, checked in tag order.
const CONTEXT_KEYWORDS: &[(ContextTag, &[&str])] = &[
    (
        ContextTag::Pain,
        &["pain", "headache", "migraine", "toothache", "ache"],
    ),
    (ContextTag::Fever, &["fever", "pyrexia"]),
    (ContextTag::Inflammation, &["inflammation", "inflammatory"]),
    (
        ContextTag::Cardiovascular,
        &["heart", "stroke", "clot", "antiplatelet", "cardiovascular"],
    ),
];

/// Context tags found in the text, each at most once.
pub fn extract_context(text: &str) -> Vec<ContextTag> {
    let lower = text.to_lowercase();
    CONTEXT_KEYWORDS
        .iter()
        .filter(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(tag, _)| *tag)
        .collect()
}

const ANTIPLATELET: &[&str] = &["B01AC"];
const ASPIRIN_ANALGESIC: &[&str] = &["N02BA", "N02BE", "M01A"];

/// Aspirin at or below this dose is antiplatelet.
const ASPIRIN_ANTIPLATELET_MAX_MG: f64 = 150.0;
/// Aspirin at or above this dose is analgesic.
const ASPIRIN_ANALGESIC_MIN_MG: f64 = 300.0;

enum Resolution {
    Fixed(TherapeuticIntent, &'static [&'static str]),
    /// Aspirin: decided by dose, then context
    AspirinByDose,
}

struct IntentRule {
    keywords: &'static [&'static str],
    resolution: Resolution,
}

/// Ordered rule table; the first rule with a keyword in the name wins.
static INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        keywords: &["aspirin", "acetylsalicylic"],
        resolution: Resolution::AspirinByDose,
    },
    IntentRule {
        keywords: &["paracetamol", "acetaminophen", "crocin", "dolo"],
        resolution: Resolution::Fixed(TherapeuticIntent::AnalgesicAntipyretic, &["N02BE"]),
    },
    IntentRule {
        keywords: &["ibuprofen", "diclofenac", "naproxen", "indomethacin"],
        resolution: Resolution::Fixed(TherapeuticIntent::AnalgesicAntiInflammatory, &["M01A"]),
    },
    IntentRule {
        keywords: &["clopidogrel", "prasugrel", "ticagrelor", "plavix"],
        resolution: Resolution::Fixed(TherapeuticIntent::Antiplatelet, ANTIPLATELET),
    },
    IntentRule {
        keywords: &["warfarin", "heparin", "rivaroxaban", "apixaban"],
        resolution: Resolution::Fixed(TherapeuticIntent::Anticoagulant, &["B01A"]),
    },
    IntentRule {
        keywords: &["amlodipine", "nifedipine"],
        resolution: Resolution::Fixed(TherapeuticIntent::CalciumChannelBlocker, &["C08CA"]),
    },
    IntentRule {
        keywords: &["atenolol", "metoprolol", "propranolol"],
        resolution: Resolution::Fixed(TherapeuticIntent::BetaBlocker, &["C07AB"]),
    },
    IntentRule {
        keywords: &["enalapril", "lisinopril", "ramipril"],
        resolution: Resolution::Fixed(TherapeuticIntent::AceInhibitor, &["C09AA"]),
    },
    IntentRule {
        keywords: &["metformin"],
        resolution: Resolution::Fixed(TherapeuticIntent::Biguanide, &["A10BA"]),
    },
    IntentRule {
        keywords: &["glipizide", "glyburide", "glimepiride"],
        resolution: Resolution::Fixed(TherapeuticIntent::Sulfonylurea, &["A10BB"]),
    },
];

fn resolution(intent: TherapeuticIntent, prefixes: &[&str]) -> IntentResolution {
    IntentResolution {
        intent,
        atc_prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
    }
}

fn aspirin_intent(dose_mg: Option<f64>, context: &[ContextTag]) -> IntentResolution {
    match dose_mg {
        Some(d) if d <= ASPIRIN_ANTIPLATELET_MAX_MG => {
            return resolution(TherapeuticIntent::Antiplatelet, ANTIPLATELET)
        }
        Some(d) if d >= ASPIRIN_ANALGESIC_MIN_MG => {
            return resolution(TherapeuticIntent::AnalgesicAntipyretic, ASPIRIN_ANALGESIC)
        }
        _ => {}
    }

    if context.contains(&ContextTag::Pain) || context.contains(&ContextTag::Fever) {
        resolution(TherapeuticIntent::AnalgesicAntipyretic, ASPIRIN_ANALGESIC)
    } else {
        // Cardiovascular context and no context both mean low-dose use
        resolution(TherapeuticIntent::Antiplatelet, ANTIPLATELET)
    }
}

/// Resolve intent from the medication name, its dose and context tags.
pub fn resolve_intent(
    medication: &str,
    dose_mg: Option<f64>,
    context: &[ContextTag],
) -> IntentResolution {
    let lower = medication.to_lowercase();

    let rule = INTENT_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| lower.contains(k)));

    match rule.map(|r| &r.resolution) {
        Some(Resolution::AspirinByDose) => aspirin_intent(dose_mg, context),
        Some(Resolution::Fixed(intent, prefixes)) => resolution(*intent, prefixes),
        None => resolution(TherapeuticIntent::Unknown, &[]),
    }
}
