//! Alternative medication models.

use serde::{Deserialize, Serialize};

/// Where an alternative came from. Declaration order is ranking order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlternativeSource {
    /// Another product containing the same active ingredient
    SameActiveIngredient,
    /// Same ATC therapeutic class in the ATC/DDD table
    AtcDatabase,
    /// Same ATC class in the WHO Essential Medicines List
    EssentialMedicinesList,
}

impl AlternativeSource {
    /// Priority tier: 0 = same ingredient, 1 = same ATC class, 2 = EML.
    pub fn priority(&self) -> u8 {
        match self {
            AlternativeSource::SameActiveIngredient => 0,
            AlternativeSource::AtcDatabase => 1,
            AlternativeSource::EssentialMedicinesList => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AlternativeSource::SameActiveIngredient => "Same Active Ingredient",
            AlternativeSource::AtcDatabase => "ATC Database",
            AlternativeSource::EssentialMedicinesList => "WHO Essential Medicines List",
        }
    }
}

/// A candidate substitute for a queried medication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlternativeCandidate {
    pub name: String,
    pub atc_code: Option<String>,
    pub source: AlternativeSource,
    /// Why this candidate was suggested
    pub rationale: String,
    pub priority: u8,
}

impl AlternativeCandidate {
    pub fn new(
        name: String,
        atc_code: Option<String>,
        source: AlternativeSource,
        rationale: String,
    ) -> Self {
        Self {
            name,
            atc_code,
            source,
            rationale,
            priority: source.priority(),
        }
    }
}

/// Therapeutic intent inferred from a medication and its dose/context.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TherapeuticIntent {
    Antiplatelet,
    AnalgesicAntipyretic,
    AnalgesicAntiInflammatory,
    Anticoagulant,
    CalciumChannelBlocker,
    BetaBlocker,
    AceInhibitor,
    Biguanide,
    Sulfonylurea,
    Unknown,
}

impl TherapeuticIntent {
    pub fn label(&self) -> &'static str {
        match self {
            TherapeuticIntent::Antiplatelet => "antiplatelet",
            TherapeuticIntent::AnalgesicAntipyretic => "analgesic/antipyretic",
            TherapeuticIntent::AnalgesicAntiInflammatory => "analgesic/anti-inflammatory",
            TherapeuticIntent::Anticoagulant => "anticoagulant",
            TherapeuticIntent::CalciumChannelBlocker => "calcium_channel_blocker",
            TherapeuticIntent::BetaBlocker => "beta_blocker",
            TherapeuticIntent::AceInhibitor => "ace_inhibitor",
            TherapeuticIntent::Biguanide => "biguanide",
            TherapeuticIntent::Sulfonylurea => "sulfonylurea",
            TherapeuticIntent::Unknown => "unknown",
        }
    }
}

/// Context tag extracted from prescription text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContextTag {
    Pain,
    Fever,
    Inflammation,
    Cardiovascular,
}

impl ContextTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextTag::Pain => "pain",
            ContextTag::Fever => "fever",
            ContextTag::Inflammation => "inflammation",
            ContextTag::Cardiovascular => "cardiovascular",
        }
    }
}

/// Resolved intent with the ATC prefixes it targets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntentResolution {
    pub intent: TherapeuticIntent,
    pub atc_prefixes: Vec<String>,
}

/// Alternatives together with how they were derived.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlternativeReport {
    pub medication: String,
    /// Dose in mg parsed from the context text
    pub dose_mg: Option<f64>,
    pub context: Vec<ContextTag>,
    pub therapeutic_intent: TherapeuticIntent,
    pub target_atc_codes: Vec<String>,
    pub alternatives: Vec<AlternativeCandidate>,
    pub explanation: String,
}
