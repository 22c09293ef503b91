//! Patient context models.

use serde::{Deserialize, Serialize};

/// Default body weight when the caller supplies none.
pub const DEFAULT_WEIGHT_KG: f64 = 70.0;

/// Patient information supplied with a request.
///
/// Keys follow the request layer: `patient_age` (years, default 0) and
/// `patient_weight_kg` (default 70).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientInfo {
    #[serde(rename = "patient_age", default)]
    pub age: u32,
    #[serde(rename = "patient_weight_kg", default = "default_weight")]
    pub weight_kg: f64,
}

fn default_weight() -> f64 {
    DEFAULT_WEIGHT_KG
}

impl Default for PatientInfo {
    fn default() -> Self {
        Self {
            age: 0,
            weight_kg: DEFAULT_WEIGHT_KG,
        }
    }
}

impl PatientInfo {
    /// Create patient info for an age, with the default weight.
    pub fn aged(age: u32) -> Self {
        Self {
            age,
            ..Self::default()
        }
    }

    pub fn age_group(&self) -> AgeGroup {
        AgeGroup::from_age(self.age)
    }
}

/// Clinical age band.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AgeGroup {
    Infant,
    Pediatric,
    Adolescent,
    Adult,
    Geriatric,
}

impl AgeGroup {
    /// Classify an age in years: <2, <12, <18, <65, else.
    pub fn from_age(age: u32) -> Self {
        match age {
            0..=1 => AgeGroup::Infant,
            2..=11 => AgeGroup::Pediatric,
            12..=17 => AgeGroup::Adolescent,
            18..=64 => AgeGroup::Adult,
            _ => AgeGroup::Geriatric,
        }
    }

    /// Parse an age-group label from the age-specific table.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "infant" => Some(AgeGroup::Infant),
            "pediatric" | "paediatric" => Some(AgeGroup::Pediatric),
            "adolescent" => Some(AgeGroup::Adolescent),
            "adult" => Some(AgeGroup::Adult),
            "geriatric" | "elderly" => Some(AgeGroup::Geriatric),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::Infant => "Infant",
            AgeGroup::Pediatric => "Pediatric",
            AgeGroup::Adolescent => "Adolescent",
            AgeGroup::Adult => "Adult",
            AgeGroup::Geriatric => "Geriatric",
        }
    }

    /// Groups whose doses above the DDD are escalated.
    pub fn is_dose_sensitive(&self) -> bool {
        matches!(
            self,
            AgeGroup::Infant | AgeGroup::Pediatric | AgeGroup::Geriatric
        )
    }

    /// Guidance used when no drug-specific age record exists.
    pub fn default_adjustment(&self) -> &'static str {
        match self {
            AgeGroup::Infant => "Weight-based dosing required. Consult pediatric guidelines.",
            AgeGroup::Pediatric => {
                "Reduced dose based on weight/age. Verify with pediatric formulary."
            }
            AgeGroup::Adolescent => "May require adult or pediatric dose depending on weight.",
            AgeGroup::Adult => "Standard adult dosing",
            AgeGroup::Geriatric => "Consider reduced dose. Monitor renal/hepatic function.",
        }
    }
}
