//! Alternative medication suggestions.
//!
//! Candidate sources, in priority order:
//! 1. Products sharing the active ingredient (composition table)
//! 2. Same ATC therapeutic class (ATC/DDD table)
//! 3. Same ATC class on the WHO Essential Medicines List

use std::collections::HashSet;

use tracing::debug;

use crate::models::{
    AlternativeCandidate, AlternativeReport, AlternativeSource, ContextTag, IntentResolution,
};
use crate::normalizer::normalize_name;
use crate::repository::ReferenceRepository;

use super::intent::{extract_context, extract_mg_dose, resolve_intent};

/// Shortest composition prefix accepted as an ingredient name.
const MIN_INGREDIENT_LEN: usize = 4;

/// What the matcher learned from the medication and its context text.
struct Analysis {
    dose_mg: Option<f64>,
    context: Vec<ContextTag>,
    resolution: IntentResolution,
}

/// Suggests substitutes for a medication.
pub struct AlternativeMatcher<'a> {
    repository: &'a ReferenceRepository,
}

impl<'a> AlternativeMatcher<'a> {
    pub fn new(repository: &'a ReferenceRepository) -> Self {
        Self { repository }
    }

    /// Ranked alternatives, at most `max_results`.
    ///
    /// `context` is the full prescription text ("Aspirin 75mg for heart"); when
    /// absent the medication name itself is searched for dose and context.
    pub fn suggest(
        &self,
        medication: &str,
        context: Option<&str>,
        max_results: usize,
    ) -> Vec<AlternativeCandidate> {
        let analysis = analyze(medication, context);
        self.candidates(medication, &analysis.resolution, max_results)
    }

    /// Alternatives with the derived dose, intent, target classes and an explanation.
    pub fn report(
        &self,
        medication: &str,
        context: Option<&str>,
        max_results: usize,
    ) -> AlternativeReport {
        let analysis = analyze(medication, context);
        let alternatives = self.candidates(medication, &analysis.resolution, max_results);
        let explanation = explain(&analysis);

        AlternativeReport {
            medication: medication.to_string(),
            dose_mg: analysis.dose_mg,
            context: analysis.context,
            therapeutic_intent: analysis.resolution.intent,
            target_atc_codes: analysis.resolution.atc_prefixes,
            alternatives,
            explanation,
        }
    }

    fn candidates(
        &self,
        medication: &str,
        resolution: &IntentResolution,
        max_results: usize,
    ) -> Vec<AlternativeCandidate> {
        let excluded = normalize_name(medication);

        let mut all = self.same_ingredient(&excluded);
        all.extend(self.atc_class(&resolution.atc_prefixes, &excluded));
        all.extend(self.essential_medicines(&resolution.atc_prefixes, &excluded));

        let mut seen = HashSet::new();
        let mut unique: Vec<AlternativeCandidate> = all
            .into_iter()
            .filter(|c| seen.insert(normalize_name(&c.name)))
            .collect();

        // Stable: keeps source order within a tier
        unique.sort_by_key(|c| c.priority);
        unique.truncate(max_results);

        debug!(
            intent = resolution.intent.label(),
            prefixes = resolution.atc_prefixes.len(),
            alternatives = unique.len(),
            "Alternatives matched"
        );
        unique
    }

    /// Other products whose composition mentions the queried product's first ingredient.
    fn same_ingredient(&self, excluded: &str) -> Vec<AlternativeCandidate> {
        if excluded.is_empty() {
            return Vec::new();
        }
        let compositions = self.repository.compositions();

        let Some(original) = compositions
            .iter()
            .find(|c| normalize_name(&c.medicine_name) == excluded)
        else {
            return Vec::new();
        };

        let Some(ingredient) = active_ingredient(&original.composition) else {
            return Vec::new();
        };

        compositions
            .iter()
            .filter(|c| c.composition.to_lowercase().contains(&ingredient))
            .filter(|c| normalize_name(&c.medicine_name) != excluded)
            .map(|c| {
                AlternativeCandidate::new(
                    c.medicine_name.clone(),
                    None,
                    AlternativeSource::SameActiveIngredient,
                    format!("Contains {}", ingredient),
                )
            })
            .collect()
    }

    fn atc_class(&self, prefixes: &[String], excluded: &str) -> Vec<AlternativeCandidate> {
        let records = self.repository.ddd_records();
        prefixes
            .iter()
            .flat_map(move |prefix| {
                records
                    .iter()
                    .filter(move |r| r.atc_code.starts_with(prefix.as_str()))
                    .filter(move |r| r.drug_name_normalized != excluded)
                    .map(move |r| {
                        AlternativeCandidate::new(
                            r.drug_name.clone(),
                            Some(r.atc_code.clone()),
                            AlternativeSource::AtcDatabase,
                            format!("Same therapeutic class ({})", prefix),
                        )
                    })
            })
            .collect()
    }

    fn essential_medicines(
        &self,
        prefixes: &[String],
        excluded: &str,
    ) -> Vec<AlternativeCandidate> {
        let medicines = self.repository.essential_medicines();
        prefixes
            .iter()
            .flat_map(move |prefix| {
                medicines
                    .iter()
                    .filter(move |m| m.atc_code.starts_with(prefix.as_str()))
                    .filter(move |m| m.medicine_normalized != excluded)
                    .map(move |m| {
                        AlternativeCandidate::new(
                            m.medicine.clone(),
                            Some(m.atc_code.clone()),
                            AlternativeSource::EssentialMedicinesList,
                            format!("WHO recommended alternative ({})", prefix),
                        )
                    })
            })
            .collect()
    }
}

fn analyze(medication: &str, context: Option<&str>) -> Analysis {
    let search_text = match context {
        Some(text) if !text.trim().is_empty() => text,
        _ => medication,
    };
    let dose_mg = extract_mg_dose(search_text);
    let context = extract_context(search_text);
    let resolution = resolve_intent(medication, dose_mg, &context);
    Analysis {
        dose_mg,
        context,
        resolution,
    }
}

/// Leading ingredient of a composition: "Paracetamol (500mg) + Caffeine" → "paracetamol".
fn active_ingredient(composition: &str) -> Option<String> {
    let lower = composition.to_lowercase();
    let end = lower
        .find(|c: char| c.is_ascii_digit() || c == ',' || c == '+')
        .unwrap_or(lower.len());
    let ingredient = lower[..end]
        .trim_end_matches(|c: char| c == '(' || c.is_whitespace())
        .trim();
    (ingredient.chars().count() >= MIN_INGREDIENT_LEN).then(|| ingredient.to_string())
}

fn explain(analysis: &Analysis) -> String {
    let mut parts = vec![format!(
        "Therapeutic intent: {}",
        analysis.resolution.intent.label()
    )];
    if let Some(dose) = analysis.dose_mg {
        parts.push(format!("Dose: {}mg", dose));
    }
    if !analysis.resolution.atc_prefixes.is_empty() {
        parts.push(format!(
            "Target ATC classes: {}",
            analysis.resolution.atc_prefixes.join(", ")
        ));
    }
    if !analysis.context.is_empty() {
        let tags: Vec<&str> = analysis.context.iter().map(|t| t.as_str()).collect();
        parts.push(format!("Context: {}", tags.join(", ")));
    }
    parts.join(" | ")
}
