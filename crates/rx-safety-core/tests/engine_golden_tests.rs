//! Golden tests for the safety engine.
//!
//! These tests run the public engine API against a small synthetic reference
//! set modeled on the WHO tables.

use rx_safety_core::models::{DosageRequest, FactorKind, TherapeuticIntent};
use rx_safety_core::{
    AgeGroup, DosageStatus, PatientInfo, PrescribedMedication, ReferenceRepository,
    ReferenceTables, RiskLevel, SafetyEngine, Severity,
};

fn reference_tables() -> ReferenceTables {
    ReferenceTables::new()
        .drug("DB00682", "Warfarin", &["Coumadin"])
        .interaction("Aspirin", "Warfarin", Severity::Major, "Increased risk of bleeding")
        .interaction("Atenolol", "Amlodipine", Severity::Moderate, "Additive hypotension")
        .interaction("Metformin", "Lisinopril", Severity::Minor, "Hypoglycemia risk")
        .ddd("A10BA02", "Metformin", 2.0, "g")
        .ddd("N02BE01", "Paracetamol", 3.0, "g")
        .ddd("B01AA03", "Warfarin", 7.5, "mg")
        .ddd("B01AC04", "Clopidogrel", 75.0, "mg")
        .ddd("B01AC24", "Ticagrelor", 180.0, "mg")
        .ddd("C07AB03", "Atenolol", 75.0, "mg")
        .ddd("C08CA01", "Amlodipine", 5.0, "mg")
        .ddd("C09AA03", "Lisinopril", 10.0, "mg")
        .age_adjustment("Warfarin", AgeGroup::Geriatric, "Start at 2.5mg")
        .essential("Clopidogrel", "B01AC04")
        .essential("Paracetamol", "N02BE01")
}

fn engine() -> SafetyEngine {
    SafetyEngine::from_tables(reference_tables())
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Interactions
// =============================================================================

struct InteractionCase {
    id: &'static str,
    medications: &'static [&'static str],
    expected_total: u32,
    expected_highest: Option<Severity>,
}

fn interaction_cases() -> Vec<InteractionCase> {
    vec![
        InteractionCase {
            id: "aspirin-warfarin",
            medications: &["Aspirin", "Warfarin"],
            expected_total: 1,
            expected_highest: Some(Severity::Major),
        },
        InteractionCase {
            id: "reversed-order",
            medications: &["Warfarin", "Aspirin"],
            expected_total: 1,
            expected_highest: Some(Severity::Major),
        },
        InteractionCase {
            id: "decorated-names",
            medications: &["ASPIRIN 75mg Tablet", "warfarin 5 mg"],
            expected_total: 1,
            expected_highest: Some(Severity::Major),
        },
        InteractionCase {
            id: "synonym-fallback",
            medications: &["Aspirin", "Coumadin"],
            expected_total: 1,
            expected_highest: Some(Severity::Major),
        },
        InteractionCase {
            id: "mixed-severities",
            medications: &["Atenolol", "Amlodipine", "Metformin", "Lisinopril"],
            expected_total: 2,
            expected_highest: Some(Severity::Moderate),
        },
        InteractionCase {
            id: "no-interaction",
            medications: &["Paracetamol", "Clopidogrel"],
            expected_total: 0,
            expected_highest: None,
        },
        InteractionCase {
            id: "single-medication",
            medications: &["Warfarin"],
            expected_total: 0,
            expected_highest: None,
        },
        InteractionCase {
            id: "empty-list",
            medications: &[],
            expected_total: 0,
            expected_highest: None,
        },
    ]
}

#[test]
fn test_interaction_golden_cases() {
    let engine = engine();

    for case in interaction_cases() {
        let report = engine.check_interactions(&names(case.medications));

        assert_eq!(
            report.total, case.expected_total,
            "Case {}: total mismatch", case.id
        );
        assert_eq!(
            report.ok,
            case.expected_total == 0,
            "Case {}: ok flag mismatch", case.id
        );
        assert_eq!(
            report.highest_severity(),
            case.expected_highest,
            "Case {}: severity mismatch", case.id
        );
    }
}

#[test]
fn test_interaction_issue_keeps_caller_names() {
    let report = engine().check_interactions(&names(&["Aspirin", "Warfarin"]));

    let issue = &report.issues[0];
    assert_eq!(issue.drug_1, "Aspirin");
    assert_eq!(issue.drug_2, "Warfarin");
    assert_eq!(issue.severity, Severity::Major);
    assert_eq!(issue.description, "Increased risk of bleeding");
    assert_eq!(issue.recommendation, Severity::Major.recommendation());
}

// =============================================================================
// Dosage
// =============================================================================

struct DosageCase {
    id: &'static str,
    medication: &'static str,
    dose: f64,
    unit: &'static str,
    age: u32,
    expected_status: DosageStatus,
    expected_ratio: Option<f64>,
}

fn dosage_cases() -> Vec<DosageCase> {
    vec![
        DosageCase {
            id: "metformin-standard",
            medication: "Metformin",
            dose: 2000.0,
            unit: "mg",
            age: 40,
            expected_status: DosageStatus::Safe,
            expected_ratio: Some(1.0),
        },
        DosageCase {
            id: "metformin-grams",
            medication: "Metformin",
            dose: 2.0,
            unit: "g",
            age: 40,
            expected_status: DosageStatus::Safe,
            expected_ratio: Some(1.0),
        },
        DosageCase {
            id: "unsupported-unit",
            medication: "Metformin",
            dose: 2.0,
            unit: "lb",
            age: 40,
            expected_status: DosageStatus::Error,
            expected_ratio: None,
        },
        DosageCase {
            id: "unknown-drug",
            medication: "Atorvastatin",
            dose: 20.0,
            unit: "mg",
            age: 40,
            expected_status: DosageStatus::Unknown,
            expected_ratio: None,
        },
        DosageCase {
            id: "subtherapeutic",
            medication: "Metformin",
            dose: 500.0,
            unit: "mg",
            age: 40,
            expected_status: DosageStatus::Low,
            expected_ratio: Some(0.25),
        },
        DosageCase {
            id: "above-ddd",
            medication: "Paracetamol",
            dose: 5000.0,
            unit: "mg",
            age: 40,
            expected_status: DosageStatus::High,
            expected_ratio: Some(1.67),
        },
        DosageCase {
            id: "far-above-ddd",
            medication: "Warfarin",
            dose: 20.0,
            unit: "mg",
            age: 40,
            expected_status: DosageStatus::VeryHigh,
            expected_ratio: Some(2.67),
        },
        DosageCase {
            id: "geriatric-escalation",
            medication: "Metformin",
            dose: 2500.0,
            unit: "mg",
            age: 70,
            expected_status: DosageStatus::High,
            expected_ratio: Some(1.25),
        },
        DosageCase {
            id: "pediatric-escalation",
            medication: "Paracetamol",
            dose: 4000.0,
            unit: "mg",
            age: 8,
            expected_status: DosageStatus::High,
            expected_ratio: Some(1.33),
        },
        DosageCase {
            id: "microgram-conversion",
            medication: "Clopidogrel",
            dose: 75000.0,
            unit: "mcg",
            age: 40,
            expected_status: DosageStatus::Safe,
            expected_ratio: Some(1.0),
        },
    ]
}

#[test]
fn test_dosage_golden_cases() {
    let engine = engine();

    for case in dosage_cases() {
        let verdict = engine.verify_dosage(
            &PatientInfo::aged(case.age),
            case.medication,
            case.dose,
            case.unit,
        );

        assert_eq!(
            verdict.status, case.expected_status,
            "Case {}: status mismatch ({})", case.id, verdict.message
        );

        match (verdict.dose_ratio, case.expected_ratio) {
            (Some(actual), Some(expected)) => assert!(
                (actual - expected).abs() < 0.001,
                "Case {}: ratio mismatch - expected {}, got {}",
                case.id, expected, actual
            ),
            (actual, expected) => assert_eq!(
                actual, expected,
                "Case {}: ratio presence mismatch", case.id
            ),
        }
    }
}

#[test]
fn test_geriatric_verdict_carries_drug_specific_adjustment() {
    let verdict = engine().verify_dosage(&PatientInfo::aged(80), "Warfarin", 5.0, "mg");

    assert_eq!(verdict.status, DosageStatus::Safe);
    assert_eq!(verdict.age_adjustment.as_deref(), Some("Start at 2.5mg"));
    assert_eq!(verdict.ddd.as_deref(), Some("7.5mg"));
    assert_eq!(verdict.prescribed_dose, "5mg");
}

#[test]
fn test_batch_verification_keeps_order() {
    let patient = PatientInfo::aged(40);
    let requests = vec![
        DosageRequest {
            medication: "Metformin".into(),
            dose: 2000.0,
            unit: "mg".into(),
            patient: patient.clone(),
        },
        DosageRequest {
            medication: "Unobtainium".into(),
            dose: 1.0,
            unit: "mg".into(),
            patient,
        },
    ];

    let verdicts = engine().batch_verify_dosages(&requests);
    assert_eq!(verdicts.len(), 2);
    assert_eq!(verdicts[0].medication, "Metformin");
    assert_eq!(verdicts[0].verdict.status, DosageStatus::Safe);
    assert_eq!(verdicts[1].medication, "Unobtainium");
    assert_eq!(verdicts[1].verdict.status, DosageStatus::Unknown);
}

// =============================================================================
// Alternatives
// =============================================================================

#[test]
fn test_low_dose_aspirin_resolves_to_antiplatelet() {
    let report = engine().alternatives_report("Aspirin", Some("Aspirin 75mg"));

    assert_eq!(report.therapeutic_intent, TherapeuticIntent::Antiplatelet);
    assert_eq!(report.target_atc_codes, vec!["B01AC"]);
    assert_eq!(report.dose_mg, Some(75.0));

    let names: Vec<&str> = report.alternatives.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Clopidogrel", "Ticagrelor"]);
}

#[test]
fn test_alternatives_respect_configured_limit() {
    let engine = engine();
    let limited = SafetyEngine::new(ReferenceRepository::new(reference_tables()).shared(), 1);

    assert_eq!(limited.suggest_alternatives("Aspirin", None).len(), 1);
    assert_eq!(engine.suggest_alternatives("Aspirin", None).len(), 2);
}

// =============================================================================
// Risk
// =============================================================================

#[test]
fn test_no_medications_is_safe() {
    let result = engine().predict_risk(&[], &PatientInfo::default());

    assert_eq!(result.safety_score, 10.0);
    assert_eq!(result.risk_level, RiskLevel::Safe);
    assert!(result.factors.is_empty());
}

#[test]
fn test_crowded_prescription_scores_worse() {
    let engine = engine();
    let patient = PatientInfo::aged(70);

    let crowded = engine.predict_risk(
        &[
            PrescribedMedication::named("Aspirin"),
            PrescribedMedication::named("Warfarin"),
            PrescribedMedication::dosed("Metformin", 10.0, "g"),
            PrescribedMedication::named("Paracetamol"),
            PrescribedMedication::named("Clopidogrel"),
            PrescribedMedication::named("Omeprazole"),
            PrescribedMedication::named("Atorvastatin"),
        ],
        &patient,
    );
    let simple = engine.predict_risk(
        &[
            PrescribedMedication::dosed("Metformin", 10.0, "g"),
            PrescribedMedication::named("Atorvastatin"),
        ],
        &patient,
    );

    assert!(crowded.safety_score < simple.safety_score);
    assert_eq!(
        crowded.factors[&FactorKind::InteractionRisk].message,
        "1 interaction(s) - highest: Major"
    );
    assert_eq!(
        crowded.factors[&FactorKind::DosageRisk].message,
        "1 dosage issue(s) detected"
    );
    assert!(crowded.factors[&FactorKind::PolypharmacyRisk]
        .message
        .ends_with("(increased for geriatric patient)"));
    assert_eq!(crowded.patient_context.medication_count, 7);
}

#[test]
fn test_safety_score_bands_follow_score() {
    let engine = engine();
    let cases: Vec<Vec<PrescribedMedication>> = vec![
        vec![PrescribedMedication::named("Paracetamol")],
        vec![
            PrescribedMedication::named("Aspirin"),
            PrescribedMedication::named("Warfarin"),
        ],
        vec![
            PrescribedMedication::named("Aspirin"),
            PrescribedMedication::dosed("Warfarin", 30.0, "mg"),
        ],
    ];

    // None of these scores sits within rounding distance of a band edge
    for medications in cases {
        let result = engine.predict_risk(&medications, &PatientInfo::aged(40));
        assert!((0.0..=10.0).contains(&result.safety_score));
        assert_eq!(
            result.risk_level,
            RiskLevel::from_safety_score(result.safety_score)
        );
    }
}
