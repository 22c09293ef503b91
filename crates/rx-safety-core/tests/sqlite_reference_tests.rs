//! Tests against ETL-shaped reference data on disk.

use std::path::Path;

use tempfile::TempDir;

use rx_safety_core::db::DbError;
use rx_safety_core::models::{AlternativeSource, TherapeuticIntent};
use rx_safety_core::repository::{ReferenceSource, SqliteReferenceSource};
use rx_safety_core::{
    Database, DosageStatus, EngineConfig, PatientInfo, SafetyEngine, Severity,
};

const VOCABULARY_JSON: &str = r#"{
    "acetylsalicylic acid": {"id": "DB00945", "primary_name": "Acetylsalicylic acid",
                             "normalized": "acetylsalicylic acid", "synonyms": ["aspirin"]},
    "aspirin": {"id": "DB00945", "primary_name": "Acetylsalicylic acid",
                "normalized": "acetylsalicylic acid", "synonyms": ["aspirin"]},
    "warfarin": {"id": "DB00682", "primary_name": "Warfarin",
                 "normalized": "warfarin", "synonyms": ["coumadin"]}
}"#;

const ETL_ROWS: &str = r#"
INSERT INTO interactions VALUES
    ('Aspirin', 'Warfarin', 'Major', 'Increased risk of bleeding', 'aspirin', 'warfarin'),
    ('Atenolol', 'Amlodipine', 'Moderate', 'Additive hypotension', 'atenolol', 'amlodipine');

INSERT INTO atc_ddd VALUES
    ('A10BA02', 'Metformin', 2.0, 'g', 'O', 'metformin'),
    ('B01AC04', 'Clopidogrel', 75, 'mg', 'O', 'clopidogrel'),
    ('B01AA03', 'Warfarin', 7.5, 'mg', 'O', 'warfarin');

INSERT INTO eml VALUES
    ('Clopidogrel', 'B01AC04', 'Antiplatelet', 'clopidogrel'),
    ('Prasugrel', 'B01AC22', 'Antiplatelet', 'prasugrel');

INSERT INTO age_specific VALUES
    ('Warfarin', 'Geriatric', 'Start at 2.5mg', 'warfarin');

INSERT INTO medicine_details VALUES
    ('Ecosprin 75 Tablet', 'Aspirin (75mg)'),
    ('Loprin 75 Tablet', 'Aspirin (75mg)');
"#;

/// Write a reference database into `dir` and run `sql` against it.
fn write_reference_db(dir: &Path, sql: &str) {
    let db = Database::open(dir.join("reference.db")).unwrap();
    db.conn().execute_batch(sql).unwrap();
}

fn write_vocabulary(dir: &Path) {
    std::fs::write(dir.join("canonical_drugs.json"), VOCABULARY_JSON).unwrap();
}

fn engine_for(dir: &Path) -> SafetyEngine {
    SafetyEngine::from_config(&EngineConfig::with_data_dir(dir))
}

#[test]
fn test_engine_reads_etl_output() {
    let dir = TempDir::new().unwrap();
    write_reference_db(dir.path(), ETL_ROWS);
    write_vocabulary(dir.path());

    let engine = engine_for(dir.path());

    let report = engine.check_interactions(&["Aspirin".to_string(), "Warfarin".to_string()]);
    assert_eq!(report.total, 1);
    assert_eq!(report.issues[0].severity, Severity::Major);
    assert_eq!(report.issues[0].description, "Increased risk of bleeding");

    let verdict = engine.verify_dosage(&PatientInfo::aged(40), "Metformin", 2000.0, "mg");
    assert_eq!(verdict.status, DosageStatus::Safe);
    assert_eq!(verdict.dose_ratio, Some(1.0));

    let verdict = engine.verify_dosage(&PatientInfo::aged(75), "Warfarin", 5.0, "mg");
    assert_eq!(verdict.age_adjustment.as_deref(), Some("Start at 2.5mg"));

    let entry = engine.repository().canonical_drug("Aspirin 75mg").unwrap();
    assert_eq!(entry.primary_name, "Acetylsalicylic acid");
    assert_eq!(entry.id, "DB00945");
}

#[test]
fn test_alternatives_from_disk() {
    let dir = TempDir::new().unwrap();
    write_reference_db(dir.path(), ETL_ROWS);

    let engine = engine_for(dir.path());

    let report = engine.alternatives_report("Aspirin", Some("Aspirin 75mg"));
    assert_eq!(report.therapeutic_intent, TherapeuticIntent::Antiplatelet);
    let names: Vec<&str> = report.alternatives.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Clopidogrel", "Prasugrel"]);
    assert_eq!(report.alternatives[1].source, AlternativeSource::EssentialMedicinesList);

    let same_ingredient = engine.suggest_alternatives("Ecosprin 75 Tablet", None);
    assert_eq!(same_ingredient[0].name, "Loprin 75 Tablet");
    assert_eq!(same_ingredient[0].source, AlternativeSource::SameActiveIngredient);
}

#[test]
fn test_class_alternatives_include_entries_without_ddd() {
    let dir = TempDir::new().unwrap();
    write_reference_db(
        dir.path(),
        r#"
        INSERT INTO atc_ddd VALUES
            ('B01AC04', 'Clopidogrel', 75, 'mg', 'O', 'clopidogrel'),
            ('B01AC24', 'Ticagrelor', NULL, NULL, NULL, 'ticagrelor'),
            ('B01AC30', 'Combinations', NULL, NULL, NULL, NULL);
        "#,
    );

    let engine = engine_for(dir.path());

    let names: Vec<String> = engine
        .suggest_alternatives("Aspirin", Some("Aspirin 75mg"))
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names, vec!["Clopidogrel", "Ticagrelor", "Combinations"]);

    // No DDD means the dose cannot be checked
    let verdict = engine.verify_dosage(&PatientInfo::aged(40), "Ticagrelor", 90.0, "mg");
    assert_eq!(verdict.status, DosageStatus::Unknown);
}

#[test]
fn test_missing_tables_degrade_to_empty() {
    let dir = TempDir::new().unwrap();
    write_reference_db(
        dir.path(),
        &format!("{}\nDROP TABLE interactions;\nDROP TABLE eml;", ETL_ROWS),
    );

    let db = Database::open_read_only(dir.path().join("reference.db")).unwrap();
    assert!(matches!(
        db.load_interactions(),
        Err(DbError::MissingTable(ref t)) if t == "interactions"
    ));
    assert_eq!(db.load_ddd_records().unwrap().len(), 3);
    drop(db);

    let engine = engine_for(dir.path());
    let report = engine.check_interactions(&["Aspirin".to_string(), "Warfarin".to_string()]);
    assert!(report.ok);
    assert!(engine.repository().essential_medicines().is_empty());

    // Tables that exist still load
    let verdict = engine.verify_dosage(&PatientInfo::aged(40), "Metformin", 2000.0, "mg");
    assert_eq!(verdict.status, DosageStatus::Safe);
    let names: Vec<String> = engine
        .suggest_alternatives("Aspirin", None)
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names, vec!["Clopidogrel"]);
}

#[test]
fn test_malformed_rows_are_skipped() {
    let dir = TempDir::new().unwrap();
    write_reference_db(
        dir.path(),
        r#"
        INSERT INTO atc_ddd VALUES
            ('A10BA02', 'Metformin', 'n/a', 'g', 'O', 'metformin'),
            ('A10BA02', 'Metformin', -1, 'g', 'O', 'metformin'),
            ('A10BA02', 'Metformin', NULL, 'g', 'O', 'metformin'),
            ('A10BA02', 'Metformin', '2', 'g', 'O', NULL),
            ('A10BA02', 'Metformin', 1.0, 'g', 'O', 'metformin');

        INSERT INTO interactions VALUES
            (NULL, 'Warfarin', 'Major', 'orphan', NULL, 'warfarin'),
            ('Clopidogrel', 'Omeprazole', NULL, NULL, NULL, NULL);

        INSERT INTO age_specific VALUES
            ('Metformin', 'Toddler', 'n/a', 'metformin'),
            ('Metformin', 'elderly', 'Check renal function', NULL);
        "#,
    );

    let db = Database::open_read_only(dir.path().join("reference.db")).unwrap();

    // Every coded row loads; only the fourth carries a usable dose
    let ddd = db.load_ddd_records().unwrap();
    assert_eq!(ddd.len(), 5);
    assert_eq!(ddd[0].daily_dose(), None);
    assert_eq!(ddd[1].daily_dose(), None);
    assert_eq!(ddd[2].daily_dose(), None);
    assert_eq!(ddd[3].daily_dose(), Some((2.0, "g")));
    assert_eq!(ddd[3].drug_name_normalized, "metformin");

    let interactions = db.load_interactions().unwrap();
    assert_eq!(interactions.len(), 1);
    assert_eq!(interactions[0].severity, Severity::Unknown);
    assert_eq!(interactions[0].description, "Interaction detected");
    assert_eq!(interactions[0].drug_b_normalized, "omeprazole");

    let ages = db.load_age_adjustments().unwrap();
    assert_eq!(ages.len(), 1);
    assert_eq!(ages[0].usage_pattern, "Check renal function");
    drop(db);

    // First valid DDD row is authoritative: 2000 mg against 2 g
    let engine = engine_for(dir.path());
    let verdict = engine.verify_dosage(&PatientInfo::aged(40), "Metformin", 2000.0, "mg");
    assert_eq!(verdict.dose_ratio, Some(1.0));
    assert_eq!(verdict.ddd.as_deref(), Some("2g"));
}

#[test]
fn test_missing_vocabulary_file() {
    let dir = TempDir::new().unwrap();
    write_reference_db(dir.path(), ETL_ROWS);

    let engine = engine_for(dir.path());
    assert!(engine.repository().canonical_drug("aspirin").is_none());
    assert_eq!(
        engine
            .check_interactions(&["Aspirin".to_string(), "Warfarin".to_string()])
            .total,
        1
    );
}

#[test]
fn test_invalid_vocabulary_file_is_ignored() {
    let dir = TempDir::new().unwrap();
    write_reference_db(dir.path(), ETL_ROWS);
    std::fs::write(dir.path().join("canonical_drugs.json"), "{ not json").unwrap();

    let engine = engine_for(dir.path());
    assert!(engine.repository().vocabulary().is_empty());
    assert!(engine.repository().ddd_for("metformin").is_some());
}

#[test]
fn test_missing_database_file() {
    let dir = TempDir::new().unwrap();

    let config = EngineConfig::with_data_dir(dir.path());
    assert!(SqliteReferenceSource::open(&config).is_err());

    let engine = SafetyEngine::from_config(&config);
    let verdict = engine.verify_dosage(&PatientInfo::aged(40), "Metformin", 500.0, "mg");
    assert_eq!(verdict.status, DosageStatus::Unknown);
    assert!(engine.check_interactions(&["Aspirin".to_string()]).ok);
}

#[test]
fn test_source_describes_itself() {
    let dir = TempDir::new().unwrap();
    write_reference_db(dir.path(), ETL_ROWS);

    let source = SqliteReferenceSource::open(&EngineConfig::with_data_dir(dir.path())).unwrap();
    assert!(source.describe().starts_with("sqlite"));
    assert_eq!(source.load_interactions().unwrap().len(), 2);
    assert!(source.load_vocabulary().is_err());
}

#[test]
fn test_json_config_sets_limit() {
    let dir = TempDir::new().unwrap();
    write_reference_db(dir.path(), ETL_ROWS);

    let json = serde_json::json!({
        "data_dir": dir.path(),
        "max_alternatives": 1,
    })
    .to_string();
    let config = EngineConfig::from_json_str(&json).unwrap();
    assert_eq!(config.reference_db, "reference.db");

    let engine = SafetyEngine::from_config(&config);
    assert_eq!(engine.suggest_alternatives("Aspirin", None).len(), 1);
}
