//! SQLite schema of the reference database.
//!
//! The ETL owns these tables; the engine only reads them. Normalized name
//! columns may be NULL, in which case the loader normalizes the display column.

pub const TABLE_INTERACTIONS: &str = "interactions";
pub const TABLE_ATC_DDD: &str = "atc_ddd";
pub const TABLE_EML: &str = "eml";
pub const TABLE_AGE_SPECIFIC: &str = "age_specific";
pub const TABLE_MEDICINE_DETAILS: &str = "medicine_details";

/// Complete reference schema.
pub const REFERENCE_SCHEMA: &str = r#"
-- ============================================================================
-- Drug-drug interactions
-- ============================================================================

CREATE TABLE IF NOT EXISTS interactions (
    drug_a TEXT,
    drug_b TEXT,
    severity TEXT,                                -- Major | Moderate | Minor
    description TEXT,
    drug_1_normalized TEXT,
    drug_2_normalized TEXT
);

-- ============================================================================
-- WHO ATC/DDD
-- ============================================================================

CREATE TABLE IF NOT EXISTS atc_ddd (
    atc_code TEXT,
    drug_name TEXT,
    ddd REAL,
    unit TEXT,
    route TEXT,
    drug_name_normalized TEXT
);

CREATE INDEX IF NOT EXISTS idx_atc_ddd_code ON atc_ddd(atc_code);

-- ============================================================================
-- WHO Essential Medicines List
-- ============================================================================

CREATE TABLE IF NOT EXISTS eml (
    medicine TEXT,
    atc_code TEXT,
    category TEXT,
    medicine_normalized TEXT
);

-- ============================================================================
-- Age-specific usage
-- ============================================================================

CREATE TABLE IF NOT EXISTS age_specific (
    drug TEXT,
    age_group TEXT,                               -- Infant | Pediatric | Adolescent | Adult | Geriatric
    usage_pattern TEXT,
    drug_normalized TEXT
);

-- ============================================================================
-- Product compositions
-- ============================================================================

CREATE TABLE IF NOT EXISTS medicine_details (
    medicine_name TEXT,
    composition TEXT
);
"#;
