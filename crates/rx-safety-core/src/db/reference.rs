//! Reference table loaders and fixture writers.

use rusqlite::types::Value;
use rusqlite::{params, Row};

use super::{
    Database, DbResult, TABLE_AGE_SPECIFIC, TABLE_ATC_DDD, TABLE_EML, TABLE_INTERACTIONS,
    TABLE_MEDICINE_DETAILS,
};
use crate::models::{
    AgeAdjustmentRecord, AgeGroup, DddRecord, EssentialMedicine, InteractionRecord,
    MedicineComposition, Severity,
};
use crate::normalizer::normalize_name;

impl Database {
    /// Load the interaction table in row order.
    pub fn load_interactions(&self) -> DbResult<Vec<InteractionRecord>> {
        self.require_table(TABLE_INTERACTIONS)?;
        let mut stmt = self.conn.prepare(
            r#"
            SELECT drug_a, drug_b, severity, description,
                   drug_1_normalized, drug_2_normalized
            FROM interactions
            ORDER BY rowid
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(InteractionRow {
                drug_a: text(row, 0)?,
                drug_b: text(row, 1)?,
                severity: text(row, 2)?,
                description: text(row, 3)?,
                drug_a_normalized: text(row, 4)?,
                drug_b_normalized: text(row, 5)?,
            })
        })?;

        collect_records(TABLE_INTERACTIONS, rows, InteractionRow::into_record)
    }

    /// Load the ATC/DDD table in row order.
    pub fn load_ddd_records(&self) -> DbResult<Vec<DddRecord>> {
        self.require_table(TABLE_ATC_DDD)?;
        let mut stmt = self.conn.prepare(
            r#"
            SELECT atc_code, drug_name, ddd, unit, route, drug_name_normalized
            FROM atc_ddd
            ORDER BY rowid
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(DddRow {
                atc_code: text(row, 0)?,
                drug_name: text(row, 1)?,
                ddd: number(row, 2)?,
                unit: text(row, 3)?,
                route: text(row, 4)?,
                drug_name_normalized: text(row, 5)?,
            })
        })?;

        collect_records(TABLE_ATC_DDD, rows, DddRow::into_record)
    }

    /// Load the Essential Medicines List in row order.
    pub fn load_essential_medicines(&self) -> DbResult<Vec<EssentialMedicine>> {
        self.require_table(TABLE_EML)?;
        let mut stmt = self.conn.prepare(
            r#"
            SELECT medicine, atc_code, category, medicine_normalized
            FROM eml
            ORDER BY rowid
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(EmlRow {
                medicine: text(row, 0)?,
                atc_code: text(row, 1)?,
                category: text(row, 2)?,
                medicine_normalized: text(row, 3)?,
            })
        })?;

        collect_records(TABLE_EML, rows, EmlRow::into_record)
    }

    /// Load the age-specific usage table in row order.
    pub fn load_age_adjustments(&self) -> DbResult<Vec<AgeAdjustmentRecord>> {
        self.require_table(TABLE_AGE_SPECIFIC)?;
        let mut stmt = self.conn.prepare(
            r#"
            SELECT drug, age_group, usage_pattern, drug_normalized
            FROM age_specific
            ORDER BY rowid
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(AgeRow {
                drug: text(row, 0)?,
                age_group: text(row, 1)?,
                usage_pattern: text(row, 2)?,
                drug_normalized: text(row, 3)?,
            })
        })?;

        collect_records(TABLE_AGE_SPECIFIC, rows, AgeRow::into_record)
    }

    /// Load product compositions in row order.
    pub fn load_compositions(&self) -> DbResult<Vec<MedicineComposition>> {
        self.require_table(TABLE_MEDICINE_DETAILS)?;
        let mut stmt = self.conn.prepare(
            r#"
            SELECT medicine_name, composition
            FROM medicine_details
            ORDER BY rowid
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(CompositionRow {
                medicine_name: text(row, 0)?,
                composition: text(row, 1)?,
            })
        })?;

        collect_records(TABLE_MEDICINE_DETAILS, rows, CompositionRow::into_record)
    }

    // =========================================================================
    // Writers (ETL output and fixtures)
    // =========================================================================

    pub fn insert_interaction(&self, record: &InteractionRecord) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO interactions (
                drug_a, drug_b, severity, description, drug_1_normalized, drug_2_normalized
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.drug_a,
                record.drug_b,
                record.severity.as_str(),
                record.description,
                record.drug_a_normalized,
                record.drug_b_normalized,
            ],
        )?;
        Ok(())
    }

    pub fn insert_ddd_record(&self, record: &DddRecord) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO atc_ddd (atc_code, drug_name, ddd, unit, route, drug_name_normalized)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.atc_code,
                record.drug_name,
                record.ddd,
                record.unit,
                record.route,
                record.drug_name_normalized,
            ],
        )?;
        Ok(())
    }

    pub fn insert_essential_medicine(&self, record: &EssentialMedicine) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO eml (medicine, atc_code, category, medicine_normalized)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                record.medicine,
                record.atc_code,
                record.category,
                record.medicine_normalized,
            ],
        )?;
        Ok(())
    }

    pub fn insert_age_adjustment(&self, record: &AgeAdjustmentRecord) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO age_specific (drug, age_group, usage_pattern, drug_normalized)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                record.drug,
                record.age_group.as_str(),
                record.usage_pattern,
                record.drug_normalized,
            ],
        )?;
        Ok(())
    }

    pub fn insert_composition(&self, record: &MedicineComposition) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO medicine_details (medicine_name, composition) VALUES (?1, ?2)",
            params![record.medicine_name, record.composition],
        )?;
        Ok(())
    }
}

/// Read a column as text, accepting numeric cells.
fn text(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Text(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Null | Value::Blob(_) => None,
    })
}

/// Read a column as a number, accepting numeric text.
fn number(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<f64>> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Real(f) => Some(f),
        Value::Integer(i) => Some(i as f64),
        Value::Text(s) => s.trim().parse::<f64>().ok(),
        Value::Null | Value::Blob(_) => None,
    })
}

/// Convert raw rows to records, skipping rows that lack required columns.
fn collect_records<R, T>(
    table: &str,
    rows: impl Iterator<Item = rusqlite::Result<R>>,
    convert: fn(R) -> Option<T>,
) -> DbResult<Vec<T>> {
    let mut records = Vec::new();
    let mut skipped = 0usize;
    for row in rows {
        match convert(row?) {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::debug!(table, skipped, "Skipped malformed reference rows");
    }
    Ok(records)
}

/// Use the precomputed normalized column, or normalize the display name.
fn normalized_or(precomputed: Option<String>, display: &str) -> String {
    precomputed
        .map(|s| s.to_lowercase())
        .unwrap_or_else(|| normalize_name(display))
}

/// Intermediate row structs for database mapping.
struct InteractionRow {
    drug_a: Option<String>,
    drug_b: Option<String>,
    severity: Option<String>,
    description: Option<String>,
    drug_a_normalized: Option<String>,
    drug_b_normalized: Option<String>,
}

impl InteractionRow {
    fn into_record(self) -> Option<InteractionRecord> {
        let drug_a = self.drug_a?;
        let drug_b = self.drug_b?;
        Some(InteractionRecord {
            drug_a_normalized: normalized_or(self.drug_a_normalized, &drug_a),
            drug_b_normalized: normalized_or(self.drug_b_normalized, &drug_b),
            drug_a,
            drug_b,
            severity: self
                .severity
                .as_deref()
                .map(Severity::from_tag)
                .unwrap_or(Severity::Unknown),
            description: self
                .description
                .unwrap_or_else(|| "Interaction detected".to_string()),
        })
    }
}

struct DddRow {
    atc_code: Option<String>,
    drug_name: Option<String>,
    ddd: Option<f64>,
    unit: Option<String>,
    route: Option<String>,
    drug_name_normalized: Option<String>,
}

impl DddRow {
    fn into_record(self) -> Option<DddRecord> {
        let drug_name = self.drug_name?;
        Some(DddRecord {
            atc_code: self.atc_code?,
            drug_name_normalized: normalized_or(self.drug_name_normalized, &drug_name),
            drug_name,
            ddd: self.ddd.filter(|d| d.is_finite()),
            unit: self.unit,
            route: self.route,
        })
    }
}

struct EmlRow {
    medicine: Option<String>,
    atc_code: Option<String>,
    category: Option<String>,
    medicine_normalized: Option<String>,
}

impl EmlRow {
    fn into_record(self) -> Option<EssentialMedicine> {
        let medicine = self.medicine?;
        Some(EssentialMedicine {
            medicine_normalized: normalized_or(self.medicine_normalized, &medicine),
            medicine,
            atc_code: self.atc_code?,
            category: self.category,
        })
    }
}

struct AgeRow {
    drug: Option<String>,
    age_group: Option<String>,
    usage_pattern: Option<String>,
    drug_normalized: Option<String>,
}

impl AgeRow {
    fn into_record(self) -> Option<AgeAdjustmentRecord> {
        let drug = self.drug?;
        Some(AgeAdjustmentRecord {
            drug_normalized: normalized_or(self.drug_normalized, &drug),
            drug,
            age_group: AgeGroup::from_label(self.age_group.as_deref()?)?,
            usage_pattern: self.usage_pattern?,
        })
    }
}

struct CompositionRow {
    medicine_name: Option<String>,
    composition: Option<String>,
}

impl CompositionRow {
    fn into_record(self) -> Option<MedicineComposition> {
        Some(MedicineComposition {
            medicine_name: self.medicine_name?,
            composition: self.composition?,
        })
    }
}
