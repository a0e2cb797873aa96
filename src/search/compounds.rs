use log::debug;
use serde::Serialize;

use super::SearchError;
use crate::database::{quote_ident, Database, RowSet, Value, CONTAINS_FUNCTION};

/// Per-compound summary table, preferred when present
pub const COMPOUND_SUMMARY_TABLE: &str = "pfas_summary";
/// Compound reference table
pub const COMPOUNDS_TABLE: &str = "compounds";
/// Row cap when a query does not set one
pub const DEFAULT_COMPOUND_LIMIT: u64 = 100;

pub(crate) const PEAKS_TABLE: &str = "peaks";
pub(crate) const MASS_COLUMNS: &[&str] = &["precursor_mz", "fixedmass", "exact_mass"];
pub(crate) const RT_COLUMNS: &[&str] = &["rt", "rt_mean"];

/// Multi-criteria compound search
///
/// Every criterion is optional. A criterion whose column is missing from the
/// target table is skipped rather than treated as an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompoundQuery {
    /// Case-insensitive substring of the compound name
    pub name: Option<String>,
    /// Inclusive mass (m/z) window
    pub mass_range: Option<(f64, f64)>,
    /// Inclusive retention time window
    pub rt_range: Option<(f64, f64)>,
    /// Maximum rows returned
    pub limit: Option<u64>,
}

impl CompoundQuery {
    /// Query with no criteria
    pub fn new() -> Self {
        Self::default()
    }

    /// Match names containing `name`; a blank name clears the filter
    pub fn name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = if name.trim().is_empty() {
            None
        } else {
            Some(name)
        };
        self
    }

    /// Restrict the mass to `[min, max]`; reversed bounds are swapped
    pub fn mass_range(mut self, min: f64, max: f64) -> Self {
        self.mass_range = Some(ordered(min, max));
        self
    }

    /// Restrict the mass to `target ± tolerance`
    pub fn target_mass(self, target: f64, tolerance: f64) -> Self {
        let tolerance = tolerance.abs();
        self.mass_range(target - tolerance, target + tolerance)
    }

    /// Restrict the retention time to `[min, max]`
    pub fn rt_range(mut self, min: f64, max: f64) -> Self {
        self.rt_range = Some(ordered(min, max));
        self
    }

    /// Cap the number of rows
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Result of a compound search, with the columns the criteria landed on
#[derive(Debug, Clone, Serialize)]
pub struct CompoundMatches {
    /// Table that was searched
    pub table: String,
    /// Column used for the mass window, if one was applied
    pub mass_column: Option<String>,
    /// Column used for the retention time window, if one was applied
    pub rt_column: Option<String>,
    /// Matching rows
    pub rows: RowSet,
}

/// Run a compound search against `pfas_summary`, or `compounds` if absent
pub fn search_compounds(db: &Database, query: &CompoundQuery) -> Result<CompoundMatches, SearchError> {
    let table = if db.has_table(COMPOUND_SUMMARY_TABLE) {
        COMPOUND_SUMMARY_TABLE
    } else {
        COMPOUNDS_TABLE
    };
    let descriptor = db.describe(table)?;

    let mut conditions = Vec::new();
    let mut params = Vec::new();

    if let Some(name) = &query.name {
        if descriptor.has_column("name") {
            conditions.push(format!("{CONTAINS_FUNCTION}(\"name\", ?)"));
            params.push(Value::Text(name.clone()));
        } else {
            debug!("{} has no name column; ignoring name filter", table);
        }
    }

    let mut mass_column = None;
    if let Some((min, max)) = query.mass_range {
        mass_column = first_present(descriptor.column_names(), MASS_COLUMNS);
        if let Some(col) = &mass_column {
            conditions.push(format!("{} BETWEEN ? AND ?", quote_ident(col)));
            params.push(Value::Real(min));
            params.push(Value::Real(max));
        }
    }

    let mut rt_column = None;
    if let Some((min, max)) = query.rt_range {
        rt_column = first_present(descriptor.column_names(), RT_COLUMNS);
        if let Some(col) = &rt_column {
            conditions.push(format!("{} BETWEEN ? AND ?", quote_ident(col)));
            params.push(Value::Real(min));
            params.push(Value::Real(max));
        }
    }

    let mut sql = format!("SELECT * FROM {}", quote_ident(table));
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" LIMIT ?");
    let limit = query.limit.unwrap_or(DEFAULT_COMPOUND_LIMIT);
    params.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));

    debug!("compound search: {}", sql);
    let rows = db.fetch(&sql, &params)?;
    Ok(CompoundMatches {
        table: table.to_string(),
        mass_column,
        rt_column,
        rows,
    })
}

pub(crate) fn first_present(columns: Vec<&str>, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find(|c| columns.contains(*c))
        .map(|c| c.to_string())
}

/// One named field of a compound record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompoundField {
    /// Column name
    pub name: String,
    /// Cell value
    pub value: Value,
}

/// A compound row plus the peaks measured for it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompoundDetails {
    /// Compound id
    pub id: i64,
    /// Every column of the compound row, in table order
    pub fields: Vec<CompoundField>,
    /// Ids of peaks linked through `peaks.compound_id`, ascending
    pub peak_ids: Vec<i64>,
}

impl CompoundDetails {
    /// Look up a field by column name
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }
}

/// Fetch one compound by id; `None` if no such compound exists
pub fn compound_details(db: &Database, id: i64) -> Result<Option<CompoundDetails>, SearchError> {
    let descriptor = db.describe(COMPOUNDS_TABLE)?;
    if !descriptor.has_column("id") {
        return Ok(None);
    }
    let sql = format!(
        "SELECT * FROM {} WHERE \"id\" = ? LIMIT 1",
        quote_ident(COMPOUNDS_TABLE)
    );
    let rows = db.fetch(&sql, &[Value::Integer(id)])?;
    let Some(record) = rows.rows.first() else {
        return Ok(None);
    };
    let fields = rows
        .columns
        .iter()
        .zip(record)
        .map(|(name, value)| CompoundField {
            name: name.clone(),
            value: value.clone(),
        })
        .collect();

    Ok(Some(CompoundDetails {
        id,
        fields,
        peak_ids: linked_peak_ids(db, id)?,
    }))
}

fn linked_peak_ids(db: &Database, compound_id: i64) -> Result<Vec<i64>, SearchError> {
    let linked = db
        .describe(PEAKS_TABLE)
        .map(|peaks| peaks.has_column("compound_id") && peaks.has_column("id"))
        .unwrap_or(false);
    if !linked {
        debug!("No peaks.compound_id link in this database");
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT \"id\" FROM {} WHERE \"compound_id\" = ? ORDER BY \"id\"",
        quote_ident(PEAKS_TABLE)
    );
    let rows = db.fetch(&sql, &[Value::Integer(compound_id)])?;
    Ok(rows
        .rows
        .iter()
        .filter_map(|r| r.first().and_then(Value::as_i64))
        .collect())
}
