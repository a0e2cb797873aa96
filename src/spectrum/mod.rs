//! # Spectrum Processor
//!
//! Loads the MS1 spectrum stored for a peak and derives plots and statistics
//! from it.
//!
//! DIMSpec keeps each spectrum as one `ms_data` row whose `measured_mz` and
//! `measured_intensity` columns hold whitespace-separated number lists. The
//! table and column names are configurable through [`SpectrumSource`].
//!
//! ```rust,no_run
//! use dimspec::database::Database;
//! use dimspec::spectrum::{get_spectrum, normalize, NormalizationMethod, SpectrumSource};
//!
//! let db = Database::connect(&["data/dimspec_sample.sqlite"])?;
//! let spectrum = get_spectrum(&db, &SpectrumSource::default(), 42)?;
//! let relative = normalize(&spectrum, NormalizationMethod::Max);
//! println!("{:?}", relative.summary());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod normalize;
mod processing;
mod types;


use log::debug;
use serde::Deserialize;

use crate::database::{quote_ident, Database, DatabaseError, TableDescriptor, Value};

pub use error::SpectrumError;
pub use normalize::{normalize, NormalizationMethod};
pub use processing::{
    bin_spectrum, filter_by_intensity, find_peak_matches, mass_error, IntensityStatistics,
    MassUnit, PeakMatch,
};
pub use types::{LabeledSpectrum, Peak, Spectrum, SpectrumSummary};

/// Where spectra live in the database
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpectrumSource {
    /// Table holding one packed spectrum per row
    pub table: String,
    /// Column with the peak id
    pub peak_column: String,
    /// Column with the packed m/z list
    pub mz_column: String,
    /// Column with the packed intensity list
    pub intensity_column: String,
}

impl Default for SpectrumSource {
    fn default() -> Self {
        Self {
            table: "ms_data".to_string(),
            peak_column: "peak_id".to_string(),
            mz_column: "measured_mz".to_string(),
            intensity_column: "measured_intensity".to_string(),
        }
    }
}

impl SpectrumSource {
    /// Check that the table and all three columns exist
    ///
    /// SQLite treats an unknown double-quoted identifier as a string literal,
    /// so column names are checked against the catalog before use.
    pub(crate) fn resolve<'a>(&self, db: &'a Database) -> Result<&'a TableDescriptor, DatabaseError> {
        let descriptor = db.describe(&self.table)?;
        for column in [&self.peak_column, &self.mz_column, &self.intensity_column] {
            if !descriptor.has_column(column) {
                return Err(DatabaseError::UnknownColumn {
                    table: descriptor.name.clone(),
                    column: column.clone(),
                });
            }
        }
        Ok(descriptor)
    }
}

/// Load the spectrum stored for `peak_id`
pub fn get_spectrum(
    db: &Database,
    source: &SpectrumSource,
    peak_id: i64,
) -> Result<Spectrum, SpectrumError> {
    let descriptor = source.resolve(db)?;
    let sql = format!(
        "SELECT {}, {} FROM {} WHERE {} = ? LIMIT 1",
        quote_ident(&source.mz_column),
        quote_ident(&source.intensity_column),
        quote_ident(&descriptor.name),
        quote_ident(&source.peak_column)
    );
    debug!("spectrum lookup: {} [{}]", sql, peak_id);
    let rows = db.fetch(&sql, &[Value::Integer(peak_id)])?;
    let record = rows.rows.first().ok_or(SpectrumError::NotFound(peak_id))?;

    let (mz_cell, intensity_cell) = match record.as_slice() {
        [mz, intensity] => (mz, intensity),
        _ => return Err(SpectrumError::NotFound(peak_id)),
    };
    let mz = unpack(peak_id, "m/z", mz_cell)?;
    let intensity = unpack(peak_id, "intensity", intensity_cell)?;
    Spectrum::from_arrays(peak_id, &mz, &intensity)
}

/// Peak ids that have a stored spectrum, ascending
pub fn list_peak_ids(
    db: &Database,
    source: &SpectrumSource,
    limit: u64,
) -> Result<Vec<i64>, SpectrumError> {
    let descriptor = source.resolve(db)?;
    let peak = quote_ident(&source.peak_column);
    let sql = format!(
        "SELECT DISTINCT {peak} FROM {} WHERE {peak} IS NOT NULL ORDER BY {peak} LIMIT ?",
        quote_ident(&descriptor.name)
    );
    let rows = db.fetch(&sql, &[Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX))])?;
    Ok(rows
        .rows
        .iter()
        .filter_map(|r| r.first().and_then(Value::as_i64))
        .collect())
}

/// Decode a packed number list; separators are whitespace or commas
pub(crate) fn unpack(peak_id: i64, what: &str, cell: &Value) -> Result<Vec<f64>, SpectrumError> {
    match cell {
        Value::Null => Ok(Vec::new()),
        Value::Integer(i) => Ok(vec![*i as f64]),
        Value::Real(r) => Ok(vec![*r]),
        Value::Text(text) => text
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .map(|token| {
                token.parse::<f64>().map_err(|_| SpectrumError::Malformed {
                    peak_id,
                    reason: format!("invalid {} value '{}'", what, token),
                })
            })
            .collect(),
    }
}
