//! # Export Formatter
//!
//! Serializes a [`RowSet`] into downloadable bytes.
//!
//! Two formats are supported:
//!
//! - **CSV**: a header row of column names followed by one record per row.
//!   NULL cells become empty fields.
//! - **XLSX**: a single worksheet named `data` with a bold header row.
//!   Integers and reals are written as numbers so spreadsheet formulas work
//!   on them. Text is written as strings and NULLs are left blank. Text
//!   longer than a cell can hold ([`MAX_CELL_CHARS`]) is cut to fit, so a
//!   table with long packed spectrum columns still exports.
//!
//! Column order always follows the input row set.

mod error;


use std::fmt;
use std::str::FromStr;

use log::warn;
use rust_xlsxwriter::{Format, Workbook};

use crate::database::{RowSet, Value};

pub use error::ExportError;

/// Name of the only worksheet in exported workbooks
pub const SHEET_NAME: &str = "data";

/// Most characters a worksheet cell accepts
pub const MAX_CELL_CHARS: usize = 32_767;

/// Download format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values
    Csv,
    /// Office Open XML workbook
    Xlsx,
}

impl ExportFormat {
    /// MIME type for the `Content-Type` header
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }

    /// Serialize rows in this format
    pub fn render(&self, rows: &RowSet) -> Result<Vec<u8>, ExportError> {
        match self {
            Self::Csv => to_csv(rows),
            Self::Xlsx => to_spreadsheet(rows),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" | "excel" => Ok(Self::Xlsx),
            other => Err(format!("unknown export format '{}' (expected csv or xlsx)", other)),
        }
    }
}

/// Encode rows as CSV
pub fn to_csv(rows: &RowSet) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&rows.columns)?;
    for row in &rows.rows {
        writer.write_record(row.iter().map(Value::to_string))?;
    }
    writer.flush()?;
    writer.into_inner().map_err(|e| {
        let err = e.error();
        ExportError::Io(std::io::Error::new(err.kind(), err.to_string()))
    })
}

/// Encode rows as an XLSX workbook
pub fn to_spreadsheet(rows: &RowSet) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, name) in rows.columns.iter().enumerate() {
        sheet.write_string_with_format(0, col_index(col)?, cell_text(name, 0, col), &header)?;
    }

    for (r, row) in rows.rows.iter().enumerate() {
        let row_num = u32::try_from(r + 1)
            .map_err(|_| rust_xlsxwriter::XlsxError::RowColumnLimitError)?;
        for (c, cell) in row.iter().enumerate() {
            let col = col_index(c)?;
            match cell {
                Value::Null => {}
                Value::Integer(i) => {
                    sheet.write_number(row_num, col, *i as f64)?;
                }
                Value::Real(v) if v.is_finite() => {
                    sheet.write_number(row_num, col, *v)?;
                }
                // NaN and infinities have no cell representation
                Value::Real(v) => {
                    sheet.write_string(row_num, col, v.to_string())?;
                }
                Value::Text(s) => {
                    sheet.write_string(row_num, col, cell_text(s, row_num, c))?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Cut text to [`MAX_CELL_CHARS`], on a character boundary
fn cell_text(text: &str, row: u32, col: usize) -> &str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        None => text,
        Some((cut, _)) => {
            warn!(
                "truncating cell ({}, {}) from {} to {} characters",
                row,
                col,
                text.chars().count(),
                MAX_CELL_CHARS
            );
            &text[..cut]
        }
    }
}

fn col_index(col: usize) -> Result<u16, ExportError> {
    u16::try_from(col).map_err(|_| rust_xlsxwriter::XlsxError::RowColumnLimitError.into())
}

/// Suggested download name: `<table>.<ext>` or `<table>_search_<term>.<ext>`
///
/// Both parts are reduced to ASCII letters, digits, `-` and `_`, so the
/// result is safe inside a quoted `Content-Disposition` filename.
pub fn export_filename(table: &str, term: Option<&str>, format: ExportFormat) -> String {
    let table = match sanitize(table) {
        t if t.is_empty() => "export".to_string(),
        t => t,
    };
    match term.map(sanitize).filter(|t| !t.is_empty()) {
        Some(term) => format!("{}_search_{}.{}", table, term, format.extension()),
        None => format!("{}.{}", table, format.extension()),
    }
}

fn sanitize(s: &str) -> String {
    let replaced: String = s
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    replaced.trim_matches('_').chars().take(64).collect()
}
