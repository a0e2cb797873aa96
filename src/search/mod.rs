//! # Filter/Search Engine
//!
//! Keyword search over any table or view, with offset pagination, plus the
//! multi-criteria compound search used by the compound page.
//!
//! A row matches a search term when at least one of its text cells contains
//! the term, ignoring case (Unicode lowercasing, so `ω` finds `Ω-PFAS`).
//! Numeric cells never match, even if their decimal rendering would. The
//! term is matched as given: surrounding spaces are part of it, and only an
//! all-whitespace term lists the table unfiltered.
//!
//! ```rust,no_run
//! use dimspec::database::Database;
//! use dimspec::search::search;
//!
//! let db = Database::connect(&["data/dimspec_sample.sqlite"])?;
//! let page = search(&db, "compounds", "PF", 50, 1)?;
//! println!("{} of {} matches", page.rows.len(), page.total_matches);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod compounds;
mod error;


use log::debug;
use serde::Serialize;

use crate::database::{Database, Predicate, RowSet};

pub use compounds::{
    compound_details, search_compounds, CompoundDetails, CompoundField, CompoundMatches,
    CompoundQuery, COMPOUNDS_TABLE, COMPOUND_SUMMARY_TABLE, DEFAULT_COMPOUND_LIMIT,
};
pub use error::SearchError;

pub(crate) use compounds::{first_present, MASS_COLUMNS, PEAKS_TABLE, RT_COLUMNS};

/// One page of search results
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    /// Table or view that was searched
    pub table: String,
    /// Search term as given (empty for an unfiltered listing)
    pub term: String,
    /// 1-based page number
    pub page: u64,
    /// Rows per page
    pub page_size: u64,
    /// Matching rows across all pages
    pub total_matches: u64,
    /// Rows on this page
    pub rows: RowSet,
}

impl SearchPage {
    /// Number of pages needed to show every match
    pub fn page_count(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total_matches.div_ceil(self.page_size)
    }

    /// Returns true if a later page has rows
    pub fn has_next(&self) -> bool {
        self.page < self.page_count()
    }

    /// Returns true if this is not the first page
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Offset of the first row on a 1-based page
///
/// Saturates instead of overflowing; such a page is simply empty.
pub fn page_offset(page_size: u64, page_number: u64) -> u64 {
    page_size.saturating_mul(page_number.saturating_sub(1))
}

fn predicate_for(term: &str) -> Option<Predicate> {
    if term.trim().is_empty() {
        None
    } else {
        Some(Predicate::Contains(term.to_string()))
    }
}

/// Search a table for rows with a text cell containing `term`
///
/// An empty term lists the whole table. Pages past the end are empty rather
/// than an error; a zero page number or page size is rejected.
pub fn search(
    db: &Database,
    table: &str,
    term: &str,
    page_size: u64,
    page_number: u64,
) -> Result<SearchPage, SearchError> {
    if page_size == 0 || page_number == 0 {
        return Err(SearchError::InvalidPage {
            page: page_number,
            page_size,
        });
    }

    let predicate = predicate_for(term);
    let total_matches = db.count(table, predicate.as_ref())?;
    let offset = page_offset(page_size, page_number);
    let rows = if offset >= total_matches {
        // Still report the column layout for an empty page
        db.query(table, predicate.as_ref(), 0, 0)?
    } else {
        db.query(table, predicate.as_ref(), page_size, offset)?
    };
    debug!(
        "search {} for {:?}: page {} ({} rows of {} matches)",
        table,
        term,
        page_number,
        rows.len(),
        total_matches
    );

    Ok(SearchPage {
        table: table.to_string(),
        term: if predicate.is_some() {
            term.to_string()
        } else {
            String::new()
        },
        page: page_number,
        page_size,
        total_matches,
        rows,
    })
}

/// Every row matching `term`, up to `limit` rows, for export
pub fn matching_rows(
    db: &Database,
    table: &str,
    term: &str,
    limit: u64,
) -> Result<RowSet, SearchError> {
    let predicate = predicate_for(term);
    Ok(db.query(table, predicate.as_ref(), limit, 0)?)
}
