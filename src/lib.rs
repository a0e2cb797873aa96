//! # DIMSpec Explorer
//!
//! `dimspec` is a read-only explorer for the NIST DIMSpec database of per-
//! and polyfluoroalkyl substances (PFAS) and their high-resolution mass
//! spectra. It opens the SQLite release of the database and serves a small
//! web dashboard on top of it.
//!
//! ## Key Features
//!
//! - **Table Explorer**: browse every table and view, grouped by category,
//!   with case-insensitive keyword search and pagination.
//!
//! - **Downloads**: any search result as CSV or as an Excel workbook.
//!
//! - **Compound Search**: filter compounds by name, target m/z with a
//!   tolerance, an explicit mass window, or a retention time window.
//!
//! - **Spectrum Viewer**: overlay MS1 spectra as stick plots, normalized by
//!   base peak, total or mean intensity, with intensity statistics.
//!
//! - **PFAS Detector**: match an observed precursor m/z, retention time and
//!   optional spectrum against the compound library, with a family vote.
//!
//! - **JSON API**: every page has a machine-readable counterpart.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dimspec::prelude::*;
//!
//! let config = Config::default();
//! let db = Database::connect(&config.candidate_paths())?;
//!
//! // Keyword search, first page of 50 rows
//! let page = search(&db, "compounds", "PFOA", 50, 1)?;
//! println!("{} matches", page.total_matches);
//!
//! // Export the same rows
//! let csv = to_csv(&page.rows)?;
//! std::fs::write("compounds.csv", csv)?;
//!
//! // Load and normalize a spectrum
//! let spectrum = get_spectrum(&db, &config.spectra, 1)?;
//! let relative = normalize(&spectrum, NormalizationMethod::Max);
//! let svg = render_spectra_svg(
//!     &[LabeledSpectrum::new("Peak 1", relative)],
//!     &PlotOptions::default(),
//! );
//! std::fs::write("peak_1.svg", svg)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`database`]: read-only SQLite connection, catalog and row access
//! - [`search`]: keyword search with pagination, and compound search
//! - [`spectrum`]: spectrum loading, normalization and statistics
//! - [`detect`]: candidate matching and family prediction for a feature
//! - [`export`]: CSV and XLSX serialization of row sets
//! - [`plot`]: SVG stick plots
//! - [`config`]: TOML configuration
//! - [`web`]: the axum server

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod database;
pub mod detect;
pub mod export;
pub mod plot;
pub mod search;
pub mod spectrum;
pub mod web;

#[cfg(test)]
pub(crate) mod test_support;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::database::{
        categorize, Database, DatabaseError, Predicate, RowSet, TableCategory, TableDescriptor,
        Value,
    };
    pub use crate::detect::{analyze_peak, Detection, DetectionQuery, FingerprintGrid, Library};
    pub use crate::export::{export_filename, to_csv, to_spreadsheet, ExportError, ExportFormat};
    pub use crate::plot::{render_spectra_svg, PlotOptions};
    pub use crate::search::{
        compound_details, search, search_compounds, CompoundQuery, SearchError, SearchPage,
    };
    pub use crate::spectrum::{
        get_spectrum, normalize, IntensityStatistics, LabeledSpectrum, NormalizationMethod,
        Spectrum, SpectrumError, SpectrumSource,
    };
    pub use crate::web::{build_router, serve, AppState};
}
