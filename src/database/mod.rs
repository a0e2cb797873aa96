//! # Data Source Adapter
//!
//! Read-only access to the DIMSpec SQLite database.
//!
//! The database file is located by trying a fixed list of candidate paths in
//! order; the first one that opens wins. Once open, the connection never
//! issues mutating statements (`PRAGMA query_only=ON`) and the catalog of
//! tables and views is cached for the lifetime of the handle.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dimspec::database::{Database, Predicate};
//!
//! let db = Database::connect(&["data/dimspec_nist_pfas.sqlite", "data/dimspec_sample.sqlite"])?;
//! for table in db.list_tables() {
//!     println!("{} ({} columns)", table.name, table.columns.len());
//! }
//!
//! let hits = db.query("compounds", Some(&Predicate::Contains("PFOA".into())), 10, 0)?;
//! println!("{} rows", hits.len());
//! # Ok::<(), dimspec::database::DatabaseError>(())
//! ```

mod categories;
mod connection;
mod error;
mod types;


pub use categories::{categorize, TableCategory, OTHER_CATEGORY, TABLE_CATEGORIES};
pub use connection::Database;
pub(crate) use connection::{quote_ident, CONTAINS_FUNCTION};
pub use error::DatabaseError;
pub use types::{Affinity, ColumnInfo, Predicate, RowSet, TableDescriptor, TableKind, Value};
