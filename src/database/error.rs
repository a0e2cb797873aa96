use std::path::PathBuf;

/// Errors that can occur while talking to the DIMSpec database
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// None of the candidate database files could be opened
    #[error("No database file found (tried: {})", display_paths(.tried))]
    DataSourceNotFound {
        /// Candidate paths in the order they were tried
        tried: Vec<PathBuf>,
    },

    /// The requested table or view does not exist
    #[error("Unknown table or view: {0}")]
    UnknownTable(String),

    /// A filter referenced a column the table does not have
    #[error("Unknown column '{column}' in {table}")]
    UnknownColumn {
        /// Table the filter was applied to
        table: String,
        /// Offending column name
        column: String,
    },

    /// Error reported by the SQLite engine
    #[error("Query error: {0}")]
    Query(#[from] rusqlite::Error),

    /// A previous query panicked while holding the connection
    #[error("Database connection lock poisoned")]
    Poisoned,
}

impl DatabaseError {
    /// Returns true for errors caused by the request rather than the database
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            DatabaseError::UnknownTable(_) | DatabaseError::UnknownColumn { .. }
        )
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
