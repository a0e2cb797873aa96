use crate::database::DatabaseError;

/// Errors that can occur while searching
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Error from the data source
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Page number or page size was zero
    #[error("Invalid page: page {page} with page size {page_size} (both must be at least 1)")]
    InvalidPage {
        /// Requested page number (1-based)
        page: u64,
        /// Requested page size
        page_size: u64,
    },
}

impl SearchError {
    /// Returns true for errors caused by the request rather than the database
    pub fn is_invalid_request(&self) -> bool {
        match self {
            SearchError::Database(e) => e.is_invalid_request(),
            SearchError::InvalidPage { .. } => true,
        }
    }
}
