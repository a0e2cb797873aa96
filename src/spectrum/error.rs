use crate::database::DatabaseError;

/// Errors that can occur while loading or processing spectra
#[derive(Debug, thiserror::Error)]
pub enum SpectrumError {
    /// No spectrum is stored for this peak id
    #[error("Spectrum not found for peak {0}")]
    NotFound(i64),

    /// The stored arrays could not be decoded
    #[error("Malformed spectrum for peak {peak_id}: {reason}")]
    Malformed {
        /// Peak id of the offending row
        peak_id: i64,
        /// What was wrong with it
        reason: String,
    },

    /// A processing parameter was out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from the data source
    #[error(transparent)]
    Database(#[from] DatabaseError),
}
