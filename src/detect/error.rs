use crate::database::DatabaseError;
use crate::spectrum::SpectrumError;

/// Errors that can occur while matching a feature against the library
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    /// A detection parameter was out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The database has no compound table with a mass column
    #[error("No compound library: {0}")]
    NoLibrary(String),

    /// Error while handling a spectrum
    #[error(transparent)]
    Spectrum(#[from] SpectrumError),

    /// Error from the data source
    #[error(transparent)]
    Database(#[from] DatabaseError),
}
