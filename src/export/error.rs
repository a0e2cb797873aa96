/// Errors that can occur while serializing a row set for download
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// CSV encoding failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Workbook assembly failed
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    /// I/O error while flushing output
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
