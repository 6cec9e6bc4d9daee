use thiserror::Error;

/// Errors surfaced by the export engine.
///
/// Configuration problems are detected before any row generation starts;
/// provider and writer failures abort the job and the partially built
/// artifact is discarded.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Spreadsheet column indexes are 1-based; zero is rejected outright
    /// rather than silently mapped to "A".
    #[error("invalid spreadsheet column index: {0}")]
    Addressing(u32),

    #[error("data provider failure: {0}")]
    Provider(#[source] anyhow::Error),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("spreadsheet write failure: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("csv write failure: {0}")]
    Csv(#[from] csv::Error),

    #[error("pdf backend failure: {0}")]
    PdfBackend(String),
}

impl ExportError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn provider(err: impl Into<anyhow::Error>) -> Self {
        Self::Provider(err.into())
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
