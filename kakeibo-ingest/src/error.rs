use thiserror::Error;

/// Failure that aborts ingestion of the whole file.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("required column `{0}` not found in header")]
    MissingColumn(String),

    #[error("reading CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Failure confined to a single data row. The row is dropped and parsing continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("malformed date `{0}` (expected YYYY/MM/DD)")]
    MalformedDate(String),

    #[error("malformed amount `{0}`")]
    MalformedAmount(String),

    #[error("unreadable row: {0}")]
    Unreadable(String),
}
