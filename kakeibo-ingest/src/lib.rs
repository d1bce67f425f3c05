//! kakeibo-ingest: household-ledger export ingestion (CSV) into typed transaction records.

pub mod error;
pub mod parsers;
pub mod types;

pub use error::{IngestError, RowError};
pub use parsers::moneyforward::{parse_moneyforward_csv, ColumnNames};
pub use types::{DroppedRow, ParseOutcome, ParseStats};
