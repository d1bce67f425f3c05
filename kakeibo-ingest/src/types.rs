use kakeibo_core::TransactionRecord;
use serde::Serialize;

use crate::error::RowError;

/// A data row that was rejected by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedRow {
    /// 1-based line number in the source file (the header is line 1)
    pub line: u64,
    pub reason: RowError,
}

/// Normalized output of an export parser: valid records in input order plus the rejects.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub records: Vec<TransactionRecord>,
    pub dropped: Vec<DroppedRow>,
}

impl ParseOutcome {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }

    /// Number of data rows seen, valid or not.
    pub fn rows_seen(&self) -> usize {
        self.records.len() + self.dropped.len()
    }
}

/// Compact per-file statistics, handy for logs and CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    pub parsed: usize,
    pub dropped: usize,
}

impl From<&ParseOutcome> for ParseStats {
    fn from(outcome: &ParseOutcome) -> Self {
        Self {
            parsed: outcome.records.len(),
            dropped: outcome.dropped_count(),
        }
    }
}
