//! Transaction record type shared by ingestion, enrichment and aggregation

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Reserved label meaning "no category assigned".
pub const UNCLASSIFIED: &str = "未分類";

/// Major category that routes an amount to income instead of expense.
pub const INCOME: &str = "収入";

/// One ledger row.
///
/// Categories are never empty: blank input is stored as [`UNCLASSIFIED`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    pub date: NaiveDate,
    /// Signed amount; income positive, spending negative
    pub amount: f64,
    pub major_category: String,
    pub minor_category: String,
    /// Free-text description, only used as classifier input
    pub memo: String,
}

impl TransactionRecord {
    pub fn new(
        date: NaiveDate,
        amount: f64,
        major_category: &str,
        minor_category: &str,
        memo: impl Into<String>,
    ) -> Self {
        Self {
            date,
            amount,
            major_category: label_or_unclassified(major_category),
            minor_category: label_or_unclassified(minor_category),
            memo: memo.into(),
        }
    }

    pub fn major_unclassified(&self) -> bool {
        self.major_category == UNCLASSIFIED
    }

    pub fn minor_unclassified(&self) -> bool {
        self.minor_category == UNCLASSIFIED
    }

    /// True when either category level still carries the sentinel.
    pub fn needs_resolution(&self) -> bool {
        self.major_unclassified() || self.minor_unclassified()
    }

    pub fn is_income(&self) -> bool {
        self.major_category == INCOME
    }

    /// Back-fill only the levels that are still unclassified.
    ///
    /// Returns true if any field changed.
    pub fn fill_categories(&mut self, major: &str, minor: &str) -> bool {
        let mut changed = false;
        if self.major_unclassified() {
            let label = label_or_unclassified(major);
            changed |= label != self.major_category;
            self.major_category = label;
        }
        if self.minor_unclassified() {
            let label = label_or_unclassified(minor);
            changed |= label != self.minor_category;
            self.minor_category = label;
        }
        changed
    }
}

fn label_or_unclassified(label: &str) -> String {
    let label = label.trim();
    if label.is_empty() {
        UNCLASSIFIED.to_string()
    } else {
        label.to_string()
    }
}
