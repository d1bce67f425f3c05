use chrono::NaiveDate;
use thiserror::Error;

/// Internal-consistency fault raised while reducing records into a summary.
///
/// The parser never emits a non-finite amount, so either variant means a bug upstream
/// or a pathological input that overflowed `f64`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregationError {
    #[error("record dated {date} has non-finite amount {amount}")]
    NonFiniteAmount { date: NaiveDate, amount: f64 },

    #[error("{view} total for `{key}` is not finite")]
    NonFiniteTotal { view: &'static str, key: String },
}
