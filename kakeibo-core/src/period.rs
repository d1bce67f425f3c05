//! Period keys for weekly and monthly bucketing.
//!
//! Weeks follow the U.S. `%U` convention: weeks start on Sunday and the days before the
//! first Sunday of a year form week `00`. So 2025-01-01 (a Wednesday) is `2025-W00`
//! while 2024-12-31 is `2024-W52`. Keys are zero-padded, so string order is
//! chronological order.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const WEEK_FORMAT: &str = "%Y-W%U";
const MONTH_FORMAT: &str = "%Y-%m";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    Weekly,
    Monthly,
}

impl Granularity {
    pub fn period_of(self, date: NaiveDate) -> Period {
        self.period(self.key_of(date))
    }

    /// Canonical key string for `date` under this granularity.
    pub fn key_of(self, date: NaiveDate) -> String {
        match self {
            Granularity::Weekly => date.format(WEEK_FORMAT).to_string(),
            Granularity::Monthly => date.format(MONTH_FORMAT).to_string(),
        }
    }

    pub fn period(self, key: String) -> Period {
        match self {
            Granularity::Weekly => Period::Week(key),
            Granularity::Monthly => Period::Month(key),
        }
    }
}

/// A bucket identifier. Serializes as `{"week": "2024-W13"}` or `{"month": "2024-04"}`
/// when flattened into its parent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "week")]
    Week(String),
    #[serde(rename = "month")]
    Month(String),
}

impl Period {
    pub fn key(&self) -> &str {
        match self {
            Period::Week(k) | Period::Month(k) => k,
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            Period::Week(_) => Granularity::Weekly,
            Period::Month(_) => Granularity::Monthly,
        }
    }
}
