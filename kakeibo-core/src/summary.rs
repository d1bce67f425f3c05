//! Summary artifact: the five aggregate views plus the unclassified total.

use serde::{Deserialize, Serialize};

use crate::aggregate;
use crate::error::AggregationError;
use crate::period::{Granularity, Period};
use crate::record::TransactionRecord;

/// Income/expense totals for one week or month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodBucket {
    #[serde(flatten)]
    pub period: Period,
    pub income: f64,
    /// Outflow magnitude; positive when the period spent money
    pub expense: f64,
    /// Always `income - expense`
    pub net: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodCategoryTotal {
    #[serde(flatten)]
    pub period: Period,
    pub category: String,
    pub amount: f64,
}

/// One run's output, handed to storage, the report renderer and the advisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryArtifact {
    pub weekly: Vec<PeriodBucket>,
    pub monthly: Vec<PeriodBucket>,
    #[serde(rename = "category")]
    pub category_totals: Vec<CategoryTotal>,
    pub category_weekly: Vec<PeriodCategoryTotal>,
    pub category_monthly: Vec<PeriodCategoryTotal>,
    pub unclassified_total: CategoryTotal,
}

impl SummaryArtifact {
    pub fn total_income(&self) -> f64 {
        self.monthly.iter().map(|b| b.income).sum()
    }

    pub fn total_expense(&self) -> f64 {
        self.monthly.iter().map(|b| b.expense).sum()
    }

    pub fn total_net(&self) -> f64 {
        self.monthly.iter().map(|b| b.net).sum()
    }
}

/// Run every aggregation pass and combine the results.
///
/// Any failing pass fails the whole assembly; no partial artifact is returned.
pub fn assemble_summary(records: &[TransactionRecord]) -> Result<SummaryArtifact, AggregationError> {
    Ok(SummaryArtifact {
        weekly: aggregate::period_totals(records, Granularity::Weekly)?,
        monthly: aggregate::period_totals(records, Granularity::Monthly)?,
        category_totals: aggregate::category_totals(records)?,
        category_weekly: aggregate::period_category_totals(records, Granularity::Weekly)?,
        category_monthly: aggregate::period_category_totals(records, Granularity::Monthly)?,
        unclassified_total: aggregate::unclassified_total(records)?,
    })
}
