//! Reduction passes over enriched records.
//!
//! Each pass is a pure function of the record slice. Groups accumulate in a `BTreeMap`
//! keyed by the output's sort key, so emission order is ascending string order and
//! never depends on hash iteration.

use std::collections::BTreeMap;

use crate::error::AggregationError;
use crate::period::Granularity;
use crate::record::{TransactionRecord, UNCLASSIFIED};
use crate::summary::{CategoryTotal, PeriodBucket, PeriodCategoryTotal};

#[derive(Debug, Default, Clone, Copy)]
struct Flow {
    income: f64,
    expense: f64,
}

/// Income/expense totals per week or month.
///
/// Income-category amounts add to `income`. Every other amount is recorded as outflow,
/// so spending of `-300` adds `300` to `expense` and a refund lowers it.
pub fn period_totals(
    records: &[TransactionRecord],
    granularity: Granularity,
) -> Result<Vec<PeriodBucket>, AggregationError> {
    let mut groups: BTreeMap<String, Flow> = BTreeMap::new();

    for r in records {
        let amount = finite_amount(r)?;
        let flow = groups.entry(granularity.key_of(r.date)).or_default();
        if r.is_income() {
            flow.income += amount;
        } else {
            flow.expense -= amount;
        }
    }

    let view = match granularity {
        Granularity::Weekly => "weekly",
        Granularity::Monthly => "monthly",
    };
    groups
        .into_iter()
        .map(|(key, flow)| {
            let net = flow.income - flow.expense;
            ensure_finite(view, &key, &[flow.income, flow.expense, net])?;
            Ok(PeriodBucket {
                period: granularity.period(key),
                income: flow.income,
                expense: flow.expense,
                net,
            })
        })
        .collect()
}

/// Signed totals per minor category, no income/expense split.
pub fn category_totals(records: &[TransactionRecord]) -> Result<Vec<CategoryTotal>, AggregationError> {
    let mut groups: BTreeMap<&str, f64> = BTreeMap::new();

    for r in records {
        let amount = finite_amount(r)?;
        *groups.entry(r.minor_category.as_str()).or_insert(0.0) += amount;
    }

    groups
        .into_iter()
        .map(|(category, total)| {
            ensure_finite("category", category, &[total])?;
            Ok(CategoryTotal {
                category: category.to_string(),
                total,
            })
        })
        .collect()
}

/// Signed totals per (period, minor category), ordered by period then category.
pub fn period_category_totals(
    records: &[TransactionRecord],
    granularity: Granularity,
) -> Result<Vec<PeriodCategoryTotal>, AggregationError> {
    let mut groups: BTreeMap<(String, &str), f64> = BTreeMap::new();

    for r in records {
        let amount = finite_amount(r)?;
        let key = (granularity.key_of(r.date), r.minor_category.as_str());
        *groups.entry(key).or_insert(0.0) += amount;
    }

    let view = match granularity {
        Granularity::Weekly => "category_weekly",
        Granularity::Monthly => "category_monthly",
    };
    groups
        .into_iter()
        .map(|((period, category), amount)| {
            ensure_finite(view, &format!("{period}/{category}"), &[amount])?;
            Ok(PeriodCategoryTotal {
                period: granularity.period(period),
                category: category.to_string(),
                amount,
            })
        })
        .collect()
}

/// Sum of amounts whose minor category is still the sentinel after enrichment.
pub fn unclassified_total(records: &[TransactionRecord]) -> Result<CategoryTotal, AggregationError> {
    let mut total = 0.0;
    for r in records.iter().filter(|r| r.minor_unclassified()) {
        total += finite_amount(r)?;
    }
    ensure_finite("unclassified", UNCLASSIFIED, &[total])?;
    Ok(CategoryTotal {
        category: UNCLASSIFIED.to_string(),
        total,
    })
}

fn finite_amount(r: &TransactionRecord) -> Result<f64, AggregationError> {
    if r.amount.is_finite() {
        Ok(r.amount)
    } else {
        Err(AggregationError::NonFiniteAmount {
            date: r.date,
            amount: r.amount,
        })
    }
}

fn ensure_finite(view: &'static str, key: &str, values: &[f64]) -> Result<(), AggregationError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(AggregationError::NonFiniteTotal {
            view,
            key: key.to_string(),
        })
    }
}
