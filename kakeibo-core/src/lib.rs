//! kakeibo-core: transaction model, period keys and the summary aggregation passes

pub mod aggregate;
pub mod error;
pub mod record;
pub mod summary;
pub mod taxonomy;
pub mod period;

pub use aggregate::{category_totals, period_category_totals, period_totals, unclassified_total};
pub use error::AggregationError;
pub use period::{Granularity, Period};
pub use record::{TransactionRecord, INCOME, UNCLASSIFIED};
pub use summary::{assemble_summary, CategoryTotal, PeriodBucket, PeriodCategoryTotal, SummaryArtifact};
pub use taxonomy::{DEFAULT_MAJOR_CATEGORIES, DEFAULT_MINOR_CATEGORIES};
