//! Pipeline driver: parse → resolve → aggregate → store.

use std::io::Read;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kakeibo_core::{assemble_summary, AggregationError, SummaryArtifact};
use kakeibo_ingest::{parse_moneyforward_csv, ColumnNames, DroppedRow, IngestError, ParseStats};
use thiserror::Error;
use tracing::info;

use crate::resolver::{CategoryResolver, ResolveReport};
use crate::storage::ObjectStore;

/// The single terminal error of a run. No artifact is stored when one is returned.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot read input: {0}")]
    Ingest(#[from] IngestError),

    #[error("no valid rows: all {dropped} data rows were rejected")]
    NoValidRows { dropped: usize },

    #[error("aggregation failed: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("serializing summary: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("writing artifact `{key}`: {reason}")]
    Storage { key: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Object key the artifact was stored under
    pub key: String,
    pub artifact: SummaryArtifact,
    pub parse: ParseStats,
    pub dropped: Vec<DroppedRow>,
    pub resolve: ResolveReport,
}

pub struct Pipeline {
    resolver: CategoryResolver,
    store: Arc<dyn ObjectStore>,
    columns: ColumnNames,
}

impl Pipeline {
    pub fn new(resolver: CategoryResolver, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            resolver,
            store,
            columns: ColumnNames::default(),
        }
    }

    pub fn with_columns(mut self, columns: ColumnNames) -> Self {
        self.columns = columns;
        self
    }

    /// Run one export through every stage and store the resulting artifact.
    ///
    /// `origin` identifies who or what the file came from (a user id) and becomes part
    /// of the artifact key.
    pub async fn run<R: Read>(
        &self,
        source: R,
        origin: &str,
        now: DateTime<Utc>,
    ) -> Result<RunOutcome, PipelineError> {
        let parsed = parse_moneyforward_csv(source, &self.columns)?;
        let parse = ParseStats::from(&parsed);
        if parse.parsed == 0 && parse.dropped > 0 {
            return Err(PipelineError::NoValidRows { dropped: parse.dropped });
        }

        let resolution = self.resolver.resolve(parsed.records).await;
        let artifact = assemble_summary(&resolution.records)?;
        let bytes = serde_json::to_vec_pretty(&artifact)?;

        let key = artifact_key(origin, now);
        self.store
            .put(&key, bytes)
            .await
            .map_err(|e| PipelineError::Storage {
                key: key.clone(),
                reason: format!("{e:#}"),
            })?;

        info!(
            %key,
            parsed = parse.parsed,
            dropped = parse.dropped,
            oracle_calls = resolution.report.calls,
            degraded = resolution.report.degraded,
            "summary stored"
        );

        Ok(RunOutcome {
            key,
            artifact,
            parse,
            dropped: parsed.dropped,
            resolve: resolution.report,
        })
    }
}

/// Timestamp part of object keys. Microseconds keep runs within the same second apart.
const KEY_STAMP: &str = "%Y-%m-%d-%H%M%S-%6f";

/// `summaries/{origin}/{YYYY-MM-DD-HHMMSS-ffffff}.json`, with `origin` reduced to `[A-Za-z0-9_-]`.
pub fn artifact_key(origin: &str, now: DateTime<Utc>) -> String {
    format!("summaries/{}/{}.json", sanitize_origin(origin), now.format(KEY_STAMP))
}

/// `reports/{origin}/{YYYY-MM-DD-HHMMSS-ffffff}.{extension}`.
pub fn report_key(origin: &str, now: DateTime<Utc>, extension: &str) -> String {
    format!("reports/{}/{}.{extension}", sanitize_origin(origin), now.format(KEY_STAMP))
}

pub fn sanitize_origin(origin: &str) -> String {
    let cleaned: String = origin
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "anonymous".to_string()
    } else {
        cleaned
    }
}
