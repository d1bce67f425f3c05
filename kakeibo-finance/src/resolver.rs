//! Category resolver: back-fills unclassified records through the oracle.
//!
//! Two phases: a pure `needs_resolution` check per record, then a bounded concurrent
//! fan-out over the records that need it. Output order always equals input order.
//! Oracle failures degrade the record (it stays unclassified); they never fail the run.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use kakeibo_core::TransactionRecord;
use serde::Serialize;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::classifier::{CandidateSet, Classification, ClassificationOracle, ClassifyRequest};

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Maximum in-flight oracle calls
    pub concurrency: usize,
    /// Limit for a single oracle call
    pub call_timeout: Duration,
    /// Limit for the whole resolution phase
    pub run_timeout: Duration,
    /// Keep guesses outside the candidate lists instead of coercing them to the sentinel
    pub accept_unlisted: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            call_timeout: Duration::from_secs(20),
            run_timeout: Duration::from_secs(300),
            accept_unlisted: false,
        }
    }
}

/// Counters for one resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveReport {
    /// Records that had at least one unclassified level
    pub pending: usize,
    /// Oracle invocations made
    pub calls: usize,
    /// Records left unclassified because the call failed, timed out or was never made
    pub degraded: usize,
    /// Guesses that named a label outside the candidate lists
    pub unlisted: usize,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub records: Vec<TransactionRecord>,
    pub report: ResolveReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    AlreadyClassified,
    Classified { unlisted: bool },
    Degraded { called: bool },
}

pub struct CategoryResolver {
    oracle: Arc<dyn ClassificationOracle>,
    candidates: CandidateSet,
    options: ResolverOptions,
}

impl CategoryResolver {
    pub fn new(oracle: Arc<dyn ClassificationOracle>, candidates: CandidateSet, options: ResolverOptions) -> Self {
        Self {
            oracle,
            candidates,
            options,
        }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Resolve every record that needs it and wait for all calls to settle.
    pub async fn resolve(&self, records: Vec<TransactionRecord>) -> Resolution {
        let deadline = Instant::now() + self.options.run_timeout;

        let settled: Vec<(TransactionRecord, Outcome)> = stream::iter(records)
            .map(|record| self.resolve_one(record, deadline))
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        let mut report = ResolveReport::default();
        let mut records = Vec::with_capacity(settled.len());
        for (record, outcome) in settled {
            match outcome {
                Outcome::AlreadyClassified => {}
                Outcome::Classified { unlisted } => {
                    report.pending += 1;
                    report.calls += 1;
                    report.unlisted += usize::from(unlisted);
                }
                Outcome::Degraded { called } => {
                    report.pending += 1;
                    report.calls += usize::from(called);
                    report.degraded += 1;
                }
            }
            records.push(record);
        }

        info!(
            pending = report.pending,
            calls = report.calls,
            degraded = report.degraded,
            unlisted = report.unlisted,
            "category resolution finished"
        );

        Resolution { records, report }
    }

    async fn resolve_one(&self, mut record: TransactionRecord, deadline: Instant) -> (TransactionRecord, Outcome) {
        if !record.needs_resolution() {
            return (record, Outcome::AlreadyClassified);
        }

        if Instant::now() >= deadline {
            warn!(memo = %excerpt(&record.memo), "run deadline passed; leaving record unclassified");
            return (record, Outcome::Degraded { called: false });
        }

        let guess = {
            let request = ClassifyRequest {
                memo: &record.memo,
                candidates: &self.candidates,
            };
            let call = timeout(self.options.call_timeout, self.oracle.classify(&request));
            match timeout_at(deadline, call).await {
                Ok(Ok(Ok(guess))) => Ok(guess),
                Ok(Ok(Err(e))) => Err(format!("{e:#}")),
                Ok(Err(_)) => Err(format!("call timed out after {:?}", self.options.call_timeout)),
                Err(_) => Err("run deadline reached".to_string()),
            }
        };

        let guess = match guess {
            Ok(guess) => guess,
            Err(reason) => {
                warn!(memo = %excerpt(&record.memo), %reason, "classification degraded");
                return (record, Outcome::Degraded { called: true });
            }
        };

        let (guess, unlisted) = if self.options.accept_unlisted {
            (guess, false)
        } else {
            guess.restrict_to(&self.candidates)
        };
        if unlisted {
            debug!(memo = %excerpt(&record.memo), "guess outside candidate lists coerced to unclassified");
        }

        let Classification { major, minor } = guess;
        record.fill_categories(&major, &minor);
        (record, Outcome::Classified { unlisted })
    }
}

fn excerpt(memo: &str) -> String {
    memo.chars().take(40).collect()
}
