use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use kakeibo_core::{Period, SummaryArtifact, UNCLASSIFIED};
use kakeibo_finance::{
    CandidateSet, CategoryResolver, Classification, ClassificationOracle, ClassifyRequest, MemoryStore,
    ObjectStore, Pipeline, PipelineError, ResolverOptions,
};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("moneyforward_sample.csv")
}

const HEADER: &str = "計算対象,日付,内容,金額（円）,保有金融機関,大項目,中項目,メモ,振替,ID\n";

/// Oracle with canned answers keyed by memo substring. Memos that match nothing fail.
#[derive(Default)]
struct ScriptedOracle {
    answers: Vec<(&'static str, Classification)>,
    hang_on: Vec<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClassificationOracle for ScriptedOracle {
    async fn classify(&self, request: &ClassifyRequest<'_>) -> Result<Classification> {
        self.calls.lock().unwrap().push(request.memo.to_string());
        if self.hang_on.iter().any(|m| request.memo.contains(m)) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.answers
            .iter()
            .find(|(m, _)| request.memo.contains(m))
            .map(|(_, c)| c.clone())
            .ok_or_else(|| anyhow!("oracle timeout"))
    }
}

struct BrokenStore;

#[async_trait]
impl ObjectStore for BrokenStore {
    async fn put(&self, _key: &str, _bytes: Vec<u8>) -> Result<()> {
        bail!("disk full")
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        bail!("no such object: {key}")
    }
}

fn pipeline(oracle: Arc<ScriptedOracle>, store: Arc<dyn ObjectStore>) -> Pipeline {
    let options = ResolverOptions {
        call_timeout: Duration::from_secs(5),
        ..ResolverOptions::default()
    };
    Pipeline::new(CategoryResolver::new(oracle, CandidateSet::default(), options), store)
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 31, 12, 0, 0).unwrap()
}

#[tokio::test]
async fn test_scenario_a_monthly_balance() {
    let csv = format!(
        "{HEADER}1,2024/04/01,給与,1000,銀行,収入,給与,,0,a\n1,2024/04/03,ランチ,-300,銀行,食費,外食,,0,b\n"
    );
    let oracle = Arc::new(ScriptedOracle::default());
    let store = Arc::new(MemoryStore::new());
    let out = pipeline(oracle.clone(), store.clone())
        .run(csv.as_bytes(), "U1", now())
        .await
        .unwrap();

    assert_eq!(out.artifact.monthly.len(), 1);
    let m = &out.artifact.monthly[0];
    assert_eq!(m.period, Period::Month("2024-04".to_string()));
    assert_eq!((m.income, m.expense, m.net), (1000.0, 300.0, 700.0));
    assert!(oracle.calls().is_empty());
}

#[tokio::test]
async fn test_scenario_b_unparsable_amount_dropped() {
    let csv = format!(
        "{HEADER}1,2024/04/01,給与,1000,銀行,収入,給与,,0,a\n\
         1,2024/04/02,謎,abc,銀行,食費,外食,,0,b\n\
         1,2024/04/03,ランチ,-300,銀行,食費,外食,,0,c\n"
    );
    let out = pipeline(Arc::new(ScriptedOracle::default()), Arc::new(MemoryStore::new()))
        .run(csv.as_bytes(), "U1", now())
        .await
        .unwrap();

    assert_eq!(out.parse.dropped, 1);
    assert_eq!(out.parse.parsed, 2);
    assert_eq!(out.dropped[0].line, 3);
    assert_eq!(out.artifact.monthly[0].net, 700.0);
}

#[tokio::test]
async fn test_scenario_c_blank_categories_resolved_once() {
    let csv = format!("{HEADER}1,2024/04/03,サイゼリヤ,-300,銀行,,,,0,a\n");
    let oracle = Arc::new(ScriptedOracle {
        answers: vec![("サイゼリヤ", Classification::new("食費", "外食"))],
        ..ScriptedOracle::default()
    });
    let out = pipeline(oracle.clone(), Arc::new(MemoryStore::new()))
        .run(csv.as_bytes(), "U1", now())
        .await
        .unwrap();

    assert_eq!(oracle.calls(), vec!["サイゼリヤ"]);
    let dining = out
        .artifact
        .category_totals
        .iter()
        .find(|t| t.category == "外食")
        .unwrap();
    assert_eq!(dining.total, -300.0);
    assert_eq!(out.artifact.unclassified_total.total, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_scenario_d_oracle_timeout_leaves_unclassified() {
    let csv = format!(
        "{HEADER}1,2024/04/03,ランチ,-300,銀行,食費,外食,,0,a\n1,2024/04/04,謎の店,-700,銀行,,,,0,b\n"
    );
    let oracle = Arc::new(ScriptedOracle {
        hang_on: vec!["謎の店"],
        ..ScriptedOracle::default()
    });
    let store = Arc::new(MemoryStore::new());
    let out = pipeline(oracle, store.clone())
        .run(csv.as_bytes(), "U1", now())
        .await
        .unwrap();

    assert_eq!(out.resolve.degraded, 1);
    assert_eq!(out.artifact.unclassified_total.category, UNCLASSIFIED);
    assert_eq!(out.artifact.unclassified_total.total, -700.0);
    assert_eq!(store.keys(), vec![out.key.clone()]);
}

#[tokio::test]
async fn test_fixture_end_to_end() {
    let oracle = Arc::new(ScriptedOracle {
        answers: vec![
            ("JR東日本", Classification::new("交通費", "電車")),
            ("Amazon", Classification::new("日用品", "ドラッグストア")),
        ],
        ..ScriptedOracle::default()
    });
    let store = Arc::new(MemoryStore::new());
    let file = File::open(fixture_path()).unwrap();

    let out = pipeline(oracle.clone(), store.clone())
        .run(file, "U4af4980629", now())
        .await
        .unwrap();

    // abc amount and the dashed date are rejected
    assert_eq!(out.parse.parsed, 10);
    assert_eq!(out.parse.dropped, 2);

    // JR (both blank), Amazon (minor blank), ライフ (both blank, oracle fails)
    let mut calls = oracle.calls();
    calls.sort();
    assert_eq!(calls.len(), 3);
    assert_eq!(out.resolve.calls, 3);
    assert_eq!(out.resolve.degraded, 1);

    let a = &out.artifact;
    assert_eq!(a.unclassified_total.total, -4320.0);

    let train = a.category_totals.iter().find(|t| t.category == "電車").unwrap();
    assert_eq!(train.total, -3000.0);

    // coverage and conservation
    let raw_sum = 250000.0 - 480.0 - 300.0 - 6200.0 - 3000.0 - 85000.0 - 2980.0 + 120.0 - 4320.0 - 10000.0;
    let category_sum: f64 = a.category_totals.iter().map(|t| t.total).sum();
    let weekly_net: f64 = a.weekly.iter().map(|b| b.net).sum();
    let monthly_net: f64 = a.monthly.iter().map(|b| b.net).sum();
    assert_eq!(category_sum, raw_sum);
    assert_eq!(weekly_net, raw_sum);
    assert_eq!(monthly_net, raw_sum);

    assert_ordering(a);

    // stored bytes are the artifact
    assert_eq!(out.key, "summaries/U4af4980629/2024-05-31-120000-000000.json");
    let stored: SummaryArtifact = serde_json::from_slice(&store.get(&out.key).await.unwrap()).unwrap();
    assert_eq!(&stored, a);
}

fn assert_ordering(a: &SummaryArtifact) {
    for list in [&a.weekly, &a.monthly] {
        for w in list.windows(2) {
            assert!(w[0].period.key() < w[1].period.key());
        }
    }
    for w in a.category_totals.windows(2) {
        assert!(w[0].category < w[1].category);
    }
    for list in [&a.category_weekly, &a.category_monthly] {
        for w in list.windows(2) {
            let left = (w[0].period.key(), w[0].category.as_str());
            let right = (w[1].period.key(), w[1].category.as_str());
            assert!(left < right);
        }
    }
    for b in a.weekly.iter().chain(a.monthly.iter()) {
        assert_eq!(b.net, b.income - b.expense);
    }
}

#[tokio::test]
async fn test_every_row_rejected_is_fatal() {
    let csv = format!("{HEADER}1,2024-04-01,x,-1,銀行,食費,外食,,0,a\n1,2024/04/02,y,zz,銀行,食費,外食,,0,b\n");
    let store = Arc::new(MemoryStore::new());
    let err = pipeline(Arc::new(ScriptedOracle::default()), store.clone())
        .run(csv.as_bytes(), "U1", now())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoValidRows { dropped: 2 }));
    assert!(store.keys().is_empty());
}

#[tokio::test]
async fn test_header_only_file_yields_empty_artifact() {
    let out = pipeline(Arc::new(ScriptedOracle::default()), Arc::new(MemoryStore::new()))
        .run(HEADER.as_bytes(), "U1", now())
        .await
        .unwrap();
    assert!(out.artifact.monthly.is_empty());
    assert!(out.artifact.category_totals.is_empty());
    assert_eq!(out.artifact.unclassified_total.total, 0.0);
}

#[tokio::test]
async fn test_missing_header_is_fatal() {
    let err = pipeline(Arc::new(ScriptedOracle::default()), Arc::new(MemoryStore::new()))
        .run("date,amount\n2024/04/01,1\n".as_bytes(), "U1", now())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Ingest(_)));
}

#[tokio::test]
async fn test_storage_failure_is_single_terminal_error() {
    let csv = format!("{HEADER}1,2024/04/01,給与,1000,銀行,収入,給与,,0,a\n");
    let err = pipeline(Arc::new(ScriptedOracle::default()), Arc::new(BrokenStore))
        .run(csv.as_bytes(), "U1", now())
        .await
        .unwrap_err();
    match err {
        PipelineError::Storage { key, reason } => {
            assert!(key.starts_with("summaries/U1/"));
            assert!(reason.contains("disk full"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_rerun_on_enriched_records_is_idempotent() {
    let csv = format!("{HEADER}1,2024/04/03,サイゼリヤ,-300,銀行,,,,0,a\n");
    let oracle = Arc::new(ScriptedOracle {
        answers: vec![("サイゼリヤ", Classification::new("食費", "外食"))],
        ..ScriptedOracle::default()
    });
    let resolver = CategoryResolver::new(oracle.clone(), CandidateSet::default(), ResolverOptions::default());
    let parsed = kakeibo_ingest::parse_moneyforward_csv(csv.as_bytes(), &Default::default()).unwrap();

    let first = resolver.resolve(parsed.records).await;
    let second = resolver.resolve(first.records.clone()).await;
    assert_eq!(oracle.calls().len(), 1);
    assert_eq!(second.records, first.records);

    let mut by_memo: HashMap<&str, &str> = HashMap::new();
    for r in &second.records {
        by_memo.insert(&r.memo, &r.minor_category);
    }
    assert_eq!(by_memo["サイゼリヤ"], "外食");
}

/// Serves its bytes once, then every read fails.
struct TruncatedSource {
    data: Vec<u8>,
    served: bool,
}

impl std::io::Read for TruncatedSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.served {
            return Err(std::io::Error::other("disk read error"));
        }
        self.served = true;
        let n = self.data.len().min(buf.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        Ok(n)
    }
}

#[tokio::test]
async fn test_source_failing_midway_stores_nothing() {
    let source = TruncatedSource {
        data: format!("{HEADER}1,2024/04/03,ランチ,-300,銀行,食費,外食,,0,a\n").into_bytes(),
        served: false,
    };
    let store = Arc::new(MemoryStore::new());
    let err = pipeline(Arc::new(ScriptedOracle::default()), store.clone())
        .run(source, "U1", now())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Ingest(_)), "got {err:?}");
    assert!(store.keys().is_empty());
}

#[tokio::test]
async fn test_runs_in_the_same_second_keep_both_artifacts() {
    let csv = format!("{HEADER}1,2024/04/03,ランチ,-300,銀行,食費,外食,,0,a\n");
    let store = Arc::new(MemoryStore::new());
    let p = pipeline(Arc::new(ScriptedOracle::default()), store.clone());

    let first = p.run(csv.as_bytes(), "U1", now()).await.unwrap();
    let later = now() + chrono::Duration::milliseconds(400);
    let second = p.run(csv.as_bytes(), "U1", later).await.unwrap();

    assert_ne!(first.key, second.key);
    assert_eq!(store.keys(), vec![first.key, second.key]);
}
