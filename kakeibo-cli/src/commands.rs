use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use kakeibo_finance::{
    deliver, report_key, route_message, Advisor, Intent, MemoryStore, ObjectStore, Pipeline, ProfileStore,
    ReportRenderer, RunOutcome, TextReport,
};
use tracing::info;

use crate::services::Services;

const UPLOAD_REPLY: &str = "MoneyForwardから書き出したCSVファイルを送信してください。集計して家計レポートを作成します。";

pub async fn analyze(svc: &Services, csv: &Path, user: &str, dry_run: bool, offline: bool) -> Result<()> {
    if !csv.exists() {
        bail!("CSV not found: {} (pass --csv <path>)", csv.display());
    }
    let file = File::open(csv).with_context(|| format!("open {}", csv.display()))?;

    let store: Arc<dyn ObjectStore> = if dry_run {
        Arc::new(MemoryStore::new())
    } else {
        svc.store.clone()
    };
    let pipeline = Pipeline::new(svc.resolver(offline)?, store);

    let now = Utc::now();
    let outcome = pipeline
        .run(BufReader::new(file), user, now)
        .await
        .with_context(|| format!("analyzing {}", csv.display()))?;

    if !dry_run {
        let mut profile = svc.profiles.get_or_new(user, now)?;
        profile.summary_key = Some(outcome.key.clone());
        profile.updated_at = now;
        svc.profiles.put(&profile)?;
    }

    print_outcome(&outcome, dry_run);
    Ok(())
}

fn print_outcome(outcome: &RunOutcome, dry_run: bool) {
    if dry_run {
        println!("Dry run: summary not stored (would be {})", outcome.key);
    } else {
        println!("Stored summary: {}", outcome.key);
    }
    println!(
        "Rows: {} parsed, {} dropped | oracle calls: {} (degraded: {}, unlisted: {})",
        outcome.parse.parsed,
        outcome.parse.dropped,
        outcome.resolve.calls,
        outcome.resolve.degraded,
        outcome.resolve.unlisted
    );
    for d in &outcome.dropped {
        println!("  dropped line {}: {}", d.line, d.reason);
    }

    println!();
    for b in &outcome.artifact.monthly {
        println!(
            "{} | income {:.0} | expense {:.0} | net {:.0}",
            b.period.key(),
            b.income,
            b.expense,
            b.net
        );
    }
    let u = &outcome.artifact.unclassified_total;
    println!("{}: {:.0}", u.category, u.total);
}

pub async fn advise(svc: &Services, user: &str, notify: bool) -> Result<()> {
    let (key, artifact) = svc.latest_artifact(user).await?;
    let advisor = Advisor::new(svc.chat_client()?);
    let comment = advisor.advise(&artifact).await;
    info!(user, %key, "advice generated");

    println!("{comment}");
    if notify {
        deliver(svc.notifier().as_ref(), user, &comment).await;
    }
    Ok(())
}

pub async fn report(svc: &Services, user: &str, out: Option<PathBuf>, notify: bool) -> Result<()> {
    let (_, artifact) = svc.latest_artifact(user).await?;
    let now = Utc::now();
    let local = now.with_timezone(&svc.timezone()?);

    let renderer = TextReport;
    let bytes = renderer.render(&artifact, local)?;
    let key = report_key(user, now, renderer.extension());
    svc.store.put(&key, bytes.clone()).await?;

    let mut profile = svc.profiles.get_or_new(user, now)?;
    profile.report_key = Some(key.clone());
    profile.updated_at = now;
    svc.profiles.put(&profile)?;

    match out {
        Some(path) => {
            std::fs::write(&path, &bytes).with_context(|| format!("write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{}", String::from_utf8_lossy(&bytes)),
    }
    println!("Stored report: {key}");

    if notify {
        let text = String::from_utf8_lossy(&bytes);
        deliver(svc.notifier().as_ref(), user, &text).await;
    }
    Ok(())
}

/// Route one inbound chat message the way the messaging webhook would.
pub async fn message(svc: &Services, user: &str, text: &str) -> Result<()> {
    match route_message(text) {
        Intent::Upload => {
            let now = Utc::now();
            let profile = svc.profiles.get_or_new(user, now)?;
            svc.profiles.put(&profile)?;
            deliver(svc.notifier().as_ref(), user, UPLOAD_REPLY).await;
            println!("{UPLOAD_REPLY}");
        }
        Intent::Diagnose => advise(svc, user, true).await?,
        Intent::Unknown => {
            info!(user, "message ignored: no matching intent");
            println!("(no action)");
        }
    }
    Ok(())
}
