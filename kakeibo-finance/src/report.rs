//! Report rendering: turns a summary artifact into a document for the user.

use anyhow::Result;
use chrono::DateTime;
use chrono_tz::Tz;
use kakeibo_core::SummaryArtifact;

pub trait ReportRenderer {
    /// File extension for stored reports, without the dot.
    fn extension(&self) -> &'static str;

    fn render(&self, artifact: &SummaryArtifact, generated_at: DateTime<Tz>) -> Result<Vec<u8>>;
}

/// Plain-text household report.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextReport;

impl ReportRenderer for TextReport {
    fn extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, artifact: &SummaryArtifact, generated_at: DateTime<Tz>) -> Result<Vec<u8>> {
        let mut s = String::new();
        s.push_str("家計レポート\n");
        s.push_str(&format!("作成日: {}\n\n", generated_at.format("%Y年%m月%d日 %H:%M")));

        let u = &artifact.unclassified_total;
        s.push_str("■ 未分類合計\n");
        s.push_str(&format!("カテゴリ: {} / 合計: {}円\n\n", u.category, format_yen(u.total)));

        s.push_str("■ 月次収支\n");
        if artifact.monthly.is_empty() {
            s.push_str("(データなし)\n");
        }
        for b in &artifact.monthly {
            s.push_str(&format!(
                "{}: 収入 {}円 / 支出 {}円 / 収支 {}円\n",
                b.period.key(),
                format_yen(b.income),
                format_yen(b.expense),
                format_yen(b.net)
            ));
        }

        s.push_str("\n■ 月別カテゴリ集計\n");
        let mut current: Option<&str> = None;
        for item in &artifact.category_monthly {
            let month = item.period.key();
            if current != Some(month) {
                s.push_str(&format!("\n[{month}]\n"));
                current = Some(month);
            }
            s.push_str(&format!("  {}: {}円\n", item.category, format_yen(item.amount)));
        }

        Ok(s.into_bytes())
    }
}

/// Whole yen with thousands separators; fractional amounts keep two decimals.
pub fn format_yen(amount: f64) -> String {
    let cents_total = (amount.abs() * 100.0).round();
    let whole = (cents_total / 100.0).trunc();
    let cents = (cents_total - whole * 100.0) as u32;

    let digits = format!("{whole:.0}");
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 4);
    if amount < 0.0 && cents_total > 0.0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if cents > 0 {
        out.push_str(&format!(".{cents:02}"));
    }
    out
}
