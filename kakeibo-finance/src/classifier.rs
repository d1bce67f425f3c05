//! Classification oracle: guesses (major, minor) categories from a memo.

use anyhow::{bail, Result};
use async_trait::async_trait;
use kakeibo_core::{DEFAULT_MAJOR_CATEGORIES, DEFAULT_MINOR_CATEGORIES, UNCLASSIFIED};

use crate::llm::ChatCompletion;

/// Closed candidate lists offered to the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    pub major: Vec<String>,
    pub minor: Vec<String>,
}

impl Default for CandidateSet {
    fn default() -> Self {
        Self {
            major: DEFAULT_MAJOR_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            minor: DEFAULT_MINOR_CATEGORIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CandidateSet {
    pub fn has_major(&self, label: &str) -> bool {
        self.major.iter().any(|c| c == label)
    }

    pub fn has_minor(&self, label: &str) -> bool {
        self.minor.iter().any(|c| c == label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyRequest<'a> {
    pub memo: &'a str,
    pub candidates: &'a CandidateSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub major: String,
    pub minor: String,
}

impl Classification {
    pub fn new(major: impl Into<String>, minor: impl Into<String>) -> Self {
        Self {
            major: major.into(),
            minor: minor.into(),
        }
    }

    pub fn unclassified() -> Self {
        Self::new(UNCLASSIFIED, UNCLASSIFIED)
    }

    /// Replace labels that are not in the candidate lists with the sentinel.
    ///
    /// Returns the restricted guess and whether anything was replaced.
    pub fn restrict_to(self, candidates: &CandidateSet) -> (Self, bool) {
        let mut replaced = false;
        let mut keep = |label: String, listed: bool| {
            if listed || label == UNCLASSIFIED {
                label
            } else {
                replaced = true;
                UNCLASSIFIED.to_string()
            }
        };
        let major_listed = candidates.has_major(&self.major);
        let minor_listed = candidates.has_minor(&self.minor);
        let major = keep(self.major, major_listed);
        let minor = keep(self.minor, minor_listed);
        (Self { major, minor }, replaced)
    }
}

#[async_trait]
pub trait ClassificationOracle: Send + Sync {
    async fn classify(&self, request: &ClassifyRequest<'_>) -> Result<Classification>;
}

const SYSTEM_PROMPT: &str = "あなたは家計簿アプリの取引分類アシスタントです。指定された形式だけで回答してください。";

/// Oracle backed by a chat model.
pub struct LlmOracle<C> {
    chat: C,
}

impl<C: ChatCompletion> LlmOracle<C> {
    pub fn new(chat: C) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl<C: ChatCompletion> ClassificationOracle for LlmOracle<C> {
    async fn classify(&self, request: &ClassifyRequest<'_>) -> Result<Classification> {
        let prompt = build_prompt(request);
        let reply = self.chat.complete(SYSTEM_PROMPT, &prompt).await?;
        parse_reply(&reply)
    }
}

pub fn build_prompt(request: &ClassifyRequest<'_>) -> String {
    format!(
        "次の取引内容に最も合う「大項目」と「中項目」を、候補の中からそれぞれ一つ選んでください。\n\n\
         内容: {memo}\n\n\
         【大項目候補】:\n{major}\n\n\
         【中項目候補】:\n{minor}\n\n\
         回答形式:\n大項目: <カテゴリ名>\n中項目: <カテゴリ名>",
        memo = request.memo,
        major = request.candidates.major.join(", "),
        minor = request.candidates.minor.join(", "),
    )
}

/// Read `大項目: X` / `中項目: Y` lines out of a model reply.
///
/// A missing line leaves that level unclassified; a reply with neither line is an error.
pub fn parse_reply(reply: &str) -> Result<Classification> {
    let mut major = None;
    let mut minor = None;

    for line in reply.lines() {
        let line = line.trim().trim_start_matches(['-', '*', ' ']);
        if let Some(v) = labelled_value(line, "大項目") {
            major = Some(v);
        } else if let Some(v) = labelled_value(line, "中項目") {
            minor = Some(v);
        }
    }

    if major.is_none() && minor.is_none() {
        bail!("unparsable classifier reply: {:?}", reply.chars().take(80).collect::<String>());
    }

    Ok(Classification::new(
        major.unwrap_or_else(|| UNCLASSIFIED.to_string()),
        minor.unwrap_or_else(|| UNCLASSIFIED.to_string()),
    ))
}

fn labelled_value(line: &str, label: &str) -> Option<String> {
    let rest = line.strip_prefix(label)?.trim_start();
    let value = rest.strip_prefix(':').or_else(|| rest.strip_prefix('：'))?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.trim_matches(['「', '」', '"']).to_string())
    }
}
