//! Financial-planner comment generated from a summary artifact.

use kakeibo_core::SummaryArtifact;
use tracing::warn;

use crate::llm::ChatCompletion;

const SYSTEM_PROMPT: &str = "あなたは家計相談に応じるファイナンシャルプランナーです。";

pub struct Advisor<C> {
    chat: C,
}

impl<C: ChatCompletion> Advisor<C> {
    pub fn new(chat: C) -> Self {
        Self { chat }
    }

    /// Ask the model for a short comment. Never fails: errors become an error comment.
    pub async fn advise(&self, artifact: &SummaryArtifact) -> String {
        let prompt = match build_prompt(artifact) {
            Ok(p) => p,
            Err(e) => return error_comment(&e),
        };
        match self.chat.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => error_comment(&anyhow::anyhow!("empty reply")),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "advice generation failed");
                error_comment(&e)
            }
        }
    }
}

fn error_comment(e: &dyn std::fmt::Display) -> String {
    format!("コメント生成エラー: {e}")
}

pub fn build_prompt(artifact: &SummaryArtifact) -> serde_json::Result<String> {
    let data = serde_json::to_string(artifact)?;
    Ok(format!(
        "以下の家計データ（収支の週次・月次・カテゴリ別の集計）をもとに、利用者向けの簡潔なコメントを日本語で書いてください。\n\
         ・収支バランス（黒字か赤字か）\n\
         ・支出の傾向（カテゴリ別の比率など）\n\
         ・改善ポイント（節約や見直しの提案）\n\n\
         データ:\n{data}\n\n\
         出力形式:\nFPコメント: <コメント本文>"
    ))
}
