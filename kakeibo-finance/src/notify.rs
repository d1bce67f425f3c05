//! Notification channel (LINE push messages).

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use tracing::{info, warn};

const LINE_PUSH_URL: &str = "https://api.line.me/v2/bot/message/push";

/// LINE rejects text messages longer than this many characters.
const LINE_TEXT_LIMIT: usize = 5000;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: &str, message: &str) -> Result<()>;
}

/// Fire-and-forget delivery: failures are logged, never returned.
pub async fn deliver(notifier: &dyn Notifier, user_id: &str, message: &str) {
    if let Err(e) = notifier.notify(user_id, message).await {
        warn!(user = user_id, error = %format!("{e:#}"), "notification not delivered");
    }
}

pub struct LineNotifier {
    http: reqwest::Client,
    channel_token: String,
    endpoint: String,
}

impl LineNotifier {
    pub fn new(channel_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            channel_token: channel_token.into(),
            endpoint: LINE_PUSH_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Serialize)]
struct PushBody<'a> {
    to: &'a str,
    messages: Vec<TextMessage>,
}

#[derive(Serialize)]
struct TextMessage {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

fn push_body<'a>(user_id: &'a str, message: &str) -> PushBody<'a> {
    PushBody {
        to: user_id,
        messages: vec![TextMessage {
            kind: "text",
            text: message.chars().take(LINE_TEXT_LIMIT).collect(),
        }],
    }
}

#[async_trait]
impl Notifier for LineNotifier {
    async fn notify(&self, user_id: &str, message: &str) -> Result<()> {
        let resp = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.channel_token))
            .json(&push_body(user_id, message))
            .send()
            .await
            .context("line push request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("line push error: {status} {txt}");
        }
        info!(user = user_id, "line message sent");
        Ok(())
    }
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user_id: &str, message: &str) -> Result<()> {
        info!(user = user_id, %message, "notification (not sent: no channel configured)");
        Ok(())
    }
}
