//! One-shot chat completion against OpenAI-compatible or Anthropic endpoints.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "openai")]
    OpenAI,
}

impl Provider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::Anthropic => "https://api.anthropic.com",
            Provider::OpenAI => "https://api.openai.com",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: Provider,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout: Duration,
}

impl LlmConfig {
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            base_url: provider.default_base_url().to_string(),
            temperature: 0.2,
            max_tokens: 450,
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Anything that can turn a system + user prompt into reply text.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

/// HTTP chat client. Build once per process and share it.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    config: LlmConfig,
    api_key: String,
}

impl ChatClient {
    pub fn new(config: LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            config,
            api_key: api_key.into(),
        })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn anthropic_complete(&self, system: &str, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            max_tokens: u32,
            temperature: f32,
            system: &'a str,
            messages: Vec<Msg<'a>>,
        }

        #[derive(Deserialize)]
        struct Resp {
            content: Vec<ContentBlock>,
        }

        #[derive(Deserialize)]
        struct ContentBlock {
            #[serde(rename = "type")]
            t: String,
            text: Option<String>,
        }

        let body = Req {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
        };

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let resp = self
            .http
            .post(format!("{}/v1/messages", self.config.base_url))
            .headers(headers)
            .json(&body)
            .send()
            .await
            .context("anthropic request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("anthropic error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse anthropic response")?;
        let mut s = String::new();
        for b in out.content {
            if b.t == "text" {
                if let Some(t) = b.text {
                    s.push_str(&t);
                }
            }
        }
        Ok(s.trim().to_string())
    }

    async fn openai_complete(&self, system: &str, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: MsgOut,
        }

        #[derive(Deserialize)]
        struct MsgOut {
            content: Option<String>,
        }

        let body = Req {
            model: &self.config.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
        };

        let resp = self
            .http
            .post(format!("{}/v1/chat/completions", self.config.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .context("openai request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("openai error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse openai response")?;
        let content = out
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl ChatCompletion for ChatClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        match self.config.provider {
            Provider::Anthropic => self.anthropic_complete(system, prompt).await,
            Provider::OpenAI => self.openai_complete(system, prompt).await,
        }
    }
}
