use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};

use crate::state::ensure_kakeibo_home;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthState {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub line_channel_token: Option<String>,
}

impl AuthState {
    /// Environment variables win over the stored file.
    pub fn with_env_overrides(mut self) -> Self {
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        if let Some(v) = env("OPENAI_API_KEY") {
            self.openai_api_key = Some(v);
        }
        if let Some(v) = env("ANTHROPIC_API_KEY") {
            self.anthropic_api_key = Some(v);
        }
        if let Some(v) = env("LINE_CHANNEL_TOKEN") {
            self.line_channel_token = Some(v);
        }
        self
    }
}

fn auth_path() -> Result<std::path::PathBuf> {
    Ok(ensure_kakeibo_home()?.join("auth.json"))
}

pub fn load_auth() -> Result<AuthState> {
    let p = auth_path()?;
    if !p.exists() {
        return Ok(AuthState::default().with_env_overrides());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    let stored: AuthState = serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))?;
    Ok(stored.with_env_overrides())
}

fn load_stored_auth() -> Result<AuthState> {
    let p = auth_path()?;
    if !p.exists() {
        return Ok(AuthState::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    Ok(serde_json::from_str(&s)?)
}

pub fn save_auth(auth: &AuthState) -> Result<()> {
    let p = auth_path()?;
    let s = serde_json::to_string_pretty(auth)?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

fn prompt_secret(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

pub fn openai_paste_api_key() -> Result<()> {
    let mut auth = load_stored_auth()?;
    let key = prompt_secret("Paste OpenAI API key (starts with sk-)")?;
    if !key.starts_with("sk-") {
        bail!("key didn't look like an OpenAI API key (expected prefix sk-)");
    }
    auth.openai_api_key = Some(key);
    save_auth(&auth)?;
    println!("Saved OpenAI API key to {}", auth_path()?.display());
    Ok(())
}

pub fn anthropic_paste_api_key() -> Result<()> {
    let mut auth = load_stored_auth()?;
    let key = prompt_secret("Paste Anthropic API key (starts with sk-ant-)")?;
    if !key.starts_with("sk-ant-") {
        bail!("key didn't look like an Anthropic key (expected prefix sk-ant-)");
    }
    auth.anthropic_api_key = Some(key);
    save_auth(&auth)?;
    println!("Saved Anthropic API key to {}", auth_path()?.display());
    Ok(())
}

pub fn line_paste_channel_token() -> Result<()> {
    let mut auth = load_stored_auth()?;
    let token = prompt_secret("Paste LINE channel access token")?;
    if token.is_empty() {
        bail!("empty token");
    }
    auth.line_channel_token = Some(token);
    save_auth(&auth)?;
    println!("Saved LINE channel token to {}", auth_path()?.display());
    Ok(())
}
