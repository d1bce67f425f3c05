use anyhow::{Context, Result};
use kakeibo_finance::{Provider, ResolverOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::state::ensure_kakeibo_home;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub classifier: ClassifierSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub report: ReportSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub provider: Provider,
    pub model: String,
    /// Override the provider's API base URL (OpenAI-compatible gateways, proxies)
    pub base_url: Option<String>,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSection {
    pub concurrency: usize,
    pub call_timeout_secs: u64,
    pub run_timeout_secs: u64,
    /// Accept guesses outside the candidate lists as-is
    pub accept_unlisted: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Object store directory (default: ~/.kakeibo/store)
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    /// IANA timezone for report timestamps
    pub timezone: String,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAI,
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            temperature: 0.2,
        }
    }
}

impl Default for ClassifierSection {
    fn default() -> Self {
        let d = ResolverOptions::default();
        Self {
            concurrency: d.concurrency,
            call_timeout_secs: d.call_timeout.as_secs(),
            run_timeout_secs: d.run_timeout.as_secs(),
            accept_unlisted: d.accept_unlisted,
        }
    }
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            timezone: "Asia/Tokyo".to_string(),
        }
    }
}

impl ClassifierSection {
    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            concurrency: self.concurrency.max(1),
            call_timeout: Duration::from_secs(self.call_timeout_secs),
            run_timeout: Duration::from_secs(self.run_timeout_secs),
            accept_unlisted: self.accept_unlisted,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_kakeibo_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

/// Missing file means defaults.
pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s)
}

pub fn parse_config(s: &str) -> Result<Config> {
    toml::from_str(s).context("parse config.toml")
}

pub fn save_config_to(p: &Path, cfg: &Config) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config_to(&p, &Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
