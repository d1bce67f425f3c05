use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$KAKEIBO_HOME`, or `~/.kakeibo`.
pub fn kakeibo_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("KAKEIBO_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".kakeibo"))
}

pub fn ensure_kakeibo_home() -> Result<PathBuf> {
    let dir = kakeibo_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn profiles_path() -> Result<PathBuf> {
    Ok(ensure_kakeibo_home()?.join("profiles.json"))
}

pub fn default_store_root() -> Result<PathBuf> {
    Ok(ensure_kakeibo_home()?.join("store"))
}
