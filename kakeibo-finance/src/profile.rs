//! User profile store: maps a chat user id to their latest artifacts.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    /// Object key of the latest summary artifact
    #[serde(default)]
    pub summary_key: Option<String>,
    /// Object key of the latest rendered report
    #[serde(default)]
    pub report_key: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            summary_key: None,
            report_key: None,
            updated_at: now,
        }
    }
}

pub trait ProfileStore {
    fn get(&self, user_id: &str) -> Result<Option<UserProfile>>;
    fn put(&self, profile: &UserProfile) -> Result<()>;

    /// Load the profile or start a fresh one.
    fn get_or_new(&self, user_id: &str, now: DateTime<Utc>) -> Result<UserProfile> {
        Ok(self
            .get(user_id)?
            .unwrap_or_else(|| UserProfile::new(user_id, now)))
    }
}

/// All profiles in one pretty-printed JSON object keyed by user id.
#[derive(Debug, Clone)]
pub struct JsonProfileStore {
    path: PathBuf,
}

impl JsonProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn partial_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "profiles.json".to_string());
        self.path.with_file_name(format!(".{name}.partial"))
    }

    fn read_all(&self) -> Result<BTreeMap<String, UserProfile>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let s = fs::read_to_string(&self.path).with_context(|| format!("read {}", self.path.display()))?;
        serde_json::from_str(&s).with_context(|| format!("parse {}", self.path.display()))
    }
}

impl ProfileStore for JsonProfileStore {
    fn get(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self.read_all()?.remove(user_id))
    }

    fn put(&self, profile: &UserProfile) -> Result<()> {
        let mut all = self.read_all()?;
        all.insert(profile.user_id.clone(), profile.clone());
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(&all)?;

        // Replace the map in one rename so readers never see a half-written file.
        let tmp = self.partial_path();
        if let Err(e) = fs::write(&tmp, json) {
            let _ = fs::remove_file(&tmp);
            return Err(e).with_context(|| format!("write {}", tmp.display()));
        }
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e).with_context(|| format!("rename {} -> {}", tmp.display(), self.path.display()));
        }
        Ok(())
    }
}
