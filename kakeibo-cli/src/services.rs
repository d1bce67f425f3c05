//! Wires config and credentials into the collaborators the commands use.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono_tz::Tz;
use kakeibo_core::SummaryArtifact;
use kakeibo_finance::{
    CandidateSet, CategoryResolver, ChatClient, Classification, ClassificationOracle, ClassifyRequest,
    FsObjectStore, JsonProfileStore, LineNotifier, LlmConfig, LlmOracle, LogNotifier, Notifier, ObjectStore,
    ProfileStore, Provider,
};

use crate::auth::AuthState;
use crate::config::Config;
use crate::state;

pub struct Services {
    pub config: Config,
    pub auth: AuthState,
    pub store: Arc<dyn ObjectStore>,
    pub profiles: JsonProfileStore,
}

impl Services {
    pub fn load(config: Config, auth: AuthState) -> Result<Self> {
        let root = match &config.storage.root {
            Some(r) => r.clone(),
            None => state::default_store_root()?,
        };
        Ok(Self {
            config,
            auth,
            store: Arc::new(FsObjectStore::new(root)),
            profiles: JsonProfileStore::new(state::profiles_path()?),
        })
    }

    pub fn chat_client(&self) -> Result<ChatClient> {
        let llm = &self.config.llm;
        let (key, hint) = match llm.provider {
            Provider::OpenAI => (&self.auth.openai_api_key, "kakeibo auth openai-paste-api-key"),
            Provider::Anthropic => (&self.auth.anthropic_api_key, "kakeibo auth anthropic-paste-api-key"),
        };
        let Some(key) = key.as_deref() else {
            bail!("no API key for {:?}. Run: {hint}", llm.provider);
        };

        let mut cfg = LlmConfig::new(llm.provider, llm.model.clone());
        cfg.temperature = llm.temperature;
        if let Some(base) = &llm.base_url {
            cfg.base_url = base.trim_end_matches('/').to_string();
        }
        ChatClient::new(cfg, key)
    }

    pub fn resolver(&self, offline: bool) -> Result<CategoryResolver> {
        let oracle: Arc<dyn ClassificationOracle> = if offline {
            Arc::new(OfflineOracle)
        } else {
            Arc::new(LlmOracle::new(self.chat_client()?))
        };
        Ok(CategoryResolver::new(
            oracle,
            CandidateSet::default(),
            self.config.classifier.resolver_options(),
        ))
    }

    pub fn notifier(&self) -> Box<dyn Notifier> {
        match &self.auth.line_channel_token {
            Some(token) => Box::new(LineNotifier::new(token.clone())),
            None => Box::new(LogNotifier),
        }
    }

    pub fn timezone(&self) -> Result<Tz> {
        let name = &self.config.report.timezone;
        name.parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("invalid report.timezone {name:?}: {e}"))
    }

    /// The user's most recent stored summary.
    pub async fn latest_artifact(&self, user_id: &str) -> Result<(String, SummaryArtifact)> {
        let profile = self.profiles.get(user_id)?;
        let Some(key) = profile.and_then(|p| p.summary_key) else {
            bail!("no summary for user {user_id}. Run: kakeibo analyze --csv <file> --user {user_id}");
        };
        let bytes = self.store.get(&key).await?;
        let artifact = serde_json::from_slice(&bytes).with_context(|| format!("parse {key}"))?;
        Ok((key, artifact))
    }
}

/// Leaves every blank category unclassified without calling a model.
pub struct OfflineOracle;

#[async_trait]
impl ClassificationOracle for OfflineOracle {
    async fn classify(&self, _request: &ClassifyRequest<'_>) -> Result<Classification> {
        Ok(Classification::unclassified())
    }
}
