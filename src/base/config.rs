//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc, time::Duration};

use serde::Deserialize;

use crate::base::prompts;

use super::types::{Res, Void};

/// Default OpenAI-compatible API base (Groq).
fn default_llm_api_base() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

/// Default relevance agent model to use
fn default_llm_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

/// Default sampling temperature for the relevance agent
fn default_llm_temperature() -> f32 {
    0.0
}

/// Default max output tokens; the agent only ever needs a "Yes" or a "No".
fn default_llm_max_tokens() -> u32 {
    16
}

fn default_llm_timeout_secs() -> u64 {
    30
}

/// Default system directive for the relevance agent.
fn default_relevance_agent_system_directive() -> String {
    prompts::RELEVANCE_AGENT_SYSTEM_DIRECTIVE.to_string()
}

fn default_command_prefix() -> String {
    "!".to_string()
}

fn default_db_endpoint() -> String {
    "ws://localhost:8000".to_string()
}

fn default_db_namespace() -> String {
    "relevance".to_string()
}

fn default_db_database() -> String {
    "user_data".to_string()
}

fn default_member_lookup_interval_ms() -> u64 {
    500
}

fn default_user_reconcile_interval_ms() -> u64 {
    1000
}

/// Configuration for the relevance-bot application.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// The shared, immutable configuration values.
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// The configuration values, loaded from the environment and / or a config file.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// Discord bot token (`DISCORD_TOKEN`).
    #[serde(default)]
    pub discord_token: String,
    /// API key for the OpenAI-compatible LLM endpoint (`LLM_API_KEY`).
    #[serde(default)]
    pub llm_api_key: String,
    /// Base URL of the OpenAI-compatible LLM endpoint (`LLM_API_BASE`).
    #[serde(default = "default_llm_api_base")]
    pub llm_api_base: String,
    /// Model used by the relevance agent (`LLM_MODEL`).
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    /// Sampling temperature for the relevance agent (`LLM_TEMPERATURE`).
    /// Value between 0 and 2; the relevance check wants this as close to 0 as possible.
    #[serde(default = "default_llm_temperature")]
    pub llm_temperature: f32,
    /// Max output tokens for the relevance agent (`LLM_MAX_TOKENS`).
    #[serde(default = "default_llm_max_tokens")]
    pub llm_max_tokens: u32,
    /// Upper bound on a single LLM call, in seconds (`LLM_TIMEOUT_SECS`).
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,
    /// Optional custom system directive to override the default (`RELEVANCE_AGENT_SYSTEM_DIRECTIVE`).
    #[serde(default = "default_relevance_agent_system_directive")]
    pub relevance_agent_system_directive: String,
    /// Prefix for text commands (`COMMAND_PREFIX`).
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// Database endpoint URL (`DB_ENDPOINT`); `mem://` selects an in-memory store.
    #[serde(default = "default_db_endpoint")]
    pub db_endpoint: String,
    /// Database username (`DB_USERNAME`); sign-in is skipped when empty.
    #[serde(default)]
    pub db_username: String,
    /// Database password (`DB_PASSWORD`).
    #[serde(default)]
    pub db_password: String,
    /// Database namespace (`DB_NAMESPACE`).
    #[serde(default = "default_db_namespace")]
    pub db_namespace: String,
    /// Database name (`DB_DATABASE`).
    #[serde(default = "default_db_database")]
    pub db_database: String,
    /// Minimum spacing between guild member lookups during reconciliation (`MEMBER_LOOKUP_INTERVAL_MS`).
    #[serde(default = "default_member_lookup_interval_ms")]
    pub member_lookup_interval_ms: u64,
    /// Minimum spacing between authorized users during reconciliation (`USER_RECONCILE_INTERVAL_MS`).
    #[serde(default = "default_user_reconcile_interval_ms")]
    pub user_reconcile_interval_ms: u64,
}

impl ConfigInner {
    /// The LLM call timeout as a [`Duration`].
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    /// The member lookup interval as a [`Duration`].
    pub fn member_lookup_interval(&self) -> Duration {
        Duration::from_millis(self.member_lookup_interval_ms)
    }

    /// The per-user reconciliation interval as a [`Duration`].
    pub fn user_reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.user_reconcile_interval_ms)
    }
}

impl Config {
    /// Load the configuration from the environment (`RELEVANCE_BOT_*`) and an optional TOML file.
    ///
    /// If no explicit path is given, `.hidden/config.toml` is used when it exists.
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("RELEVANCE_BOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Void {
        if self.llm_temperature < 0.0 || self.llm_temperature > 2.0 {
            return Err(anyhow::anyhow!("LLM temperature must be between 0 and 2."));
        }

        if self.llm_max_tokens < 1 {
            return Err(anyhow::anyhow!("LLM max tokens must be at least 1."));
        }

        if self.command_prefix.is_empty() {
            return Err(anyhow::anyhow!("Command prefix must not be empty."));
        }

        Ok(())
    }

    /// Ensure the secrets needed to run the bot are present.
    pub fn require_secrets(&self) -> Void {
        if self.discord_token.trim().is_empty() {
            return Err(anyhow::anyhow!("A Discord token is required (`RELEVANCE_BOT_DISCORD_TOKEN`)."));
        }

        if self.llm_api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("An LLM API key is required (`RELEVANCE_BOT_LLM_API_KEY`)."));
        }

        Ok(())
    }
}

// Tests.
