use std::net::SocketAddr;
use std::path::PathBuf;

use uuid::Uuid;

use crate::config::{DEFAULT_DEEP_MODEL, DEFAULT_FAST_MODEL};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Model identifiers for each LLM-backed stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub enrich: String,
    pub connect: String,
    pub briefing: String,
    pub analysis: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enrich: DEFAULT_FAST_MODEL.to_string(),
            connect: DEFAULT_FAST_MODEL.to_string(),
            briefing: DEFAULT_DEEP_MODEL.to_string(),
            analysis: DEFAULT_DEEP_MODEL.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub sources_path: PathBuf,
    pub persona_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: String,
    pub llm_max_attempts: u32,
    pub llm_backoff_base_ms: u64,
    pub llm_timeout_secs: u64,
    pub models: ModelConfig,
    pub http_timeout_secs: u64,
    pub http_user_agent: String,
    pub sec_user_agent: String,
    pub fetch_max_concurrent_sources: usize,
    pub enrich_batch_limit: u32,
    pub enrich_delay_ms: u64,
    pub default_persona_id: Option<Uuid>,
    pub cron_secret: Option<String>,
    pub scheduler_enabled: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("sources_path", &self.sources_path)
            .field("persona_path", &self.persona_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "anthropic_api_key",
                &self.anthropic_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("anthropic_base_url", &self.anthropic_base_url)
            .field("llm_max_attempts", &self.llm_max_attempts)
            .field("llm_backoff_base_ms", &self.llm_backoff_base_ms)
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("models", &self.models)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("http_user_agent", &self.http_user_agent)
            .field("sec_user_agent", &self.sec_user_agent)
            .field(
                "fetch_max_concurrent_sources",
                &self.fetch_max_concurrent_sources,
            )
            .field("enrich_batch_limit", &self.enrich_batch_limit)
            .field("enrich_delay_ms", &self.enrich_delay_ms)
            .field("default_persona_id", &self.default_persona_id)
            .field("cron_secret", &self.cron_secret.as_ref().map(|_| "[redacted]"))
            .field("scheduler_enabled", &self.scheduler_enabled)
            .finish()
    }
}
