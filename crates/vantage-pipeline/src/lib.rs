//! Vantage pipeline stages: fetch, enrich, connect, briefing and analysis,
//! plus the usage governor that admits and records every run.
//!
//! A [`Pipeline`] is built once at process start from a [`PipelineStore`], a
//! [`ConnectorRegistry`] and, for the LLM stages, a [`CompletionService`].

pub mod analysis;
pub mod briefing;
pub mod connect;
pub mod enrich;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod parse;
pub mod persona;
pub mod prompts;
pub mod stage;
pub mod store;
pub mod usage;

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;
use vantage_core::{AppConfig, ModelConfig};
use sqlx::PgPool;
use vantage_llm::{AnthropicClient, CompletionService, LlmError};
use vantage_sources::{ConnectorRegistry, HttpSettings};

pub use analysis::{AnalysisReport, AnalysisRequest};
pub use briefing::BriefingReport;
pub use connect::ConnectReport;
pub use enrich::EnrichReport;
pub use error::{ParseError, PipelineError};
pub use fetch::{FetchReport, SourceFetchResult};
pub use normalize::{fingerprint, normalize_and_store, NormalizeOutcome};
pub use persona::ResolvedPersona;
pub use stage::{StageOptions, StageReport};
pub use store::{PgStore, PipelineStore};
pub use usage::{
    check_daily_limit, daily_usage_summary, record_pipeline_run, AdmissionDecision, GovernedRun,
    PipelineUsage, RunMetrics,
};

pub const DEFAULT_MAX_CONCURRENT_SOURCES: usize = 4;
pub const MAX_CONCURRENT_SOURCES: usize = 8;

/// Tunables shared by the stages.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_concurrent_sources: usize,
    pub enrich_limit: u32,
    pub enrich_delay: Duration,
    pub models: ModelConfig,
    pub default_persona_id: Option<Uuid>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_concurrent_sources: DEFAULT_MAX_CONCURRENT_SOURCES,
            enrich_limit: 20,
            enrich_delay: Duration::from_millis(500),
            models: ModelConfig::default(),
            default_persona_id: None,
        }
    }
}

impl PipelineSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_concurrent_sources: config.fetch_max_concurrent_sources,
            enrich_limit: config.enrich_batch_limit,
            enrich_delay: Duration::from_millis(config.enrich_delay_ms),
            models: config.models.clone(),
            default_persona_id: config.default_persona_id,
        }
    }
}

#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn PipelineStore>,
    connectors: ConnectorRegistry,
    completion: Option<Arc<dyn CompletionService>>,
    settings: PipelineSettings,
}

impl Pipeline {
    /// A pipeline that can fetch. LLM stages need [`Pipeline::with_completion`].
    #[must_use]
    pub fn new(
        store: Arc<dyn PipelineStore>,
        connectors: ConnectorRegistry,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            connectors,
            completion: None,
            settings,
        }
    }

    /// Postgres store, the default connectors and, when an API key is
    /// configured, the Anthropic client.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Sources`] or [`PipelineError::Completion`] if
    /// an HTTP client cannot be built.
    pub fn from_app_config(pool: PgPool, config: &AppConfig) -> Result<Self, PipelineError> {
        let connectors = ConnectorRegistry::with_defaults(&HttpSettings::from_app_config(config))?;
        let pipeline = Self::new(
            Arc::new(PgStore::new(pool)),
            connectors,
            PipelineSettings::from_app_config(config),
        );

        if config.anthropic_api_key.is_none() {
            tracing::warn!("ANTHROPIC_API_KEY not set; LLM stages are disabled");
            return Ok(pipeline);
        }
        let client = AnthropicClient::from_app_config(config)?;
        Ok(pipeline.with_completion(Arc::new(client)))
    }

    #[must_use]
    pub fn with_completion(mut self, completion: Arc<dyn CompletionService>) -> Self {
        self.completion = Some(completion);
        self
    }

    #[must_use]
    pub fn store(&self) -> &dyn PipelineStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    #[must_use]
    pub fn has_completion(&self) -> bool {
        self.completion.is_some()
    }

    fn completion(&self) -> Result<&dyn CompletionService, PipelineError> {
        self.completion
            .as_deref()
            .ok_or(PipelineError::Completion(LlmError::MissingApiKey))
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("connectors", &self.connectors)
            .field("has_completion", &self.completion.is_some())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Saturating conversions for ledger columns.
pub(crate) fn to_i32(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

pub(crate) fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
