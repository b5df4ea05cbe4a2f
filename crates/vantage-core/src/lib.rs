//! Shared configuration and domain vocabulary for Vantage.

pub mod app_config;
pub mod articles;
pub mod config;
pub mod persona;
pub mod pipeline;
pub mod sources;
pub mod taxonomy;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, ModelConfig};
pub use articles::RawArticle;
pub use config::{load_app_config, load_app_config_from_env};
pub use persona::{load_persona, BriefingFormat, DepthLevel, InterestArea, PersonaConfig, PersonaSeed};
pub use pipeline::{DailyLimit, PipelineKind, RunStatus, TriggerKind};
pub use sources::{load_sources, CompanyConfig, SourceCategory, SourceConfig, SourceDescriptor, SourcesFile};
pub use taxonomy::{
    AnalysisKind, Entity, EntityType, ImpactLevel, RelationshipType, Sentiment, SourceType,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read {path}: {source}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    FileParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

impl CoreError {
    pub(crate) fn unknown(kind: &'static str, value: &str) -> Self {
        Self::UnknownVariant {
            kind,
            value: value.to_string(),
        }
    }
}
