use thiserror::Error;
use vantage_db::DbError;
use vantage_llm::{ExtractError, LlmError};
use vantage_sources::SourceError;

/// Model output that does not satisfy the expected shape.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("response contains no JSON value or single fenced block")]
    NoJson,

    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("schema violation: {0}")]
    Schema(String),

    #[error("completion returned empty content")]
    Empty,
}

impl From<ExtractError> for ParseError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::NoJson => ParseError::NoJson,
            ExtractError::Invalid(e) => ParseError::Json(e),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no persona available: pass one explicitly or configure a default")]
    NoPersona,

    #[error("No enriched articles available for briefing")]
    NoEnrichedArticles,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("completion failed: {0}")]
    Completion(#[from] LlmError),

    #[error("could not parse completion: {0}")]
    Parse(#[from] ParseError),

    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("connector setup failed: {0}")]
    Sources(#[from] SourceError),
}
