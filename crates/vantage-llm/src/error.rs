use thiserror::Error;

/// Errors returned by the completion client.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("completion API returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The response parsed as JSON but did not have the expected shape.
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("ANTHROPIC_API_KEY is not configured")]
    MissingApiKey,

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
