use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{context} returned HTTP {status}")]
    Status {
        context: String,
        status: reqwest::StatusCode,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("feed parse error for {context}: {message}")]
    Feed { context: String, message: String },

    /// The source row cannot be fetched as configured (bad URL, wrong type).
    #[error("invalid source configuration: {0}")]
    InvalidConfig(String),
}
