//! Shared HTTP plumbing for connectors.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use vantage_core::{AppConfig, SourceDescriptor};

use crate::error::SourceError;

pub const DEFAULT_USER_AGENT: &str = "Vantage Intelligence Dashboard/1.0";

/// Client settings shared by every connector.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// SEC asks automated clients to identify a contact.
    pub sec_user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            sec_user_agent: "Vantage Intelligence ops@vantage.local".to_string(),
        }
    }
}

impl HttpSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.http_timeout_secs,
            user_agent: config.http_user_agent.clone(),
            sec_user_agent: config.sec_user_agent.clone(),
        }
    }
}

/// Build the connector HTTP client.
///
/// # Errors
///
/// Returns [`SourceError::Http`] if the `reqwest::Client` cannot be constructed.
pub fn build_client(settings: &HttpSettings) -> Result<Client, SourceError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(settings.user_agent.clone())
        .build()?;
    Ok(client)
}

/// Parse the source's catalog URL.
pub(crate) fn source_url(source: &SourceDescriptor) -> Result<Url, SourceError> {
    Url::parse(&source.url).map_err(|e| {
        SourceError::InvalidConfig(format!("source '{}' has invalid url '{}': {e}", source.name, source.url))
    })
}

/// Append `path` to `base`, keeping every existing path segment.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, SourceError> {
    // Normalise to exactly one trailing slash so `join` appends rather than
    // replacing the last segment.
    let normalised = format!("{}/", base.as_str().trim_end_matches('/'));
    Url::parse(&normalised)
        .and_then(|b| b.join(path.trim_start_matches('/')))
        .map_err(|e| SourceError::InvalidConfig(format!("cannot build endpoint '{path}' from '{base}': {e}")))
}

/// Send a request and decode a JSON body, surfacing non-2xx as [`SourceError::Status`].
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    context: &str,
) -> Result<T, SourceError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            context: context.to_string(),
            status,
        });
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| SourceError::Deserialize {
        context: context.to_string(),
        source: e,
    })
}

/// Send a request and return the raw body, surfacing non-2xx as [`SourceError::Status`].
pub(crate) async fn send_bytes(
    request: reqwest::RequestBuilder,
    context: &str,
) -> Result<Vec<u8>, SourceError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            context: context.to_string(),
            status,
        });
    }
    Ok(response.bytes().await?.to_vec())
}

/// Lowercase, hyphen-joined form of a keyword, e.g. `"data breach"` → `"data-breach"`.
pub(crate) fn slug(keyword: &str) -> String {
    keyword
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
