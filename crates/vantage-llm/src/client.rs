//! Anthropic Messages API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use vantage_core::AppConfig;

use crate::error::LlmError;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::{Completion, CompletionRequest, CompletionService};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Completion client for the Anthropic Messages API.
///
/// Use [`AnthropicClient::new`] for production or
/// [`AnthropicClient::with_base_url`] to point at a mock server in tests.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    messages_url: Url,
    policy: RetryPolicy,
}

impl AnthropicClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the `reqwest::Client` cannot be constructed.
    pub fn new(api_key: &str, timeout_secs: u64, policy: RetryPolicy) -> Result<Self, LlmError> {
        Self::with_base_url(api_key, timeout_secs, policy, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the `reqwest::Client` cannot be constructed,
    /// or [`LlmError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        policy: RetryPolicy,
        base_url: &str,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        // Normalise to one trailing slash so `join` appends to any base path.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let messages_url = Url::parse(&normalised)
            .and_then(|base| base.join("v1/messages"))
            .map_err(|e| LlmError::InvalidBaseUrl {
                url: base_url.to_owned(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            messages_url,
            policy,
        })
    }

    /// Builds the client from application config.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingApiKey`] when no API key is configured, plus
    /// anything [`AnthropicClient::with_base_url`] returns.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, LlmError> {
        let api_key = config
            .anthropic_api_key
            .as_deref()
            .ok_or(LlmError::MissingApiKey)?;
        let policy = RetryPolicy {
            max_attempts: config.llm_max_attempts,
            backoff_base_ms: config.llm_backoff_base_ms,
        };
        Self::with_base_url(
            api_key,
            config.llm_timeout_secs,
            policy,
            &config.anthropic_base_url,
        )
    }

    /// One HTTP round trip, no retry.
    async fn send_once(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let body = MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system.as_deref(),
            messages: [Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .client
            .post(self.messages_url.clone())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status,
                body: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let bytes = response.bytes().await?;
        let parsed: MessagesResponse = serde_json::from_slice(&bytes)
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
        parse_completion(parsed)
    }
}

fn parse_completion(response: MessagesResponse) -> Result<Completion, LlmError> {
    let text = response
        .content
        .into_iter()
        .find_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .ok_or_else(|| LlmError::MalformedResponse("no text content block".to_owned()))?;

    Ok(Completion {
        text,
        input_tokens: response.usage.input_tokens,
        output_tokens: response.usage.output_tokens,
    })
}

#[async_trait]
impl CompletionService for AnthropicClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let completion = retry_with_backoff(self.policy, || self.send_once(request)).await?;
        tracing::debug!(
            model = %request.model,
            input_tokens = completion.input_tokens,
            output_tokens = completion.output_tokens,
            "completion finished"
        );
        Ok(completion)
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("messages_url", &self.messages_url.as_str())
            .field("api_key", &"[redacted]")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
