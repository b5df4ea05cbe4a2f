//! Completion client for the LLM-backed pipeline stages.
//!
//! The pipeline only sees [`CompletionService`]; [`AnthropicClient`] is the
//! production implementation, constructed once at process start and shared.

pub mod client;
pub mod error;
pub mod json;
pub mod retry;

use async_trait::async_trait;

pub use client::AnthropicClient;
pub use error::LlmError;
pub use json::{extract_json, ExtractError};
pub use retry::RetryPolicy;

/// One completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Model output plus the provider's token accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Completion {
    #[must_use]
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Run one completion, retrying transient failures internally.
    ///
    /// # Errors
    ///
    /// Returns the last [`LlmError`] once every attempt has failed.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;
}
