//! Response Generator
//!
//! Language-model access used to compose auto-replies for `AI:` templates
//! and to suggest new templates. The auto-reply loop only depends on the
//! [`ResponseGenerator`] trait.

pub mod providers;
pub mod types;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use providers::chat::ChatCompletionsGenerator;
pub use types::*;

/// Errors that can occur when talking to a model provider
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Rate limit exceeded. Retry after: {retry_after}s")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Not supported: {0}")]
    Unsupported(String),
}

/// Result type for AI operations
pub type Result<T> = std::result::Result<T, AiError>;

/// Composes reply text from inbound messages.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Classify the intent of `text`; `Ok(None)` when the model returns nothing
    async fn analyze_intent(&self, text: &str) -> Result<Option<IntentAnalysis>>;

    /// Generate a reply to `text`; `Ok(None)` when the model returns nothing
    async fn generate(&self, text: &str, context: &GenerationContext) -> Result<Option<String>>;

    /// Suggest casual/professional/friendly templates for a business
    async fn suggest_templates(
        &self,
        _business_type: &str,
        _purpose: &str,
    ) -> Result<TemplateSuggestions> {
        Err(AiError::Unsupported("template suggestions".to_string()))
    }
}

/// Type-erased generator for storage
pub type DynGenerator = Arc<dyn ResponseGenerator>;

/// Default OpenAI-compatible endpoint (Groq)
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default completion model
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Configuration for the chat-completions provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL for API requests
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout", alias = "timeoutSecs")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl ProviderConfig {
    /// Set the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Whether a usable API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}
