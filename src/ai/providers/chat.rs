//! Chat-completions provider.
//!
//! Non-streaming client for OpenAI-compatible `/chat/completions` endpoints
//! (Groq by default).

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::ai::types::ChatCompletion;
use crate::ai::{
    AiError, GenerationContext, IntentAnalysis, ProviderConfig, ResponseGenerator, Result,
    TemplateSuggestions,
};

const REPLY_SYSTEM_PROMPT: &str = "You are a helpful Instagram DM assistant.";
const ANALYSIS_SYSTEM_PROMPT: &str = "You are a message analysis assistant.";
const COPYWRITER_SYSTEM_PROMPT: &str = "You are a professional copywriting assistant.";

/// OpenAI-compatible chat-completions generator
#[derive(Debug, Clone)]
pub struct ChatCompletionsGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl ChatCompletionsGenerator {
    /// Create a generator from provider settings
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AiError::AuthenticationError("API key required".to_string()))?;

        let parsed = url::Url::parse(&config.base_url).map_err(|e| {
            AiError::InvalidRequest(format!("invalid base URL \"{}\": {e}", config.base_url))
        })?;
        if parsed.scheme() != "https" && parsed.scheme() != "http" {
            return Err(AiError::InvalidRequest(format!(
                "base URL must use http or https scheme, got \"{}\"",
                parsed.scheme()
            )));
        }

        let headers = super::build_headers(api_key)?;
        let client = super::build_client(config.timeout_seconds, headers)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model,
        })
    }

    /// Model used for completions
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the JSON body for a single-turn completion
    pub(crate) fn build_body(&self, system: &str, user: &str, max_tokens: u32, temperature: f32) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "max_tokens": max_tokens,
            "temperature": temperature,
        })
    }

    /// Run one completion and return the trimmed text of the first choice
    async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<Option<String>> {
        let body = self.build_body(system, user, max_tokens, temperature);
        let url = format!("{}/chat/completions", self.base_url);

        let response = self.client.post(&url).json(&body).send().await?;
        let response = super::handle_api_error(response).await?;
        let completion: ChatCompletion = response.json().await?;
        Ok(completion.first_text())
    }
}

fn intent_prompt(text: &str) -> String {
    format!(
        "Analyze the following message and determine:\n\
         1. Primary intent (question, complaint, inquiry, etc.)\n\
         2. Sentiment (positive, negative, neutral)\n\
         3. Key topics mentioned\n\
         4. Priority level (high, medium, low)\n\n\
         Message: {text}\n\n\
         Respond with only a JSON object with the keys \"intent\" (string), \
         \"sentiment\" (string), \"topics\" (array of strings) and \"priority\" (string)."
    )
}

fn suggestions_prompt(business_type: &str, purpose: &str) -> String {
    format!(
        "Generate 3 professional Instagram DM templates for a {business_type} business.\n\
         Purpose: {purpose}\n\n\
         Include variables like {{name}}, {{username}}, etc. where appropriate.\n\
         Respond with only a JSON object with the keys \"casual\", \"professional\" and \"friendly\"."
    )
}

#[async_trait]
impl ResponseGenerator for ChatCompletionsGenerator {
    async fn analyze_intent(&self, text: &str) -> Result<Option<IntentAnalysis>> {
        let raw = self
            .complete(ANALYSIS_SYSTEM_PROMPT, &intent_prompt(text), 200, 0.3)
            .await?;
        Ok(raw.as_deref().and_then(IntentAnalysis::parse))
    }

    async fn generate(&self, text: &str, context: &GenerationContext) -> Result<Option<String>> {
        self.complete(REPLY_SYSTEM_PROMPT, &context.build_prompt(text), 150, 0.7)
            .await
    }

    async fn suggest_templates(
        &self,
        business_type: &str,
        purpose: &str,
    ) -> Result<TemplateSuggestions> {
        let raw = self
            .complete(
                COPYWRITER_SYSTEM_PROMPT,
                &suggestions_prompt(business_type, purpose),
                500,
                0.7,
            )
            .await?
            .ok_or_else(|| AiError::ProviderError("empty suggestion completion".to_string()))?;
        Ok(TemplateSuggestions::parse(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> ChatCompletionsGenerator {
        ChatCompletionsGenerator::new(ProviderConfig::default().with_api_key("gsk-test")).unwrap()
    }

    #[test]
    fn test_new_requires_api_key() {
        assert!(matches!(
            ChatCompletionsGenerator::new(ProviderConfig::default()),
            Err(AiError::AuthenticationError(_))
        ));
        assert!(ChatCompletionsGenerator::new(ProviderConfig::default().with_api_key("  ")).is_err());
    }

    #[test]
    fn test_new_rejects_bad_base_url() {
        let config = ProviderConfig::default()
            .with_api_key("k")
            .with_base_url("ftp://example.com");
        assert!(ChatCompletionsGenerator::new(config).is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let config = ProviderConfig::default()
            .with_api_key("k")
            .with_base_url("http://localhost:11434/v1/");
        let generator = ChatCompletionsGenerator::new(config).unwrap();
        assert_eq!(generator.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn test_build_body() {
        let body = generator().build_body("sys", "hello", 150, 0.7);
        assert_eq!(body["model"], crate::ai::DEFAULT_MODEL);
        assert_eq!(body["max_tokens"], 150);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "sys");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "hello");
    }

    #[test]
    fn test_intent_prompt_requests_json_keys() {
        let prompt = intent_prompt("Where is my order?");
        assert!(prompt.contains("Message: Where is my order?"));
        assert!(prompt.contains("\"intent\""));
        assert!(prompt.contains("\"priority\""));
    }

    #[test]
    fn test_suggestions_prompt_keeps_literal_braces() {
        let prompt = suggestions_prompt("ecommerce", "welcome");
        assert!(prompt.contains("{name}"));
        assert!(prompt.contains("ecommerce business"));
    }
}
