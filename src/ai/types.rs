//! Response Generator Types
//!
//! Structured results parsed out of model completions. Completions are only
//! ever parsed as JSON data; anything that does not fit the expected shape
//! is kept as plain text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Intent fields the analysis prompt asks the model for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentSummary {
    /// Primary intent (question, complaint, inquiry, ...)
    #[serde(alias = "primary_intent")]
    pub intent: String,
    /// Sentiment (positive, negative, neutral)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    /// Key topics mentioned
    #[serde(default, alias = "key_topics")]
    pub topics: Vec<String>,
    /// Priority level (high, medium, low)
    #[serde(
        default,
        alias = "priority_level",
        skip_serializing_if = "Option::is_none"
    )]
    pub priority: Option<String>,
}

/// Result of an intent analysis request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum IntentAnalysis {
    /// Completion matched the expected JSON shape
    Structured(IntentSummary),
    /// Completion text that could not be parsed
    Unstructured(String),
}

impl IntentAnalysis {
    /// Parse a completion; `None` when it is blank
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match serde_json::from_str::<IntentSummary>(strip_code_fence(trimmed)) {
            Ok(summary) => Some(IntentAnalysis::Structured(summary)),
            Err(e) => {
                tracing::debug!(error = %e, "intent analysis is not structured JSON; keeping raw text");
                Some(IntentAnalysis::Unstructured(trimmed.to_string()))
            }
        }
    }
}

impl fmt::Display for IntentAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentAnalysis::Structured(s) => {
                write!(f, "intent: {}", s.intent)?;
                if let Some(sentiment) = &s.sentiment {
                    write!(f, "; sentiment: {}", sentiment)?;
                }
                if !s.topics.is_empty() {
                    write!(f, "; topics: {}", s.topics.join(", "))?;
                }
                if let Some(priority) = &s.priority {
                    write!(f, "; priority: {}", priority)?;
                }
                Ok(())
            }
            IntentAnalysis::Unstructured(text) => f.write_str(text),
        }
    }
}

/// Extra material for a generated reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationContext {
    /// Intent analysis of the inbound message
    pub intent: Option<IntentAnalysis>,
    /// Guidance text taken from an `AI:` template
    pub template_guide: Option<String>,
}

impl GenerationContext {
    /// Render the user prompt for `message_text`
    pub fn build_prompt(&self, message_text: &str) -> String {
        let mut prompt = format!("Message: {}\n\n", message_text);
        if let Some(intent) = &self.intent {
            prompt.push_str(&format!("Intent analysis: {}\n", intent));
        }
        if let Some(guide) = self.template_guide.as_deref().map(str::trim) {
            if !guide.is_empty() {
                prompt.push_str(&format!("Reply guidance: {}\n", guide));
            }
        }
        prompt.push_str("\nGenerate a professional and engaging response:");
        prompt
    }
}

/// Three tone variations of a suggested template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedTemplates {
    pub casual: String,
    pub professional: String,
    pub friendly: String,
}

/// Result of a template suggestion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateSuggestions {
    Variations(SuggestedTemplates),
    Unstructured(String),
}

impl TemplateSuggestions {
    /// Parse a completion, keeping the raw text when it is not the expected JSON
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match serde_json::from_str::<SuggestedTemplates>(strip_code_fence(trimmed)) {
            Ok(variations) => TemplateSuggestions::Variations(variations),
            Err(_) => TemplateSuggestions::Unstructured(trimmed.to_string()),
        }
    }
}

/// Strip a surrounding Markdown code fence (```json ... ```), if any
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line.
    match body.find('\n') {
        Some(idx) => body[idx + 1..].trim(),
        None => body.trim(),
    }
}

// OpenAI-compatible chat completion response (only the fields we read)

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletion {
    /// Trimmed text of the first choice; `None` when missing or blank
    pub fn first_text(&self) -> Option<String> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }
}
