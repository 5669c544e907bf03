//! Message Templates
//!
//! Reusable message bodies with `{variable}` placeholders. Auto-replies send
//! template content as-is (or hand it to the response generator when it
//! carries the `AI:` marker); placeholder substitution is only used for bulk
//! sends and previews.

pub mod store;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::storage::timestamp;

pub use store::{JsonTemplateStore, MemoryTemplateStore};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex"));

/// Errors raised by template stores
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Template already exists: {0}")]
    DuplicateId(String),

    #[error("Invalid template: {0}")]
    Invalid(String),
}

/// Stored message template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Template identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Body text, optionally starting with the `AI:` marker
    pub content: String,
    /// Placeholder names found in `content`
    #[serde(default)]
    pub variables: Vec<String>,
    /// Creation time
    #[serde(default = "Utc::now", deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    /// Last modification time
    #[serde(default = "Utc::now", deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for creating or replacing a template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDraft {
    /// Explicit id; generated when absent on insert, ignored on update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Human-readable name
    pub name: String,
    /// Body text
    pub content: String,
}

impl TemplateDraft {
    /// Create a draft without an explicit id
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            content: content.into(),
        }
    }

    /// Request a specific id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Check the draft can be stored
    pub fn validate(&self) -> Result<(), TemplateError> {
        if self.name.trim().is_empty() {
            return Err(TemplateError::Invalid("name must not be empty".to_string()));
        }
        if self.content.trim().is_empty() {
            return Err(TemplateError::Invalid("content must not be empty".to_string()));
        }
        if let Some(id) = &self.id {
            if id.trim().is_empty() {
                return Err(TemplateError::Invalid("id must not be blank".to_string()));
            }
        }
        Ok(())
    }
}

/// Template lookup and management.
///
/// Implementations are synchronous; they are expected to be small local
/// stores (a JSON file or memory).
pub trait TemplateStore: Send + Sync {
    /// Find a template by id
    fn lookup(&self, id: &str) -> Result<Option<Template>, TemplateError>;

    /// All templates in insertion order
    fn list(&self) -> Result<Vec<Template>, TemplateError>;

    /// Store a new template and return it with id and variables filled in
    fn insert(&self, draft: TemplateDraft) -> Result<Template, TemplateError>;

    /// Replace name and content of an existing template; `None` if absent
    fn update(&self, id: &str, draft: TemplateDraft) -> Result<Option<Template>, TemplateError>;

    /// Remove a template; false if it did not exist
    fn delete(&self, id: &str) -> Result<bool, TemplateError>;
}

/// Unique `{name}` placeholders of `content`, in first-seen order
pub fn extract_variables(content: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in PLACEHOLDER.captures_iter(content) {
        let name = &caps[1];
        if !seen.iter().any(|v: &String| v == name) {
            seen.push(name.to_string());
        }
    }
    seen
}

/// Substitute `{key}` placeholders with `values`.
///
/// Keys are lowercased before matching, so `Name` in the data fills `{name}`.
/// Placeholders without a value are left untouched.
pub fn render(content: &str, values: &HashMap<String, String>) -> String {
    let lowered: HashMap<String, &str> = values
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.as_str()))
        .collect();

    PLACEHOLDER
        .replace_all(content, |caps: &regex::Captures<'_>| {
            match lowered.get(&caps[1]) {
                Some(value) => (*value).to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_variables_unique_in_order() {
        let vars = extract_variables("Hi {name}! Your code is {code}. Bye {name}");
        assert_eq!(vars, vec!["name", "code"]);
    }

    #[test]
    fn test_extract_variables_adjacent_punctuation() {
        assert_eq!(extract_variables("Hey {username}, welcome!"), vec!["username"]);
        assert!(extract_variables("no placeholders { here }").is_empty());
    }

    #[test]
    fn test_render_substitutes_known_keys() {
        let mut values = HashMap::new();
        values.insert("Name".to_string(), "John".to_string());
        values.insert("username".to_string(), "jdoe".to_string());

        assert_eq!(render("Hi {name} (@{username})!", &values), "Hi John (@jdoe)!");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let values = HashMap::new();
        assert_eq!(render("Hi {name}!", &values), "Hi {name}!");
    }

    #[test]
    fn test_draft_validation() {
        assert!(TemplateDraft::new("Welcome", "Hello").validate().is_ok());
        assert!(TemplateDraft::new("", "Hello").validate().is_err());
        assert!(TemplateDraft::new("Welcome", "  ").validate().is_err());
        assert!(TemplateDraft::new("Welcome", "Hello")
            .with_id(" ")
            .validate()
            .is_err());
    }
}
