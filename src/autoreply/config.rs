//! Auto-reply Configuration
//!
//! Per-account auto-reply settings: which template answers and which
//! conditions an inbound message must meet.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Condition kinds understood by the evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    /// Message contains the operand
    Contains,
    /// Message starts with the operand
    StartsWith,
    /// Message ends with the operand
    EndsWith,
}

impl ConditionKind {
    /// All recognized kinds
    pub const ALL: [ConditionKind; 3] = [
        ConditionKind::Contains,
        ConditionKind::StartsWith,
        ConditionKind::EndsWith,
    ];

    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKind::Contains => "contains",
            ConditionKind::StartsWith => "starts_with",
            ConditionKind::EndsWith => "ends_with",
        }
    }

    /// Parse a wire name; `None` for unrecognized kinds
    pub fn parse(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == kind)
    }
}

/// Validation failures for an account config
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplyConfigError {
    #[error("account id must not be empty")]
    EmptyAccountId,

    #[error("unknown condition kind(s): {}", .0.join(", "))]
    UnknownConditionKinds(Vec<String>),

    #[error("an enabled auto-reply needs a template")]
    MissingTemplate,
}

/// Auto-reply settings for one account.
///
/// Updates always replace the whole config; there is no partial mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountReplyConfig {
    /// Account the config belongs to
    #[serde(default)]
    pub account_id: String,
    /// Whether auto-reply is active for the account
    #[serde(default, alias = "is_enabled", alias = "isEnabled")]
    pub enabled: bool,
    /// Template answering matching messages
    #[serde(default, alias = "template_id", alias = "templateId")]
    pub template_ref: Option<String>,
    /// Condition kind -> operand; all must hold
    #[serde(default)]
    pub conditions: BTreeMap<String, String>,
}

impl AccountReplyConfig {
    /// Create an enabled config with no template and no conditions
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            enabled: true,
            template_ref: None,
            conditions: BTreeMap::new(),
        }
    }

    /// Create a config that turns auto-reply off for the account
    pub fn disabled(account_id: impl Into<String>) -> Self {
        Self {
            enabled: false,
            ..Self::new(account_id)
        }
    }

    /// Set the answering template
    pub fn with_template(mut self, template_ref: impl Into<String>) -> Self {
        self.template_ref = Some(template_ref.into());
        self
    }

    /// Add or replace a typed condition
    pub fn with_condition(mut self, kind: ConditionKind, operand: impl Into<String>) -> Self {
        self.conditions.insert(kind.as_str().to_string(), operand.into());
        self
    }

    /// Add or replace a condition by raw kind name
    pub fn with_raw_condition(mut self, kind: impl Into<String>, operand: impl Into<String>) -> Self {
        self.conditions.insert(kind.into(), operand.into());
        self
    }

    /// Condition kinds the evaluator will not recognize
    pub fn unknown_condition_kinds(&self) -> Vec<String> {
        super::conditions::unknown_condition_kinds(&self.conditions)
    }

    /// Validate the configuration.
    ///
    /// Used at the API boundary; the scheduler itself accepts any config.
    pub fn validate(&self) -> Result<(), ReplyConfigError> {
        if self.account_id.trim().is_empty() {
            return Err(ReplyConfigError::EmptyAccountId);
        }

        let unknown = self.unknown_condition_kinds();
        if !unknown.is_empty() {
            return Err(ReplyConfigError::UnknownConditionKinds(unknown));
        }

        if self.enabled && self.template_ref.as_deref().map_or(true, |t| t.trim().is_empty()) {
            return Err(ReplyConfigError::MissingTemplate);
        }

        Ok(())
    }
}
