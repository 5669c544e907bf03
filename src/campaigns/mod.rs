//! Bulk DM Campaigns
//!
//! A campaign sends one template to every recipient of an uploaded list,
//! substituting `{column}` placeholders from each recipient's row. Campaigns
//! run in the background through the (paced) gateway; their status lives in
//! memory for the lifetime of the process.

mod runner;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use runner::CampaignManager;

/// Lifecycle of a campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignState {
    Running,
    Completed,
    Failed,
}

/// A failed send, or a campaign-level failure when `username` is absent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub error: String,
}

/// Progress of one campaign
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignStatus {
    pub campaign_id: String,
    /// Account the messages are sent from
    pub account: String,
    pub template_id: String,
    pub total_messages: usize,
    pub sent_messages: usize,
    pub failed_messages: usize,
    pub status: CampaignState,
    pub errors: Vec<CampaignFailure>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl CampaignStatus {
    fn started(
        campaign_id: String,
        account: &str,
        template_id: &str,
        total_messages: usize,
    ) -> Self {
        Self {
            campaign_id,
            account: account.to_string(),
            template_id: template_id.to_string(),
            total_messages,
            sent_messages: 0,
            failed_messages: 0,
            status: CampaignState::Running,
            errors: Vec::new(),
            start_time: Utc::now(),
            end_time: None,
        }
    }

    fn record_sent(&mut self) {
        self.sent_messages += 1;
    }

    fn record_failed(&mut self, username: &str, error: String) {
        self.failed_messages += 1;
        self.errors.push(CampaignFailure {
            username: Some(username.to_string()),
            error,
        });
    }

    fn finish(&mut self) {
        self.status = CampaignState::Completed;
        self.end_time = Some(Utc::now());
    }

    fn fail(&mut self, error: String) {
        self.status = CampaignState::Failed;
        self.end_time = Some(Utc::now());
        self.errors.push(CampaignFailure {
            username: None,
            error,
        });
    }
}

/// Reasons a campaign cannot be launched
#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("No accounts available to send from")]
    NoAccounts,

    #[error("Campaign has no recipients")]
    NoRecipients,

    #[error(transparent)]
    Accounts(#[from] crate::accounts::AccountError),
}
