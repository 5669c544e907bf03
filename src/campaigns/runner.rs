//! Campaign registry and background runner.

use chrono::Utc;
use futures_util::FutureExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::{CampaignError, CampaignStatus};
use crate::accounts::{Account, AccountStore, SessionEvent};
use crate::autoreply::scheduler::panic_message;
use crate::channels::DynGateway;
use crate::imports::Recipient;
use crate::templates::{self, Template};

struct Registry {
    gateway: DynGateway,
    accounts: Arc<dyn AccountStore>,
    /// campaign_id -> status
    campaigns: RwLock<HashMap<String, CampaignStatus>>,
}

/// Launches campaigns and tracks their status.
///
/// Cloning is cheap; all clones share the same registry.
#[derive(Clone)]
pub struct CampaignManager {
    registry: Arc<Registry>,
}

impl std::fmt::Debug for CampaignManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CampaignManager")
            .field("campaigns", &self.registry.campaigns.read().len())
            .finish()
    }
}

impl CampaignManager {
    pub fn new(gateway: DynGateway, accounts: Arc<dyn AccountStore>) -> Self {
        Self {
            registry: Arc::new(Registry {
                gateway,
                accounts,
                campaigns: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Pick the sending account: the requested one, or the first active
    /// stored account.
    pub fn sender(&self, requested: Option<&str>) -> Result<Account, CampaignError> {
        match requested.map(str::trim).filter(|s| !s.is_empty()) {
            Some(username) => self
                .registry
                .accounts
                .get(username)?
                .ok_or_else(|| CampaignError::AccountNotFound(username.to_string())),
            None => self
                .registry
                .accounts
                .list()?
                .into_iter()
                .find(|a| a.is_active)
                .ok_or(CampaignError::NoAccounts),
        }
    }

    /// Register a campaign and start sending in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn launch(
        &self,
        template: &Template,
        recipients: Vec<Recipient>,
        sender: Account,
    ) -> Result<CampaignStatus, CampaignError> {
        if recipients.is_empty() {
            return Err(CampaignError::NoRecipients);
        }

        let campaign_id = uuid::Uuid::new_v4().to_string();
        let status = CampaignStatus::started(
            campaign_id.clone(),
            &sender.username,
            &template.id,
            recipients.len(),
        );
        self.registry
            .campaigns
            .write()
            .insert(campaign_id.clone(), status.clone());

        tracing::info!(
            campaign = %campaign_id,
            account = %sender.username,
            template = %template.id,
            recipients = recipients.len(),
            "campaign started"
        );

        let manager = self.clone();
        let content = template.content.clone();
        tokio::spawn(async move {
            manager.run(campaign_id, sender, content, recipients).await;
        });
        Ok(status)
    }

    /// All campaigns, oldest first
    pub fn list(&self) -> Vec<CampaignStatus> {
        let mut campaigns: Vec<_> = self.registry.campaigns.read().values().cloned().collect();
        campaigns.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.campaign_id.cmp(&b.campaign_id))
        });
        campaigns
    }

    pub fn get(&self, campaign_id: &str) -> Option<CampaignStatus> {
        self.registry.campaigns.read().get(campaign_id).cloned()
    }

    /// Forget a campaign. A running campaign stops before its next send.
    pub fn remove(&self, campaign_id: &str) -> bool {
        let removed = self.registry.campaigns.write().remove(campaign_id).is_some();
        if removed {
            tracing::info!(campaign = %campaign_id, "campaign deleted");
        }
        removed
    }

    /// Apply `f` to a campaign; false once the campaign has been deleted
    fn update(&self, campaign_id: &str, f: impl FnOnce(&mut CampaignStatus)) -> bool {
        match self.registry.campaigns.write().get_mut(campaign_id) {
            Some(status) => {
                f(status);
                true
            }
            None => false,
        }
    }

    fn record_session(&self, username: &str, event: SessionEvent) {
        if let Err(e) = self.registry.accounts.record(username, event) {
            tracing::warn!(account = %username, error = %e, "failed to record session state");
        }
    }

    async fn run(self, campaign_id: String, sender: Account, content: String, recipients: Vec<Recipient>) {
        let outcome = AssertUnwindSafe(self.send_all(&campaign_id, &sender, &content, &recipients))
            .catch_unwind()
            .await;

        if let Err(panic) = outcome {
            let message = panic_message(panic.as_ref());
            tracing::error!(campaign = %campaign_id, panic = %message, "campaign panicked");
            self.update(&campaign_id, |s| s.fail(format!("campaign aborted: {message}")));
        }
    }

    async fn send_all(&self, campaign_id: &str, sender: &Account, content: &str, recipients: &[Recipient]) {
        let gateway = &self.registry.gateway;
        let account = sender.username.as_str();

        if let Err(e) = gateway.login(account, &sender.password).await {
            tracing::error!(campaign = %campaign_id, account = %account, error = %e, "campaign login failed");
            self.record_session(account, SessionEvent::LoginFailed(e.to_string()));
            self.update(campaign_id, |s| s.fail(format!("Failed to login as {account}: {e}")));
            return;
        }
        self.record_session(account, SessionEvent::LoggedIn(Utc::now()));

        for recipient in recipients {
            if self.get(campaign_id).is_none() {
                tracing::info!(campaign = %campaign_id, "campaign deleted; stopping sends");
                return;
            }

            let message = templates::render(content, &recipient.fields);
            let result = gateway.send_dm(account, &recipient.username, &message).await;
            let recorded = match result {
                Ok(delivery) if delivery.ok => {
                    tracing::debug!(campaign = %campaign_id, recipient = %recipient.username, "message sent");
                    self.update(campaign_id, CampaignStatus::record_sent)
                }
                Ok(delivery) => {
                    let error = delivery.error.unwrap_or_else(|| "message rejected".to_string());
                    tracing::warn!(campaign = %campaign_id, recipient = %recipient.username, error = %error, "message rejected");
                    self.update(campaign_id, |s| s.record_failed(&recipient.username, error))
                }
                Err(e) => {
                    tracing::warn!(campaign = %campaign_id, recipient = %recipient.username, error = %e, "message send failed");
                    self.update(campaign_id, |s| s.record_failed(&recipient.username, e.to_string()))
                }
            };
            if !recorded {
                return;
            }
        }

        self.update(campaign_id, CampaignStatus::finish);
        if let Some(status) = self.get(campaign_id) {
            tracing::info!(
                campaign = %campaign_id,
                sent = status.sent_messages,
                failed = status.failed_messages,
                "campaign completed"
            );
        }
    }
}
