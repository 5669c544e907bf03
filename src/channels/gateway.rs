//! Messaging Gateway
//!
//! Defines the interface used to read, answer and send direct messages on
//! behalf of a platform account, and to open or close its session.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result type for gateway operations
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors that can occur in gateway operations
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Message send failed: {0}")]
    SendFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Account not connected: {0}")]
    NotConnected(String),

    #[error("Rate limited: retry after {0}s")]
    RateLimited(u64),

    #[error("Channel error: {0}")]
    Other(String),
}

/// Unseen direct message pulled from an account's inbox.
///
/// Carries no identity of its own; the gateway decides what counts as unseen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    /// Conversation the message arrived in (replies are addressed here)
    pub thread_id: String,
    /// Platform user who sent the message
    pub sender_id: String,
    /// Message body
    #[serde(default)]
    pub text: String,
    /// When the platform received the message
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    /// Create a message stamped with the current time
    pub fn new(
        thread_id: impl Into<String>,
        sender_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            sender_id: sender_id.into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Outcome of a reply send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    /// Whether the platform accepted the message
    pub ok: bool,
    /// Platform message id, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Failure reason when `ok` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryResult {
    /// Successful delivery
    pub fn delivered(message_id: Option<String>) -> Self {
        Self {
            ok: true,
            message_id,
            error: None,
        }
    }

    /// Rejected delivery with a reason
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// Per-account inbox access and message sending.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Fetch messages the account has not seen yet, in platform order
    async fn poll_unseen(&self, account_id: &str) -> ChannelResult<Vec<InboundMessage>>;

    /// Send `text` into `thread_id` as `account_id`
    async fn send_reply(
        &self,
        account_id: &str,
        thread_id: &str,
        text: &str,
    ) -> ChannelResult<DeliveryResult>;

    /// Send `text` to `recipient` (a platform username) as `account_id`,
    /// opening a conversation if none exists
    async fn send_dm(
        &self,
        account_id: &str,
        recipient: &str,
        text: &str,
    ) -> ChannelResult<DeliveryResult>;

    /// Open a session for the account.
    ///
    /// Gateways whose sessions are managed elsewhere accept every login.
    async fn login(&self, _account_id: &str, _password: &str) -> ChannelResult<()> {
        Ok(())
    }

    /// Close the account's session; closing an unknown session is a no-op
    async fn logout(&self, _account_id: &str) -> ChannelResult<()> {
        Ok(())
    }
}

/// Type-erased gateway for storage
pub type DynGateway = Arc<dyn MessagingGateway>;

#[async_trait]
impl<G: MessagingGateway + ?Sized> MessagingGateway for Arc<G> {
    async fn poll_unseen(&self, account_id: &str) -> ChannelResult<Vec<InboundMessage>> {
        (**self).poll_unseen(account_id).await
    }

    async fn send_reply(
        &self,
        account_id: &str,
        thread_id: &str,
        text: &str,
    ) -> ChannelResult<DeliveryResult> {
        (**self).send_reply(account_id, thread_id, text).await
    }

    async fn send_dm(
        &self,
        account_id: &str,
        recipient: &str,
        text: &str,
    ) -> ChannelResult<DeliveryResult> {
        (**self).send_dm(account_id, recipient, text).await
    }

    async fn login(&self, account_id: &str, password: &str) -> ChannelResult<()> {
        (**self).login(account_id, password).await
    }

    async fn logout(&self, account_id: &str) -> ChannelResult<()> {
        (**self).logout(account_id).await
    }
}
