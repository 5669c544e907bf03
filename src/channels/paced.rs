//! Send pacing.
//!
//! Wraps a gateway and holds each account for a fixed delay after every
//! delivered message, thread replies and new direct messages alike. The
//! pause is an async sleep guarded per account, so one account's pacing
//! never delays sends from another account or blocks the runtime.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::gateway::{ChannelResult, DeliveryResult, InboundMessage, MessagingGateway};

/// Default pause after each delivered reply.
pub const DEFAULT_SEND_DELAY: Duration = Duration::from_secs(30);

/// Gateway decorator applying a fixed post-send delay per account.
pub struct PacedGateway<G> {
    inner: G,
    delay: Duration,
    /// One send lane per account (account_id -> lane)
    lanes: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<G: MessagingGateway> PacedGateway<G> {
    /// Wrap `inner` with the given post-send delay
    pub fn new(inner: G, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            lanes: Mutex::new(HashMap::new()),
        }
    }

    /// Configured delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn lane(&self, account_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut lanes = self.lanes.lock();
        lanes
            .entry(account_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

impl<G: MessagingGateway> PacedGateway<G> {
    /// Run one send on the account's lane, then hold the lane for the delay
    /// if the platform accepted the message.
    async fn paced<F>(&self, account_id: &str, send: F) -> ChannelResult<DeliveryResult>
    where
        F: std::future::Future<Output = ChannelResult<DeliveryResult>> + Send,
    {
        let lane = self.lane(account_id);
        let _guard = lane.lock().await;

        let result = send.await;
        if matches!(result, Ok(ref delivery) if delivery.ok) && !self.delay.is_zero() {
            tracing::debug!(
                account = %account_id,
                delay_secs = self.delay.as_secs(),
                "pacing after send"
            );
            tokio::time::sleep(self.delay).await;
        }
        result
    }
}

#[async_trait]
impl<G: MessagingGateway> MessagingGateway for PacedGateway<G> {
    async fn poll_unseen(&self, account_id: &str) -> ChannelResult<Vec<InboundMessage>> {
        self.inner.poll_unseen(account_id).await
    }

    async fn send_reply(
        &self,
        account_id: &str,
        thread_id: &str,
        text: &str,
    ) -> ChannelResult<DeliveryResult> {
        self.paced(account_id, self.inner.send_reply(account_id, thread_id, text))
            .await
    }

    async fn send_dm(
        &self,
        account_id: &str,
        recipient: &str,
        text: &str,
    ) -> ChannelResult<DeliveryResult> {
        self.paced(account_id, self.inner.send_dm(account_id, recipient, text))
            .await
    }

    async fn login(&self, account_id: &str, password: &str) -> ChannelResult<()> {
        self.inner.login(account_id, password).await
    }

    async fn logout(&self, account_id: &str) -> ChannelResult<()> {
        self.inner.logout(account_id).await
    }
}
