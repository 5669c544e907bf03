//! HTTP bridge gateway.
//!
//! Talks to an external session service that holds the authenticated
//! platform sessions and exposes a small REST surface:
//!
//! - `GET    {base}/accounts/{account}/inbox/unseen` → `[InboundMessage]`
//! - `POST   {base}/accounts/{account}/threads/{thread}/reply` with `{"text": ...}`
//!   → `DeliveryResult`
//! - `POST   {base}/accounts/{account}/messages` with `{"recipient": ..., "text": ...}`
//!   → `DeliveryResult`
//! - `POST   {base}/accounts/{account}/session` with `{"password": ...}` → login
//! - `DELETE {base}/accounts/{account}/session` → logout

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

use super::gateway::{ChannelError, ChannelResult, DeliveryResult, InboundMessage, MessagingGateway};

/// Default request timeout for bridge calls.
pub const DEFAULT_BRIDGE_TIMEOUT_SECS: u64 = 30;

/// Gateway backed by an HTTP session bridge.
#[derive(Debug, Clone)]
pub struct BridgeGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl BridgeGateway {
    /// Create a bridge client for `base_url`.
    ///
    /// Both `http` and `https` are accepted since the bridge usually runs
    /// next to this process.
    pub fn new(base_url: &str, timeout_secs: u64) -> ChannelResult<Self> {
        let parsed = url::Url::parse(base_url).map_err(|e| {
            ChannelError::InvalidConfig(format!("invalid bridge URL \"{base_url}\": {e}"))
        })?;
        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(ChannelError::InvalidConfig(format!(
                "bridge URL must use http or https scheme, got \"{scheme}\""
            )));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ChannelError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    /// Set a bearer token sent with every bridge request.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Returns the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn inbox_url(&self, account_id: &str) -> String {
        format!(
            "{}/accounts/{}/inbox/unseen",
            self.base_url,
            urlencoding::encode(account_id)
        )
    }

    fn reply_url(&self, account_id: &str, thread_id: &str) -> String {
        format!(
            "{}/accounts/{}/threads/{}/reply",
            self.base_url,
            urlencoding::encode(account_id),
            urlencoding::encode(thread_id)
        )
    }

    fn messages_url(&self, account_id: &str) -> String {
        format!(
            "{}/accounts/{}/messages",
            self.base_url,
            urlencoding::encode(account_id)
        )
    }

    fn session_url(&self, account_id: &str) -> String {
        format!(
            "{}/accounts/{}/session",
            self.base_url,
            urlencoding::encode(account_id)
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref key) => request.header("authorization", format!("Bearer {key}")),
            None => request,
        }
    }
}

/// Map a non-success bridge status to a gateway error.
fn status_error(status: StatusCode, account_id: &str, body: String) -> ChannelError {
    match status.as_u16() {
        401 | 403 => ChannelError::AuthenticationFailed(format!("{account_id}: {body}")),
        404 => ChannelError::NotConnected(account_id.to_string()),
        429 => ChannelError::RateLimited(60),
        _ => ChannelError::Other(format!("bridge returned {status}: {body}")),
    }
}

/// Turn a non-success response into a gateway error.
async fn check_status(response: reqwest::Response, account_id: &str) -> ChannelResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable>".to_string());
    Err(status_error(status, account_id, body))
}

/// Read a delivery result; an empty body is a bare acknowledgement.
async fn delivery_from(response: reqwest::Response) -> ChannelResult<DeliveryResult> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ChannelError::SendFailed(format!("failed to read send response: {e}")))?;
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(DeliveryResult::delivered(None));
    }
    serde_json::from_slice(&bytes)
        .map_err(|e| ChannelError::Other(format!("failed to parse send response: {e}")))
}

#[async_trait]
impl MessagingGateway for BridgeGateway {
    async fn poll_unseen(&self, account_id: &str) -> ChannelResult<Vec<InboundMessage>> {
        let request = self.authorize(self.client.get(self.inbox_url(account_id)));
        let response = request
            .send()
            .await
            .map_err(|e| ChannelError::ConnectionFailed(format!("inbox request failed: {e}")))?;

        check_status(response, account_id)
            .await?
            .json::<Vec<InboundMessage>>()
            .await
            .map_err(|e| ChannelError::Other(format!("failed to parse inbox response: {e}")))
    }

    async fn send_reply(
        &self,
        account_id: &str,
        thread_id: &str,
        text: &str,
    ) -> ChannelResult<DeliveryResult> {
        let body = serde_json::json!({ "text": text });
        let request = self.authorize(self.client.post(self.reply_url(account_id, thread_id)));
        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(format!("reply request failed: {e}")))?;

        delivery_from(check_status(response, account_id).await?).await
    }

    async fn send_dm(
        &self,
        account_id: &str,
        recipient: &str,
        text: &str,
    ) -> ChannelResult<DeliveryResult> {
        let body = serde_json::json!({ "recipient": recipient, "text": text });
        let request = self.authorize(self.client.post(self.messages_url(account_id)));
        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(format!("message request failed: {e}")))?;

        delivery_from(check_status(response, account_id).await?).await
    }

    async fn login(&self, account_id: &str, password: &str) -> ChannelResult<()> {
        let body = serde_json::json!({ "password": password });
        let request = self.authorize(self.client.post(self.session_url(account_id)));
        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::ConnectionFailed(format!("login request failed: {e}")))?;

        check_status(response, account_id).await?;
        tracing::info!(account = %account_id, "session opened");
        Ok(())
    }

    async fn logout(&self, account_id: &str) -> ChannelResult<()> {
        let request = self.authorize(self.client.delete(self.session_url(account_id)));
        let response = request
            .send()
            .await
            .map_err(|e| ChannelError::ConnectionFailed(format!("logout request failed: {e}")))?;

        match check_status(response, account_id).await {
            Ok(_) | Err(ChannelError::NotConnected(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
