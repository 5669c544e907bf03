//! AI Provider Implementations
//!
//! HTTP plumbing shared by the chat-completions provider.

pub mod chat;

use crate::ai::{AiError, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;

/// Build headers for API requests
pub fn build_headers(api_key: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    let auth_value = format!("Bearer {}", api_key);
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&auth_value)
            .map_err(|e| AiError::InvalidRequest(format!("Invalid API key: {}", e)))?,
    );

    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Ok(headers)
}

/// Build a reqwest client with timeout settings
pub fn build_client(timeout_seconds: u64, headers: HeaderMap) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(timeout_seconds))
        .default_headers(headers)
        .build()
        .map_err(AiError::NetworkError)
}

/// Map a non-success response to an error
pub async fn handle_api_error(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    Err(map_status(status.as_u16(), retry_after, body))
}

fn map_status(status: u16, retry_after: Option<u64>, body: String) -> AiError {
    match status {
        401 | 403 => AiError::AuthenticationError(body),
        429 => AiError::RateLimitExceeded {
            retry_after: retry_after.unwrap_or(60),
        },
        400 | 422 => AiError::InvalidRequest(body),
        _ => AiError::ApiError(format!("{}: {}", status, body)),
    }
}
