//! Account management handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use super::error::{ApiError, ApiResponse};
use super::AppState;
use crate::accounts::{self, AccountSummary, NewAccount, SessionEvent};
use crate::autoreply::AccountReplyConfig;
use crate::imports;

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn not_found() -> ApiError {
    ApiError::NotFound("Account not found".to_string())
}

#[derive(Debug, Serialize)]
pub(super) struct AccountList {
    accounts: Vec<AccountSummary>,
    total: usize,
}

pub(super) async fn list_accounts(State(state): State<AppState>) -> ApiResult<AccountList> {
    let accounts: Vec<_> = state.accounts.list()?.iter().map(|a| a.summary()).collect();
    let total = accounts.len();
    Ok(ApiResponse::ok("Accounts", AccountList { accounts, total }))
}

pub(super) async fn add_account(
    State(state): State<AppState>,
    Json(new): Json<NewAccount>,
) -> Result<(StatusCode, Json<ApiResponse<AccountSummary>>), ApiError> {
    let account = accounts::register(&*state.gateway, &*state.accounts, new).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(
            format!("Successfully added account {}", account.username),
            account.summary(),
        ),
    ))
}

/// Body is the CSV text; accounts are logged in and stored in the background.
pub(super) async fn bulk_add_accounts(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<Value> {
    let parsed = imports::parse_accounts(&body);
    if parsed.rows.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "No valid accounts found in CSV. Errors: {}",
            parsed.errors.join("; ")
        )));
    }

    let rows = parsed.rows;
    let total = rows.len();
    let gateway = state.gateway.clone();
    let store = state.accounts.clone();
    tokio::spawn(async move {
        accounts::register_all(&*gateway, &*store, rows).await;
    });

    Ok(ApiResponse::ok(
        format!("Processing {total} accounts in background"),
        json!({ "total_accounts": total, "errors": parsed.errors }),
    ))
}

pub(super) async fn get_account(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<AccountSummary> {
    match state.accounts.get(&username)? {
        Some(account) => Ok(ApiResponse::ok("Account", account.summary())),
        None => Err(not_found()),
    }
}

/// Closes the session, turns auto-reply off and forgets the account.
pub(super) async fn delete_account(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<()> {
    if state.accounts.get(&username)?.is_none() {
        return Err(not_found());
    }

    if let Err(e) = state.gateway.logout(&username).await {
        tracing::warn!(account = %username, error = %e, "logout before delete failed");
    }
    state
        .scheduler
        .update_config(&username, AccountReplyConfig::disabled(&username));

    if state.accounts.delete(&username)? {
        tracing::info!(account = %username, "account deleted");
        Ok(ApiResponse::done(format!("Successfully deleted account {username}")))
    } else {
        Err(not_found())
    }
}

pub(super) async fn login_account(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<AccountSummary> {
    let Some(account) = state.accounts.get(&username)? else {
        return Err(not_found());
    };

    let event = match state.gateway.login(&username, &account.password).await {
        Ok(()) => SessionEvent::LoggedIn(Utc::now()),
        Err(e) => SessionEvent::LoginFailed(e.to_string()),
    };
    let updated = state.accounts.record(&username, event.clone())?.ok_or_else(not_found)?;

    match event {
        SessionEvent::LoginFailed(error) => {
            Err(ApiError::BadRequest(format!("Login failed: {error}")))
        }
        _ => Ok(ApiResponse::ok(
            format!("Successfully logged in as {username}"),
            updated.summary(),
        )),
    }
}

pub(super) async fn logout_account(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<()> {
    if state.accounts.get(&username)?.is_none() {
        return Err(not_found());
    }

    state
        .gateway
        .logout(&username)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;
    state.accounts.record(&username, SessionEvent::LoggedOut)?;
    Ok(ApiResponse::done(format!("Successfully logged out {username}")))
}
