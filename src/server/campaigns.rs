//! Bulk campaign handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResponse};
use super::AppState;
use crate::campaigns::CampaignStatus;
use crate::imports;

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct LaunchParams {
    #[serde(alias = "template_id")]
    template_id: String,
    /// Sending account; the first active account when absent
    #[serde(default)]
    account: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct CampaignLaunched {
    campaign_id: String,
    account: String,
    total_recipients: usize,
    errors: Vec<String>,
}

/// Body is the recipient CSV (`username`, `name`, any extra columns).
pub(super) async fn launch_campaign(
    State(state): State<AppState>,
    Query(params): Query<LaunchParams>,
    body: String,
) -> Result<(StatusCode, Json<ApiResponse<CampaignLaunched>>), ApiError> {
    let parsed = imports::parse_recipients(&body);
    if parsed.rows.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "No valid recipients found in CSV. Errors: {}",
            parsed.errors.join("; ")
        )));
    }

    let Some(template) = state.templates.lookup(&params.template_id)? else {
        return Err(ApiError::NotFound("Template not found".to_string()));
    };
    let sender = state.campaigns.sender(params.account.as_deref())?;
    let status = state.campaigns.launch(&template, parsed.rows, sender)?;

    Ok((
        StatusCode::ACCEPTED,
        ApiResponse::ok(
            "Bulk DM campaign started",
            CampaignLaunched {
                campaign_id: status.campaign_id,
                account: status.account,
                total_recipients: status.total_messages,
                errors: parsed.errors,
            },
        ),
    ))
}

#[derive(Debug, Serialize)]
pub(super) struct CampaignList {
    campaigns: Vec<CampaignStatus>,
    total: usize,
}

pub(super) async fn list_campaigns(State(state): State<AppState>) -> ApiResult<CampaignList> {
    let campaigns = state.campaigns.list();
    let total = campaigns.len();
    Ok(ApiResponse::ok("Campaigns", CampaignList { campaigns, total }))
}

pub(super) async fn get_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
) -> ApiResult<CampaignStatus> {
    match state.campaigns.get(&campaign_id) {
        Some(status) => Ok(ApiResponse::ok("Campaign", status)),
        None => Err(ApiError::NotFound("Campaign not found".to_string())),
    }
}

pub(super) async fn delete_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
) -> ApiResult<()> {
    if state.campaigns.remove(&campaign_id) {
        Ok(ApiResponse::done(format!("Campaign {campaign_id} deleted successfully")))
    } else {
        Err(ApiError::NotFound("Campaign not found".to_string()))
    }
}
