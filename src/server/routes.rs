//! HTTP handlers for the control surface.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

use super::error::{ApiError, ApiResponse};
use super::AppState;
use crate::autoreply::AccountReplyConfig;
use crate::templates::{self, Template, TemplateDraft};

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub(super) async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": "dmpilot",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "autoReply": state.scheduler.is_running(),
    }))
}

pub(super) async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

// ---------------------------------------------------------------------------
// Auto-reply
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct AutoReplyStatus {
    running: bool,
    configs: Vec<AccountReplyConfig>,
}

pub(super) async fn list_auto_replies(State(state): State<AppState>) -> ApiResult<AutoReplyStatus> {
    let status = AutoReplyStatus {
        running: state.scheduler.is_running(),
        configs: state.scheduler.active_configs(),
    };
    Ok(ApiResponse::ok("Auto-reply configurations", status))
}

pub(super) async fn update_auto_reply(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Json(mut config): Json<AccountReplyConfig>,
) -> ApiResult<AccountReplyConfig> {
    config.account_id = account_id.clone();
    config
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if state.accounts.get(&account_id)?.is_none() {
        return Err(ApiError::NotFound(format!("Account not found: {account_id}")));
    }

    if config.enabled {
        if let Some(template_ref) = config.template_ref.as_deref() {
            if state.templates.lookup(template_ref)?.is_none() {
                return Err(ApiError::NotFound(format!("Template not found: {template_ref}")));
            }
        }
    }

    state.scheduler.update_config(&account_id, config.clone());
    let message = if config.enabled {
        format!("Auto-reply enabled for {account_id}")
    } else {
        format!("Auto-reply disabled for {account_id}")
    };
    Ok(ApiResponse::ok(message, config))
}

pub(super) async fn start_auto_reply(State(state): State<AppState>) -> ApiResult<Value> {
    let spawned = state.scheduler.start();
    Ok(ApiResponse::ok(
        "Auto-reply started",
        json!({ "running": true, "spawned": spawned }),
    ))
}

pub(super) async fn stop_auto_reply(State(state): State<AppState>) -> ApiResult<Value> {
    state.scheduler.stop();
    Ok(ApiResponse::ok("Auto-reply stopped", json!({ "running": false })))
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct TemplateList {
    templates: Vec<Template>,
    total: usize,
}

pub(super) async fn list_templates(State(state): State<AppState>) -> ApiResult<TemplateList> {
    let templates = state.templates.list()?;
    let total = templates.len();
    Ok(ApiResponse::ok("Templates", TemplateList { templates, total }))
}

pub(super) async fn create_template(
    State(state): State<AppState>,
    Json(draft): Json<TemplateDraft>,
) -> Result<(StatusCode, Json<ApiResponse<Template>>), ApiError> {
    let template = state.templates.insert(draft)?;
    tracing::info!(template = %template.id, "template created");
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Template created successfully", template),
    ))
}

pub(super) async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Template> {
    match state.templates.lookup(&id)? {
        Some(template) => Ok(ApiResponse::ok("Template", template)),
        None => Err(ApiError::NotFound("Template not found".to_string())),
    }
}

pub(super) async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<TemplateDraft>,
) -> ApiResult<Template> {
    match state.templates.update(&id, draft)? {
        Some(template) => Ok(ApiResponse::ok(
            format!("Template {id} updated successfully"),
            template,
        )),
        None => Err(ApiError::NotFound("Template not found".to_string())),
    }
}

pub(super) async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    if state.templates.delete(&id)? {
        Ok(ApiResponse::done(format!("Template {id} deleted successfully")))
    } else {
        Err(ApiError::NotFound("Template not found".to_string()))
    }
}

pub(super) async fn preview_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(sample): Json<HashMap<String, Value>>,
) -> ApiResult<Value> {
    let Some(template) = state.templates.lookup(&id)? else {
        return Err(ApiError::NotFound("Template not found".to_string()));
    };

    let values: HashMap<String, String> = sample
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (k, v)
        })
        .collect();

    let preview = templates::render(&template.content, &values);
    Ok(ApiResponse::ok(
        "Template preview generated",
        json!({ "preview": preview }),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SuggestionRequest {
    #[serde(alias = "business_type")]
    business_type: String,
    purpose: String,
}

pub(super) async fn generate_templates(
    State(state): State<AppState>,
    Json(request): Json<SuggestionRequest>,
) -> ApiResult<Value> {
    let Some(suggester) = state.suggester.as_ref() else {
        return Err(ApiError::Unavailable(
            "Template generation needs an AI API key".to_string(),
        ));
    };

    if request.business_type.trim().is_empty() || request.purpose.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "businessType and purpose are required".to_string(),
        ));
    }

    let suggestions = suggester
        .suggest_templates(&request.business_type, &request.purpose)
        .await?;
    Ok(ApiResponse::ok(
        "Successfully generated template suggestions",
        json!({ "suggestions": suggestions }),
    ))
}
