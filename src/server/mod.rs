//! Server module
//!
//! HTTP control surface for auto-reply configuration, templates, accounts
//! and bulk campaigns. No authentication layer; bind to a private address.

mod accounts;
mod campaigns;
pub mod error;
mod routes;

use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::accounts::AccountStore;
use crate::ai::DynGenerator;
use crate::autoreply::AutoReplyScheduler;
use crate::campaigns::CampaignManager;
use crate::channels::DynGateway;
use crate::templates::TemplateStore;

pub use error::{ApiError, ApiResponse};

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub scheduler: AutoReplyScheduler,
    pub templates: Arc<dyn TemplateStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub campaigns: CampaignManager,
    /// Paced gateway shared with the scheduler and campaigns
    pub gateway: DynGateway,
    /// Generator for template suggestions; `None` without an API key
    pub suggester: Option<DynGenerator>,
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/api/v1/auto-reply", get(routes::list_auto_replies))
        .route("/api/v1/auto-reply/start", post(routes::start_auto_reply))
        .route("/api/v1/auto-reply/stop", post(routes::stop_auto_reply))
        .route("/api/v1/auto-reply/{account}", post(routes::update_auto_reply))
        .route(
            "/api/v1/templates",
            get(routes::list_templates).post(routes::create_template),
        )
        .route("/api/v1/templates/generate", post(routes::generate_templates))
        .route(
            "/api/v1/templates/{id}",
            get(routes::get_template)
                .put(routes::update_template)
                .delete(routes::delete_template),
        )
        .route("/api/v1/templates/{id}/preview", post(routes::preview_template))
        .route(
            "/api/v1/accounts",
            get(accounts::list_accounts).post(accounts::add_account),
        )
        .route("/api/v1/accounts/bulk", post(accounts::bulk_add_accounts))
        .route(
            "/api/v1/accounts/{username}",
            get(accounts::get_account).delete(accounts::delete_account),
        )
        .route("/api/v1/accounts/{username}/login", post(accounts::login_account))
        .route("/api/v1/accounts/{username}/logout", post(accounts::logout_account))
        .route(
            "/api/v1/campaigns",
            get(campaigns::list_campaigns).post(campaigns::launch_campaign),
        )
        .route(
            "/api/v1/campaigns/{id}",
            get(campaigns::get_campaign).delete(campaigns::delete_campaign),
        )
        .with_state(state)
}

/// Serve the API on `addr` until `shutdown` resolves
pub async fn serve<F>(addr: SocketAddr, state: AppState, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    tracing::info!(address = %addr, "HTTP server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
