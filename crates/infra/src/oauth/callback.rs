//! The OAuth callback route.
//!
//! One GET endpoint receiving the provider's redirect. Whatever happens in
//! the handshake, the browser always ends on a redirect back into the
//! application UI; errors surface on the account's activity trail, not as
//! HTTP error pages.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use socialhub_core::{CallbackOutcome, CallbackParams, OAuthHandshakeManager};
use socialhub_domain::Result;
use tracing::{info, instrument};

/// Shared state of the callback route.
#[derive(Clone)]
pub struct CallbackState {
    handshakes: Arc<OAuthHandshakeManager>,
    app_base_url: String,
}

impl CallbackState {
    /// Create the route state.
    pub fn new(handshakes: Arc<OAuthHandshakeManager>, app_base_url: impl Into<String>) -> Self {
        Self {
            handshakes,
            app_base_url: app_base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Query parameters Meta appends to the redirect URI.
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    state: Option<String>,
    code: Option<String>,
    error: Option<String>,
    error_reason: Option<String>,
    error_description: Option<String>,
}

/// Build the callback router.
pub fn callback_router(state: CallbackState) -> Router {
    Router::new().route("/oauth/callback", get(handle_callback)).with_state(state)
}

/// Bind and serve the callback router until the shutdown future resolves.
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: CallbackState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let router = callback_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|err| socialhub_domain::SocialHubError::Internal(format!("callback server: {err}")))
}

#[instrument(skip_all, fields(has_state = query.state.is_some()))]
async fn handle_callback(
    State(state): State<CallbackState>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    let params = CallbackParams {
        state: query.state,
        code: query.code,
        error: query.error,
        error_reason: query.error_reason,
        error_description: query.error_description,
    };

    let outcome = state.handshakes.handle_callback(params).await;
    info!(?outcome, "oauth callback handled");

    let target = match outcome {
        CallbackOutcome::UnknownState => {
            format!("{}/connect/error?reason=unknown_state", state.app_base_url)
        }
        CallbackOutcome::Connected { account_id } => {
            format!(
                "{}/accounts/{}?connected=1",
                state.app_base_url,
                urlencoding::encode(&account_id)
            )
        }
        CallbackOutcome::Rejected { account_id } => {
            format!(
                "{}/accounts/{}?connected=0",
                state.app_base_url,
                urlencoding::encode(&account_id)
            )
        }
    };
    Redirect::to(&target)
}
