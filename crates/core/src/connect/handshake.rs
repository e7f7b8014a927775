//! The OAuth handshake state machine.
//!
//! Issues one-time authorization state, validates callbacks and sequences
//! code exchange, token upgrade and target resolution. Callback handling is
//! fully absorbing: every failure ends as a disconnected account with the
//! reason on its activity trail, never as an error escaping to the HTTP
//! layer.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use rand::RngCore;
use socialhub_domain::{Account, AccountState, Result, SocialHubError};
use tracing::{info, instrument, warn};
use url::Url;

use crate::connect::ports::{AccountStore, ActivityLog, AppConfigProvider};
use crate::connect::resolver::AccountResolver;
use crate::connect::tokens::TokenExchangeService;

/// Lifetime of an issued authorization state value.
pub const STATE_TTL_MINUTES: i64 = 15;
/// Entropy of the state value, before URL-safe encoding.
const STATE_ENTROPY_BYTES: usize = 24;
/// Provider tag written to the OAuth scratch fields.
const PROVIDER_TAG: &str = "meta";

/// Query parameters of an OAuth callback.
#[derive(Debug, Clone, Default)]
pub struct CallbackParams {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_reason: Option<String>,
    pub error_description: Option<String>,
}

/// Disposition of a handled callback, for the HTTP layer's redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// No account matches the state value; nothing to update.
    UnknownState,
    /// Handshake completed; the account is connected.
    Connected { account_id: String },
    /// Handshake rejected; the account is disconnected with the reason on
    /// its activity trail.
    Rejected { account_id: String },
}

/// Sequences the OAuth handshake over the account's scratch fields.
pub struct OAuthHandshakeManager {
    accounts: Arc<dyn AccountStore>,
    configs: Arc<dyn AppConfigProvider>,
    activity: Arc<dyn ActivityLog>,
    tokens: Arc<TokenExchangeService>,
    resolver: Arc<AccountResolver>,
    redirect_uri: String,
}

impl OAuthHandshakeManager {
    /// Create a new manager.
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        configs: Arc<dyn AppConfigProvider>,
        activity: Arc<dyn ActivityLog>,
        tokens: Arc<TokenExchangeService>,
        resolver: Arc<AccountResolver>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            accounts,
            configs,
            activity,
            tokens,
            resolver,
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Issue a one-time state value and return the authorization dialog URL.
    #[instrument(skip(self))]
    pub async fn begin_handshake(&self, tenant_id: &str, account_id: &str) -> Result<String> {
        let mut account = self.accounts.get(tenant_id, account_id).await?;
        let config = self.configs.meta_config(tenant_id).await?;
        if config.app_id.is_empty() {
            return Err(SocialHubError::Config(
                "set the Meta app id in settings before connecting".into(),
            ));
        }

        let state = generate_state();
        account.oauth_provider = Some(PROVIDER_TAG.to_string());
        account.oauth_state = Some(state.clone());
        account.oauth_state_expires_at = Some(Utc::now() + Duration::minutes(STATE_TTL_MINUTES));
        self.accounts.save(&account).await?;

        let url = Url::parse_with_params(
            &config.dialog_base(),
            &[
                ("client_id", config.app_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("state", state.as_str()),
                ("response_type", "code"),
                ("scope", config.scopes.as_str()),
            ],
        )
        .map_err(|err| SocialHubError::Internal(format!("authorization URL: {err}")))?;

        info!(account_id = %account.id, "handshake started");
        Ok(url.into())
    }

    /// Validate and complete an OAuth callback.
    ///
    /// The checks run in strict order: state lookup, state expiry, provider
    /// error parameter, code presence, then the exchange chain. Reordering
    /// would mask the most specific diagnosis for stale or ambiguous
    /// callbacks.
    #[instrument(skip(self, params), fields(has_code = params.code.is_some()))]
    pub async fn handle_callback(&self, params: CallbackParams) -> CallbackOutcome {
        let mut account = match self.find_account(params.state.as_deref()).await {
            Some(account) => account,
            None => return CallbackOutcome::UnknownState,
        };

        if account.oauth_state_expired(Utc::now()) {
            self.activity
                .record(&account.id, "Meta OAuth callback rejected: state expired.")
                .await;
            account.clear_oauth_scratch();
            return self.disconnect(account).await;
        }

        if let Some(error) = &params.error {
            let reason = params.error_reason.as_deref().unwrap_or("");
            let description = params.error_description.as_deref().unwrap_or("");
            self.activity
                .record(
                    &account.id,
                    &format!("Meta OAuth failed: {error} / {reason} / {description}"),
                )
                .await;
            return self.disconnect(account).await;
        }

        let Some(code) = params.code.as_deref() else {
            self.activity
                .record(&account.id, "Meta OAuth callback has no authorization code.")
                .await;
            return self.disconnect(account).await;
        };

        match self.connect(&mut account, code).await {
            Ok(()) => {
                self.activity.record(&account.id, "Meta OAuth connected successfully.").await;
                info!(account_id = %account.id, "handshake completed");
                CallbackOutcome::Connected { account_id: account.id }
            }
            Err(err) => {
                self.activity
                    .record(&account.id, &format!("Meta OAuth sync failed: {err}"))
                    .await;
                self.disconnect(account).await
            }
        }
    }

    /// Code exchange, forced long-lived upgrade, target resolution.
    async fn connect(&self, account: &mut Account, code: &str) -> Result<()> {
        let config = self.configs.meta_config(&account.tenant_id).await?;
        self.tokens.exchange_code(account, &config, &self.redirect_uri, code).await?;
        self.tokens.upgrade_to_long_lived(account, &config, true).await?;

        let user_token = account.user_access_token.clone().ok_or_else(|| {
            SocialHubError::Internal("exchange succeeded without a user token".into())
        })?;
        self.resolver.resolve(account, &user_token).await?;
        Ok(())
    }

    async fn find_account(&self, state: Option<&str>) -> Option<Account> {
        let state = state.filter(|state| !state.is_empty())?;
        match self.accounts.find_by_oauth_state(state).await {
            Ok(account) => account,
            Err(err) => {
                warn!(error = %err, "oauth state lookup failed");
                None
            }
        }
    }

    /// Set the account disconnected, absorbing any store failure.
    async fn disconnect(&self, mut account: Account) -> CallbackOutcome {
        account.state = AccountState::Disconnected;
        if let Err(err) = self.accounts.save(&account).await {
            warn!(account_id = %account.id, error = %err, "failed to persist disconnected state");
        }
        CallbackOutcome::Rejected { account_id: account.id }
    }
}

/// Generate a cryptographically random, URL-safe one-time state value.
fn generate_state() -> String {
    let mut bytes = [0u8; STATE_ENTROPY_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
