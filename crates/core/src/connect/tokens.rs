//! Authorization-code exchange and long-lived token upgrade.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use socialhub_domain::{Account, MetaAppConfig, Result, SocialHubError};
use tracing::{debug, info};

use crate::connect::ports::AccountStore;
use crate::provider::{params, CallClass, GraphApi};

/// Tokens expiring further than this margin in the future are not refreshed
/// unless the caller forces it. Keeps refresh traffic within the platform's
/// rate limits.
const REFRESH_SAFETY_MARGIN_DAYS: i64 = 10;

/// Performs the code exchange and short-lived to long-lived token upgrade,
/// persisting the account's user-scoped credential fields on success.
///
/// On failure the account record is left untouched; the caller decides the
/// downstream state transition.
pub struct TokenExchangeService {
    graph: Arc<dyn GraphApi>,
    accounts: Arc<dyn AccountStore>,
}

impl TokenExchangeService {
    /// Create a new service over the given ports.
    pub fn new(graph: Arc<dyn GraphApi>, accounts: Arc<dyn AccountStore>) -> Self {
        Self { graph, accounts }
    }

    /// Exchange an authorization code for a short-lived user token.
    ///
    /// Single-shot: authorization codes are one-time use, so this never
    /// retries. Also clears the account's OAuth scratch fields, which are
    /// consumed by a successful exchange.
    pub async fn exchange_code(
        &self,
        account: &mut Account,
        config: &MetaAppConfig,
        redirect_uri: &str,
        code: &str,
    ) -> Result<()> {
        config.require_credentials()?;

        let body = self
            .graph
            .get(
                "oauth/access_token",
                &params(&[
                    ("client_id", &config.app_id),
                    ("client_secret", &config.app_secret),
                    ("redirect_uri", redirect_uri),
                    ("code", code),
                ]),
                CallClass::Metadata,
            )
            .await
            .map_err(|err| SocialHubError::TokenExchange(err.to_string()))?;

        let (token, expires_at) =
            parse_token_response(&body).map_err(SocialHubError::TokenExchange)?;

        debug!(account_id = %account.id, "authorization code exchanged");
        account.user_access_token = Some(token);
        account.user_token_expires_at = expires_at;
        account.clear_oauth_scratch();
        self.accounts.save(account).await?;
        Ok(())
    }

    /// Upgrade the current user token to a long-lived one.
    ///
    /// Returns `Ok(false)` without any provider call when the account holds
    /// no user token, or when `force` is false and the current token expires
    /// further than the safety margin in the future. Absence of a returned
    /// lifetime means "no expiry tracked", not "expired".
    pub async fn upgrade_to_long_lived(
        &self,
        account: &mut Account,
        config: &MetaAppConfig,
        force: bool,
    ) -> Result<bool> {
        let Some(current_token) = account.user_access_token.clone() else {
            return Ok(false);
        };

        if !force {
            if let Some(expires_at) = account.user_token_expires_at {
                if expires_at > Utc::now() + Duration::days(REFRESH_SAFETY_MARGIN_DAYS) {
                    debug!(account_id = %account.id, "token expiry outside safety margin, skipping refresh");
                    return Ok(false);
                }
            }
        }

        config.require_credentials()?;

        let body = self
            .graph
            .get(
                "oauth/access_token",
                &params(&[
                    ("grant_type", "fb_exchange_token"),
                    ("client_id", &config.app_id),
                    ("client_secret", &config.app_secret),
                    ("fb_exchange_token", &current_token),
                ]),
                CallClass::Metadata,
            )
            .await
            .map_err(|err| SocialHubError::TokenRefresh(err.to_string()))?;

        let (token, expires_at) =
            parse_token_response(&body).map_err(SocialHubError::TokenRefresh)?;

        info!(account_id = %account.id, "user token upgraded to long-lived");
        account.user_access_token = Some(token);
        account.user_token_expires_at = expires_at;
        account.last_refresh_at = Some(Utc::now());
        self.accounts.save(account).await?;
        Ok(true)
    }
}

/// Extract the access token and computed expiry from a token endpoint
/// response body.
fn parse_token_response(body: &Value) -> std::result::Result<(String, Option<DateTime<Utc>>), String> {
    let token = body
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| "response has no access token".to_string())?;

    let expires_in = body.get("expires_in").and_then(Value::as_i64).unwrap_or(0);
    let expires_at = if expires_in > 0 {
        Some(Utc::now() + Duration::seconds(expires_in))
    } else {
        None
    };

    Ok((token.to_string(), expires_at))
}
