//! Token upkeep and manual account actions.
//!
//! The periodic refresh pass and the operator-triggered actions (sync
//! assets, force refresh, disconnect) share the exchange and resolution
//! services with the OAuth handshake; only the entry conditions differ.

use std::sync::Arc;

use socialhub_domain::{Account, AccountState, Result, SocialHubError};
use tracing::{info, instrument, warn};

use crate::connect::ports::{AccountStore, ActivityLog, AppConfigProvider};
use crate::connect::resolver::AccountResolver;
use crate::connect::tokens::TokenExchangeService;

/// Tally of one token refresh pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Accounts examined as refresh candidates.
    pub examined: usize,
    /// Accounts whose user token was actually upgraded.
    pub refreshed: usize,
    /// Accounts skipped because their token is not yet near expiry.
    pub skipped: usize,
    /// Accounts whose refresh or re-resolution failed.
    pub failed: usize,
}

/// Token upkeep over connected accounts.
pub struct TokenMaintenance {
    accounts: Arc<dyn AccountStore>,
    configs: Arc<dyn AppConfigProvider>,
    activity: Arc<dyn ActivityLog>,
    tokens: Arc<TokenExchangeService>,
    resolver: Arc<AccountResolver>,
}

impl TokenMaintenance {
    /// Create a new maintenance service.
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        configs: Arc<dyn AppConfigProvider>,
        activity: Arc<dyn ActivityLog>,
        tokens: Arc<TokenExchangeService>,
        resolver: Arc<AccountResolver>,
    ) -> Self {
        Self { accounts, configs, activity, tokens, resolver }
    }

    /// One pass over all refresh candidates.
    ///
    /// Each account is handled independently: a failure is logged on the
    /// account's activity trail and counted, never propagated, so one bad
    /// token cannot starve the rest of the fleet.
    #[instrument(skip(self))]
    pub async fn refresh_due_tokens(&self) -> Result<RefreshSummary> {
        let candidates = self.accounts.list_refresh_candidates().await?;
        let mut summary = RefreshSummary { examined: candidates.len(), ..Default::default() };

        for mut account in candidates {
            match self.refresh_one(&mut account, false).await {
                Ok(true) => summary.refreshed += 1,
                Ok(false) => summary.skipped += 1,
                Err(err) => {
                    warn!(account_id = %account.id, error = %err, "token refresh failed");
                    self.activity
                        .record(&account.id, &format!("Token refresh failed: {err}"))
                        .await;
                    summary.failed += 1;
                }
            }
        }

        info!(
            examined = summary.examined,
            refreshed = summary.refreshed,
            failed = summary.failed,
            "token refresh pass complete"
        );
        Ok(summary)
    }

    /// Re-resolve the account's target from its current user token.
    ///
    /// Operator action: picks up renamed pages, rotated page tokens and
    /// changed profile links without a new handshake.
    #[instrument(skip(self))]
    pub async fn sync_assets(&self, tenant_id: &str, account_id: &str) -> Result<()> {
        let mut account = self.accounts.get(tenant_id, account_id).await?;
        let user_token = require_user_token(&account)?;
        self.resolver.resolve(&mut account, &user_token).await?;
        self.activity.record(&account.id, "Assets synced from Meta.").await;
        Ok(())
    }

    /// Force a long-lived upgrade and re-resolve, regardless of expiry.
    #[instrument(skip(self))]
    pub async fn refresh_token(&self, tenant_id: &str, account_id: &str) -> Result<()> {
        let mut account = self.accounts.get(tenant_id, account_id).await?;
        require_user_token(&account)?;
        self.refresh_one(&mut account, true).await?;
        self.activity.record(&account.id, "Token refreshed on request.").await;
        Ok(())
    }

    /// Disconnect the account, dropping its publish credential.
    ///
    /// The user token is kept so a later sync can reconnect without a full
    /// handshake; only the target-scoped token is discarded.
    #[instrument(skip(self))]
    pub async fn mark_disconnected(&self, tenant_id: &str, account_id: &str) -> Result<()> {
        let mut account = self.accounts.get(tenant_id, account_id).await?;
        account.state = AccountState::Disconnected;
        account.access_token = None;
        account.clear_oauth_scratch();
        self.accounts.save(&account).await?;
        self.activity.record(&account.id, "Account disconnected.").await;
        Ok(())
    }

    /// Upgrade one account's token, re-resolving its target on success.
    async fn refresh_one(&self, account: &mut Account, force: bool) -> Result<bool> {
        let config = self.configs.meta_config(&account.tenant_id).await?;
        let refreshed = self.tokens.upgrade_to_long_lived(account, &config, force).await?;
        if refreshed {
            // Page tokens are derived from the user token; a fresh user
            // token invalidates the stored target token.
            let user_token = require_user_token(account)?;
            self.resolver.resolve(account, &user_token).await?;
        }
        Ok(refreshed)
    }
}

fn require_user_token(account: &Account) -> Result<String> {
    account
        .user_access_token
        .clone()
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            SocialHubError::NotConnected(format!("account {} has no user token", account.id))
        })
}
