//! Port interfaces for account and configuration access.

use async_trait::async_trait;
use socialhub_domain::{Account, MetaAppConfig, Result};

/// Trait for account record access.
///
/// Field updates follow optimistic "last write wins" semantics; no
/// multi-record atomicity is assumed across the handshake's several writes.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fetch one account by tenant and id
    async fn get(&self, tenant_id: &str, account_id: &str) -> Result<Account>;

    /// Find the account holding an in-flight OAuth state value, if any
    async fn find_by_oauth_state(&self, state: &str) -> Result<Option<Account>>;

    /// Persist the account record
    async fn save(&self, account: &Account) -> Result<()>;

    /// Connected accounts holding a user token, across all tenants.
    /// Candidates for the periodic token refresh pass.
    async fn list_refresh_candidates(&self) -> Result<Vec<Account>>;
}

/// Trait for per-tenant Meta app configuration.
#[async_trait]
pub trait AppConfigProvider: Send + Sync {
    /// Configuration for a tenant. An absent record yields
    /// [`MetaAppConfig::empty`] rather than an error.
    async fn meta_config(&self, tenant_id: &str) -> Result<MetaAppConfig>;
}

/// Trait for the best-effort activity trail.
///
/// Messages are human-readable status notes appended to the owning record.
/// Implementations must absorb their own failures; nothing in the core
/// branches on the outcome.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    /// Append a message to the record's activity trail
    async fn record(&self, record_id: &str, message: &str);
}
