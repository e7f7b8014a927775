//! Account records and publish target descriptors.
//!
//! An [`Account`] represents one organization's presence on the Meta
//! platform. It carries two credential sets: a user-scoped token obtained
//! from the OAuth code exchange (valid for listing the user's pages) and a
//! target-scoped token resolved from it (valid for publishing to one page or
//! business profile).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SocialHubError};

/// The concrete kind of publishable target behind an account.
///
/// A closed set: either a managed Facebook Page or an Instagram business
/// profile linked to one. The platform-specific publish protocol is selected
/// from this variant, never re-derived from a free-form platform string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Page,
    BusinessProfile,
}

crate::impl_status_conversions!(TargetKind {
    Page => "page",
    BusinessProfile => "business_profile",
});

/// Account lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountState {
    Draft,
    Connected,
    Disconnected,
}

crate::impl_status_conversions!(AccountState {
    Draft => "draft",
    Connected => "connected",
    Disconnected => "disconnected",
});

/// One organization's account on the Meta platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: String,
    /// Owning tenant. Always passed explicitly, never read from ambient
    /// context.
    pub tenant_id: String,
    pub name: String,
    /// For example: `@brand_official`. Unique per (kind, handle, tenant).
    pub handle: String,
    pub kind: TargetKind,
    /// Provider-side id of the resolved page / business profile.
    pub external_uid: Option<String>,
    pub profile_url: Option<String>,

    /// Target-scoped access token. Present only while `state == Connected`.
    pub access_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    /// User-scoped access token from the OAuth code exchange.
    pub user_access_token: Option<String>,
    pub user_token_expires_at: Option<DateTime<Utc>>,
    pub last_refresh_at: Option<DateTime<Utc>>,

    pub state: AccountState,
    /// OAuth provider tag set while a handshake is in flight.
    pub oauth_provider: Option<String>,
    /// One-time anti-forgery value for the in-flight handshake. Cleared on
    /// completion or expiry.
    pub oauth_state: Option<String>,
    pub oauth_state_expires_at: Option<DateTime<Utc>>,

    pub note: Option<String>,
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Create a new draft account.
    pub fn new(
        tenant_id: impl Into<String>,
        name: impl Into<String>,
        handle: impl Into<String>,
        kind: TargetKind,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            name: name.into(),
            handle: handle.into(),
            kind,
            external_uid: None,
            profile_url: None,
            access_token: None,
            token_expires_at: None,
            user_access_token: None,
            user_token_expires_at: None,
            last_refresh_at: None,
            state: AccountState::Draft,
            oauth_provider: None,
            oauth_state: None,
            oauth_state_expires_at: None,
            note: None,
            last_sync_at: None,
        }
    }

    /// Validate the handle constraint (at least 2 characters).
    pub fn validate_handle(&self) -> Result<()> {
        if self.handle.trim().len() < 2 {
            return Err(SocialHubError::Validation(
                "handle must be at least 2 characters".into(),
            ));
        }
        Ok(())
    }

    /// Clear the one-time OAuth scratch fields.
    pub fn clear_oauth_scratch(&mut self) {
        self.oauth_state = None;
        self.oauth_state_expires_at = None;
    }

    /// Whether the in-flight handshake state has expired at `now`.
    pub fn oauth_state_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.oauth_state_expires_at, Some(expiry) if expiry < now)
    }

    /// Apply a resolved publish target, marking the account connected.
    pub fn apply_target(&mut self, target: &PublishTarget, now: DateTime<Utc>) {
        if !target.display_name.is_empty() {
            self.name = target.display_name.clone();
        }
        if self.handle.is_empty() {
            if let Some(username) = &target.username {
                self.handle = username.clone();
            }
        } else if self.kind == TargetKind::BusinessProfile {
            if let Some(username) = &target.username {
                self.handle = username.clone();
            }
        }
        self.external_uid = Some(target.external_id.clone());
        self.profile_url = target.profile_url.clone();
        self.access_token = Some(target.access_token.clone());
        self.state = AccountState::Connected;
        self.last_sync_at = Some(now);
    }

    /// Target-scoped token required for publishing.
    ///
    /// Fails unless the account is connected and actually holds a token.
    pub fn publish_token(&self) -> Result<&str> {
        if self.state != AccountState::Connected {
            return Err(SocialHubError::NotConnected(format!(
                "account {} is {}",
                self.id, self.state
            )));
        }
        match self.access_token.as_deref() {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(SocialHubError::NotConnected(format!(
                "account {} has no access token",
                self.id
            ))),
        }
    }
}

/// Normalized descriptor of the concrete target resolved for an account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishTarget {
    pub kind: TargetKind,
    /// Provider-side page id / business profile id.
    pub external_id: String,
    pub display_name: String,
    pub username: Option<String>,
    pub profile_url: Option<String>,
    /// Token valid for publishing to this specific target.
    pub access_token: String,
}
