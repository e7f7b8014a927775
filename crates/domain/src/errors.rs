//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the Social Hub connector.
///
/// Provider-facing variants keep the raw response payload in their message so
/// that a failed call can be diagnosed from the record's activity trail alone.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "message")]
pub enum SocialHubError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("Resolution failed: {0}")]
    Resolution(String),

    #[error("No publishable target: {0}")]
    NoTarget(String),

    #[error("Account not connected: {0}")]
    NotConnected(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("OAuth state expired: {0}")]
    StateExpired(String),

    #[error("OAuth state not found: {0}")]
    StateNotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SocialHubError {
    /// Whether a publish attempt that failed with this error may be retried.
    ///
    /// Provider rejections and transport failures are transient (rate limits,
    /// timeouts, 5xx). Everything else describes a condition a retry cannot
    /// fix: missing credentials, invalid payloads, disconnected accounts.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Network(_))
    }
}

/// Result type alias for Social Hub operations
pub type Result<T> = std::result::Result<T, SocialHubError>;
