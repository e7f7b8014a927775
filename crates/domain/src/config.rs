//! Runtime configuration structures.
//!
//! Loaded by the infrastructure config loader from environment variables or
//! a JSON/TOML file. Distinct from [`crate::types::MetaAppConfig`], which is
//! per-tenant data kept in the record store.

use serde::{Deserialize, Serialize};

/// Top-level runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub database: DatabaseConfig,
    pub sweep: SweepConfig,
    pub oauth: OAuthConfig,
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Database file path
    pub path: String,
    /// Connection pool size
    pub pool_size: u32,
}

/// Publish sweep settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SweepConfig {
    /// Interval between sweeps, in seconds
    pub interval_seconds: u64,
    /// Maximum jobs advanced per sweep
    pub batch_size: usize,
    /// Whether the background sweep is enabled
    pub enabled: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self { interval_seconds: 300, batch_size: 50, enabled: true }
    }
}

/// OAuth callback settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OAuthConfig {
    /// Public redirect URI registered with the Meta app
    pub redirect_uri: String,
    /// Base URL of the record UI, used for post-callback redirects
    pub app_base_url: String,
}
