//! # Social Hub Infrastructure
//!
//! Adapters behind the core's ports:
//! - SQLite record stores for accounts, publish jobs, tenant app
//!   configuration and the activity trail
//! - The reqwest-backed Graph API client with per-class timeouts
//! - The axum OAuth callback route
//! - Background schedulers driving the publish sweep and the token refresh
//!   pass
//! - The runtime configuration loader

pub mod config;
pub mod database;
pub mod errors;
pub mod graph;
pub mod oauth;
pub mod scheduling;

pub use database::{
    DbManager, SqliteAccountRepository, SqliteActivityLog, SqliteMetaConfigRepository,
    SqlitePublishJobRepository,
};
pub use errors::InfraError;
pub use graph::GraphClient;
pub use oauth::{callback_router, CallbackState};
pub use scheduling::{PublishSweepScheduler, SchedulerConfig, TokenRefreshScheduler};
