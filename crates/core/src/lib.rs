//! # Social Hub Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The OAuth handshake state machine, token exchange and target resolution
//! - The publish-retry engine and platform-specific publish protocols
//! - Port/adapter interfaces (traits) for the Graph API, record stores,
//!   tenant configuration and the activity trail
//!
//! ## Architecture Principles
//! - Only depends on `socialhub-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod connect;
pub mod provider;
pub mod publish;

#[cfg(test)]
pub(crate) mod testsupport;

// Re-export specific items to avoid ambiguity
pub use connect::handshake::{CallbackOutcome, CallbackParams, OAuthHandshakeManager};
pub use connect::maintenance::{RefreshSummary, TokenMaintenance};
pub use connect::ports::{AccountStore, ActivityLog, AppConfigProvider};
pub use connect::resolver::{AccountResolver, ResolvedTarget};
pub use connect::tokens::TokenExchangeService;
pub use provider::{CallClass, Enrichment, GraphApi, GraphMethod};
pub use publish::engine::{AttemptStatus, PublishEngine, SkipReason, SweepSummary};
pub use publish::ports::PublishJobStore;
pub use publish::protocol::{protocol_for, ProviderPost, PublishProtocol};
