//! Account connection: OAuth handshake, token lifecycle, target resolution.

pub mod handshake;
pub mod maintenance;
pub mod ports;
pub mod resolver;
pub mod tokens;

pub use handshake::{CallbackOutcome, CallbackParams, OAuthHandshakeManager};
pub use maintenance::{RefreshSummary, TokenMaintenance};
pub use ports::{AccountStore, ActivityLog, AppConfigProvider};
pub use resolver::{AccountResolver, ResolvedTarget};
pub use tokens::TokenExchangeService;
