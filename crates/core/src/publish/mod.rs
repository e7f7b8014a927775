//! Publishing: the retry engine and platform-specific publish protocols.

pub mod engine;
pub mod ports;
pub mod protocol;

pub use engine::{AttemptStatus, PublishEngine, SkipReason, SweepSummary};
pub use ports::PublishJobStore;
pub use protocol::{protocol_for, ProviderPost, PublishProtocol};
