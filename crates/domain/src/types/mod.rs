//! Domain data types

pub mod account;
pub mod meta;
pub mod post;

pub use account::{Account, AccountState, PublishTarget, TargetKind};
pub use meta::MetaAppConfig;
pub use post::{JobState, MediaKind, PublishJob};
