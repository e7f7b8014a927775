//! SQLite-backed record stores.
//!
//! All repositories share one [`DbManager`] pool and run their rusqlite work
//! on the blocking thread pool. Timestamps are stored as Unix epoch seconds;
//! enum fields as their lowercase string form with a warn-and-default parse
//! on the way out, so one corrupt row cannot poison a batch query.

mod account_repository;
mod activity_log;
mod manager;
mod meta_config_repository;
mod publish_job_repository;

pub use account_repository::SqliteAccountRepository;
pub use activity_log::SqliteActivityLog;
pub use manager::DbManager;
pub use meta_config_repository::SqliteMetaConfigRepository;
pub use publish_job_repository::SqlitePublishJobRepository;

use chrono::{DateTime, Utc};

/// Epoch seconds for storage.
pub(crate) fn to_epoch(value: Option<DateTime<Utc>>) -> Option<i64> {
    value.map(|dt| dt.timestamp())
}

/// Timestamps back from epoch seconds. Out-of-range values become `None`.
pub(crate) fn from_epoch(value: Option<i64>) -> Option<DateTime<Utc>> {
    value.and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Parse a stored enum field, falling back to a default on unknown values.
pub(crate) fn parse_or_default<T>(record_id: &str, column: &str, raw: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match raw.parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(record_id, column, raw, "unknown stored value, using default");
            default
        }
    }
}
