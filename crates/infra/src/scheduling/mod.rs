//! Background schedulers driving the periodic core passes.

mod publish_sweeper;
mod token_refresher;

use std::time::Duration;

use thiserror::Error;

pub use publish_sweeper::PublishSweepScheduler;
pub use token_refresher::TokenRefreshScheduler;

/// Scheduler lifecycle errors.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler is already running")]
    AlreadyRunning,

    #[error("scheduler is not running")]
    NotRunning,

    #[error("scheduler task did not stop within {duration:?}")]
    Timeout {
        duration: Duration,
        #[source]
        source: tokio::time::error::Elapsed,
    },

    #[error("scheduler task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type for scheduler lifecycle operations.
pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;

/// Shared scheduler settings.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between passes.
    pub interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(300) }
    }
}

/// Grace period for a loop to finish after cancellation.
pub(crate) const JOIN_TIMEOUT: Duration = Duration::from_secs(5);
