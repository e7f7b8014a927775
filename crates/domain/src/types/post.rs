//! Publish jobs: one unit of content destined for one account.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Kind of content carried by a publish job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Text,
    Image,
    Video,
}

crate::impl_status_conversions!(MediaKind {
    Text => "text",
    Image => "image",
    Video => "video",
});

/// Publish job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Draft,
    Queued,
    Processing,
    Posted,
    Failed,
    Canceled,
}

crate::impl_status_conversions!(JobState {
    Draft => "draft",
    Queued => "queued",
    Processing => "processing",
    Posted => "posted",
    Failed => "failed",
    Canceled => "canceled",
});

impl JobState {
    /// Posted, failed and canceled jobs receive no further automatic
    /// attempts.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Posted | Self::Failed | Self::Canceled)
    }
}

/// Default attempt ceiling for new jobs.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default backoff interval between retries, in minutes.
pub const DEFAULT_RETRY_INTERVAL_MINUTES: i64 = 10;

/// One unit of content destined for one account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishJob {
    pub id: String,
    pub tenant_id: String,
    pub account_id: String,
    pub name: String,

    pub media_kind: MediaKind,
    pub message: String,
    /// Image or video URL, depending on `media_kind`.
    pub media_url: Option<String>,

    /// If set in the future, automatic attempts wait until this time.
    pub scheduled_at: Option<DateTime<Utc>>,
    pub state: JobState,

    pub attempt_count: u32,
    pub max_attempts: u32,
    pub retry_interval_minutes: i64,
    pub next_retry_at: Option<DateTime<Utc>>,

    pub external_post_id: Option<String>,
    pub external_permalink: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Raw provider payload from the last attempt, success or failure.
    pub provider_response: Option<String>,
}

impl PublishJob {
    /// Create a new draft job.
    pub fn new(
        tenant_id: impl Into<String>,
        account_id: impl Into<String>,
        name: impl Into<String>,
        media_kind: MediaKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            account_id: account_id.into(),
            name: name.into(),
            media_kind,
            message: message.into(),
            media_url: None,
            scheduled_at: None,
            state: JobState::Draft,
            attempt_count: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_interval_minutes: DEFAULT_RETRY_INTERVAL_MINUTES,
            next_retry_at: None,
            external_post_id: None,
            external_permalink: None,
            posted_at: None,
            last_error: None,
            provider_response: None,
        }
    }

    /// Effective attempt ceiling; always at least one.
    pub fn attempt_ceiling(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Backoff added to "now" after a retryable failure. Never below one
    /// minute.
    pub fn backoff_interval(&self) -> Duration {
        Duration::minutes(self.retry_interval_minutes.max(1))
    }

    /// Whether the job is scheduled for a future time at `now`.
    pub fn scheduled_in_future(&self, now: DateTime<Utc>) -> bool {
        matches!(self.scheduled_at, Some(at) if at > now)
    }
}
