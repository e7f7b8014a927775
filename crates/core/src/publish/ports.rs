//! Port interface for publish job persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use socialhub_domain::{PublishJob, Result};

/// Trait for publish job record access.
#[async_trait]
pub trait PublishJobStore: Send + Sync {
    /// Fetch one job by tenant and id
    async fn get(&self, tenant_id: &str, job_id: &str) -> Result<PublishJob>;

    /// Persist the job record
    async fn save(&self, job: &PublishJob) -> Result<()>;

    /// Jobs eligible for an automatic attempt at `now`.
    ///
    /// Selection: state queued or failed, retry timer unset or elapsed,
    /// schedule unset or reached. At most `limit` jobs, oldest first.
    async fn find_due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<PublishJob>>;
}
