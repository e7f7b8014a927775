//! The publish-retry engine.
//!
//! Drives a job through Queued, Processing and the terminal states with a
//! bounded number of attempts. Failure handling is tag-based: every dispatch
//! error is classified retryable or terminal up front. Retryable failures
//! under the attempt ceiling loop back to Queued with a retry timer; Failed
//! is terminal and never retried automatically.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use socialhub_domain::{JobState, PublishJob, Result, SocialHubError};
use tracing::{info, instrument, warn};

use crate::connect::ports::{AccountStore, ActivityLog};
use crate::provider::GraphApi;
use crate::publish::ports::PublishJobStore;
use crate::publish::protocol::{protocol_for, ProviderPost};

/// Jobs examined per sweep pass.
pub const DEFAULT_SWEEP_BATCH: usize = 50;

/// Why an attempt did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The job was canceled; cancellation is permanent.
    Canceled,
    /// The job is already posted.
    AlreadyPosted,
    /// The job's schedule lies in the future (automatic attempts only).
    NotYetScheduled,
    /// The attempt ceiling is already spent.
    AttemptsExhausted,
}

/// Outcome of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    /// Nothing happened; the reason says why.
    Skipped(SkipReason),
    /// The post was accepted by the platform.
    Posted,
    /// A retryable failure; the job is back in Queued behind its retry timer.
    Requeued,
    /// A terminal failure; no further automatic attempts.
    Failed,
}

/// Tally of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub examined: usize,
    pub posted: usize,
    pub requeued: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// The publish state machine over the job and account stores.
pub struct PublishEngine {
    jobs: Arc<dyn PublishJobStore>,
    accounts: Arc<dyn AccountStore>,
    graph: Arc<dyn GraphApi>,
    activity: Arc<dyn ActivityLog>,
    batch_size: usize,
}

impl PublishEngine {
    /// Create a new engine with the default sweep batch size.
    pub fn new(
        jobs: Arc<dyn PublishJobStore>,
        accounts: Arc<dyn AccountStore>,
        graph: Arc<dyn GraphApi>,
        activity: Arc<dyn ActivityLog>,
    ) -> Self {
        Self { jobs, accounts, graph, activity, batch_size: DEFAULT_SWEEP_BATCH }
    }

    /// Override the sweep batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Queue a job for automatic publishing, optionally not before a given
    /// time.
    #[instrument(skip(self, not_before))]
    pub async fn queue(
        &self,
        tenant_id: &str,
        job_id: &str,
        not_before: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut job = self.jobs.get(tenant_id, job_id).await?;
        if job.state == JobState::Posted {
            return Err(SocialHubError::Validation(format!("job {} is already posted", job.id)));
        }
        job.state = JobState::Queued;
        job.scheduled_at = not_before;
        job.next_retry_at = Some(not_before.unwrap_or_else(Utc::now));
        job.last_error = None;
        self.jobs.save(&job).await?;
        self.activity.record(&job.id, "Queued for publishing.").await;
        Ok(())
    }

    /// One publish attempt against the job's account.
    ///
    /// `manual` marks an operator-triggered attempt: it bypasses the future
    /// schedule gate, and its failures go straight to Failed and re-raise so
    /// the operator sees the error.
    #[instrument(skip(self), fields(manual))]
    pub async fn attempt(
        &self,
        tenant_id: &str,
        job_id: &str,
        manual: bool,
    ) -> Result<AttemptStatus> {
        let job = self.jobs.get(tenant_id, job_id).await?;
        self.run_attempt(job, manual).await
    }

    /// Operator-triggered attempt.
    pub async fn publish_now(&self, tenant_id: &str, job_id: &str) -> Result<AttemptStatus> {
        self.attempt(tenant_id, job_id, true).await
    }

    /// Cancel a not-yet-posted job. Cancellation is permanent: canceled jobs
    /// are never selected by the sweep and skip manual attempts too.
    #[instrument(skip(self))]
    pub async fn cancel(&self, tenant_id: &str, job_id: &str) -> Result<()> {
        let mut job = self.jobs.get(tenant_id, job_id).await?;
        if job.state == JobState::Posted {
            return Err(SocialHubError::Validation(format!("job {} is already posted", job.id)));
        }
        job.state = JobState::Canceled;
        job.next_retry_at = None;
        self.jobs.save(&job).await?;
        self.activity.record(&job.id, "Publishing canceled.").await;
        Ok(())
    }

    /// Return a failed or canceled job to draft, clearing the attempt
    /// counter, retry timer and recorded errors.
    #[instrument(skip(self))]
    pub async fn reset_to_draft(&self, tenant_id: &str, job_id: &str) -> Result<()> {
        let mut job = self.jobs.get(tenant_id, job_id).await?;
        if job.state == JobState::Posted {
            return Err(SocialHubError::Validation(format!("job {} is already posted", job.id)));
        }
        job.state = JobState::Draft;
        job.attempt_count = 0;
        job.next_retry_at = None;
        job.last_error = None;
        job.provider_response = None;
        self.jobs.save(&job).await?;
        self.activity.record(&job.id, "Reset to draft.").await;
        Ok(())
    }

    /// One pass over the due jobs.
    ///
    /// Per-job failures are absorbed and tallied so one poisoned job cannot
    /// stall the batch.
    #[instrument(skip(self))]
    pub async fn sweep(&self) -> Result<SweepSummary> {
        let now = Utc::now();
        let due = self.jobs.find_due(now, self.batch_size).await?;
        let mut summary = SweepSummary { examined: due.len(), ..Default::default() };

        for job in due {
            // The store query bounds selection, but ceilings can change
            // between selection and attempt. Re-check before dispatching.
            if job.attempt_count >= job.attempt_ceiling() {
                if let Err(err) = self.finalize_exhausted(job).await {
                    warn!(error = %err, "failed to finalize exhausted job");
                }
                summary.skipped += 1;
                continue;
            }
            match self.run_attempt(job, false).await {
                Ok(AttemptStatus::Posted) => summary.posted += 1,
                Ok(AttemptStatus::Requeued) => summary.requeued += 1,
                Ok(AttemptStatus::Failed) => summary.failed += 1,
                Ok(AttemptStatus::Skipped(_)) => summary.skipped += 1,
                Err(err) => {
                    warn!(error = %err, "sweep attempt errored");
                    summary.failed += 1;
                }
            }
        }

        info!(
            examined = summary.examined,
            posted = summary.posted,
            requeued = summary.requeued,
            failed = summary.failed,
            "sweep pass complete"
        );
        Ok(summary)
    }

    async fn run_attempt(&self, mut job: PublishJob, manual: bool) -> Result<AttemptStatus> {
        let now = Utc::now();

        match job.state {
            JobState::Canceled => return Ok(AttemptStatus::Skipped(SkipReason::Canceled)),
            JobState::Posted => return Ok(AttemptStatus::Skipped(SkipReason::AlreadyPosted)),
            _ => {}
        }
        if !manual && job.scheduled_in_future(now) {
            return Ok(AttemptStatus::Skipped(SkipReason::NotYetScheduled));
        }
        if job.attempt_count >= job.attempt_ceiling() {
            self.finalize_exhausted(job).await?;
            return Ok(AttemptStatus::Skipped(SkipReason::AttemptsExhausted));
        }

        // Persist Processing before dispatching so a crash mid-call is
        // visible and the attempt is counted.
        job.state = JobState::Processing;
        job.attempt_count += 1;
        job.next_retry_at = None;
        self.jobs.save(&job).await?;

        match self.dispatch(&job).await {
            Ok(post) => self.record_posted(job, post).await,
            Err(err) => self.record_failure(job, err, manual, now).await,
        }
    }

    /// Resolve the account's protocol and publish.
    async fn dispatch(&self, job: &PublishJob) -> Result<ProviderPost> {
        let account = self.accounts.get(&job.tenant_id, &job.account_id).await?;
        let token = account.publish_token()?.to_string();
        let target_id = account.external_uid.clone().ok_or_else(|| {
            SocialHubError::NotConnected(format!("account {} has no resolved target", account.id))
        })?;
        protocol_for(account.kind)
            .publish(self.graph.as_ref(), &target_id, &token, job)
            .await
    }

    async fn record_posted(&self, mut job: PublishJob, post: ProviderPost) -> Result<AttemptStatus> {
        job.state = JobState::Posted;
        job.external_post_id = Some(post.post_id.clone());
        job.external_permalink = post.permalink;
        job.posted_at = Some(Utc::now());
        job.last_error = None;
        job.provider_response = Some(post.raw.to_string());
        job.next_retry_at = None;
        self.jobs.save(&job).await?;

        info!(job_id = %job.id, post_id = %post.post_id, "job posted");
        self.activity
            .record(&job.id, &format!("Published to Meta (post {}).", post.post_id))
            .await;
        Ok(AttemptStatus::Posted)
    }

    async fn record_failure(
        &self,
        mut job: PublishJob,
        err: SocialHubError,
        manual: bool,
        now: DateTime<Utc>,
    ) -> Result<AttemptStatus> {
        job.last_error = Some(err.to_string());
        if let SocialHubError::Provider(payload) = &err {
            job.provider_response = Some(payload.clone());
        }

        let will_retry = err.is_retryable() && !manual && job.attempt_count < job.attempt_ceiling();
        if will_retry {
            let next_retry = now + job.backoff_interval();
            job.state = JobState::Queued;
            job.next_retry_at = Some(next_retry);
            self.jobs.save(&job).await?;
            warn!(job_id = %job.id, attempt = job.attempt_count, error = %err, "attempt failed, will retry");
            self.activity
                .record(
                    &job.id,
                    &format!(
                        "Publish attempt {} failed, retry scheduled for {}: {err}",
                        job.attempt_count,
                        next_retry.to_rfc3339()
                    ),
                )
                .await;
            return Ok(AttemptStatus::Requeued);
        }

        job.state = JobState::Failed;
        job.next_retry_at = None;
        self.jobs.save(&job).await?;
        warn!(job_id = %job.id, attempt = job.attempt_count, error = %err, "attempt failed permanently");
        self.activity
            .record(&job.id, &format!("Publishing failed: {err}"))
            .await;

        if manual {
            return Err(err);
        }
        Ok(AttemptStatus::Failed)
    }

    /// Selection raced a ceiling change; park the job as failed.
    async fn finalize_exhausted(&self, mut job: PublishJob) -> Result<()> {
        if job.state != JobState::Failed || job.next_retry_at.is_some() {
            job.state = JobState::Failed;
            job.next_retry_at = None;
            self.jobs.save(&job).await?;
        }
        self.activity
            .record(&job.id, "Publishing abandoned: attempt limit reached.")
            .await;
        Ok(())
    }
}
