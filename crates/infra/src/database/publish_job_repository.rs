//! SQLite-backed implementation of the publish job store port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use socialhub_core::PublishJobStore;
use socialhub_domain::{JobState, MediaKind, PublishJob, Result, SocialHubError};
use tokio::task;

use super::manager::DbManager;
use super::{from_epoch, parse_or_default, to_epoch};
use crate::errors::InfraError;

const JOB_COLUMNS: &str = "id, tenant_id, account_id, name, media_kind, message, media_url, \
     scheduled_at, state, attempt_count, max_attempts, retry_interval_minutes, next_retry_at, \
     external_post_id, external_permalink, posted_at, last_error, provider_response";

/// Due-job selection, mirroring the engine's eligibility rules so the sweep
/// only loads rows it can act on. Failed is terminal and never selected; the
/// engine re-checks the attempt ceiling on whatever this returns.
const FIND_DUE_SQL: &str = "SELECT id, tenant_id, account_id, name, media_kind, message, media_url, \
     scheduled_at, state, attempt_count, max_attempts, retry_interval_minutes, next_retry_at, \
     external_post_id, external_permalink, posted_at, last_error, provider_response \
     FROM publish_jobs \
     WHERE state = 'queued' \
       AND (next_retry_at IS NULL OR next_retry_at <= ?1) \
       AND (scheduled_at IS NULL OR scheduled_at <= ?1) \
     ORDER BY id \
     LIMIT ?2";

/// SQLite-backed publish job repository.
pub struct SqlitePublishJobRepository {
    db: Arc<DbManager>,
}

impl SqlitePublishJobRepository {
    /// Construct a repository backed by the shared manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PublishJobStore for SqlitePublishJobRepository {
    async fn get(&self, tenant_id: &str, job_id: &str) -> Result<PublishJob> {
        let db = Arc::clone(&self.db);
        let tenant_id = tenant_id.to_string();
        let job_id = job_id.to_string();

        task::spawn_blocking(move || -> Result<PublishJob> {
            let conn = db.get_connection()?;
            let sql =
                format!("SELECT {JOB_COLUMNS} FROM publish_jobs WHERE id = ?1 AND tenant_id = ?2");
            conn.query_row(&sql, params![job_id, tenant_id], map_job_row).map_err(|err| {
                match err {
                    rusqlite::Error::QueryReturnedNoRows => {
                        SocialHubError::NotFound(format!("publish job {job_id}"))
                    }
                    other => InfraError::from(other).into(),
                }
            })
        })
        .await
        .map_err(InfraError::from)?
    }

    async fn save(&self, job: &PublishJob) -> Result<()> {
        let db = Arc::clone(&self.db);
        let job = job.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT OR REPLACE INTO publish_jobs (
                    id, tenant_id, account_id, name, media_kind, message, media_url,
                    scheduled_at, state, attempt_count, max_attempts, retry_interval_minutes,
                    next_retry_at, external_post_id, external_permalink, posted_at,
                    last_error, provider_response
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                params![
                    job.id,
                    job.tenant_id,
                    job.account_id,
                    job.name,
                    job.media_kind.to_string(),
                    job.message,
                    job.media_url,
                    to_epoch(job.scheduled_at),
                    job.state.to_string(),
                    job.attempt_count,
                    job.max_attempts,
                    job.retry_interval_minutes,
                    to_epoch(job.next_retry_at),
                    job.external_post_id,
                    job.external_permalink,
                    to_epoch(job.posted_at),
                    job.last_error,
                    job.provider_response,
                ],
            )
            .map_err(InfraError::from)?;
            Ok(())
        })
        .await
        .map_err(InfraError::from)?
    }

    async fn find_due(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<PublishJob>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let db = Arc::clone(&self.db);
        let now_epoch = now.timestamp();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        task::spawn_blocking(move || -> Result<Vec<PublishJob>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(FIND_DUE_SQL).map_err(InfraError::from)?;
            let rows = stmt
                .query_map(params![now_epoch, limit], map_job_row)
                .map_err(InfraError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(InfraError::from)?;
            Ok(rows)
        })
        .await
        .map_err(InfraError::from)?
    }
}

fn map_job_row(row: &Row<'_>) -> rusqlite::Result<PublishJob> {
    let id: String = row.get(0)?;
    let media_raw: String = row.get(4)?;
    let state_raw: String = row.get(8)?;

    Ok(PublishJob {
        media_kind: parse_or_default(&id, "media_kind", &media_raw, MediaKind::Text),
        state: parse_or_default(&id, "state", &state_raw, JobState::Draft),
        tenant_id: row.get(1)?,
        account_id: row.get(2)?,
        name: row.get(3)?,
        message: row.get(5)?,
        media_url: row.get(6)?,
        scheduled_at: from_epoch(row.get(7)?),
        attempt_count: row.get(9)?,
        max_attempts: row.get(10)?,
        retry_interval_minutes: row.get(11)?,
        next_retry_at: from_epoch(row.get(12)?),
        external_post_id: row.get(13)?,
        external_permalink: row.get(14)?,
        posted_at: from_epoch(row.get(15)?),
        last_error: row.get(16)?,
        provider_response: row.get(17)?,
        id,
    })
}
