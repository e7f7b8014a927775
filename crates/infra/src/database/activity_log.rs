//! SQLite-backed activity trail.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::params;
use socialhub_core::ActivityLog;
use socialhub_domain::Result;
use tokio::task;
use tracing::warn;

use super::manager::DbManager;
use crate::errors::InfraError;

/// Append-only activity trail. Write failures are logged and swallowed; the
/// trail is diagnostics, never control flow.
pub struct SqliteActivityLog {
    db: Arc<DbManager>,
}

impl SqliteActivityLog {
    /// Construct a log backed by the shared manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Messages recorded for one record, oldest first.
    pub async fn messages_for(&self, record_id: &str) -> Result<Vec<String>> {
        let db = Arc::clone(&self.db);
        let record_id = record_id.to_string();

        task::spawn_blocking(move || -> Result<Vec<String>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT message FROM activity_log WHERE record_id = ?1 ORDER BY created_at, id",
                )
                .map_err(InfraError::from)?;
            let rows = stmt
                .query_map(params![record_id], |row| row.get::<_, String>(0))
                .map_err(InfraError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(InfraError::from)?;
            Ok(rows)
        })
        .await
        .map_err(InfraError::from)?
    }
}

#[async_trait]
impl ActivityLog for SqliteActivityLog {
    async fn record(&self, record_id: &str, message: &str) {
        let db = Arc::clone(&self.db);
        let record_id = record_id.to_string();
        let message = message.to_string();
        let created_at = Utc::now().timestamp();

        let result = task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO activity_log (record_id, message, created_at) VALUES (?1, ?2, ?3)",
                params![record_id, message, created_at],
            )
            .map_err(InfraError::from)?;
            Ok(())
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "failed to record activity message"),
            Err(err) => warn!(error = %err, "activity log task failed"),
        }
    }
}
