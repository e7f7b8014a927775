//! Interval scheduler for the publish sweep.

use std::sync::Arc;

use socialhub_core::PublishEngine;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::{SchedulerConfig, SchedulerError, SchedulerResult, JOIN_TIMEOUT};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Runs [`PublishEngine::sweep`] on a fixed interval.
pub struct PublishSweepScheduler {
    engine: Arc<PublishEngine>,
    config: SchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl PublishSweepScheduler {
    /// Create a new scheduler.
    pub fn new(engine: Arc<PublishEngine>, config: SchedulerConfig) -> Self {
        Self {
            engine,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the background loop.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(interval = ?self.config.interval, "starting publish sweep scheduler");

        // Fresh token so the scheduler can restart after a stop
        self.cancellation_token = CancellationToken::new();
        let engine = Arc::clone(&self.engine);
        let interval = self.config.interval;
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("publish sweep loop cancelled");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        match engine.sweep().await {
                            Ok(summary) => {
                                if summary.examined > 0 {
                                    info!(
                                        examined = summary.examined,
                                        posted = summary.posted,
                                        requeued = summary.requeued,
                                        failed = summary.failed,
                                        "publish sweep tick"
                                    );
                                }
                            }
                            Err(err) => warn!(error = %err, "publish sweep failed"),
                        }
                    }
                }
            }
        });

        *self.task_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Stop the background loop gracefully.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation_token.cancel();
        if let Some(handle) = self.task_handle.lock().await.take() {
            tokio::time::timeout(JOIN_TIMEOUT, handle)
                .await
                .map_err(|source| SchedulerError::Timeout { duration: JOIN_TIMEOUT, source })??;
        }

        info!("publish sweep scheduler stopped");
        Ok(())
    }

    /// Whether the loop is currently running.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }
}

impl Drop for PublishSweepScheduler {
    fn drop(&mut self) {
        // Best-effort cleanup; the handle cannot be awaited here
        if !self.cancellation_token.is_cancelled() {
            self.cancellation_token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::database::{
        DbManager, SqliteAccountRepository, SqliteActivityLog, SqlitePublishJobRepository,
    };
    use crate::graph::GraphClient;

    fn engine(temp_dir: &TempDir) -> Arc<PublishEngine> {
        let manager = Arc::new(
            DbManager::new(temp_dir.path().join("test.db"), 2).expect("manager created"),
        );
        manager.run_migrations().expect("migrations run");
        let jobs = Arc::new(SqlitePublishJobRepository::new(manager.clone()));
        let accounts = Arc::new(SqliteAccountRepository::new(manager.clone()));
        let activity = Arc::new(SqliteActivityLog::new(manager));
        let graph =
            Arc::new(GraphClient::with_base_url("http://127.0.0.1:9").expect("client built"));
        Arc::new(PublishEngine::new(jobs, accounts, graph, activity))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn scheduler_lifecycle() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let mut scheduler = PublishSweepScheduler::new(
            engine(&temp_dir),
            SchedulerConfig { interval: Duration::from_millis(10) },
        );

        assert!(!scheduler.is_running());
        scheduler.start().await.expect("start succeeds");
        assert!(scheduler.is_running());

        // Let at least one tick run against the empty database
        tokio::time::sleep(Duration::from_millis(50)).await;

        scheduler.stop().await.expect("stop succeeds");
        assert!(!scheduler.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn double_start_fails() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let mut scheduler =
            PublishSweepScheduler::new(engine(&temp_dir), SchedulerConfig::default());

        scheduler.start().await.expect("start succeeds");
        assert!(matches!(scheduler.start().await, Err(SchedulerError::AlreadyRunning)));
        scheduler.stop().await.expect("stop succeeds");
    }

    #[tokio::test]
    async fn stop_without_start_fails() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let mut scheduler =
            PublishSweepScheduler::new(engine(&temp_dir), SchedulerConfig::default());
        assert!(matches!(scheduler.stop().await, Err(SchedulerError::NotRunning)));
    }
}
