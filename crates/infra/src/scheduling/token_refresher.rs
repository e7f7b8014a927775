//! Interval scheduler for the token refresh pass.

use std::sync::Arc;

use socialhub_core::TokenMaintenance;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::{SchedulerConfig, SchedulerError, SchedulerResult, JOIN_TIMEOUT};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Runs [`TokenMaintenance::refresh_due_tokens`] on a fixed interval.
///
/// Intended to tick far less often than the publish sweep; the non-forced
/// upgrade skips anything more than the safety margin from expiry, so a
/// daily pass keeps tokens alive without refresh traffic.
pub struct TokenRefreshScheduler {
    maintenance: Arc<TokenMaintenance>,
    config: SchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl TokenRefreshScheduler {
    /// Create a new scheduler.
    pub fn new(maintenance: Arc<TokenMaintenance>, config: SchedulerConfig) -> Self {
        Self {
            maintenance,
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

        info!(interval = ?self.config.interval, "starting token refresh scheduler");

        self.cancellation_token = CancellationToken::new();
        let maintenance = Arc::clone(&self.maintenance);
        let interval = self.config.interval;
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("token refresh loop cancelled");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        match maintenance.refresh_due_tokens().await {
                            Ok(summary) => {
                                if summary.examined > 0 {
                                    info!(
                                        examined = summary.examined,
                                        refreshed = summary.refreshed,
                                        failed = summary.failed,
                                        "token refresh tick"
                                    );
                                }
                            }
                            Err(err) => warn!(error = %err, "token refresh pass failed"),
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

        info!("token refresh scheduler stopped");
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

impl Drop for TokenRefreshScheduler {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() {
            self.cancellation_token.cancel();
        }
    }
}
