//! Periodic background differential sync.

use crate::error::{EngineResult, SyncError};
use crate::orchestrator::{SyncOrchestrator, SyncOutcome};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handle to a task running [`SyncOrchestrator::try_differential_sync`]
/// every interval.
///
/// Cancellation is observed between runs only; a run in progress always
/// completes. Dropping the handle signals the task to stop.
pub struct BackgroundSync {
    orchestrator: Arc<SyncOrchestrator>,
    interval: Duration,
    runs: Arc<AtomicU64>,
    cancel: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundSync {
    /// Spawns the task on the current tokio runtime.
    pub fn start(orchestrator: Arc<SyncOrchestrator>, interval: Duration) -> Self {
        let runs = Arc::new(AtomicU64::new(0));
        let (cancel, handle) = spawn(Arc::clone(&orchestrator), interval, Arc::clone(&runs));
        info!(?interval, "background sync started");
        Self {
            orchestrator,
            interval,
            runs,
            cancel,
            handle: Some(handle),
        }
    }

    /// Current interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of runs finished so far, skipped ones included.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    /// Cancels the task and restarts it with a new interval.
    pub async fn set_interval(&mut self, interval: Duration) -> EngineResult<()> {
        self.shutdown().await?;
        let (cancel, handle) = spawn(
            Arc::clone(&self.orchestrator),
            interval,
            Arc::clone(&self.runs),
        );
        self.cancel = cancel;
        self.handle = Some(handle);
        self.interval = interval;
        info!(?interval, "background sync restarted");
        Ok(())
    }

    /// Stops the task, waiting for a run in progress to finish. Returns the
    /// number of runs performed.
    pub async fn stop(mut self) -> EngineResult<u64> {
        self.shutdown().await?;
        info!(runs = self.runs(), "background sync stopped");
        Ok(self.runs())
    }

    async fn shutdown(&mut self) -> EngineResult<()> {
        let _ = self.cancel.send(true);
        if let Some(handle) = self.handle.take() {
            handle.await.map_err(|e| {
                warn!(error = %e, "background sync task failed");
                SyncError::Cancelled
            })?;
        }
        Ok(())
    }
}

impl Drop for BackgroundSync {
    fn drop(&mut self) {
        let _ = self.cancel.send(true);
    }
}

fn spawn(
    orchestrator: Arc<SyncOrchestrator>,
    interval: Duration,
    runs: Arc<AtomicU64>,
) -> (watch::Sender<bool>, JoinHandle<()>) {
    let (cancel, receiver) = watch::channel(false);
    let handle = tokio::spawn(run(orchestrator, interval, receiver, runs));
    (cancel, handle)
}

async fn run(
    orchestrator: Arc<SyncOrchestrator>,
    interval: Duration,
    mut cancel: watch::Receiver<bool>,
    runs: Arc<AtomicU64>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    break;
                }
                continue;
            }
        }

        match orchestrator.try_differential_sync().await {
            Ok(SyncOutcome::Skipped) => debug!("background sync skipped"),
            Ok(outcome) => debug!(message = outcome.message(), "background sync finished"),
            Err(SyncError::NotConfigured(_)) => debug!("background sync idle: not configured"),
            Err(e) => warn!(error = %e, "background sync failed"),
        }
        runs.fetch_add(1, Ordering::SeqCst);
    }
}
