//! Periodic fan-out over every tracked repository.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::platform::{PlatformClient, RepoKey};
use crate::pool::{TaskError, TaskPool};
use crate::shutdown::ShutdownSignal;
use crate::store::SyncStore;

use super::error::SyncError;
use super::orchestrator::Syncer;
use super::types::{MonitorOptions, MonitorState, TickReport};

/// Runs a sync pass for every stored repository on a fixed interval.
pub struct Monitor<C, S> {
    syncer: Syncer<C, S>,
    options: MonitorOptions,
    shutdown: ShutdownSignal,
}

/// Handle to a spawned [`Monitor`].
#[derive(Debug)]
pub struct MonitorHandle {
    state: watch::Receiver<MonitorState>,
    join: JoinHandle<()>,
}

impl MonitorHandle {
    /// A receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<MonitorState> {
        self.state.clone()
    }

    /// Wait for the loop to stop.
    pub async fn join(self) -> Result<(), TaskError> {
        self.join.await.map_err(TaskError::from)
    }
}

impl<C, S> Monitor<C, S>
where
    C: PlatformClient + 'static,
    S: SyncStore + 'static,
{
    pub fn new(syncer: Syncer<C, S>, options: MonitorOptions, shutdown: ShutdownSignal) -> Self {
        Self {
            syncer,
            options,
            shutdown,
        }
    }

    /// Start the loop on the runtime.
    pub fn spawn(self) -> MonitorHandle {
        let (tx, rx) = watch::channel(MonitorState::Idle);
        let join = tokio::spawn(self.run(tx));
        MonitorHandle { state: rx, join }
    }

    /// Tick every `poll_interval` until shutdown. The first tick fires one
    /// interval after start.
    pub async fn run(self, state: watch::Sender<MonitorState>) {
        let period = self.options.poll_interval.max(std::time::Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = period.as_secs(),
            concurrency = self.options.concurrency,
            "Monitor started"
        );

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.wait() => break,
                _ = ticker.tick() => {
                    if self.shutdown.is_shutdown() {
                        break;
                    }
                    state.send_replace(MonitorState::Ticking);
                    let report = self.tick().await;
                    tracing::info!(
                        synced = report.synced.len(),
                        failed = report.failures.len(),
                        "Tick complete"
                    );
                    state.send_replace(MonitorState::Idle);
                }
            }
        }

        state.send_replace(MonitorState::Stopped);
        tracing::info!("Monitor stopped");
    }

    /// One pass over every stored repository.
    ///
    /// Each repository's failure is logged and collected; it never stops the
    /// others.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();

        let repositories = match self.syncer.store().list_repositories().await {
            Ok(repositories) => repositories,
            Err(e) => {
                tracing::warn!(error = %e, kind = %e.kind(), "Failed to list repositories");
                return report;
            }
        };
        let keys: Vec<RepoKey> = repositories.iter().map(|repo| repo.key()).collect();

        let pool = TaskPool::new(self.options.concurrency);
        let history_start = self.options.history_start;
        let results = pool
            .run_all(keys.clone(), |key| {
                let syncer = self.syncer.clone();
                async move { syncer.sync_from_cursor(&key, history_start).await }
            })
            .await;

        for (key, result) in keys.into_iter().zip(results) {
            let result = result.unwrap_or_else(|e| {
                Err(SyncError::Worker {
                    repo: key.to_string(),
                    message: e.to_string(),
                })
            });
            match result {
                Ok(outcome) => report.synced.push((key.to_string(), outcome)),
                Err(e) => {
                    tracing::warn!(
                        repo = %key,
                        kind = %e.kind(),
                        step = e.step(),
                        error = %e,
                        "Repository sync failed"
                    );
                    report.failures.push(e);
                }
            }
        }

        report
    }
}
