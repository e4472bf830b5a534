//! Options and results for sync passes and monitoring ticks.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::pool::DEFAULT_POOL_SIZE;

use super::error::SyncError;

/// Default time between monitoring ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3600);

/// Default number of repositories synced at once within a tick.
pub const DEFAULT_CONCURRENCY: usize = DEFAULT_POOL_SIZE;

/// Where history starts for a repository with no stored commits.
pub fn default_history_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Settings for the monitoring loop.
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub poll_interval: Duration,
    /// Repositories synced at once within one tick.
    pub concurrency: usize,
    /// Lower bound for repositories that have no commits stored yet.
    pub history_start: DateTime<Utc>,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            concurrency: DEFAULT_CONCURRENCY,
            history_start: default_history_start(),
        }
    }
}

/// Result of one `sync_once` pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Storage id of the synced repository.
    pub repository_id: i32,
    /// Commits returned by the remote.
    pub fetched: usize,
    /// Rows inserted or advanced.
    pub written: u64,
}

impl SyncOutcome {
    pub fn is_noop(&self) -> bool {
        self.written == 0
    }
}

/// Aggregate of one monitoring tick.
#[derive(Debug, Default)]
pub struct TickReport {
    pub synced: Vec<(String, SyncOutcome)>,
    pub failures: Vec<SyncError>,
}

impl TickReport {
    pub fn attempted(&self) -> usize {
        self.synced.len() + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Lifecycle of the monitoring loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Waiting for the next tick.
    Idle,
    /// A tick is fanning out over repositories.
    Ticking,
    /// Cancelled; terminal.
    Stopped,
}
