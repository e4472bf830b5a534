//! Incremental sync engine.
//!
//! # Module Structure
//!
//! - [`Syncer`] - one pass over one repository: `sync_once()`, `reset_sync()`
//! - [`Monitor`] - periodic fan-out over every stored repository
//! - [`SyncError`] - step-tagged failures
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use chronicle::shutdown::shutdown_channel;
//! use chronicle::sync::{Monitor, MonitorOptions, Syncer};
//!
//! let (trigger, signal) = shutdown_channel();
//! let syncer = Syncer::new(Arc::new(client), Arc::new(store), signal.clone());
//! syncer.sync_once(&"acme/widget".parse()?, None).await?;
//!
//! let handle = Monitor::new(syncer, MonitorOptions::default(), signal).spawn();
//! trigger.trigger();
//! handle.join().await?;
//! ```

mod error;
mod monitor;
mod orchestrator;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use error::SyncError;
pub use monitor::{Monitor, MonitorHandle};
pub use orchestrator::Syncer;
pub use types::{
    DEFAULT_CONCURRENCY, DEFAULT_POLL_INTERVAL, MonitorOptions, MonitorState, SyncOutcome,
    TickReport, default_history_start,
};
