//! Fixed-size task pool.
//!
//! Used at two granularities: per-entity syncs inside a monitoring tick, and
//! per-chunk commit writes inside one batch upsert. Each call site owns its
//! own pool, so the two never share permits.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinError;

/// Default number of simultaneous workers.
pub const DEFAULT_POOL_SIZE: usize = 5;

/// Why a pooled task produced no value.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("task was aborted")]
    Aborted,

    #[error("task pool closed unexpectedly")]
    Closed,
}

impl From<JoinError> for TaskError {
    fn from(err: JoinError) -> Self {
        if err.is_panic() {
            let payload = err.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            TaskError::Panicked(message)
        } else {
            TaskError::Aborted
        }
    }
}

/// Semaphore-bounded spawner that always waits for every task.
#[derive(Debug, Clone)]
pub struct TaskPool {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl TaskPool {
    /// Create a pool with `size` workers. A size of zero is treated as one.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `task` for every item with at most `size` running at once.
    ///
    /// Results come back in input order. A failing or panicking task never
    /// short-circuits the rest: every spawned task is awaited before return.
    pub async fn run_all<I, F, Fut, T>(&self, items: I, task: F) -> Vec<Result<T, TaskError>>
    where
        I: IntoIterator,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let mut handles = Vec::new();

        for item in items {
            let semaphore = Arc::clone(&self.semaphore);
            let fut = task(item);

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return Err(TaskError::Closed),
                };
                Ok(fut.await)
            });

            handles.push(handle);
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => results.push(Err(TaskError::from(e))),
            }
        }
        results
    }
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}
