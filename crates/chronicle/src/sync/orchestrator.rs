//! One sync pass over one repository.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::platform::{PlatformClient, RepoKey};
use crate::shutdown::ShutdownSignal;
use crate::store::{NewCommit, StoreError, SyncStore};

use super::error::SyncError;
use super::types::SyncOutcome;

/// Drives `fetch repository -> store repository -> fetch commits -> store commits`.
///
/// Steps run strictly in order and none is retried; the next monitoring tick
/// is the retry.
pub struct Syncer<C, S> {
    client: Arc<C>,
    store: Arc<S>,
    shutdown: ShutdownSignal,
}

impl<C, S> Clone for Syncer<C, S> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            store: Arc::clone(&self.store),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<C, S> Syncer<C, S>
where
    C: PlatformClient,
    S: SyncStore,
{
    pub fn new(client: Arc<C>, store: Arc<S>, shutdown: ShutdownSignal) -> Self {
        Self {
            client,
            store,
            shutdown,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn ensure_running(&self, repo: &str) -> Result<(), SyncError> {
        if self.shutdown.is_shutdown() {
            return Err(SyncError::Cancelled {
                repo: repo.to_string(),
            });
        }
        Ok(())
    }

    /// Run one pass for `key`, fetching commits from `since` onwards.
    ///
    /// `None` fetches all history. An empty fetch is a successful no-op.
    #[tracing::instrument(skip(self, key), fields(repo = %key))]
    pub async fn sync_once(
        &self,
        key: &RepoKey,
        since: Option<DateTime<Utc>>,
    ) -> Result<SyncOutcome, SyncError> {
        let repo = key.to_string();

        self.ensure_running(&repo)?;
        let snapshot = self
            .client
            .fetch_repository(&key.owner, &key.name)
            .await
            .map_err(|source| SyncError::FetchRepository {
                repo: repo.clone(),
                source,
            })?;

        self.ensure_running(&repo)?;
        self.store
            .upsert_repository(&snapshot)
            .await
            .map_err(|source| SyncError::StoreRepository {
                repo: repo.clone(),
                source,
            })?;

        // Commits reference the storage id, not anything the remote reports.
        let stored = self
            .store
            .find_repository(key)
            .await
            .and_then(|found| found.ok_or_else(|| StoreError::not_found_by_key(key)))
            .map_err(|source| SyncError::LoadRepository {
                repo: repo.clone(),
                source,
            })?;

        self.ensure_running(&repo)?;
        let commits = self
            .client
            .fetch_commits_since(&key.owner, &key.name, since)
            .await
            .map_err(|source| SyncError::FetchCommits {
                repo: repo.clone(),
                source,
            })?;

        if commits.is_empty() {
            tracing::info!("No new commits");
            return Ok(SyncOutcome {
                repository_id: stored.id,
                fetched: 0,
                written: 0,
            });
        }

        let fetched = commits.len();
        let rows: Vec<NewCommit> = commits
            .into_iter()
            .map(|commit| NewCommit::from_snapshot(stored.id, commit))
            .collect();

        self.ensure_running(&repo)?;
        let written = self
            .store
            .upsert_commits(rows)
            .await
            .map_err(|source| SyncError::StoreCommits {
                repo: repo.clone(),
                source,
            })?;

        if written == 0 {
            tracing::info!(fetched, "No new commits");
        } else {
            tracing::info!(fetched, written, "Commits synced");
        }

        Ok(SyncOutcome {
            repository_id: stored.id,
            fetched,
            written,
        })
    }

    /// The `since` to use for `key`'s next pass.
    ///
    /// The stored cursor when one exists. A repository that is unknown or has
    /// no commits yet gets a full backfill from `history_start`.
    pub async fn resolve_since(
        &self,
        key: &RepoKey,
        history_start: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, SyncError> {
        match self.store.latest_commit_date(key).await {
            Ok(cursor) => Ok(cursor),
            Err(StoreError::NoRecordsYet { .. } | StoreError::EntityNotFound { .. }) => {
                tracing::debug!(repo = %key, since = %history_start, "No cursor yet, backfilling");
                Ok(history_start)
            }
            Err(source) => Err(SyncError::Cursor {
                repo: key.to_string(),
                source,
            }),
        }
    }

    /// Resolve the cursor for `key` and run one pass from it.
    pub async fn sync_from_cursor(
        &self,
        key: &RepoKey,
        history_start: DateTime<Utc>,
    ) -> Result<SyncOutcome, SyncError> {
        self.ensure_running(&key.to_string())?;
        let since = self.resolve_since(key, history_start).await?;
        self.sync_once(key, Some(since)).await
    }

    /// Replay the last `days` of history for `key`, ignoring the stored cursor.
    pub async fn reset_sync(&self, key: &RepoKey, days: u32) -> Result<SyncOutcome, SyncError> {
        let since = Utc::now() - Duration::days(i64::from(days));
        tracing::info!(repo = %key, days, since = %since, "Resetting sync cursor");
        self.sync_once(key, Some(since)).await
    }
}
