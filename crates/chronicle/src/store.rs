//! Persistence for repositories and commits.
//!
//! Free functions over a [`DatabaseConnection`] do the work; [`SeaOrmStore`]
//! bundles a connection with the shared statement cache, writer settings and
//! shutdown signal, and implements the [`SyncStore`] port the orchestrator
//! depends on.

mod bulk;
mod errors;
mod query;
mod single;
mod statements;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;

use crate::entity::repository::Model as RepositoryModel;
use crate::platform::{RepoKey, RepoSnapshot};
use crate::shutdown::ShutdownSignal;

pub use bulk::{
    DEFAULT_BATCH_SIZE, DEFAULT_WRITE_CONCURRENCY, NewCommit, WriterSettings, upsert_commits,
};
pub use errors::{Result, StoreError};
pub use query::{RepositoryStats, latest_commit_date, repository_stats};
pub use single::{find_by_key, find_by_name, list_all, upsert_repository, validate_key};
pub use statements::StatementCache;

/// Storage capability used by the sync orchestrator and monitor.
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Insert or update a repository keyed on `(owner, name)`.
    async fn upsert_repository(&self, snapshot: &RepoSnapshot) -> Result<()>;

    async fn find_repository(&self, key: &RepoKey) -> Result<Option<RepositoryModel>>;

    /// Every tracked repository.
    async fn list_repositories(&self) -> Result<Vec<RepositoryModel>>;

    /// The sync cursor: newest stored commit date.
    ///
    /// Fails with `EntityNotFound` or `NoRecordsYet`.
    async fn latest_commit_date(&self, key: &RepoKey) -> Result<DateTime<Utc>>;

    /// All-or-nothing batch upsert with the monotonic date policy.
    async fn upsert_commits(&self, commits: Vec<NewCommit>) -> Result<u64>;
}

/// [`SyncStore`] backed by a SeaORM connection.
#[derive(Debug)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
    statements: StatementCache,
    writer: WriterSettings,
    shutdown: ShutdownSignal,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection, writer: WriterSettings, shutdown: ShutdownSignal) -> Self {
        Self {
            db,
            statements: StatementCache::new(),
            writer,
            shutdown,
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl SyncStore for SeaOrmStore {
    async fn upsert_repository(&self, snapshot: &RepoSnapshot) -> Result<()> {
        single::upsert_repository(&self.db, snapshot).await
    }

    async fn find_repository(&self, key: &RepoKey) -> Result<Option<RepositoryModel>> {
        single::find_by_key(&self.db, key).await
    }

    async fn list_repositories(&self) -> Result<Vec<RepositoryModel>> {
        single::list_all(&self.db).await
    }

    async fn latest_commit_date(&self, key: &RepoKey) -> Result<DateTime<Utc>> {
        query::latest_commit_date(&self.db, key).await
    }

    async fn upsert_commits(&self, commits: Vec<NewCommit>) -> Result<u64> {
        bulk::upsert_commits(
            &self.db,
            &self.statements,
            &self.writer,
            &self.shutdown,
            commits,
        )
        .await
    }
}
