use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, Statement,
    TransactionTrait, Value,
    sea_query::{Alias, Expr, OnConflict, Query, SimpleExpr},
};

use crate::entity::commit::{Column, Entity as Commit};
use crate::platform::CommitSnapshot;
use crate::pool::{DEFAULT_POOL_SIZE, TaskError, TaskPool};
use crate::shutdown::ShutdownSignal;

use super::errors::{Result, StoreError};
use super::statements::StatementCache;

/// Default number of commits per chunk.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default number of chunks written at once.
pub const DEFAULT_WRITE_CONCURRENCY: usize = DEFAULT_POOL_SIZE;

const COMMIT_UPSERT: &str = "commit_upsert";

/// Chunking and concurrency for [`upsert_commits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterSettings {
    pub batch_size: usize,
    pub concurrency: usize,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_WRITE_CONCURRENCY,
        }
    }
}

/// A commit in storage shape, attached to its repository's storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommit {
    pub repository_id: i32,
    pub sha: String,
    pub message: String,
    pub author_name: String,
    pub date: DateTime<Utc>,
    pub url: String,
}

impl NewCommit {
    pub fn from_snapshot(repository_id: i32, snapshot: CommitSnapshot) -> Self {
        Self {
            repository_id,
            sha: snapshot.sha,
            message: snapshot.message,
            author_name: snapshot.author_name,
            date: snapshot.date,
            url: snapshot.url,
        }
    }

    // Order matches COMMIT_COLUMNS.
    fn into_values(self, inserted_at: DateTime<Utc>) -> Vec<Value> {
        vec![
            self.sha.into(),
            self.repository_id.into(),
            self.message.into(),
            self.author_name.into(),
            self.date.fixed_offset().into(),
            self.url.into(),
            inserted_at.fixed_offset().into(),
        ]
    }
}

const COMMIT_COLUMNS: [Column; 7] = [
    Column::Sha,
    Column::RepositoryId,
    Column::Message,
    Column::AuthorName,
    Column::Date,
    Column::Url,
    Column::CreatedAt,
];

// ─── Statement Rendering ─────────────────────────────────────────────────────

/// Conflict clause for commit upserts.
///
/// A re-observed SHA is only rewritten when the incoming date is strictly
/// newer, so a stale retry can never move a stored date backwards.
pub(crate) fn build_commit_on_conflict() -> OnConflict {
    OnConflict::column(Column::Sha)
        .update_columns([
            Column::Message,
            Column::AuthorName,
            Column::Date,
            Column::Url,
        ])
        .action_and_where(
            Expr::col((Commit, Column::Date)).lt(Expr::col((Alias::new("excluded"), Column::Date))),
        )
        .to_owned()
}

/// Render the parameterized single-row upsert for `backend`.
pub(crate) fn render_commit_upsert(backend: DbBackend) -> Result<String> {
    let placeholder = NewCommit {
        repository_id: 0,
        sha: String::new(),
        message: String::new(),
        author_name: String::new(),
        date: DateTime::<Utc>::UNIX_EPOCH,
        url: String::new(),
    };
    let values: Vec<SimpleExpr> = placeholder
        .into_values(DateTime::<Utc>::UNIX_EPOCH)
        .into_iter()
        .map(SimpleExpr::from)
        .collect();

    let mut insert = Query::insert();
    insert
        .into_table(Commit)
        .columns(COMMIT_COLUMNS)
        .values(values)
        .map_err(|e| StoreError::Internal {
            message: format!("commit upsert template: {e}"),
        })?
        .on_conflict(build_commit_on_conflict());

    Ok(backend.build(&insert).sql)
}

// ─── Batch Writer ────────────────────────────────────────────────────────────

fn validate(commits: &[NewCommit]) -> Result<()> {
    for commit in commits {
        if commit.sha.trim().is_empty() {
            return Err(StoreError::invalid_input("commit sha is empty"));
        }
        if commit.repository_id <= 0 {
            return Err(StoreError::invalid_input(format!(
                "commit {} has no repository id",
                commit.sha
            )));
        }
    }
    Ok(())
}

fn into_chunks<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let size = size.max(1);
    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(size).collect());
    }
    chunks
}

async fn write_chunk(
    txn: &DatabaseTransaction,
    sql: &str,
    shutdown: &ShutdownSignal,
    chunk: Vec<NewCommit>,
) -> Result<u64> {
    let backend = txn.get_database_backend();
    let inserted_at = Utc::now();
    let mut written = 0;

    for commit in chunk {
        if shutdown.is_shutdown() {
            return Err(StoreError::Cancelled);
        }
        let stmt = Statement::from_sql_and_values(backend, sql, commit.into_values(inserted_at));
        written += txn.execute(stmt).await?.rows_affected();
    }

    Ok(written)
}

/// Upsert commits in one all-or-nothing transaction.
///
/// The list is split into `batch_size` chunks written concurrently by
/// `concurrency` workers that share one transaction and one cached
/// statement. Every chunk is awaited before the outcome is decided; if any
/// failed, the transaction is rolled back and `TransactionFailed` carries the
/// first cause. Failing to begin or commit the transaction is also
/// `TransactionFailed`, with every chunk counted as failed. Cancellation
/// rolls back.
///
/// Returns the number of rows inserted or advanced. An empty list returns
/// `Ok(0)` without opening a transaction.
pub async fn upsert_commits(
    db: &DatabaseConnection,
    statements: &StatementCache,
    settings: &WriterSettings,
    shutdown: &ShutdownSignal,
    commits: Vec<NewCommit>,
) -> Result<u64> {
    if commits.is_empty() {
        return Ok(0);
    }
    validate(&commits)?;
    if shutdown.is_shutdown() {
        return Err(StoreError::Cancelled);
    }

    let count = commits.len();
    let chunks = into_chunks(commits, settings.batch_size);
    let total = chunks.len();
    tracing::debug!(count, chunks = total, "Starting commit batch upsert");

    let txn = db
        .begin()
        .await
        .map_err(|e| nothing_committed(total, e.into()))?;

    let backend = txn.get_database_backend();
    let sql = match statements
        .get_or_render(COMMIT_UPSERT, || render_commit_upsert(backend))
        .await
    {
        Ok(sql) => sql,
        Err(e) => {
            rollback(txn).await;
            return Err(e);
        }
    };

    let txn = Arc::new(txn);
    let pool = TaskPool::new(settings.concurrency);

    let results = pool
        .run_all(chunks, |chunk| {
            let txn = Arc::clone(&txn);
            let sql = Arc::clone(&sql);
            let shutdown = shutdown.clone();
            async move { write_chunk(&txn, &sql, &shutdown, chunk).await }
        })
        .await;

    let mut written = 0u64;
    let mut failures: Vec<StoreError> = Vec::new();
    for result in results {
        match result {
            Ok(Ok(n)) => written += n,
            Ok(Err(e)) => failures.push(e),
            Err(TaskError::Panicked(message)) => failures.push(StoreError::Internal {
                message: format!("chunk writer panicked: {message}"),
            }),
            Err(e) => failures.push(StoreError::Internal {
                message: e.to_string(),
            }),
        }
    }

    let txn = Arc::try_unwrap(txn).map_err(|_| StoreError::Internal {
        message: "transaction still shared after all chunk writers finished".to_string(),
    })?;

    if shutdown.is_shutdown() {
        rollback(txn).await;
        return Err(StoreError::Cancelled);
    }

    if !failures.is_empty() {
        let failed = failures.len();
        for e in &failures {
            tracing::warn!(error = %e, "Commit chunk failed");
        }
        rollback(txn).await;
        let source = failures.swap_remove(0);
        return Err(StoreError::TransactionFailed {
            failed,
            total,
            source: Box::new(source),
        });
    }

    txn.commit()
        .await
        .map_err(|e| nothing_committed(total, e.into()))?;
    tracing::debug!(count, written, "Commit batch committed");
    Ok(written)
}

/// Failure to open or commit the batch transaction. No chunk is persisted.
fn nothing_committed(total: usize, source: StoreError) -> StoreError {
    StoreError::TransactionFailed {
        failed: total,
        total,
        source: Box::new(source),
    }
}

async fn rollback(txn: DatabaseTransaction) {
    if let Err(e) = txn.rollback().await {
        tracing::warn!(error = %e, "Rollback failed");
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};

    use super::*;
    use crate::shutdown::shutdown_channel;

    fn commit(sha: &str) -> NewCommit {
        NewCommit {
            repository_id: 1,
            sha: sha.to_string(),
            message: format!("commit {sha}"),
            author_name: "Ada".to_string(),
            date: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap_or_default(),
            url: format!("https://github.com/acme/widget/commit/{sha}"),
        }
    }

    fn exec_ok(rows: u64) -> MockExecResult {
        MockExecResult {
            rows_affected: rows,
            last_insert_id: 0,
        }
    }

    #[test]
    fn chunking_covers_every_item_once() {
        let chunks = into_chunks((0..2501).collect::<Vec<_>>(), 1000);
        let sizes: Vec<_> = chunks.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![1000, 1000, 501]);
        assert!(into_chunks(Vec::<u8>::new(), 1000).is_empty());
        assert_eq!(into_chunks(vec![1, 2, 3], 0).len(), 3);
    }

    #[test]
    fn rendered_sql_guards_on_strictly_newer_date() {
        let sql = render_commit_upsert(DatabaseBackend::Sqlite).expect("renders");
        assert!(sql.contains(r#"ON CONFLICT ("sha") DO UPDATE"#), "{sql}");
        assert!(
            sql.contains(r#"WHERE "commits"."date" < "excluded"."date""#),
            "{sql}"
        );
        assert!(!sql.contains(r#""repository_id" = "excluded"."repository_id""#));
        assert_eq!(sql.matches('?').count(), COMMIT_COLUMNS.len());

        let pg = render_commit_upsert(DatabaseBackend::Postgres).expect("renders");
        assert!(pg.contains("$7"), "{pg}");
    }

    #[tokio::test]
    async fn empty_input_touches_nothing() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let cache = StatementCache::new();

        let written = upsert_commits(
            &db,
            &cache,
            &WriterSettings::default(),
            &ShutdownSignal::never(),
            Vec::new(),
        )
        .await
        .expect("empty batch succeeds");

        assert_eq!(written, 0);
        assert!(cache.is_empty().await);
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn invalid_commit_is_rejected_before_io() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let mut bad = commit("abc");
        bad.sha = " ".to_string();

        let err = upsert_commits(
            &db,
            &StatementCache::new(),
            &WriterSettings::default(),
            &ShutdownSignal::never(),
            vec![commit("ok"), bad],
        )
        .await
        .expect_err("blank sha");

        assert!(matches!(err, StoreError::InvalidInput { .. }));
        assert!(db.into_transaction_log().is_empty());
    }

    #[tokio::test]
    async fn writes_every_record_inside_one_transaction() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_results([exec_ok(1), exec_ok(1), exec_ok(0)])
            .into_connection();
        let settings = WriterSettings {
            batch_size: 2,
            concurrency: 2,
        };

        let written = upsert_commits(
            &db,
            &StatementCache::new(),
            &settings,
            &ShutdownSignal::never(),
            vec![commit("a"), commit("b"), commit("c")],
        )
        .await
        .expect("batch should commit");

        assert_eq!(written, 2);
        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1, "one transaction expected: {log:?}");
        // BEGIN, three upserts, COMMIT
        assert_eq!(log[0].statements().len(), 5);
    }

    #[tokio::test]
    async fn failure_in_any_chunk_rolls_back_everything() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_results([exec_ok(1)])
            .append_exec_errors([DbErr::Custom("constraint violated".to_string())])
            .append_exec_results([exec_ok(1), exec_ok(1)])
            .into_connection();
        let settings = WriterSettings {
            batch_size: 1,
            concurrency: 1,
        };

        let err = upsert_commits(
            &db,
            &StatementCache::new(),
            &settings,
            &ShutdownSignal::never(),
            vec![commit("a"), commit("b"), commit("c"), commit("d")],
        )
        .await
        .expect_err("one failing record poisons the batch");

        match &err {
            StoreError::TransactionFailed {
                failed,
                total,
                source,
            } => {
                assert_eq!(*failed, 1);
                assert_eq!(*total, 4);
                assert!(matches!(**source, StoreError::Database(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.kind(), crate::ErrorKind::TransactionFailed);

        let log = db.into_transaction_log();
        let last = log[0]
            .statements()
            .last()
            .map(|s| s.sql.clone())
            .unwrap_or_default();
        assert_eq!(last, "ROLLBACK");
    }

    #[tokio::test]
    async fn cached_statement_matches_the_connection_backend() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec_ok(1)])
            .into_connection();
        let cache = StatementCache::new();

        upsert_commits(
            &db,
            &cache,
            &WriterSettings::default(),
            &ShutdownSignal::never(),
            vec![commit("a")],
        )
        .await
        .expect("write");

        let cached = cache
            .get_or_render(COMMIT_UPSERT, || Ok(String::new()))
            .await
            .expect("cached");
        assert!(cached.contains("$1"), "{cached}");
        assert!(!cached.contains('?'), "{cached}");
    }

    #[tokio::test]
    async fn begin_failure_is_a_failed_transaction() {
        let db = DatabaseConnection::Disconnected;
        let settings = WriterSettings {
            batch_size: 1,
            concurrency: 1,
        };

        let err = upsert_commits(
            &db,
            &StatementCache::new(),
            &settings,
            &ShutdownSignal::never(),
            vec![commit("a"), commit("b")],
        )
        .await
        .expect_err("no connection to begin on");

        match &err {
            StoreError::TransactionFailed {
                failed,
                total,
                source,
            } => {
                assert_eq!((*failed, *total), (2, 2));
                assert!(matches!(**source, StoreError::Database(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.kind(), crate::ErrorKind::TransactionFailed);
    }

    #[test]
    fn commit_failure_counts_every_chunk() {
        let err = nothing_committed(3, DbErr::Custom("database is locked".to_string()).into());
        assert!(matches!(
            err,
            StoreError::TransactionFailed {
                failed: 3,
                total: 3,
                ..
            }
        ));
        assert_eq!(err.kind(), crate::ErrorKind::TransactionFailed);
    }

    #[tokio::test]
    async fn cancelled_before_start_opens_no_transaction() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let (trigger, signal) = shutdown_channel();
        trigger.trigger();

        let err = upsert_commits(
            &db,
            &StatementCache::new(),
            &WriterSettings::default(),
            &signal,
            vec![commit("a")],
        )
        .await
        .expect_err("cancelled");

        assert!(matches!(err, StoreError::Cancelled));
        assert!(db.into_transaction_log().is_empty());
    }

    #[test]
    fn from_snapshot_attaches_repository_id() {
        let snapshot = CommitSnapshot {
            sha: "abc".to_string(),
            message: "init".to_string(),
            author_name: "Ada".to_string(),
            date: Utc::now(),
            url: "https://github.com/acme/widget/commit/abc".to_string(),
        };
        let commit = NewCommit::from_snapshot(9, snapshot);
        assert_eq!(commit.repository_id, 9);
        assert_eq!(commit.sha, "abc");
    }
}
