//! Integration tests for the storage layer against in-memory SQLite.
//!
//! Key scenarios tested:
//! - Repository upserts overwrite in place, keyed on (owner, name)
//! - Commit dates only move forward on conflict
//! - Batch writes are all-or-nothing across chunks
//! - Cursor states: unknown, no commits yet, newest date
//! - Deleting a repository cascades to its commits

#![cfg(all(feature = "sqlite", feature = "migrate"))]

use chrono::{DateTime, Duration, TimeZone, Utc};
use chronicle::connect_and_migrate;
use chronicle::entity::commit::{Column as CommitColumn, Entity as Commit};
use chronicle::entity::repository::Entity as Repository;
use chronicle::platform::{RepoKey, RepoSnapshot};
use chronicle::shutdown::ShutdownSignal;
use chronicle::store::{
    self, NewCommit, SeaOrmStore, StoreError, SyncStore, WriterSettings,
};
use chronicle::ErrorKind;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

async fn setup_test_db() -> DatabaseConnection {
    connect_and_migrate("sqlite::memory:")
        .await
        .expect("Failed to create test database")
}

fn test_store(db: DatabaseConnection, writer: WriterSettings) -> SeaOrmStore {
    SeaOrmStore::new(db, writer, ShutdownSignal::never())
}

fn snapshot(owner: &str, name: &str, stars: i32) -> RepoSnapshot {
    RepoSnapshot {
        owner: owner.to_string(),
        name: name.to_string(),
        description: Some("A widget".to_string()),
        url: format!("https://github.com/{owner}/{name}"),
        language: Some("Go".to_string()),
        forks: 3,
        stars,
        open_issues: 1,
        watchers: stars,
        created_at: Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
        updated_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
    }
}

fn day(n: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, n, 12, 0, 0).unwrap()
}

fn new_commit(repository_id: i32, sha: &str, date: DateTime<Utc>) -> NewCommit {
    NewCommit {
        repository_id,
        sha: sha.to_string(),
        message: format!("change {sha}"),
        author_name: "Grace".to_string(),
        date,
        url: format!("https://github.com/acme/widget/commit/{sha}"),
    }
}

async fn seed_repo(store: &SeaOrmStore, owner: &str, name: &str) -> i32 {
    store
        .upsert_repository(&snapshot(owner, name, 1))
        .await
        .expect("seed repository");
    store
        .find_repository(&RepoKey::new(owner, name))
        .await
        .expect("lookup")
        .expect("seeded row")
        .id
}

async fn stored_date(db: &DatabaseConnection, sha: &str) -> DateTime<Utc> {
    Commit::find()
        .filter(CommitColumn::Sha.eq(sha))
        .one(db)
        .await
        .expect("query")
        .expect("commit stored")
        .date
        .with_timezone(&Utc)
}

#[tokio::test]
async fn test_upsert_repository_twice_keeps_one_row_with_latest_values() {
    let db = setup_test_db().await;

    store::upsert_repository(&db, &snapshot("acme", "widget", 10))
        .await
        .expect("first upsert");
    let first = store::find_by_key(&db, &RepoKey::new("acme", "widget"))
        .await
        .expect("lookup")
        .expect("row");

    let mut second = snapshot("acme", "widget", 42);
    second.description = None;
    store::upsert_repository(&db, &second).await.expect("second upsert");

    let rows = store::list_all(&db).await.expect("list");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, first.id);
    assert_eq!(rows[0].stars_count, 42);
    assert_eq!(rows[0].description, None);
}

#[tokio::test]
async fn test_upsert_repository_rejects_blank_identity() {
    let db = setup_test_db().await;

    let err = store::upsert_repository(&db, &snapshot("", "widget", 1))
        .await
        .expect_err("blank owner");
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(Repository::find().count(&db).await.expect("count"), 0);
}

#[tokio::test]
async fn test_same_name_under_different_owners_are_distinct() {
    let db = setup_test_db().await;
    store::upsert_repository(&db, &snapshot("acme", "widget", 1))
        .await
        .expect("acme");
    store::upsert_repository(&db, &snapshot("globex", "widget", 2))
        .await
        .expect("globex");

    let matches = store::find_by_name(&db, "widget").await.expect("find");
    let owners: Vec<&str> = matches.iter().map(|r| r.owner.as_str()).collect();
    assert_eq!(owners, vec!["acme", "globex"]);
}

#[tokio::test]
async fn test_older_commit_date_never_overwrites_newer() {
    let store = test_store(setup_test_db().await, WriterSettings::default());
    let db = store.connection();
    let repo_id = seed_repo(&store, "acme", "widget").await;

    let written = store
        .upsert_commits(vec![new_commit(repo_id, "abc", day(10))])
        .await
        .expect("insert");
    assert_eq!(written, 1);

    let written = store
        .upsert_commits(vec![new_commit(repo_id, "abc", day(5))])
        .await
        .expect("stale upsert");
    assert_eq!(written, 0);
    assert_eq!(stored_date(db, "abc").await, day(10));

    store
        .upsert_commits(vec![new_commit(repo_id, "abc", day(20))])
        .await
        .expect("newer upsert");
    assert_eq!(stored_date(db, "abc").await, day(20));
    assert_eq!(Commit::find().count(db).await.expect("count"), 1);
}

#[tokio::test]
async fn test_empty_batch_is_a_noop() {
    let store = test_store(setup_test_db().await, WriterSettings::default());
    let db = store.connection();

    let written = store.upsert_commits(Vec::new()).await.expect("empty");
    assert_eq!(written, 0);
    assert_eq!(Commit::find().count(db).await.expect("count"), 0);
}

#[tokio::test]
async fn test_batch_spanning_many_chunks_writes_everything() {
    let store = test_store(
        setup_test_db().await,
        WriterSettings {
            batch_size: 2,
            concurrency: 3,
        },
    );
    let db = store.connection();
    let repo_id = seed_repo(&store, "acme", "widget").await;

    let commits: Vec<NewCommit> = (1..=9)
        .map(|i| new_commit(repo_id, &format!("sha{i}"), day(i)))
        .collect();
    let written = store.upsert_commits(commits).await.expect("batch");

    assert_eq!(written, 9);
    assert_eq!(Commit::find().count(db).await.expect("count"), 9);
}

#[tokio::test]
async fn test_failing_chunk_rolls_back_whole_batch() {
    let store = test_store(
        setup_test_db().await,
        WriterSettings {
            batch_size: 2,
            concurrency: 2,
        },
    );
    let db = store.connection();
    let repo_id = seed_repo(&store, "acme", "widget").await;

    // The last commit points at a repository that does not exist.
    let mut commits: Vec<NewCommit> = (1..=5)
        .map(|i| new_commit(repo_id, &format!("ok{i}"), day(i)))
        .collect();
    commits.push(new_commit(repo_id + 100, "orphan", day(6)));

    let err = store.upsert_commits(commits).await.expect_err("fk violation");
    assert!(matches!(err, StoreError::TransactionFailed { failed: 1, total: 3, .. }), "{err}");
    assert_eq!(err.kind(), ErrorKind::TransactionFailed);
    assert_eq!(Commit::find().count(db).await.expect("count"), 0);
}

#[tokio::test]
async fn test_commit_sha_is_unique_across_repositories() {
    let store = test_store(setup_test_db().await, WriterSettings::default());
    let db = store.connection();
    let widget = seed_repo(&store, "acme", "widget").await;
    let gadget = seed_repo(&store, "acme", "gadget").await;

    store
        .upsert_commits(vec![new_commit(widget, "shared", day(1))])
        .await
        .expect("first");
    store
        .upsert_commits(vec![new_commit(gadget, "shared", day(2))])
        .await
        .expect("second");

    assert_eq!(Commit::find().count(db).await.expect("count"), 1);
}

#[tokio::test]
async fn test_cursor_states() {
    let store = test_store(setup_test_db().await, WriterSettings::default());
    let db = store.connection();
    let key = RepoKey::new("acme", "widget");

    let err = store.latest_commit_date(&key).await.expect_err("unknown");
    assert!(matches!(err, StoreError::EntityNotFound { .. }));

    let repo_id = seed_repo(&store, "acme", "widget").await;
    let err = store.latest_commit_date(&key).await.expect_err("empty");
    assert!(matches!(err, StoreError::NoRecordsYet { .. }));
    assert_eq!(err.kind(), ErrorKind::NoRecordsYet);

    store
        .upsert_commits(vec![
            new_commit(repo_id, "a", day(3)),
            new_commit(repo_id, "b", day(9)),
            new_commit(repo_id, "c", day(7)),
        ])
        .await
        .expect("write");
    assert_eq!(store.latest_commit_date(&key).await.expect("cursor"), day(9));
}

#[tokio::test]
async fn test_cursor_is_scoped_to_one_repository() {
    let store = test_store(setup_test_db().await, WriterSettings::default());
    let db = store.connection();
    let widget = seed_repo(&store, "acme", "widget").await;
    let gadget = seed_repo(&store, "acme", "gadget").await;

    store
        .upsert_commits(vec![
            new_commit(widget, "w1", day(2)),
            new_commit(gadget, "g1", day(28)),
        ])
        .await
        .expect("write");

    let cursor = store
        .latest_commit_date(&RepoKey::new("acme", "widget"))
        .await
        .expect("cursor");
    assert_eq!(cursor, day(2));
}

#[tokio::test]
async fn test_deleting_repository_cascades_to_commits() {
    let store = test_store(setup_test_db().await, WriterSettings::default());
    let db = store.connection();
    let repo_id = seed_repo(&store, "acme", "widget").await;
    store
        .upsert_commits(vec![
            new_commit(repo_id, "a", day(1)),
            new_commit(repo_id, "b", day(2)),
        ])
        .await
        .expect("write");

    Repository::delete_by_id(repo_id)
        .exec(db)
        .await
        .expect("delete");

    assert_eq!(Commit::find().count(db).await.expect("count"), 0);
}

#[tokio::test]
async fn test_repository_stats() {
    let store = test_store(setup_test_db().await, WriterSettings::default());
    let db = store.connection();
    let repo_id = seed_repo(&store, "acme", "widget").await;

    let mut by_linus = new_commit(repo_id, "c", day(15));
    by_linus.author_name = "Linus".to_string();
    store
        .upsert_commits(vec![
            new_commit(repo_id, "a", day(4)),
            new_commit(repo_id, "b", day(1)),
            by_linus,
        ])
        .await
        .expect("write");

    let stats = store::repository_stats(db, &RepoKey::new("acme", "widget"))
        .await
        .expect("stats");
    assert_eq!(stats.total_commits, 3);
    assert_eq!(stats.unique_authors, 2);
    assert_eq!(stats.first_commit, Some(day(1)));
    assert_eq!(stats.last_commit, Some(day(15)));
}

#[tokio::test]
async fn test_cancelled_store_writes_nothing() {
    let (trigger, signal) = chronicle::shutdown::shutdown_channel();
    let store = SeaOrmStore::new(setup_test_db().await, WriterSettings::default(), signal);
    let db = store.connection();
    let repo_id = seed_repo(&store, "acme", "widget").await;

    trigger.trigger();
    let err = store
        .upsert_commits(vec![new_commit(repo_id, "a", Utc::now() - Duration::hours(1))])
        .await
        .expect_err("cancelled");

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(Commit::find().count(db).await.expect("count"), 0);
}
