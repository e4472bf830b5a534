use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, sea_query::Expr,
};
use serde::Serialize;

use crate::entity::commit::{Column, Entity as Commit, Model as CommitModel};
use crate::platform::RepoKey;

use super::errors::{Result, StoreError};
use super::single::find_by_key;

// ─── Sync Cursor ─────────────────────────────────────────────────────────────

async fn newest_commit(db: &DatabaseConnection, repository_id: i32) -> Result<Option<CommitModel>> {
    Commit::find()
        .filter(Column::RepositoryId.eq(repository_id))
        .order_by_desc(Column::Date)
        .one(db)
        .await
        .map_err(StoreError::from)
}

async fn oldest_commit(db: &DatabaseConnection, repository_id: i32) -> Result<Option<CommitModel>> {
    Commit::find()
        .filter(Column::RepositoryId.eq(repository_id))
        .order_by_asc(Column::Date)
        .one(db)
        .await
        .map_err(StoreError::from)
}

/// The newest stored commit date for a repository.
///
/// This is the sync cursor. It is derived from stored commits on every call
/// and never written on its own.
///
/// # Errors
/// `EntityNotFound` when the repository is not tracked, `NoRecordsYet` when it
/// is tracked but owns no commits.
pub async fn latest_commit_date(db: &DatabaseConnection, key: &RepoKey) -> Result<DateTime<Utc>> {
    let repo = find_by_key(db, key)
        .await?
        .ok_or_else(|| StoreError::not_found_by_key(key))?;

    match newest_commit(db, repo.id).await? {
        Some(commit) => Ok(commit.date.with_timezone(&Utc)),
        None => Err(StoreError::NoRecordsYet {
            repo: key.to_string(),
        }),
    }
}

// ─── Statistics ──────────────────────────────────────────────────────────────

/// Commit totals for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryStats {
    pub repository: String,
    pub total_commits: u64,
    pub unique_authors: u64,
    pub first_commit: Option<DateTime<Utc>>,
    pub last_commit: Option<DateTime<Utc>>,
}

/// Commit totals, distinct authors and the date span for a repository.
///
/// # Errors
/// `EntityNotFound` when the repository is not tracked.
pub async fn repository_stats(db: &DatabaseConnection, key: &RepoKey) -> Result<RepositoryStats> {
    let repo = find_by_key(db, key)
        .await?
        .ok_or_else(|| StoreError::not_found_by_key(key))?;

    let total_commits = Commit::find()
        .filter(Column::RepositoryId.eq(repo.id))
        .count(db)
        .await?;

    let unique_authors: Option<i64> = Commit::find()
        .select_only()
        .column_as(Expr::col(Column::AuthorName).count_distinct(), "authors")
        .filter(Column::RepositoryId.eq(repo.id))
        .into_tuple()
        .one(db)
        .await?;

    let first_commit = oldest_commit(db, repo.id).await?;
    let last_commit = newest_commit(db, repo.id).await?;

    Ok(RepositoryStats {
        repository: key.to_string(),
        total_commits,
        unique_authors: unique_authors.map_or(0, |n| n.max(0) as u64),
        first_commit: first_commit.map(|c| c.date.with_timezone(&Utc)),
        last_commit: last_commit.map(|c| c.date.with_timezone(&Utc)),
    })
}
