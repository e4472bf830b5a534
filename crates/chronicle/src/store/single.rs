use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::OnConflict,
};

use crate::entity::repository::{ActiveModel, Column, Entity as Repository, Model};
use crate::platform::{RepoKey, RepoSnapshot};

use super::errors::{Result, StoreError};

// ─── Validation ──────────────────────────────────────────────────────────────

/// Reject blank identity fields before touching the database.
pub fn validate_key(owner: &str, name: &str) -> Result<()> {
    if owner.trim().is_empty() {
        return Err(StoreError::invalid_input("repository owner is empty"));
    }
    if name.trim().is_empty() {
        return Err(StoreError::invalid_input("repository name is empty"));
    }
    Ok(())
}

// ─── Single Record Operations ────────────────────────────────────────────────

/// Conflict clause for repository upserts: every attribute follows the remote.
///
/// `created_at` is the remote creation time, so it is refreshed too; only the
/// storage id survives.
pub(crate) fn build_upsert_on_conflict() -> OnConflict {
    OnConflict::columns([Column::Owner, Column::Name])
        .update_columns([
            Column::Description,
            Column::Url,
            Column::Language,
            Column::ForksCount,
            Column::StarsCount,
            Column::OpenIssuesCount,
            Column::WatchersCount,
            Column::CreatedAt,
            Column::UpdatedAt,
            Column::SyncedAt,
        ])
        .to_owned()
}

fn to_active_model(snapshot: &RepoSnapshot) -> ActiveModel {
    ActiveModel {
        owner: Set(snapshot.owner.clone()),
        name: Set(snapshot.name.clone()),
        description: Set(snapshot.description.clone()),
        url: Set(snapshot.url.clone()),
        language: Set(snapshot.language.clone()),
        forks_count: Set(snapshot.forks),
        stars_count: Set(snapshot.stars),
        open_issues_count: Set(snapshot.open_issues),
        watchers_count: Set(snapshot.watchers),
        created_at: Set(snapshot.created_at.map(|t| t.fixed_offset())),
        updated_at: Set(snapshot.updated_at.map(|t| t.fixed_offset())),
        synced_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
}

/// Insert a repository or update it in place, keyed on `(owner, name)`.
///
/// This is the only write path for repositories.
///
/// # Errors
/// `InvalidInput` for a blank owner or name, `Database` otherwise.
pub async fn upsert_repository(db: &DatabaseConnection, snapshot: &RepoSnapshot) -> Result<()> {
    validate_key(&snapshot.owner, &snapshot.name)?;

    Repository::insert(to_active_model(snapshot))
        .on_conflict(build_upsert_on_conflict())
        .exec_without_returning(db)
        .await?;

    tracing::debug!(repo = %snapshot.key(), "Repository upserted");
    Ok(())
}

/// Find a repository by its natural key.
pub async fn find_by_key(db: &DatabaseConnection, key: &RepoKey) -> Result<Option<Model>> {
    Repository::find()
        .filter(Column::Owner.eq(key.owner.as_str()))
        .filter(Column::Name.eq(key.name.as_str()))
        .one(db)
        .await
        .map_err(StoreError::from)
}

/// Find every repository with the given name, across owners.
pub async fn find_by_name(db: &DatabaseConnection, name: &str) -> Result<Vec<Model>> {
    Repository::find()
        .filter(Column::Name.eq(name))
        .order_by_asc(Column::Owner)
        .all(db)
        .await
        .map_err(StoreError::from)
}

/// Every tracked repository, oldest first.
pub async fn list_all(db: &DatabaseConnection) -> Result<Vec<Model>> {
    Repository::find()
        .order_by_asc(Column::Id)
        .all(db)
        .await
        .map_err(StoreError::from)
}
