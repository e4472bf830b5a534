//! Repository entity: one tracked remote repository.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::platform::RepoKey;

/// A repository tracked by the sync engine, unique on `(owner, name)`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repositories")]
pub struct Model {
    /// Storage-assigned identity referenced by commits.
    #[sea_orm(primary_key)]
    pub id: i32,

    // ─── Naming ──────────────────────────────────────────────────────────────
    /// Owner login (user or organization).
    pub owner: String,
    /// Repository name.
    pub name: String,

    // ─── Content ─────────────────────────────────────────────────────────────
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    /// Canonical HTML URL.
    pub url: String,
    /// Primary programming language.
    pub language: Option<String>,

    // ─── Statistics ──────────────────────────────────────────────────────────
    pub forks_count: i32,
    pub stars_count: i32,
    pub open_issues_count: i32,
    pub watchers_count: i32,

    // ─── Timestamps ──────────────────────────────────────────────────────────
    /// When the repository was created on the remote.
    pub created_at: Option<DateTimeWithTimeZone>,
    /// When the repository was last updated on the remote.
    pub updated_at: Option<DateTimeWithTimeZone>,
    /// When this row was last refreshed by a sync pass.
    pub synced_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::commit::Entity")]
    Commit,
}

impl Related<super::commit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Commit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Natural key of this row.
    pub fn key(&self) -> RepoKey {
        RepoKey::new(&self.owner, &self.name)
    }
}
