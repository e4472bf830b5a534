//! Commit entity: one observed commit, unique on `sha` across all repositories.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "commits")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Content hash.
    #[sea_orm(unique)]
    pub sha: String,
    /// Owning repository.
    pub repository_id: i32,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub author_name: String,
    /// Authored timestamp; never moves backwards once stored.
    pub date: DateTimeWithTimeZone,
    pub url: String,
    /// Local insert time.
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::repository::Entity",
        from = "Column::RepositoryId",
        to = "super::repository::Column::Id",
        on_delete = "Cascade"
    )]
    Repository,
}

impl Related<super::repository::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repository.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
