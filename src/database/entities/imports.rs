use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

pub use super::common_types::ImportStatus;

/// Import entity: one record per uploaded tabular file.
///
/// Tracks the lifecycle of the upload (`status`), the staging metadata
/// (row_count, error_message), the eventual materialized table name, and a
/// denormalized `data_quality` summary kept fresh by the quality analyzer
/// for fast dashboard reads. Imports are never deleted automatically.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "imports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub organization_id: String,
    pub name: String,
    pub filename: String,
    /// Physical table created by the materializer; None until completion.
    pub table_name: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub row_count: Option<i64>,
    /// Free-text dataset description, typically suggester-provided.
    pub context: Option<String>,
    /// JSON `{last_analysis_id, overall_quality, issues_count}`.
    #[sea_orm(column_type = "Text", nullable)]
    pub data_quality: Option<String>,
    pub created_by: Option<String>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::import_rows::Entity")]
    ImportRows,
    #[sea_orm(has_many = "super::import_columns::Entity")]
    ImportColumns,
    #[sea_orm(has_many = "super::analyses::Entity")]
    Analyses,
    #[sea_orm(has_many = "super::transformations::Entity")]
    Transformations,
}

impl Related<super::import_rows::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ImportRows.def()
    }
}

impl Related<super::import_columns::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ImportColumns.def()
    }
}

impl Related<super::analyses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Analyses.def()
    }
}

impl Related<super::transformations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transformations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub fn new() -> Self {
        Self {
            id: ActiveValue::NotSet,
            organization_id: ActiveValue::NotSet,
            name: ActiveValue::NotSet,
            filename: ActiveValue::NotSet,
            table_name: Set(None),
            status: Set(ImportStatus::Pending.as_str().to_string()),
            error_message: Set(None),
            row_count: Set(None),
            context: Set(None),
            data_quality: Set(None),
            created_by: Set(None),
            created_at: Set(chrono::Utc::now()),
            updated_at: Set(chrono::Utc::now()),
        }
    }
}

impl Model {
    pub fn status(&self) -> Option<ImportStatus> {
        ImportStatus::parse(&self.status)
    }
}
