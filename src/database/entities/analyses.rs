use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Analysis snapshot, append-only.
///
/// Each analyzer run inserts a new record; nothing ever updates an existing
/// one, so the audit history survives later corrective fixes. The crate
/// exposes no update path for this entity on purpose.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "analyses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub import_id: i32,
    /// e.g. "quality", "statistics", "duplicates".
    pub analysis_type: String,
    /// JSON parameters the run was invoked with.
    #[sea_orm(column_type = "Text")]
    pub configuration: String,
    /// JSON results payload; for quality runs: per-column qualities,
    /// overall_completeness, overall_quality, ordered issues.
    #[sea_orm(column_type = "Text")]
    pub results: String,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::imports::Entity",
        from = "Column::ImportId",
        to = "super::imports::Column::Id"
    )]
    Imports,
}

impl Related<super::imports::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Imports.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
