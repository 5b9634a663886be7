use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transformation audit log, append-only and write-once.
///
/// One record per fix applicator invocation, even when zero rows changed.
/// Its existence is the only evidence a fix ran.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transformations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub import_id: i32,
    /// Target column, or "all" for table-wide operations.
    pub column_name: String,
    pub transformation_type: String,
    /// JSON parameters (fill value used, format applied, ...).
    #[sea_orm(column_type = "Text")]
    pub parameters: String,
    pub rows_affected: i64,
    pub applied_at: ChronoDateTimeUtc,
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
