use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Staged row storage: every parsed row of an upload, as a JSON object keyed
/// by header name. `(import_id, row_number)` is unique so re-staging after a
/// partial failure is idempotent.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "import_rows")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub import_id: i32,
    pub row_number: i32,
    #[sea_orm(column_type = "JsonBinary")]
    pub data: serde_json::Value,
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
