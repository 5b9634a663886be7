use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::common_types::{ColumnStatistics, DataType};

/// Column metadata captured at ingestion time.
///
/// `original_name` is immutable (exactly as found in the source file);
/// `display_name` and `description` may be edited manually or via accepted
/// suggester output. `statistics` is replaced wholesale by each quality
/// analyzer run.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "import_columns")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub import_id: i32,
    pub original_name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub data_type: String,
    /// JSON array of up to 5 raw sample values.
    #[sea_orm(column_type = "Text")]
    pub sample_values: String,
    /// JSON-encoded ColumnStatistics; None until the first analysis.
    #[sea_orm(column_type = "Text", nullable)]
    pub statistics: Option<String>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
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

impl Model {
    pub fn data_type(&self) -> DataType {
        DataType::parse(&self.data_type).unwrap_or(DataType::Text)
    }

    pub fn sample_values(&self) -> Vec<String> {
        serde_json::from_str(&self.sample_values).unwrap_or_default()
    }

    pub fn statistics(&self) -> Option<ColumnStatistics> {
        self.statistics
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}
