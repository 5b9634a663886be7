//! Import lookup, tenant checks, staged-row pagination, and the guarded
//! status transitions every pipeline stage goes through.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;
use tracing::warn;

use crate::database::entities::common_types::ImportStatus;
use crate::database::entities::{import_columns, import_rows, imports};
use crate::errors::{PipelineError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct RowPage {
    pub data: Vec<serde_json::Value>,
    pub total_rows: u64,
    pub page: u64,
    pub page_size: u64,
}

pub struct ImportService {
    db: DatabaseConnection,
}

impl ImportService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Fetch an import scoped to its owning tenant. An import belonging to a
    /// different organization is indistinguishable from a missing one.
    pub async fn find_for_org(&self, import_id: i32, org_id: &str) -> Result<imports::Model> {
        imports::Entity::find_by_id(import_id)
            .filter(imports::Column::OrganizationId.eq(org_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| PipelineError::not_found("Import", import_id.to_string()))
    }

    pub async fn columns_of(&self, import_id: i32) -> Result<Vec<import_columns::Model>> {
        let columns = import_columns::Entity::find()
            .filter(import_columns::Column::ImportId.eq(import_id))
            .order_by_asc(import_columns::Column::Id)
            .all(&self.db)
            .await?;
        Ok(columns)
    }

    /// Staged rows in upload order, one page at a time.
    pub async fn staged_rows_page(
        &self,
        import_id: i32,
        page: u64,
        page_size: u64,
    ) -> Result<RowPage> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, 1000);

        let paginator = import_rows::Entity::find()
            .filter(import_rows::Column::ImportId.eq(import_id))
            .order_by_asc(import_rows::Column::RowNumber)
            .paginate(&self.db, page_size);

        let total_rows = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;

        Ok(RowPage {
            data: rows.into_iter().map(|r| r.data).collect(),
            total_rows,
            page,
            page_size,
        })
    }

    /// Compare-and-set status gate: succeeds only when the import's current
    /// status is one of `from`. Concurrent stages racing on the same import
    /// see a Conflict instead of silently double-running.
    pub async fn transition(
        &self,
        import_id: i32,
        from: &[ImportStatus],
        to: ImportStatus,
    ) -> Result<()> {
        let expected: Vec<&str> = from.iter().map(|s| s.as_str()).collect();
        let result = imports::Entity::update_many()
            .col_expr(imports::Column::Status, Expr::value(to.as_str()))
            .col_expr(imports::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(imports::Column::Id.eq(import_id))
            .filter(imports::Column::Status.is_in(expected.clone()))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(PipelineError::Conflict(format!(
                "import {import_id} is not in any of {expected:?}"
            )));
        }
        Ok(())
    }

    /// Terminal failure: status = error plus the captured message, so the
    /// import stays diagnosable without a re-upload.
    pub async fn mark_error(&self, import_id: i32, message: &str) {
        let update = imports::ActiveModel {
            id: Set(import_id),
            status: Set(ImportStatus::Error.as_str().to_string()),
            error_message: Set(Some(message.to_string())),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        if let Err(err) = update.update(&self.db).await {
            warn!(import_id, %err, "failed to record import error state");
        }
    }

    /// Record the dataset description accepted alongside column suggestions.
    pub async fn set_context(&self, import_id: i32, context: &str) -> Result<()> {
        imports::ActiveModel {
            id: Set(import_id),
            context: Set(Some(context.to_string())),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await?;
        Ok(())
    }

    /// Apply accepted display-name/description edits. `original_name` and
    /// `data_type` stay immutable.
    pub async fn update_column_labels(
        &self,
        import_id: i32,
        edits: &[ColumnLabelEdit],
    ) -> Result<u64> {
        let mut updated = 0;
        for edit in edits {
            let column = import_columns::Entity::find()
                .filter(import_columns::Column::ImportId.eq(import_id))
                .filter(import_columns::Column::OriginalName.eq(&edit.original_name))
                .one(&self.db)
                .await?
                .ok_or_else(|| {
                    PipelineError::not_found("Column", edit.original_name.clone())
                })?;

            let mut active: import_columns::ActiveModel = column.into();
            if let Some(display_name) = &edit.display_name {
                active.display_name = Set(display_name.clone());
            }
            if let Some(description) = &edit.description {
                active.description = Set(Some(description.clone()));
            }
            active.updated_at = Set(Utc::now());
            active.update(&self.db).await?;
            updated += 1;
        }
        Ok(updated)
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ColumnLabelEdit {
    pub original_name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
}
