use axum::extract::{Path, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::Result;
use crate::server::app::AppState;
use crate::services::import_service::ImportService;
use crate::services::materialize_service::{ColumnSpec, MaterializeService};

#[derive(Deserialize)]
pub struct MaterializeRequest {
    pub table_name: String,
    pub organization_id: String,
    /// Defaults to the column metadata captured at ingestion.
    #[serde(default)]
    pub columns: Option<Vec<ColumnSpec>>,
    /// Defaults to the full staged row set.
    #[serde(default)]
    pub preview_data: Option<Vec<Value>>,
}

pub async fn materialize_table(
    State(state): State<AppState>,
    Path(import_id): Path<i32>,
    Json(payload): Json<MaterializeRequest>,
) -> Result<Json<Value>> {
    let imports_svc = ImportService::new(state.db.clone());
    let import = imports_svc
        .find_for_org(import_id, &payload.organization_id)
        .await?;

    let columns = match payload.columns {
        Some(columns) => columns,
        None => imports_svc
            .columns_of(import_id)
            .await?
            .into_iter()
            .map(|c| ColumnSpec {
                name: c.original_name.clone(),
                data_type: c.data_type(),
                description: c.description,
            })
            .collect(),
    };

    let rows = match payload.preview_data {
        Some(rows) => rows,
        None => {
            // Pull the full staged set page by page
            let mut rows = Vec::new();
            let mut page = 1;
            loop {
                let batch = imports_svc.staged_rows_page(import_id, page, 1000).await?;
                let fetched = batch.data.len() as u64;
                rows.extend(batch.data);
                if fetched < batch.page_size || rows.len() as u64 >= batch.total_rows {
                    break;
                }
                page += 1;
            }
            rows
        }
    };

    let outcome = MaterializeService::new(state.db.clone())
        .materialize(
            &import,
            &payload.table_name,
            &columns,
            &payload.organization_id,
            &rows,
        )
        .await?;

    Ok(Json(json!({
        "message": format!(
            "Table '{}' created with {} row(s)",
            outcome.table_name, outcome.rows_inserted
        ),
        "tableName": outcome.table_name,
    })))
}
