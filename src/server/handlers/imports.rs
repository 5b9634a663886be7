use axum::extract::{Multipart, Path, Query, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::entities::imports;
use crate::errors::{PipelineError, Result};
use crate::server::app::AppState;
use crate::services::import_service::{ColumnLabelEdit, ImportService, RowPage};
use crate::services::ingest_service::{IngestOutcome, IngestService};

#[derive(Deserialize)]
pub struct TenantQuery {
    pub organization_id: String,
}

#[derive(Deserialize)]
pub struct RowsQuery {
    pub organization_id: String,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    100
}

/// Multipart upload: `file` (the spreadsheet/CSV), `organization_id`, and an
/// optional display `name`.
pub async fn ingest_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestOutcome>> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut organization_id: Option<String> = None;
    let mut name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PipelineError::Validation(e.to_string()))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                let filename = field
                    .file_name()
                    .map(|f| f.to_string())
                    .ok_or_else(|| PipelineError::Validation("file field needs a filename".into()))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| PipelineError::Validation(e.to_string()))?;
                file = Some((filename, bytes.to_vec()));
            }
            "organization_id" => {
                organization_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| PipelineError::Validation(e.to_string()))?,
                );
            }
            "name" => {
                name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| PipelineError::Validation(e.to_string()))?,
                );
            }
            _ => {}
        }
    }

    let (filename, bytes) =
        file.ok_or_else(|| PipelineError::Validation("missing 'file' field".into()))?;
    let organization_id = organization_id
        .ok_or_else(|| PipelineError::Validation("missing 'organization_id' field".into()))?;

    let outcome = IngestService::new(state.db.clone())
        .ingest_file(&organization_id, name, &filename, &bytes)
        .await?;

    Ok(Json(outcome))
}

pub async fn get_import(
    State(state): State<AppState>,
    Path(import_id): Path<i32>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<imports::Model>> {
    let import = ImportService::new(state.db.clone())
        .find_for_org(import_id, &query.organization_id)
        .await?;
    Ok(Json(import))
}

pub async fn get_staged_rows(
    State(state): State<AppState>,
    Path(import_id): Path<i32>,
    Query(query): Query<RowsQuery>,
) -> Result<Json<RowPage>> {
    let service = ImportService::new(state.db.clone());
    service
        .find_for_org(import_id, &query.organization_id)
        .await?;
    let page = service
        .staged_rows_page(import_id, query.page, query.page_size)
        .await?;
    Ok(Json(page))
}

#[derive(Deserialize)]
pub struct UpdateColumnsRequest {
    pub organization_id: String,
    /// Dataset description accepted along with the suggestions.
    #[serde(default)]
    pub context: Option<String>,
    pub columns: Vec<ColumnLabelEdit>,
}

/// Apply accepted suggester output or manual edits to display names and
/// descriptions. Original names and inferred types stay untouched.
pub async fn update_columns(
    State(state): State<AppState>,
    Path(import_id): Path<i32>,
    Json(payload): Json<UpdateColumnsRequest>,
) -> Result<Json<Value>> {
    let service = ImportService::new(state.db.clone());
    service
        .find_for_org(import_id, &payload.organization_id)
        .await?;
    if let Some(context) = &payload.context {
        service.set_context(import_id, context).await?;
    }
    let updated = service
        .update_column_labels(import_id, &payload.columns)
        .await?;
    Ok(Json(json!({ "success": true, "columns_updated": updated })))
}
