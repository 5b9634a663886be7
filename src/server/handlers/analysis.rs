use axum::extract::{Path, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::Result;
use crate::server::app::AppState;
use crate::services::quality_service::QualityService;

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub table_name: String,
    pub organization_id: String,
}

pub async fn run_quality_analysis(
    State(state): State<AppState>,
    Path(import_id): Path<i32>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<Value>> {
    let report = QualityService::new(state.db.clone())
        .run_quality_analysis(import_id, &payload.table_name, &payload.organization_id)
        .await?;
    Ok(Json(json!({ "success": true, "analysis": report })))
}
