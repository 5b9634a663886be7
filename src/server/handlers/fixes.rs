use axum::extract::{Path, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::entities::common_types::FixType;
use crate::errors::{PipelineError, Result};
use crate::server::app::AppState;
use crate::services::fix_service::FixService;

#[derive(Deserialize)]
pub struct ApplyFixRequest {
    pub fix_type: String,
    pub organization_id: String,
    #[serde(default)]
    pub column: Option<String>,
}

pub async fn apply_fix(
    State(state): State<AppState>,
    Path(import_id): Path<i32>,
    Json(payload): Json<ApplyFixRequest>,
) -> Result<Json<Value>> {
    let fix_type = FixType::parse(&payload.fix_type).ok_or_else(|| {
        PipelineError::Validation(format!("unknown fix type: {}", payload.fix_type))
    })?;

    let outcome = FixService::new(state.db.clone())
        .apply_fix(
            import_id,
            fix_type,
            payload.column.as_deref(),
            &payload.organization_id,
        )
        .await?;

    let rows_key = match fix_type {
        FixType::HandleDuplicates => "rowsRemoved",
        _ => "rowsUpdated",
    };

    Ok(Json(json!({
        "success": true,
        rows_key: outcome.rows_affected,
        "message": outcome.message,
    })))
}
