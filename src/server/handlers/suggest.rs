use axum::extract::State;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::errors::Result;
use crate::server::app::AppState;
use crate::services::suggest_service::ColumnSample;

#[derive(Deserialize)]
pub struct SuggestRequest {
    #[serde(default)]
    pub description: Option<String>,
    pub columns: Vec<ColumnSample>,
    #[serde(default)]
    pub sample_data: Vec<Value>,
}

/// Advisory endpoint: provider failures degrade to an empty suggestion list
/// instead of an error, so callers never have to special-case it.
pub async fn suggest_columns(
    State(state): State<AppState>,
    Json(payload): Json<SuggestRequest>,
) -> Result<Json<Value>> {
    let suggestions = match state
        .suggester
        .suggest(
            payload.description.as_deref(),
            &payload.columns,
            &payload.sample_data,
        )
        .await
    {
        Ok(suggestions) => suggestions,
        Err(err) => {
            warn!(%err, "column suggester unavailable, returning no suggestions");
            Vec::new()
        }
    };

    Ok(Json(json!({ "suggestions": suggestions })))
}
