use axum::extract::{Path, State};
use axum::response::Json;

use crate::database::entities::common_types::ColumnStatistics;
use crate::errors::Result;
use crate::server::app::AppState;
use crate::services::profile_service::ProfileService;

pub async fn column_statistics(
    State(state): State<AppState>,
    Path((import_id, column_name)): Path<(i32, String)>,
) -> Result<Json<ColumnStatistics>> {
    let stats = ProfileService::new(state.db.clone())
        .profile_column(import_id, &column_name)
        .await?;
    Ok(Json(stats))
}
