use std::sync::Arc;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use super::handlers::{analysis, fixes, health, imports, materialize, statistics, suggest};
use crate::config::AppConfig;
use crate::services::suggest_service::{suggester_from_config, ColumnSuggester};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub suggester: Arc<dyn ColumnSuggester>,
}

pub async fn create_app(db: DatabaseConnection, config: &AppConfig) -> Result<Router> {
    let state = AppState {
        db,
        suggester: Arc::from(suggester_from_config(config.suggester.clone())),
    };

    let cors = match &config.cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<axum::http::HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_v1_routes())
        .layer(ServiceBuilder::new().layer(cors))
        // Upload size policy is enforced at this boundary, not in the core
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .with_state(state);

    Ok(app)
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/imports", post(imports::ingest_file))
        .route("/imports/:id", get(imports::get_import))
        .route("/imports/:id/rows", get(imports::get_staged_rows))
        .route("/imports/:id/columns", put(imports::update_columns))
        .route(
            "/imports/:id/columns/:name/statistics",
            get(statistics::column_statistics),
        )
        .route("/imports/:id/analyze", post(analysis::run_quality_analysis))
        .route("/imports/:id/materialize", post(materialize::materialize_table))
        .route("/imports/:id/fixes", post(fixes::apply_fix))
        .route("/suggest-columns", post(suggest::suggest_columns))
}
