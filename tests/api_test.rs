//! Handler-level tests over the HTTP surface.

use anyhow::Result;
use axum::http::StatusCode;
use axum_test::TestServer;
use sea_orm::Database;
use serde_json::{json, Value};
use tempfile::NamedTempFile;

use datalens::config::{AppConfig, DEFAULT_MAX_UPLOAD_BYTES};
use datalens::database::setup_database;
use datalens::server::app::create_app;

fn test_config() -> AppConfig {
    AppConfig {
        database_url: String::new(),
        bind_addr: "127.0.0.1:0".to_string(),
        cors_origin: None,
        max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        // No suggester configured: the advisory endpoint must still answer
        suggester: None,
    }
}

async fn setup_test_server() -> Result<TestServer> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    let app = create_app(db, &test_config()).await?;
    let server = TestServer::new(app)?;

    Ok(server)
}

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let server = setup_test_server().await?;

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["service"], "datalens");
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());

    Ok(())
}

#[tokio::test]
async fn test_unknown_fix_type_is_a_validation_error() -> Result<()> {
    let server = setup_test_server().await?;

    let response = server
        .post("/api/v1/imports/1/fixes")
        .json(&json!({
            "fix_type": "massage_gently",
            "organization_id": "org-1"
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("unknown fix type"));

    Ok(())
}

#[tokio::test]
async fn test_missing_import_returns_not_found() -> Result<()> {
    let server = setup_test_server().await?;

    let response = server
        .get("/api/v1/imports/999/rows")
        .add_query_param("organization_id", "org-1")
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_quality_analysis_on_missing_import_is_not_found() -> Result<()> {
    let server = setup_test_server().await?;

    let response = server
        .post("/api/v1/imports/42/analyze")
        .json(&json!({
            "table_name": "anything",
            "organization_id": "org-1"
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_suggest_endpoint_degrades_to_empty_suggestions() -> Result<()> {
    let server = setup_test_server().await?;

    let response = server
        .post("/api/v1/suggest-columns")
        .json(&json!({
            "description": "sales spreadsheet",
            "columns": [
                { "name": "vlr_tot", "type": "numeric", "sample": ["10.5", "99.0"] }
            ],
            "sample_data": []
        }))
        .await;

    // Advisory contract: never an error, just no suggestions
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["suggestions"], json!([]));

    Ok(())
}
