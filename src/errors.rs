//! Pipeline error taxonomy.
//!
//! Every stage of the import pipeline reports failures through
//! [`PipelineError`]; the axum layer converts it to an HTTP status plus a
//! JSON `{"error": ...}` body in one place.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// File cannot be parsed, has no headers, or has no data rows.
    #[error("Malformed file: {0}")]
    MalformedFile(String),

    /// Unsupported upload format (extension not csv/xlsx/xls).
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Referenced import/column/table is missing or belongs to another tenant.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Missing or invalid request parameters, unknown fix type.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A staged value cannot be converted to its column's declared type.
    #[error("Cannot coerce value {value:?} in column '{column}' to {data_type}")]
    Coercion {
        column: String,
        value: String,
        data_type: String,
    },

    /// Requested operation does not apply to the column's type.
    #[error("Unsupported column type for this operation: {0}")]
    UnsupportedType(String),

    /// Import status did not match the stage's precondition.
    #[error("Conflicting import status: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

impl PipelineError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedFile(_)
            | Self::UnsupportedFormat(_)
            | Self::Validation(_)
            | Self::Coercion { .. }
            | Self::UnsupportedType(_)
            | Self::Csv(_)
            | Self::Spreadsheet(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Json(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
