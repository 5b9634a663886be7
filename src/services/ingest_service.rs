//! File Ingestor: parses an uploaded CSV or spreadsheet, infers column
//! types, records column metadata, and stages every row for the later
//! pipeline stages.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::database::entities::common_types::{DataType, FileFormat, ImportStatus};
use crate::database::entities::{import_columns, import_rows, imports};
use crate::errors::{PipelineError, Result};
use crate::services::column_types::infer_data_type;
use crate::services::import_service::ImportService;

/// Rows returned to the client for preview.
const PREVIEW_ROWS: usize = 10;
/// Raw values kept per column as a sample.
const SAMPLE_VALUES: usize = 5;
/// Staged rows per bulk insert.
const STAGING_CHUNK: usize = 500;

#[derive(Debug, Clone, Serialize)]
pub struct IngestedColumn {
    pub name: String,
    pub display_name: String,
    pub data_type: DataType,
    pub sample_values: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub file_id: i32,
    pub total_rows: u64,
    pub preview_data: Vec<serde_json::Value>,
    pub columns: Vec<IngestedColumn>,
}

/// Header row plus data rows, normalized to the header width.
struct ParsedFile {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

pub struct IngestService {
    db: DatabaseConnection,
}

impl IngestService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Ingest an uploaded file for a tenant: create the Import record, parse,
    /// infer types, stage rows, and return the preview payload.
    ///
    /// Failures after the Import record exists leave it in `error` with the
    /// captured message; partially staged rows are kept for diagnostics.
    pub async fn ingest_file(
        &self,
        org_id: &str,
        name: Option<String>,
        filename: &str,
        bytes: &[u8],
    ) -> Result<IngestOutcome> {
        let format = FileFormat::from_extension(filename)
            .ok_or_else(|| PipelineError::UnsupportedFormat(filename.to_string()))?;

        let display_name = name.unwrap_or_else(|| filename.to_string());
        let import = imports::ActiveModel {
            organization_id: Set(org_id.to_string()),
            name: Set(display_name),
            filename: Set(filename.to_string()),
            status: Set(ImportStatus::Uploaded.as_str().to_string()),
            ..imports::ActiveModel::new()
        }
        .insert(&self.db)
        .await?;

        debug!(import_id = import.id, format = format.as_str(), "ingesting file");

        match self.parse_and_stage(import.id, format, bytes).await {
            Ok(outcome) => {
                info!(
                    import_id = import.id,
                    rows = outcome.total_rows,
                    columns = outcome.columns.len(),
                    "file ingested"
                );
                Ok(outcome)
            }
            Err(err) => {
                ImportService::new(self.db.clone())
                    .mark_error(import.id, &err.to_string())
                    .await;
                Err(err)
            }
        }
    }

    async fn parse_and_stage(
        &self,
        import_id: i32,
        format: FileFormat,
        bytes: &[u8],
    ) -> Result<IngestOutcome> {
        let parsed = match format {
            FileFormat::Csv => parse_csv(bytes)?,
            FileFormat::Xlsx | FileFormat::Xls => parse_spreadsheet(bytes)?,
        };

        if parsed.headers.is_empty() {
            return Err(PipelineError::MalformedFile("no header row found".into()));
        }
        if parsed.rows.is_empty() {
            return Err(PipelineError::MalformedFile(
                "file must contain at least one data row".into(),
            ));
        }

        let columns = self.record_columns(import_id, &parsed).await?;
        let total_rows = self.stage_rows(import_id, &parsed).await?;

        let now = Utc::now();
        imports::ActiveModel {
            id: Set(import_id),
            status: Set(ImportStatus::Analyzing.as_str().to_string()),
            row_count: Set(Some(total_rows as i64)),
            updated_at: Set(now),
            ..Default::default()
        }
        .update(&self.db)
        .await?;

        let preview_data = parsed
            .rows
            .iter()
            .take(PREVIEW_ROWS)
            .map(|row| row_to_json(&parsed.headers, row))
            .collect();

        Ok(IngestOutcome {
            file_id: import_id,
            total_rows,
            preview_data,
            columns,
        })
    }

    /// One metadata row per header: original name, single-sample inferred
    /// type, and a capped sample of raw values.
    async fn record_columns(
        &self,
        import_id: i32,
        parsed: &ParsedFile,
    ) -> Result<Vec<IngestedColumn>> {
        let first_row = &parsed.rows[0];
        let now = Utc::now();

        let mut columns = Vec::with_capacity(parsed.headers.len());
        let mut models = Vec::with_capacity(parsed.headers.len());

        for (idx, header) in parsed.headers.iter().enumerate() {
            let data_type = infer_data_type(first_row.get(idx).map(String::as_str).unwrap_or(""));
            let sample_values: Vec<String> = parsed
                .rows
                .iter()
                .take(SAMPLE_VALUES)
                .map(|row| row.get(idx).cloned().unwrap_or_default())
                .collect();

            models.push(import_columns::ActiveModel {
                import_id: Set(import_id),
                original_name: Set(header.clone()),
                display_name: Set(header.clone()),
                description: Set(None),
                data_type: Set(data_type.as_str().to_string()),
                sample_values: Set(serde_json::to_string(&sample_values)?),
                statistics: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            });
            columns.push(IngestedColumn {
                name: header.clone(),
                display_name: header.clone(),
                data_type,
                sample_values,
            });
        }

        import_columns::Entity::insert_many(models)
            .exec(&self.db)
            .await?;

        Ok(columns)
    }

    /// Bulk-stage all rows keyed by `(import_id, row_number)`. The conflict
    /// target makes re-staging after a partial failure idempotent.
    async fn stage_rows(&self, import_id: i32, parsed: &ParsedFile) -> Result<u64> {
        let now = Utc::now();
        let mut staged = 0u64;

        for chunk in parsed.rows.chunks(STAGING_CHUNK) {
            let models: Vec<import_rows::ActiveModel> = chunk
                .iter()
                .enumerate()
                .map(|(offset, row)| import_rows::ActiveModel {
                    import_id: Set(import_id),
                    row_number: Set((staged as usize + offset + 1) as i32),
                    data: Set(row_to_json(&parsed.headers, row)),
                    created_at: Set(now),
                    ..Default::default()
                })
                .collect();

            import_rows::Entity::insert_many(models)
                .on_conflict(
                    OnConflict::columns([
                        import_rows::Column::ImportId,
                        import_rows::Column::RowNumber,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(&self.db)
                .await?;

            staged += chunk.len() as u64;
        }

        Ok(staged)
    }
}

fn row_to_json(headers: &[String], row: &[String]) -> serde_json::Value {
    let mut object = serde_json::Map::with_capacity(headers.len());
    for (idx, header) in headers.iter().enumerate() {
        let cell = row.get(idx).cloned().unwrap_or_default();
        object.insert(header.clone(), json!(cell));
    }
    serde_json::Value::Object(object)
}

fn parse_csv(bytes: &[u8]) -> Result<ParsedFile> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PipelineError::MalformedFile(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let width = headers.len();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| PipelineError::MalformedFile(e.to_string()))?;
        let mut row: Vec<String> = record.iter().map(|c| c.to_string()).collect();
        row.resize(width, String::new());
        row.truncate(width);
        rows.push(row);
    }

    Ok(ParsedFile { headers, rows })
}

/// First worksheet only; cells stringified the way the dashboard displays
/// them (integers without a trailing `.0`).
fn parse_spreadsheet(bytes: &[u8]) -> Result<ParsedFile> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PipelineError::MalformedFile("workbook has no worksheets".into()))?
        .map_err(|e| PipelineError::MalformedFile(e.to_string()))?;

    let width = range.width();
    let mut all_rows: Vec<Vec<String>> = Vec::with_capacity(range.height());
    for row_idx in 0..range.height() {
        let mut row = Vec::with_capacity(width);
        for col_idx in 0..width {
            let value = match range.get((row_idx, col_idx)) {
                Some(Data::String(s)) => s.clone(),
                Some(Data::Int(i)) => i.to_string(),
                Some(Data::Float(f)) => {
                    if f.fract() == 0.0 && f.abs() < 1e15 {
                        format!("{}", *f as i64)
                    } else {
                        f.to_string()
                    }
                }
                Some(Data::Bool(b)) => b.to_string(),
                Some(Data::Empty) | None => String::new(),
                Some(other) => other.to_string(),
            };
            row.push(value);
        }
        all_rows.push(row);
    }

    let mut iter = all_rows.into_iter();
    let headers = iter
        .next()
        .map(|row| row.iter().map(|h| h.trim().to_string()).collect())
        .unwrap_or_default();

    Ok(ParsedFile {
        headers,
        rows: iter.collect(),
    })
}
