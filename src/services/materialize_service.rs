//! Schema Materializer: creates the tenant-scoped physical table for an
//! import and bulk-loads the staged rows into it.
//!
//! All identifiers pass through [`sanitize_identifier`] before reaching DDL;
//! no other code path may interpolate a user-supplied name into SQL. Cell
//! values are always bound as statement parameters.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DbBackend, Set, Statement,
    TransactionTrait, Value,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::database::entities::common_types::{DataType, ImportStatus};
use crate::database::entities::imports;
use crate::errors::{PipelineError, Result};
use crate::services::column_types::{is_truthy, parse_timestamp};
use crate::services::import_service::ImportService;

/// Columns every materialized table carries besides the imported ones.
const SYSTEM_COLUMNS: [&str; 4] = ["id", "organization_id", "created_at", "updated_at"];

/// sqlite caps bound parameters per statement; chunk rows to stay under it.
const MAX_BIND_PARAMS: usize = 900;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaterializeOutcome {
    pub table_name: String,
    pub rows_inserted: u64,
}

pub struct MaterializeService {
    db: DatabaseConnection,
}

impl MaterializeService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create (or reuse) the physical table and load `rows` in one
    /// all-or-nothing batch.
    ///
    /// Every cell is coerced to its declared type before anything touches the
    /// database, so a coercion failure leaves the import exactly as it was.
    pub async fn materialize(
        &self,
        import: &imports::Model,
        requested_table: &str,
        columns: &[ColumnSpec],
        org_id: &str,
        rows: &[serde_json::Value],
    ) -> Result<MaterializeOutcome> {
        if columns.is_empty() {
            return Err(PipelineError::Validation(
                "at least one column is required".into(),
            ));
        }

        let table = sanitize_identifier(requested_table);
        let physical = physical_columns(columns);

        // Coerce everything up front; CoercionError must abort before any write.
        let mut bound_rows: Vec<Vec<Value>> = Vec::with_capacity(rows.len());
        for row in rows {
            let mut bound: Vec<Value> = Vec::with_capacity(physical.len() + 1);
            bound.push(org_id.into());
            for (spec, _) in &physical {
                bound.push(coerce_cell(row.get(&spec.name), spec)?);
            }
            bound_rows.push(bound);
        }

        // Completed is allowed so re-materializing the same import (idempotent
        // create) is not an error. An import already in processing belongs to
        // an in-flight run and is rejected, as are pending/error imports.
        let imports_svc = ImportService::new(self.db.clone());
        imports_svc
            .transition(
                import.id,
                &[ImportStatus::Analyzing, ImportStatus::Completed],
                ImportStatus::Processing,
            )
            .await?;

        match self.create_and_load(&table, &physical, &bound_rows).await {
            Ok(inserted) => {
                imports::ActiveModel {
                    id: Set(import.id),
                    status: Set(ImportStatus::Completed.as_str().to_string()),
                    table_name: Set(Some(table.clone())),
                    row_count: Set(Some(inserted as i64)),
                    updated_at: Set(Utc::now()),
                    ..Default::default()
                }
                .update(&self.db)
                .await?;

                info!(import_id = import.id, table = %table, rows = inserted, "table materialized");
                Ok(MaterializeOutcome {
                    table_name: table,
                    rows_inserted: inserted,
                })
            }
            Err(err) => {
                imports_svc.mark_error(import.id, &err.to_string()).await;
                Err(err)
            }
        }
    }

    async fn create_and_load(
        &self,
        table: &str,
        physical: &[(ColumnSpec, String)],
        bound_rows: &[Vec<Value>],
    ) -> Result<u64> {
        self.create_table(table, physical).await?;

        let txn = self.db.begin().await?;

        let column_list: Vec<&str> = std::iter::once("organization_id")
            .chain(physical.iter().map(|(_, ident)| ident.as_str()))
            .collect();
        let params_per_row = column_list.len();
        let rows_per_chunk = (MAX_BIND_PARAMS / params_per_row).max(1);

        let mut inserted = 0u64;
        for chunk in bound_rows.chunks(rows_per_chunk) {
            let placeholders: Vec<String> = chunk
                .iter()
                .map(|_| format!("({})", vec!["?"; params_per_row].join(", ")))
                .collect();
            let sql = format!(
                "INSERT INTO \"{}\" ({}) VALUES {}",
                table,
                column_list
                    .iter()
                    .map(|c| format!("\"{c}\""))
                    .collect::<Vec<_>>()
                    .join(", "),
                placeholders.join(", ")
            );
            let values: Vec<Value> = chunk.iter().flatten().cloned().collect();
            let result = txn
                .execute(Statement::from_sql_and_values(DbBackend::Sqlite, sql, values))
                .await?;
            inserted += result.rows_affected();
        }

        txn.commit().await?;
        Ok(inserted)
    }

    /// Idempotent DDL: table, tenant index, and updated_at touch trigger all
    /// use IF NOT EXISTS, so re-invoking with the same name is not an error.
    async fn create_table(&self, table: &str, physical: &[(ColumnSpec, String)]) -> Result<()> {
        let mut column_defs = vec![
            "id INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
            "organization_id TEXT NOT NULL".to_string(),
        ];
        for (spec, ident) in physical {
            column_defs.push(format!("\"{}\" {}", ident, spec.data_type.sql_type()));
        }
        column_defs.push("created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP".to_string());
        column_defs.push("updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP".to_string());

        let create = format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" ({})",
            table,
            column_defs.join(", ")
        );
        let index = format!(
            "CREATE INDEX IF NOT EXISTS \"idx_{table}_organization_id\" ON \"{table}\" (organization_id)"
        );
        let trigger = format!(
            "CREATE TRIGGER IF NOT EXISTS \"trg_{table}_updated_at\" \
             AFTER UPDATE ON \"{table}\" FOR EACH ROW BEGIN \
             UPDATE \"{table}\" SET updated_at = CURRENT_TIMESTAMP WHERE id = NEW.id; \
             END"
        );

        for sql in [create, index, trigger] {
            debug!(%sql, "materializer DDL");
            self.db
                .execute(Statement::from_string(DbBackend::Sqlite, sql))
                .await?;
        }
        Ok(())
    }
}

/// Pair each requested column with its sanitized physical identifier,
/// deduplicating against system columns and earlier columns.
fn physical_columns(columns: &[ColumnSpec]) -> Vec<(ColumnSpec, String)> {
    let mut taken: Vec<String> = SYSTEM_COLUMNS.iter().map(|s| s.to_string()).collect();
    columns
        .iter()
        .map(|spec| {
            let mut ident = sanitize_identifier(&spec.name);
            if taken.contains(&ident) {
                let mut suffix = 2;
                while taken.contains(&format!("{ident}_{suffix}")) {
                    suffix += 1;
                }
                ident = format!("{ident}_{suffix}");
            }
            taken.push(ident.clone());
            (spec.clone(), ident)
        })
        .collect()
}

/// The single sanitization point for physical identifiers: lowercase, any
/// character outside `[a-z0-9_]` becomes `_`, and a leading digit gets a
/// `t_` prefix. DDL construction must never bypass this.
pub fn sanitize_identifier(raw: &str) -> String {
    let mut out: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() {
        out.push('_');
    }
    if out.as_bytes()[0].is_ascii_digit() {
        out = format!("t_{out}");
    }
    out
}

/// Convert one staged cell to a bound SQL value per the declared type.
/// Null and empty values pass through as SQL NULL for every type.
fn coerce_cell(cell: Option<&serde_json::Value>, spec: &ColumnSpec) -> Result<Value> {
    use crate::services::column_types::value_to_string;

    let raw = match cell {
        None | Some(serde_json::Value::Null) => return Ok(null_for(spec.data_type)),
        Some(v) => value_to_string(v),
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(null_for(spec.data_type));
    }

    let coercion_error = || PipelineError::Coercion {
        column: spec.name.clone(),
        value: raw.clone(),
        data_type: spec.data_type.as_str().to_string(),
    };

    let value = match spec.data_type {
        DataType::Text => Value::from(raw.clone()),
        DataType::Integer => {
            let n: i64 = trimmed.parse().map_err(|_| coercion_error())?;
            Value::from(n)
        }
        DataType::Numeric => {
            let n: f64 = trimmed.parse().map_err(|_| coercion_error())?;
            Value::from(n)
        }
        DataType::Boolean => Value::from(is_truthy(trimmed)),
        DataType::Timestamp => {
            let dt = parse_timestamp(trimmed).ok_or_else(coercion_error)?;
            Value::from(dt.to_rfc3339())
        }
    };
    Ok(value)
}

fn null_for(data_type: DataType) -> Value {
    match data_type {
        DataType::Text | DataType::Timestamp => Value::String(None),
        DataType::Integer => Value::BigInt(None),
        DataType::Numeric => Value::Double(None),
        DataType::Boolean => Value::Bool(None),
    }
}
