//! Fix Applicator: named corrective transformations against one column of a
//! materialized table. Every invocation appends exactly one audit record to
//! `transformations`, even when no rows changed; that record is the only
//! evidence the fix ran. Quality scores are not recomputed here.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DbBackend, Set, Statement,
    TransactionTrait, Value,
};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::database::entities::common_types::{DataType, FixType};
use crate::database::entities::transformations;
use crate::errors::{PipelineError, Result};
use crate::services::column_types::parse_timestamp;
use crate::services::import_service::ImportService;
use crate::services::materialize_service::sanitize_identifier;

/// Fill value for text columns when no non-null value exists to borrow.
const TEXT_FILL_FALLBACK: &str = "(não informado)";

#[derive(Debug, Clone, Serialize)]
pub struct FixOutcome {
    pub rows_affected: u64,
    pub message: String,
}

pub struct FixService {
    db: DatabaseConnection,
}

impl FixService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn apply_fix(
        &self,
        import_id: i32,
        fix_type: FixType,
        column: Option<&str>,
        org_id: &str,
    ) -> Result<FixOutcome> {
        let imports_svc = ImportService::new(self.db.clone());
        let import = imports_svc.find_for_org(import_id, org_id).await?;
        let table = import
            .table_name
            .clone()
            .ok_or_else(|| PipelineError::not_found("Materialized table for import", import_id.to_string()))?;

        let (rows_affected, parameters, message) = match fix_type {
            FixType::FillNulls => {
                let column = require_column(column)?;
                self.fill_nulls(&table, import_id, column, org_id).await?
            }
            FixType::HandleDuplicates => {
                self.handle_duplicates(&table, import_id, column, org_id)
                    .await?
            }
            FixType::StandardizeFormat => {
                let column = require_column(column)?;
                self.standardize_format(&table, import_id, column, org_id)
                    .await?
            }
        };

        // Audit record is appended unconditionally, zero rows included
        transformations::ActiveModel {
            import_id: Set(import_id),
            column_name: Set(column.unwrap_or("all").to_string()),
            transformation_type: Set(fix_type.as_str().to_string()),
            parameters: Set(parameters.to_string()),
            rows_affected: Set(rows_affected as i64),
            applied_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(
            import_id,
            fix = fix_type.as_str(),
            rows = rows_affected,
            "fix applied"
        );

        Ok(FixOutcome {
            rows_affected,
            message,
        })
    }

    /// Replace null/empty cells with a type-appropriate default. Text columns
    /// borrow the most frequent existing value, deterministic on ties.
    async fn fill_nulls(
        &self,
        table: &str,
        import_id: i32,
        column: &str,
        org_id: &str,
    ) -> Result<(u64, serde_json::Value, String)> {
        let data_type = self.declared_type(import_id, column).await?;
        let ident = sanitize_identifier(column);

        let fill_value: Value = match data_type {
            DataType::Integer => Value::from(0i64),
            DataType::Numeric => Value::from(0f64),
            DataType::Boolean => Value::from(false),
            DataType::Timestamp => Value::from(Utc::now().to_rfc3339()),
            DataType::Text => {
                let sql = format!(
                    "SELECT \"{ident}\" AS v FROM \"{table}\" \
                     WHERE organization_id = ? AND \"{ident}\" IS NOT NULL AND \"{ident}\" != '' \
                     GROUP BY \"{ident}\" ORDER BY COUNT(*) DESC, MIN(id) ASC LIMIT 1"
                );
                let top = self
                    .db
                    .query_one(Statement::from_sql_and_values(
                        DbBackend::Sqlite,
                        sql,
                        [org_id.into()],
                    ))
                    .await?
                    .and_then(|row| row.try_get::<Option<String>>("", "v").ok().flatten());
                Value::from(top.unwrap_or_else(|| TEXT_FILL_FALLBACK.to_string()))
            }
        };

        let fill_repr = format!("{fill_value:?}");
        let sql = format!(
            "UPDATE \"{table}\" SET \"{ident}\" = ? \
             WHERE organization_id = ? AND (\"{ident}\" IS NULL OR \"{ident}\" = '')"
        );
        let result = self
            .db
            .execute(Statement::from_sql_and_values(
                DbBackend::Sqlite,
                sql,
                [fill_value, org_id.into()],
            ))
            .await?;

        let rows = result.rows_affected();
        Ok((
            rows,
            json!({ "column": column, "data_type": data_type.as_str(), "fill_value": fill_repr }),
            format!("Filled {rows} empty value(s) in '{column}'"),
        ))
    }

    /// Remove duplicate rows, keeping the lowest id per duplicate group
    /// (first inserted wins). Without a target column the whole imported row
    /// is the duplicate key.
    async fn handle_duplicates(
        &self,
        table: &str,
        import_id: i32,
        column: Option<&str>,
        org_id: &str,
    ) -> Result<(u64, serde_json::Value, String)> {
        let group_by = match column {
            Some(column) => {
                // Validate against recorded metadata before touching SQL
                self.declared_type(import_id, column).await?;
                format!("\"{}\"", sanitize_identifier(column))
            }
            None => {
                let columns = ImportService::new(self.db.clone()).columns_of(import_id).await?;
                if columns.is_empty() {
                    return Err(PipelineError::not_found(
                        "Columns for import",
                        import_id.to_string(),
                    ));
                }
                columns
                    .iter()
                    .map(|c| format!("\"{}\"", sanitize_identifier(&c.original_name)))
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        };

        let sql = format!(
            "DELETE FROM \"{table}\" WHERE organization_id = ? AND id NOT IN \
             (SELECT MIN(id) FROM \"{table}\" WHERE organization_id = ? GROUP BY {group_by})"
        );
        let result = self
            .db
            .execute(Statement::from_sql_and_values(
                DbBackend::Sqlite,
                sql,
                [org_id.into(), org_id.into()],
            ))
            .await?;

        let rows = result.rows_affected();
        Ok((
            rows,
            json!({ "column": column.unwrap_or("all"), "keep": "first_seen" }),
            format!("Removed {rows} duplicate row(s)"),
        ))
    }

    /// Text columns are trimmed and lowercased; timestamp columns reformatted
    /// to ISO-8601 (unparseable values left untouched). Other types are not
    /// standardizable.
    async fn standardize_format(
        &self,
        table: &str,
        import_id: i32,
        column: &str,
        org_id: &str,
    ) -> Result<(u64, serde_json::Value, String)> {
        let data_type = self.declared_type(import_id, column).await?;
        let ident = sanitize_identifier(column);

        let rows = match data_type {
            DataType::Text => {
                let sql = format!(
                    "UPDATE \"{table}\" SET \"{ident}\" = LOWER(TRIM(\"{ident}\")) \
                     WHERE organization_id = ? AND \"{ident}\" IS NOT NULL AND \"{ident}\" != ''"
                );
                self.db
                    .execute(Statement::from_sql_and_values(
                        DbBackend::Sqlite,
                        sql,
                        [org_id.into()],
                    ))
                    .await?
                    .rows_affected()
            }
            DataType::Timestamp => {
                self.standardize_timestamps(table, &ident, org_id).await?
            }
            other => {
                return Err(PipelineError::UnsupportedType(format!(
                    "standardize_format does not support {} columns",
                    other.as_str()
                )));
            }
        };

        Ok((
            rows,
            json!({ "column": column, "data_type": data_type.as_str() }),
            format!("Standardized {rows} value(s) in '{column}'"),
        ))
    }

    /// Per-row rewrites land in a single transaction: a failure mid-column
    /// reformats nothing.
    async fn standardize_timestamps(&self, table: &str, ident: &str, org_id: &str) -> Result<u64> {
        let select = format!(
            "SELECT id, \"{ident}\" AS v FROM \"{table}\" \
             WHERE organization_id = ? AND \"{ident}\" IS NOT NULL AND \"{ident}\" != ''"
        );
        let rows = self
            .db
            .query_all(Statement::from_sql_and_values(
                DbBackend::Sqlite,
                select,
                [org_id.into()],
            ))
            .await?;

        let txn = self.db.begin().await?;
        let mut updated = 0u64;
        for row in rows {
            let id: i64 = row.try_get("", "id")?;
            let raw: String = row.try_get("", "v")?;
            let Some(parsed) = parse_timestamp(&raw) else {
                continue;
            };
            let iso = parsed.to_rfc3339();
            if iso == raw {
                continue;
            }
            let update = format!("UPDATE \"{table}\" SET \"{ident}\" = ? WHERE id = ?");
            let result = txn
                .execute(Statement::from_sql_and_values(
                    DbBackend::Sqlite,
                    update,
                    [Value::from(iso), Value::from(id)],
                ))
                .await?;
            updated += result.rows_affected();
        }
        txn.commit().await?;
        Ok(updated)
    }

    async fn declared_type(&self, import_id: i32, column: &str) -> Result<DataType> {
        let columns = ImportService::new(self.db.clone()).columns_of(import_id).await?;
        columns
            .iter()
            .find(|c| c.original_name == column)
            .map(|c| c.data_type())
            .ok_or_else(|| PipelineError::not_found("Column", column.to_string()))
    }
}

fn require_column(column: Option<&str>) -> Result<&str> {
    column.ok_or_else(|| PipelineError::Validation("a target column is required for this fix".into()))
}
