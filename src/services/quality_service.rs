//! Quality Analyzer: computes per-column completeness/uniqueness against the
//! materialized table, flags threshold violations, and appends an immutable
//! analysis snapshot.
//!
//! This is the authoritative quality gate and deliberately reads the
//! materialized table, not the staging store.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    QueryFilter, Set, Statement,
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::database::entities::common_types::{ColumnStatistics, ImportStatus};
use crate::database::entities::{analyses, import_columns, imports};
use crate::errors::{PipelineError, Result};
use crate::services::import_service::ImportService;
use crate::services::materialize_service::sanitize_identifier;

/// A column is an issue below this completeness.
pub const ISSUE_THRESHOLD: f64 = 0.95;
/// Issue severity becomes high below this completeness.
pub const HIGH_SEVERITY_THRESHOLD: f64 = 0.8;
/// Quality weighting: completeness dominates uniqueness.
const COMPLETENESS_WEIGHT: f64 = 0.7;
const UNIQUENESS_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Serialize)]
pub struct ColumnQuality {
    pub column: String,
    pub completeness: f64,
    pub uniqueness: f64,
    pub quality: f64,
    pub null_count: u64,
    pub distinct_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityIssue {
    pub column: String,
    pub completeness: f64,
    pub severity: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub analysis_id: i32,
    pub columns: Vec<ColumnQuality>,
    pub issues: Vec<QualityIssue>,
    pub overall_completeness: f64,
    pub overall_quality: f64,
}

pub struct QualityService {
    db: DatabaseConnection,
}

impl QualityService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn run_quality_analysis(
        &self,
        import_id: i32,
        table_name: &str,
        org_id: &str,
    ) -> Result<QualityReport> {
        let imports_svc = ImportService::new(self.db.clone());
        imports_svc.find_for_org(import_id, org_id).await?;

        let columns = imports_svc.columns_of(import_id).await?;
        if columns.is_empty() {
            return Err(PipelineError::not_found("Columns for import", import_id.to_string()));
        }

        // Guarded gate: only a materialized import can be analyzed, and two
        // concurrent runs cannot both pass it. Completed is restored together
        // with the result.
        imports_svc
            .transition(import_id, &[ImportStatus::Completed], ImportStatus::Processing)
            .await?;

        match self.analyze(import_id, table_name, org_id, &columns).await {
            Ok(report) => Ok(report),
            Err(err) => {
                imports_svc.mark_error(import_id, &err.to_string()).await;
                Err(err)
            }
        }
    }

    async fn analyze(
        &self,
        import_id: i32,
        table_name: &str,
        org_id: &str,
        columns: &[import_columns::Model],
    ) -> Result<QualityReport> {
        let table = sanitize_identifier(table_name);
        let mut column_qualities = Vec::with_capacity(columns.len());
        let mut issues = Vec::new();

        for column in columns {
            let counts = match self.column_counts(&table, &column.original_name, org_id).await {
                Ok(counts) => counts,
                Err(err) => {
                    // Partial-failure tolerance: one bad column never aborts the run
                    warn!(
                        import_id,
                        column = %column.original_name,
                        %err,
                        "column statistics failed, skipping"
                    );
                    continue;
                }
            };

            let (completeness, uniqueness) = if counts.total > 0 {
                (
                    Some(1.0 - counts.nulls as f64 / counts.total as f64),
                    Some(counts.distinct as f64 / counts.total as f64),
                )
            } else {
                (None, None)
            };

            let stats = ColumnStatistics {
                total_rows: counts.total,
                null_count: counts.nulls,
                distinct_count: counts.distinct,
                completeness,
                uniqueness,
                ..Default::default()
            };

            // Statistics are replaced wholesale on every run
            let mut active: import_columns::ActiveModel = column.clone().into();
            active.statistics = Set(Some(serde_json::to_string(&stats)?));
            active.updated_at = Set(Utc::now());
            active.update(&self.db).await?;

            // Both ratios are undefined on an empty table: no issue flags and
            // no contribution to the overall scores.
            let (Some(completeness), Some(uniqueness)) = (completeness, uniqueness) else {
                continue;
            };

            if completeness < ISSUE_THRESHOLD {
                issues.push(QualityIssue {
                    column: column.original_name.clone(),
                    completeness,
                    severity: if completeness < HIGH_SEVERITY_THRESHOLD {
                        "high"
                    } else {
                        "medium"
                    },
                });
            }

            column_qualities.push(ColumnQuality {
                column: column.original_name.clone(),
                completeness,
                uniqueness,
                quality: COMPLETENESS_WEIGHT * completeness + UNIQUENESS_WEIGHT * uniqueness,
                null_count: counts.nulls,
                distinct_count: counts.distinct,
            });
        }

        let analyzed = column_qualities.len() as f64;
        let overall_completeness = if analyzed > 0.0 {
            column_qualities.iter().map(|c| c.completeness).sum::<f64>() / analyzed
        } else {
            0.0
        };
        let overall_quality = if analyzed > 0.0 {
            column_qualities.iter().map(|c| c.quality).sum::<f64>() / analyzed
        } else {
            0.0
        };

        let results = json!({
            "columns": column_qualities,
            "issues": issues,
            "overall_completeness": overall_completeness,
            "overall_quality": overall_quality,
        });

        // Append-only snapshot; a new run is always a new record
        let analysis = analyses::ActiveModel {
            import_id: Set(import_id),
            analysis_type: Set("quality".to_string()),
            configuration: Set(json!({ "table_name": table }).to_string()),
            results: Set(results.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        // Denormalized summary for fast dashboard reads; the same write
        // returns the import to completed, releasing the gate.
        let summary = json!({
            "last_analysis_id": analysis.id,
            "overall_quality": overall_quality,
            "issues_count": issues.len(),
        });
        imports::ActiveModel {
            id: Set(import_id),
            status: Set(ImportStatus::Completed.as_str().to_string()),
            data_quality: Set(Some(summary.to_string())),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&self.db)
        .await?;

        info!(
            import_id,
            analysis_id = analysis.id,
            columns = column_qualities.len(),
            issues = issues.len(),
            "quality analysis recorded"
        );

        Ok(QualityReport {
            analysis_id: analysis.id,
            columns: column_qualities,
            issues,
            overall_completeness,
            overall_quality,
        })
    }

    async fn column_counts(&self, table: &str, column: &str, org_id: &str) -> Result<ColumnCounts> {
        let ident = sanitize_identifier(column);
        let sql = format!(
            "SELECT COUNT(*) AS total, \
             COALESCE(SUM(CASE WHEN \"{ident}\" IS NULL OR \"{ident}\" = '' THEN 1 ELSE 0 END), 0) AS null_count, \
             COUNT(DISTINCT CASE WHEN \"{ident}\" IS NULL OR \"{ident}\" = '' THEN NULL ELSE \"{ident}\" END) AS distinct_count \
             FROM \"{table}\" WHERE organization_id = ?"
        );
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                DbBackend::Sqlite,
                sql,
                [org_id.into()],
            ))
            .await?
            .ok_or_else(|| PipelineError::Internal("count query returned no row".into()))?;

        Ok(ColumnCounts {
            total: row.try_get::<i64>("", "total")? as u64,
            nulls: row.try_get::<i64>("", "null_count")? as u64,
            distinct: row.try_get::<i64>("", "distinct_count")? as u64,
        })
    }
}

struct ColumnCounts {
    total: u64,
    nulls: u64,
    distinct: u64,
}
