//! Column Profiler: scans a column's staged values and computes counts,
//! an exact frequency distribution, and numeric aggregates when the column
//! is effectively numeric. Results are returned, never persisted here; the
//! quality analyzer owns persistence.

use indexmap::IndexMap;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};

use crate::database::entities::common_types::ColumnStatistics;
use crate::database::entities::{import_columns, import_rows, imports};
use crate::errors::{PipelineError, Result};
use crate::services::column_types::{is_null_value, value_to_string};

/// Staged rows fetched per page to bound memory on large imports.
const PROFILE_PAGE_SIZE: u64 = 1000;

/// How many top values make up the mode.
const MODE_TOP_K: usize = 3;

pub struct ProfileService {
    db: DatabaseConnection,
}

impl ProfileService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn profile_column(
        &self,
        import_id: i32,
        column_name: &str,
    ) -> Result<ColumnStatistics> {
        imports::Entity::find_by_id(import_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| PipelineError::not_found("Import", import_id.to_string()))?;

        import_columns::Entity::find()
            .filter(import_columns::Column::ImportId.eq(import_id))
            .filter(import_columns::Column::OriginalName.eq(column_name))
            .one(&self.db)
            .await?
            .ok_or_else(|| PipelineError::not_found("Column", column_name.to_string()))?;

        let mut accumulator = ColumnAccumulator::default();

        let paginator = import_rows::Entity::find()
            .filter(import_rows::Column::ImportId.eq(import_id))
            .order_by_asc(import_rows::Column::RowNumber)
            .paginate(&self.db, PROFILE_PAGE_SIZE);

        let mut pages = paginator;
        while let Some(rows) = pages.fetch_and_next().await? {
            for row in rows {
                accumulator.observe(row.data.get(column_name));
            }
        }

        Ok(accumulator.finish())
    }
}

/// Streaming accumulator over a column's raw values.
#[derive(Default)]
struct ColumnAccumulator {
    total: u64,
    nulls: u64,
    distribution: IndexMap<String, u64>,
    numeric: Vec<f64>,
    all_numeric: bool,
    seen_non_null: bool,
}

impl ColumnAccumulator {
    fn observe(&mut self, value: Option<&serde_json::Value>) {
        self.total += 1;

        if is_null_value(value) {
            self.nulls += 1;
            return;
        }

        let raw = value_to_string(value.unwrap_or(&serde_json::Value::Null));
        if !self.seen_non_null {
            self.seen_non_null = true;
            self.all_numeric = true;
        }
        match raw.trim().parse::<f64>() {
            Ok(n) if self.all_numeric => self.numeric.push(n),
            _ => self.all_numeric = false,
        }
        *self.distribution.entry(raw).or_insert(0) += 1;
    }

    fn finish(self) -> ColumnStatistics {
        let mut stats = ColumnStatistics {
            total_rows: self.total,
            null_count: self.nulls,
            distinct_count: self.distribution.len() as u64,
            ..Default::default()
        };

        if self.total > 0 {
            stats.completeness = Some(1.0 - self.nulls as f64 / self.total as f64);
            stats.uniqueness = Some(stats.distinct_count as f64 / self.total as f64);
        }

        stats.mode = top_k_by_frequency(&self.distribution, MODE_TOP_K);
        stats.distribution = self.distribution;

        if self.seen_non_null && self.all_numeric && !self.numeric.is_empty() {
            let mut sorted = self.numeric;
            sorted.sort_by(f64::total_cmp);
            fill_numeric_aggregates(&mut stats, &sorted);
        }

        stats
    }
}

/// Top `k` values by frequency; ties keep the order the values were first
/// encountered (stable sort over the encounter-ordered map).
fn top_k_by_frequency(distribution: &IndexMap<String, u64>, k: usize) -> Vec<String> {
    let mut entries: Vec<(&String, &u64)> = distribution.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1));
    entries.into_iter().take(k).map(|(v, _)| v.clone()).collect()
}

fn fill_numeric_aggregates(stats: &mut ColumnStatistics, sorted: &[f64]) {
    let n = sorted.len();
    let sum: f64 = sorted.iter().sum();
    let mean = sum / n as f64;

    // Population variance, not sample
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;

    stats.min = Some(sorted[0]);
    stats.max = Some(sorted[n - 1]);
    stats.mean = Some(mean);
    stats.median = Some(nearest_rank(sorted, 0.50));
    stats.standard_deviation = Some(variance.sqrt());
    stats.quartiles = Some([
        nearest_rank(sorted, 0.25),
        nearest_rank(sorted, 0.50),
        nearest_rank(sorted, 0.75),
    ]);
}

/// Nearest-rank percentile: index `floor(n * p)` into the ascending sort,
/// clamped to the last element. No interpolation.
fn nearest_rank(sorted: &[f64], p: f64) -> f64 {
    let idx = ((sorted.len() as f64 * p).floor() as usize).min(sorted.len() - 1);
    sorted[idx]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn observe_all(values: &[serde_json::Value]) -> ColumnStatistics {
        let mut acc = ColumnAccumulator::default();
        for v in values {
            acc.observe(Some(v));
        }
        acc.finish()
    }

    #[test]
    fn counts_nulls_and_distinct_values() {
        let stats = observe_all(&[json!("a"), json!(""), json!("b"), json!("a"), json!(null)]);
        assert_eq!(stats.total_rows, 5);
        assert_eq!(stats.null_count, 2);
        assert_eq!(stats.distinct_count, 2);
        assert_eq!(stats.completeness, Some(0.6));
        assert_eq!(stats.uniqueness, Some(0.4));
    }

    #[test]
    fn empty_column_has_undefined_ratios() {
        let acc = ColumnAccumulator::default();
        let stats = acc.finish();
        assert_eq!(stats.total_rows, 0);
        assert_eq!(stats.completeness, None);
        assert_eq!(stats.uniqueness, None);
    }

    #[test]
    fn numeric_aggregates_use_population_stddev() {
        let stats = observe_all(&[json!("2"), json!("4"), json!("4"), json!("4"), json!("5"), json!("5"), json!("7"), json!("9")]);
        assert_eq!(stats.mean, Some(5.0));
        // Population std-dev of the classic example set is exactly 2
        assert_eq!(stats.standard_deviation, Some(2.0));
        assert_eq!(stats.min, Some(2.0));
        assert_eq!(stats.max, Some(9.0));
    }

    #[test]
    fn percentiles_are_nearest_rank_not_interpolated() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(nearest_rank(&sorted, 0.25), 2.0);
        assert_eq!(nearest_rank(&sorted, 0.50), 3.0);
        assert_eq!(nearest_rank(&sorted, 0.75), 4.0);
        // p = 1.0 clamps to the last element
        assert_eq!(nearest_rank(&sorted, 1.0), 4.0);
    }

    #[test]
    fn one_text_value_disables_numeric_aggregates() {
        let stats = observe_all(&[json!("1"), json!("2"), json!("abc")]);
        assert_eq!(stats.mean, None);
        assert_eq!(stats.quartiles, None);
        assert_eq!(stats.distinct_count, 3);
    }

    #[test]
    fn mode_is_top_three_with_encounter_order_ties() {
        let stats = observe_all(&[
            json!("x"),
            json!("y"),
            json!("y"),
            json!("z"),
            json!("w"),
        ]);
        // y wins on count; x, z, w all tie at 1 and x was seen first
        assert_eq!(stats.mode, vec!["y", "x", "z"]);
    }
}
