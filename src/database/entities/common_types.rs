//! Shared column/import types used across entities, services, and handlers.
//!
//! Database columns store these as plain strings; the enums own the canonical
//! string forms via `as_str`/`parse` so every layer agrees on spelling.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Lifecycle of an import: pending → uploaded → analyzing → processing →
/// completed, with error as the terminal failure state of any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Pending,
    Uploaded,
    Analyzing,
    Processing,
    Completed,
    Error,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploaded => "uploaded",
            Self::Analyzing => "analyzing",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "uploaded" => Some(Self::Uploaded),
            "analyzing" => Some(Self::Analyzing),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Inferred column type; also drives the SQL type of materialized columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Text,
    Integer,
    Numeric,
    Boolean,
    Timestamp,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Numeric => "numeric",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "integer" => Some(Self::Integer),
            "numeric" => Some(Self::Numeric),
            "boolean" => Some(Self::Boolean),
            "timestamp" => Some(Self::Timestamp),
            _ => None,
        }
    }

    /// SQL column type for materialized tables (sqlite dialect).
    /// Timestamps are stored as ISO-8601 text.
    pub fn sql_type(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Numeric => "REAL",
            Self::Boolean => "BOOLEAN",
            Self::Timestamp => "TEXT",
        }
    }
}

/// Supported upload formats, detected from the filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
    Xls,
}

impl FileFormat {
    pub fn from_extension(filename: &str) -> Option<Self> {
        let lower = filename.to_lowercase();
        if lower.ends_with(".csv") {
            Some(Self::Csv)
        } else if lower.ends_with(".xlsx") {
            Some(Self::Xlsx)
        } else if lower.ends_with(".xls") {
            Some(Self::Xls)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
        }
    }
}

/// Corrective transformations the fix applicator knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixType {
    FillNulls,
    HandleDuplicates,
    StandardizeFormat,
}

impl FixType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FillNulls => "fill_nulls",
            Self::HandleDuplicates => "handle_duplicates",
            Self::StandardizeFormat => "standardize_format",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fill_nulls" => Some(Self::FillNulls),
            "handle_duplicates" => Some(Self::HandleDuplicates),
            "standardize_format" => Some(Self::StandardizeFormat),
            _ => None,
        }
    }
}

/// Per-column statistics, embedded as JSON in `import_columns.statistics`
/// and in quality analysis results.
///
/// `completeness = 1 - null_count/total_rows` and
/// `uniqueness = distinct_count/total_rows`; both are `None` when the column
/// has no rows. The numeric aggregates are present only when every non-null
/// value of the column parses as a number.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnStatistics {
    pub total_rows: u64,
    pub null_count: u64,
    pub distinct_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completeness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uniqueness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard_deviation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quartiles: Option<[f64; 3]>,
    /// Top 3 values by frequency, ties broken by encounter order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub mode: Vec<String>,
    /// Exact value→frequency map in encounter order.
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub distribution: IndexMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_status_round_trips() {
        for status in [
            ImportStatus::Pending,
            ImportStatus::Uploaded,
            ImportStatus::Analyzing,
            ImportStatus::Processing,
            ImportStatus::Completed,
            ImportStatus::Error,
        ] {
            assert_eq!(ImportStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ImportStatus::parse("bogus"), None);
    }

    #[test]
    fn file_format_detection_is_case_insensitive() {
        assert_eq!(FileFormat::from_extension("Data.CSV"), Some(FileFormat::Csv));
        assert_eq!(FileFormat::from_extension("book.xlsx"), Some(FileFormat::Xlsx));
        assert_eq!(FileFormat::from_extension("legacy.XLS"), Some(FileFormat::Xls));
        assert_eq!(FileFormat::from_extension("notes.txt"), None);
    }

    #[test]
    fn timestamp_columns_materialize_as_text() {
        assert_eq!(DataType::Timestamp.sql_type(), "TEXT");
        assert_eq!(DataType::Numeric.sql_type(), "REAL");
    }
}
