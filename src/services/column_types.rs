//! Value typing shared by the ingestor, materializer, and fix applicator:
//! type inference from raw strings, timestamp parsing, and the boolean
//! truthy-token set.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::database::entities::common_types::DataType;

/// Tokens accepted as boolean `true` during materialization, case-insensitive.
pub const TRUTHY_TOKENS: [&str; 5] = ["true", "t", "yes", "sim", "1"];

const BOOLEAN_TOKENS: [&str; 8] = ["true", "false", "t", "f", "yes", "no", "sim", "nao"];

/// Infer a column type from a single raw value (the first data row's cell).
///
/// Checked in order: boolean token, integer, numeric, timestamp, text.
/// Empty values fall through to text. Deterministic for a fixed input.
pub fn infer_data_type(raw: &str) -> DataType {
    let value = raw.trim();
    if value.is_empty() {
        return DataType::Text;
    }

    let lower = value.to_lowercase();
    if BOOLEAN_TOKENS.contains(&lower.as_str()) {
        return DataType::Boolean;
    }

    if is_integer(value) {
        return DataType::Integer;
    }

    if value.parse::<f64>().is_ok() {
        return DataType::Numeric;
    }

    if parse_timestamp(value).is_some() {
        return DataType::Timestamp;
    }

    DataType::Text
}

fn is_integer(value: &str) -> bool {
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Parse a timestamp from the formats seen in uploaded business data and
/// normalize to UTC. Returns None when no known format matches.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%d/%m/%Y %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc());
        }
    }

    for format in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }

    None
}

/// Membership test against the fixed truthy-token set.
pub fn is_truthy(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    TRUTHY_TOKENS.contains(&lower.as_str())
}

/// Null semantics for staged values: null, missing, or empty string.
pub fn is_null_value(value: Option<&serde_json::Value>) -> bool {
    match value {
        None => true,
        Some(serde_json::Value::Null) => true,
        Some(serde_json::Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Raw string form of a staged JSON cell, for profiling and coercion.
pub fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_types_from_single_sample() {
        assert_eq!(infer_data_type("Ana"), DataType::Text);
        assert_eq!(infer_data_type("34"), DataType::Integer);
        assert_eq!(infer_data_type("-7"), DataType::Integer);
        assert_eq!(infer_data_type("3.14"), DataType::Numeric);
        assert_eq!(infer_data_type("true"), DataType::Boolean);
        assert_eq!(infer_data_type("SIM"), DataType::Boolean);
        assert_eq!(infer_data_type("2024-03-01"), DataType::Timestamp);
        assert_eq!(infer_data_type("01/03/2024"), DataType::Timestamp);
        assert_eq!(infer_data_type(""), DataType::Text);
    }

    #[test]
    fn integer_wins_over_numeric_for_whole_numbers() {
        assert_eq!(infer_data_type("1200"), DataType::Integer);
        assert_eq!(infer_data_type("1200.5"), DataType::Numeric);
    }

    #[test]
    fn numeric_one_is_integer_not_boolean() {
        // "1" is in the truthy set for coercion, but inference reads it as a number
        assert_eq!(infer_data_type("1"), DataType::Integer);
        assert!(is_truthy("1"));
    }

    #[test]
    fn truthy_set_is_case_insensitive() {
        assert!(is_truthy("TRUE"));
        assert!(is_truthy("Sim"));
        assert!(is_truthy("t"));
        assert!(!is_truthy("no"));
        assert!(!is_truthy("2"));
    }

    #[test]
    fn timestamp_parsing_normalizes_to_utc() {
        let dt = parse_timestamp("2024-03-01 10:30:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-01T10:30:00+00:00");
        assert!(parse_timestamp("not a date").is_none());
    }

    #[test]
    fn null_semantics_cover_missing_and_empty() {
        assert!(is_null_value(None));
        assert!(is_null_value(Some(&serde_json::Value::Null)));
        assert!(is_null_value(Some(&serde_json::json!(""))));
        assert!(!is_null_value(Some(&serde_json::json!("x"))));
        assert!(!is_null_value(Some(&serde_json::json!(0))));
    }
}
