//! Domain models for the Recordport codec.
//!
//! This module contains the core data structures shared by export and import:
//!
//! - [`Value`] - Tagged union of everything a record field can hold
//! - [`Record`] - One logical domain entity (name → value)
//! - [`RowRecord`] - One flattened, array-free slice of a record (one CSV row)
//! - [`RawRow`] - One tokenized CSV row (header → raw text)
//! - [`ImportBatchResult`] - Aggregate outcome of an import

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

// =============================================================================
// Value
// =============================================================================

/// Object payload of a [`Value`].
pub type Map = BTreeMap<String, Value>;

/// A field value of a record.
///
/// Serializes through `serde_json::Value`. Dates become RFC 3339 text;
/// JSON strings always read back as [`Value::Text`], so a [`Value::Date`]
/// only exists where a caller builds one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(DateTime<Utc>),
    Object(Map),
    Array(Vec<Value>),
}

impl Value {
    /// Null, bool, number, text and date.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::Object(_) | Value::Array(_))
    }

    /// Null or empty text.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// True for an array holding at least one object.
    pub fn is_object_array(&self) -> bool {
        match self {
            Value::Array(items) => items.iter().any(|v| matches!(v, Value::Object(_))),
            _ => false,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Follow a dot-separated path through nested objects.
    pub fn pointer(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(self, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            _ => None,
        })
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => json!(b),
            Value::Number(n) => number_to_json(n),
            Value::Text(s) => json!(s),
            Value::Date(dt) => json!(crate::codec::format::format_date(&dt)),
            Value::Object(map) => serde_json::Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
            }
        }
    }
}

/// Integral numbers go out as JSON integers so ids stay `42`, not `42.0`.
fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        json!(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

// =============================================================================
// Records and rows
// =============================================================================

/// One logical domain entity.
pub type Record = BTreeMap<String, Value>;

/// One flattened row: flattened key → value. Never holds an array of objects
/// produced by the record itself; those are spread across sibling rows.
pub type RowRecord = BTreeMap<String, Value>;

/// One tokenized CSV data row: header text → raw cell text.
pub type RawRow = BTreeMap<String, String>;

/// Convert a JSON object into a [`Record`]. Non-objects yield `None`.
pub fn record_from_json(value: serde_json::Value) -> Option<Record> {
    match Value::from(value) {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Convert a [`Record`] into a JSON object.
pub fn record_to_json(record: Record) -> serde_json::Value {
    serde_json::Value::from(Value::Object(record))
}

// =============================================================================
// Import outcome
// =============================================================================

/// Aggregate outcome of a batch import.
///
/// `errors` holds one message per failed record, prefixed with the
/// 1-based position of the record among attempted records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatchResult {
    pub success_count: usize,
    pub errors: Vec<String>,
}

impl ImportBatchResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Imported: {} records, {} failed",
            self.success_count,
            self.errors.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_from_json_keeps_structure() {
        let value = Value::from(json!({
            "id": 7,
            "tags": ["a", "b"],
            "owner": { "name": "Ann" }
        }));

        assert_eq!(value.pointer("id"), Some(&Value::Number(7.0)));
        assert_eq!(value.pointer("owner.name"), Some(&Value::from("Ann")));
        assert!(matches!(value.pointer("tags"), Some(Value::Array(items)) if items.len() == 2));
    }

    #[test]
    fn test_timestamp_strings_stay_text() {
        let value = Value::from(json!("2024-05-01T12:00:00+02:00"));
        assert_eq!(value, Value::from("2024-05-01T12:00:00+02:00"));
    }

    #[test]
    fn test_typed_date_serializes_as_iso_text() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let json = serde_json::to_value(Value::Date(dt)).unwrap();
        assert_eq!(json, json!("2024-03-01T10:00:00.000Z"));
    }

    #[test]
    fn test_integral_numbers_serialize_as_integers() {
        let json = serde_json::to_value(Value::Number(42.0)).unwrap();
        assert_eq!(json, json!(42));

        let json = serde_json::to_value(Value::Number(2.5)).unwrap();
        assert_eq!(json, json!(2.5));
    }

    #[test]
    fn test_record_json_round_trip() {
        let record = record_from_json(json!({ "name": "Acme", "active": true })).unwrap();
        assert_eq!(record["active"], Value::Bool(true));
        assert_eq!(record_to_json(record), json!({ "name": "Acme", "active": true }));
        assert!(record_from_json(json!([1, 2])).is_none());
    }

    #[test]
    fn test_object_array_detection() {
        assert!(Value::from(json!([{ "a": 1 }])).is_object_array());
        assert!(!Value::from(json!(["a", "b"])).is_object_array());
        assert!(!Value::from(json!([])).is_object_array());
    }

    #[test]
    fn test_batch_result_serializes_camel_case() {
        let result = ImportBatchResult {
            success_count: 4,
            errors: vec!["Row 3: Missing required field 'name'".into()],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["successCount"], 4);
        assert_eq!(json["errors"][0], "Row 3: Missing required field 'name'");
    }
}
