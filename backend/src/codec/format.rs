//! Value formatting for CSV cells.
//!
//! Every cell is plain text with no embedded structure:
//!
//! | Value            | Cell text                                  |
//! |------------------|--------------------------------------------|
//! | null             | `""`                                       |
//! | bool             | `Yes` / `No`                               |
//! | number           | decimal, no grouping                       |
//! | date             | ISO-8601 (`2024-01-31T08:00:00.000Z`)      |
//! | array of scalars | elements joined with `;`                   |
//! | object           | `name`, else `id`, else `email`, else JSON |

use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::{Map, Value};

/// Separator used for arrays of scalars inside a single cell.
pub const LIST_SEPARATOR: char = ';';

/// Fields tried, in order, to give an object a one-cell identity.
pub const IDENTITY_FIELDS: [&str; 3] = ["name", "id", "email"];

/// Format one value as CSV cell text.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::Number(n) => format_number(*n),
        Value::Text(s) => s.clone(),
        Value::Date(dt) => format_date(dt),
        Value::Object(map) => format_object(map),
        Value::Array(items) => match items.iter().find_map(Value::as_object) {
            // Object arrays are spread across rows before formatting;
            // one that slips through is shown by its first object.
            Some(first) => format_object(first),
            None => items
                .iter()
                .map(plain_text)
                .collect::<Vec<_>>()
                .join(&LIST_SEPARATOR.to_string()),
        },
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn format_date(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn format_number(n: f64) -> String {
    if n.is_finite() {
        // `Display` for f64 never uses grouping or exponent notation.
        n.to_string()
    } else {
        String::new()
    }
}

/// List elements are plain-text coerced, without the Yes/No mapping.
fn plain_text(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        other => format_value(other),
    }
}

fn format_object(map: &Map) -> String {
    identity_of(map)
        .map(format_value)
        .unwrap_or_else(|| serde_json::to_string(&Value::Object(map.clone())).unwrap_or_default())
}

/// First non-blank identity field of an object, if any.
pub fn identity_of(map: &Map) -> Option<&Value> {
    IDENTITY_FIELDS
        .iter()
        .filter_map(|field| map.get(*field))
        .find(|v| !v.is_blank())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn test_scalars() {
        assert_eq!(format_value(&Value::Null), "");
        assert_eq!(format_value(&Value::Bool(true)), "Yes");
        assert_eq!(format_value(&Value::Bool(false)), "No");
        assert_eq!(format_value(&Value::Number(42.0)), "42");
        assert_eq!(format_value(&Value::Number(1234567.5)), "1234567.5");
        assert_eq!(format_value(&Value::Number(-0.25)), "-0.25");
        assert_eq!(format_value(&Value::from("plain")), "plain");
    }

    #[test]
    fn test_date_is_iso() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 31, 8, 0, 0).unwrap();
        assert_eq!(format_value(&Value::Date(dt)), "2024-01-31T08:00:00.000Z");
    }

    #[test]
    fn test_scalar_array_joined() {
        assert_eq!(format_value(&v(json!(["a", "b", 3]))), "a;b;3");
        assert_eq!(format_value(&v(json!([true, null]))), "true;");
        assert_eq!(format_value(&v(json!([]))), "");
    }

    #[test]
    fn test_object_identity_order() {
        assert_eq!(format_value(&v(json!({ "name": "Ann", "id": 1 }))), "Ann");
        assert_eq!(format_value(&v(json!({ "id": 7, "email": "a@x.com" }))), "7");
        assert_eq!(format_value(&v(json!({ "email": "a@x.com" }))), "a@x.com");
        // Blank identity falls through to the next candidate.
        assert_eq!(format_value(&v(json!({ "name": "", "id": "u-1" }))), "u-1");
    }

    #[test]
    fn test_object_without_identity_is_json() {
        assert_eq!(
            format_value(&v(json!({ "city": "Oslo", "zip": "0150" }))),
            r#"{"city":"Oslo","zip":"0150"}"#
        );
    }

    #[test]
    fn test_stray_object_array_uses_first_item() {
        let value = v(json!([{ "name": "first" }, { "name": "second" }]));
        assert_eq!(format_value(&value), "first");
    }
}
