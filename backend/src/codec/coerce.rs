//! Guess a typed value from raw CSV cell text.
//!
//! Parsers are tried in order and the first success wins; text is the
//! fallback, so coercion never fails:
//!
//! 1. exactly `yes` / `true` / `no` / `false`, in any case → bool
//! 2. finite number → number
//! 3. contains `;` → array of trimmed, non-empty text elements
//! 4. anything else → the original text

use super::format::LIST_SEPARATOR;
use crate::models::Value;
use crate::schema::FieldKind;

/// A typed parser: `Some` when the cell matches its shape.
pub type CellParser = fn(&str) -> Option<Value>;

/// Parsers used when nothing is known about the column.
pub const DEFAULT_PARSERS: &[CellParser] = &[parse_bool, parse_number, parse_list];

/// Parsers for a column declared scalar: `;` never splits.
pub const SCALAR_PARSERS: &[CellParser] = &[parse_bool, parse_number];

/// Coerce with the default parser chain.
pub fn coerce(raw: &str) -> Value {
    coerce_with(raw, DEFAULT_PARSERS)
}

/// Coerce with an explicit parser chain.
pub fn coerce_with(raw: &str, parsers: &[CellParser]) -> Value {
    parsers
        .iter()
        .find_map(|parse| parse(raw))
        .unwrap_or_else(|| Value::Text(raw.to_string()))
}

/// Coerce a cell whose column kind is declared.
pub fn coerce_as(raw: &str, kind: FieldKind) -> Value {
    match kind {
        FieldKind::Scalar => coerce_with(raw, SCALAR_PARSERS),
        FieldKind::ArrayOfScalar => Value::Array(split_list(raw)),
        FieldKind::ArrayOfObject => coerce(raw),
    }
}

pub fn parse_bool(raw: &str) -> Option<Value> {
    match raw.to_lowercase().as_str() {
        "yes" | "true" => Some(Value::Bool(true)),
        "no" | "false" => Some(Value::Bool(false)),
        _ => None,
    }
}

pub fn parse_number(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    // Rust accepts "inf"/"nan" spellings; the finiteness check drops them.
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(Value::Number)
}

pub fn parse_list(raw: &str) -> Option<Value> {
    raw.contains(LIST_SEPARATOR)
        .then(|| Value::Array(split_list(raw)))
}

fn split_list(raw: &str) -> Vec<Value> {
    raw.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Value::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Value {
        Value::Array(items.iter().map(|s| Value::from(*s)).collect())
    }

    #[test]
    fn test_booleans_case_insensitive() {
        assert_eq!(coerce("Yes"), Value::Bool(true));
        assert_eq!(coerce("TRUE"), Value::Bool(true));
        assert_eq!(coerce("no"), Value::Bool(false));
        assert_eq!(coerce("False"), Value::Bool(false));
        assert_eq!(coerce("yess"), Value::from("yess"));
    }

    #[test]
    fn test_padded_booleans_stay_text() {
        assert_eq!(coerce(" yes "), Value::from(" yes "));
        assert_eq!(coerce("No "), Value::from("No "));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(coerce("42"), Value::Number(42.0));
        assert_eq!(coerce(" -3.5 "), Value::Number(-3.5));
        assert_eq!(coerce("1e3"), Value::Number(1000.0));
        assert_eq!(coerce("inf"), Value::from("inf"));
        assert_eq!(coerce("NaN"), Value::from("NaN"));
        assert_eq!(coerce("12 boxes"), Value::from("12 boxes"));
    }

    #[test]
    fn test_lists() {
        assert_eq!(coerce("a; b ;c"), texts(&["a", "b", "c"]));
        assert_eq!(coerce("a;;b;"), texts(&["a", "b"]));
    }

    #[test]
    fn test_text_fallback_keeps_original() {
        assert_eq!(coerce("  padded "), Value::from("  padded "));
        assert_eq!(coerce(""), Value::from(""));
    }

    #[test]
    fn test_declared_kinds() {
        assert_eq!(coerce_as("a;b", FieldKind::Scalar), Value::from("a;b"));
        assert_eq!(coerce_as("7", FieldKind::Scalar), Value::Number(7.0));
        assert_eq!(coerce_as("solo", FieldKind::ArrayOfScalar), texts(&["solo"]));
        assert_eq!(coerce_as("x;y", FieldKind::ArrayOfScalar), texts(&["x", "y"]));
    }
}
