//! Header collection across an export batch.

use std::collections::BTreeSet;

use crate::models::RowRecord;

/// Sorted union of every flattened key seen in `rows`.
///
/// Must run over the whole batch: records contribute different keys, and a
/// key missing from a row is written as an empty cell.
pub fn collect_headers(rows: &[RowRecord]) -> Vec<String> {
    rows.iter()
        .flat_map(|row| row.keys())
        .cloned()
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Value;

    fn row(keys: &[&str]) -> RowRecord {
        keys.iter().map(|k| (k.to_string(), Value::Null)).collect()
    }

    #[test]
    fn test_union_is_sorted() {
        let rows = vec![row(&["name", "id"]), row(&["contacts.email", "id"])];
        assert_eq!(collect_headers(&rows), vec!["contacts.email", "id", "name"]);
    }

    #[test]
    fn test_order_independent() {
        let a = vec![row(&["b", "a"]), row(&["c"])];
        let b = vec![row(&["c"]), row(&["a", "b"])];
        assert_eq!(collect_headers(&a), collect_headers(&b));
    }

    #[test]
    fn test_empty_batch() {
        assert!(collect_headers(&[]).is_empty());
    }
}
