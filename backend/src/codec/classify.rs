//! Decide whether an import file spreads records across several rows.

use std::collections::HashMap;

use crate::models::RawRow;

/// Column whose value identifies a logical record.
pub const ID_COLUMN: &str = "id";

/// True when some non-empty `id` occurs on more than one row.
///
/// Files without an `id` column are always one record per row.
pub fn is_multi_row(rows: &[RawRow]) -> bool {
    if !has_id_column(rows) {
        return false;
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for id in rows.iter().filter_map(row_id) {
        let count = counts.entry(id).or_insert(0);
        *count += 1;
        if *count > 1 {
            return true;
        }
    }
    false
}

pub fn has_id_column(rows: &[RawRow]) -> bool {
    rows.iter().any(|row| row.contains_key(ID_COLUMN))
}

/// Trimmed `id` of a row; blank ids never group.
pub fn row_id(row: &RawRow) -> Option<&str> {
    row.get(ID_COLUMN)
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
}
