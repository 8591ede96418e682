//! Rebuild nested records from tokenized CSV rows.
//!
//! Column names are dot paths; each path is nested back into objects. When
//! several rows share an `id`, they are one record whose object arrays were
//! spread across rows on export:
//!
//! ```text
//! CSV rows                                  Records
//! ┌──────────────────────────────────┐      ┌──────────────────────────────┐
//! │ id: A, name: X, eq.status: empty │      │ id: A, name: X               │
//! │ id: A, name: X, eq.status: full  │  →   │ eq: [{status: empty},        │
//! │ id: B, name: Y, eq.status: full  │      │      {status: full}]         │
//! └──────────────────────────────────┘      ├──────────────────────────────┤
//!                                           │ id: B, name: Y               │
//!                                           │ eq: [{status: full}]         │
//!                                           └──────────────────────────────┘
//! ```
//!
//! # Array roots
//!
//! An *array root* is the path of an array of objects (`eq` above). Columns
//! under a root build the items; all others build the base record from the
//! first row of the group.
//!
//! Without a schema, roots are inferred: a column whose value differs between
//! two rows of the same id makes its parent path a root. A root found in one
//! id group applies to every group, so single-row ids still get an array.
//! With a declared schema, its `array-of-object` paths are the roots.
//!
//! # Items
//!
//! Rows are walked in order. A row starts a new item when one of its values
//! differs from the current item's value for the same field; otherwise it is
//! merged into the current item. Identical consecutive items therefore
//! collapse into one, except under a schema when the group has a single
//! populated array (one row per item is then exact).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::classify::{is_multi_row, row_id};
use super::coerce::{coerce, coerce_as};
use crate::models::{Map, RawRow, Record, Value};
use crate::schema::RecordSchema;

/// A row after coercion; blank cells are omitted.
type CellRow = BTreeMap<String, Value>;

/// Rebuild records from raw rows.
pub fn reconstruct(rows: &[RawRow], schema: Option<&RecordSchema>) -> Vec<Record> {
    let cells: Vec<CellRow> = rows.iter().map(|row| coerce_row(row, schema)).collect();
    let declared = schema.map(RecordSchema::object_arrays).unwrap_or_default();

    if declared.is_empty() && !is_multi_row(rows) {
        return cells.iter().map(nest_row).collect();
    }

    let groups = group_rows(rows, &cells);
    let builder = if declared.is_empty() {
        RecordBuilder::new(outermost(infer_array_roots(&groups)), false)
    } else {
        RecordBuilder::new(outermost(declared), true)
    };

    groups.iter().map(|group| builder.build(group)).collect()
}

/// Array roots inferred from value variation within id groups.
fn infer_array_roots(groups: &[Vec<&CellRow>]) -> BTreeSet<String> {
    let mut roots = BTreeSet::new();

    for group in groups.iter().filter(|g| g.len() > 1) {
        let headers: BTreeSet<&String> = group.iter().flat_map(|row| row.keys()).collect();
        for header in headers {
            let first = group[0].get(header);
            if group[1..].iter().any(|row| row.get(header) != first) {
                roots.insert(parent_path(header).to_string());
            }
        }
    }

    roots
}

fn coerce_row(row: &RawRow, schema: Option<&RecordSchema>) -> CellRow {
    row.iter()
        .filter(|(_, cell)| !cell.trim().is_empty())
        .map(|(header, cell)| {
            let value = match schema.and_then(|s| s.kind_of(header)) {
                Some(kind) => coerce_as(cell, kind),
                None => coerce(cell),
            };
            (header.clone(), value)
        })
        .collect()
}

fn nest_row(row: &CellRow) -> Record {
    let mut record = Record::new();
    for (header, value) in row {
        insert_path(&mut record, header, value.clone());
    }
    record
}

/// Group rows by id in order of first appearance; id-less rows stand alone.
fn group_rows<'a>(rows: &'a [RawRow], cells: &'a [CellRow]) -> Vec<Vec<&'a CellRow>> {
    let mut groups: Vec<Vec<&CellRow>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for (raw, cell_row) in rows.iter().zip(cells) {
        match row_id(raw) {
            Some(id) => match index.get(id) {
                Some(&i) => groups[i].push(cell_row),
                None => {
                    index.insert(id, groups.len());
                    groups.push(vec![cell_row]);
                }
            },
            None => groups.push(vec![cell_row]),
        }
    }

    groups
}

/// `a.b.c` → `a.b`; a single segment is its own root.
fn parent_path(header: &str) -> &str {
    header.rsplit_once('.').map_or(header, |(parent, _)| parent)
}

/// Drop roots nested inside another root.
fn outermost(roots: BTreeSet<String>) -> BTreeSet<String> {
    roots
        .iter()
        .filter(|root| !roots.iter().any(|other| is_under(root, other)))
        .cloned()
        .collect()
}

fn is_under(path: &str, root: &str) -> bool {
    path.len() > root.len() && path.starts_with(root) && path.as_bytes()[root.len()] == b'.'
}

/// Accumulates one record from its id group.
struct RecordBuilder {
    roots: BTreeSet<String>,
    declared: bool,
}

impl RecordBuilder {
    fn new(roots: BTreeSet<String>, declared: bool) -> Self {
        Self { roots, declared }
    }

    fn root_for(&self, header: &str) -> Option<&str> {
        self.roots
            .iter()
            .find(|root| header == root.as_str() || is_under(header, root))
            .map(String::as_str)
    }

    fn build(&self, rows: &[&CellRow]) -> Record {
        let mut record = Record::new();

        if let Some(first) = rows.first() {
            for (header, value) in first.iter() {
                if self.root_for(header).is_none() {
                    insert_path(&mut record, header, value.clone());
                }
            }
        }

        let populated: Vec<(&String, Vec<Option<Value>>)> = self
            .roots
            .iter()
            .map(|root| (root, rows.iter().map(|row| row_item(root, row)).collect::<Vec<_>>()))
            .filter(|(_, items)| items.iter().any(Option::is_some))
            .collect();

        let merge = !self.declared || populated.len() > 1;
        for (root, row_items) in populated {
            let items = collect_items(row_items, merge);
            insert_path(&mut record, root, Value::Array(items));
        }

        record
    }
}

/// This row's contribution to the array at `root`.
fn row_item(root: &str, row: &CellRow) -> Option<Value> {
    if let Some(value) = row.get(root) {
        return Some(value.clone());
    }

    let mut item = Map::new();
    for (header, value) in row.iter().filter(|(h, _)| is_under(h, root)) {
        insert_path(&mut item, &header[root.len() + 1..], value.clone());
    }
    (!item.is_empty()).then_some(Value::Object(item))
}

fn collect_items(row_items: Vec<Option<Value>>, merge: bool) -> Vec<Value> {
    let mut items: Vec<Value> = Vec::new();

    for item in row_items.into_iter().flatten() {
        if merge {
            if let Some(current) = items.last_mut() {
                if !starts_new_item(current, &item) {
                    merge_item(current, item);
                    continue;
                }
            }
        }
        items.push(item);
    }

    items
}

fn starts_new_item(current: &Value, item: &Value) -> bool {
    match (current, item) {
        (Value::Object(existing), Value::Object(incoming)) => incoming
            .iter()
            .any(|(field, value)| existing.get(field).is_some_and(|v| v != value)),
        (existing, incoming) => existing != incoming,
    }
}

fn merge_item(current: &mut Value, item: Value) {
    if let (Value::Object(existing), Value::Object(incoming)) = (current, item) {
        for (field, value) in incoming {
            existing.entry(field).or_insert(value);
        }
    }
}

/// Nest `value` at a dot path. The first value written at a path wins;
/// a path running through a scalar is dropped.
fn insert_path(map: &mut Map, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            map.entry(path.to_string()).or_insert(value);
        }
        Some((head, rest)) => {
            let slot = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(inner) = slot {
                insert_path(inner, rest, value);
            }
        }
    }
}
