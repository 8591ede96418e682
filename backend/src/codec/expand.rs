//! Flatten nested records into row-records.
//!
//! A record is split into *base fields*, copied into every row, and
//! *array-producing fields*, whose items are spread across rows:
//!
//! ```text
//! { id: x, contacts: [{email: a}, {email: b}] }
//!
//!   id | contacts.email
//!   x  | a
//!   x  | b
//! ```
//!
//! How rows are allotted when several array fields disagree in length is
//! decided by an [`ExpansionPolicy`].

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::format::identity_of;
use crate::error::ExportError;
use crate::models::{Map, Record, RowRecord, Value};

/// Reserved key holding the domain document blob.
pub const DOCUMENT_KEY: &str = "data";

/// Objects with at most this many fields count as simple when nested.
const SMALL_OBJECT_FIELDS: usize = 3;

/// A field whose items are spread across rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayField {
    /// Flattened key of the field.
    pub key: String,
    /// Items, never empty.
    pub items: Vec<Value>,
}

// =============================================================================
// Expansion policies
// =============================================================================

/// Decides which item of each array field lands on which row.
pub trait ExpansionPolicy: Send + Sync {
    /// Short name used in configuration and logs.
    fn name(&self) -> &'static str;

    /// One entry per output row; each entry holds one item index per field,
    /// in the order of `fields`. Called only with a non-empty `fields`.
    fn plan(&self, fields: &[ArrayField]) -> Result<Vec<Vec<usize>>, ExportError>;
}

/// Row count is the longest array; shorter arrays repeat cyclically.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cycle;

impl ExpansionPolicy for Cycle {
    fn name(&self) -> &'static str {
        "cycle"
    }

    fn plan(&self, fields: &[ArrayField]) -> Result<Vec<Vec<usize>>, ExportError> {
        let max_len = fields.iter().map(|f| f.items.len()).max().unwrap_or(1);
        Ok((0..max_len)
            .map(|row| fields.iter().map(|f| row % f.items.len()).collect())
            .collect())
    }
}

/// One row per combination of items; the first field varies slowest.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossProduct;

impl ExpansionPolicy for CrossProduct {
    fn name(&self) -> &'static str {
        "cross-product"
    }

    fn plan(&self, fields: &[ArrayField]) -> Result<Vec<Vec<usize>>, ExportError> {
        let mut rows: Vec<Vec<usize>> = vec![Vec::new()];
        for field in fields {
            rows = rows
                .into_iter()
                .flat_map(|prefix| {
                    (0..field.items.len()).map(move |i| {
                        let mut next = prefix.clone();
                        next.push(i);
                        next
                    })
                })
                .collect();
        }
        Ok(rows)
    }
}

/// All array fields must have the same length; items are zipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectOnMismatch;

impl ExpansionPolicy for RejectOnMismatch {
    fn name(&self) -> &'static str {
        "reject-on-mismatch"
    }

    fn plan(&self, fields: &[ArrayField]) -> Result<Vec<Vec<usize>>, ExportError> {
        let expected = fields.first().map(|f| f.items.len()).unwrap_or(1);
        if let Some(bad) = fields.iter().find(|f| f.items.len() != expected) {
            return Err(ExportError::ArrayLengthMismatch {
                field: bad.key.clone(),
                expected,
                found: bad.items.len(),
            });
        }
        Ok((0..expected).map(|row| vec![row; fields.len()]).collect())
    }
}

/// Selectable policy name, for configuration files and the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    #[default]
    Cycle,
    CrossProduct,
    RejectOnMismatch,
}

impl PolicyKind {
    pub fn policy(self) -> &'static dyn ExpansionPolicy {
        match self {
            PolicyKind::Cycle => &Cycle,
            PolicyKind::CrossProduct => &CrossProduct,
            PolicyKind::RejectOnMismatch => &RejectOnMismatch,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().replace('_', "-").as_str() {
            "cycle" => Some(PolicyKind::Cycle),
            "cross-product" => Some(PolicyKind::CrossProduct),
            "reject-on-mismatch" => Some(PolicyKind::RejectOnMismatch),
            _ => None,
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.policy().name())
    }
}

// =============================================================================
// Expansion
// =============================================================================

#[derive(Default)]
struct Partition {
    base: RowRecord,
    arrays: Vec<ArrayField>,
}

/// Expand one record into one or more row-records.
pub fn expand_record(
    record: &Record,
    policy: &dyn ExpansionPolicy,
) -> Result<Vec<RowRecord>, ExportError> {
    let mut partition = Partition::default();
    for (name, value) in record {
        partition_field(name, value, &mut partition);
    }

    let Partition { base, arrays } = partition;
    if arrays.is_empty() {
        return Ok(vec![base]);
    }

    let plan = policy.plan(&arrays)?;
    Ok(plan
        .into_iter()
        .map(|indices| {
            let mut row = base.clone();
            for (field, index) in arrays.iter().zip(indices) {
                place_item(&field.key, &field.items[index], &mut row);
            }
            row
        })
        .collect())
}

/// Expand a batch, preserving record order.
pub fn expand_records(
    records: &[Record],
    policy: &dyn ExpansionPolicy,
) -> Result<Vec<RowRecord>, ExportError> {
    let mut rows = Vec::new();
    for record in records {
        rows.extend(expand_record(record, policy)?);
    }
    Ok(rows)
}

fn partition_field(key: &str, value: &Value, partition: &mut Partition) {
    match value {
        Value::Object(map) if key == DOCUMENT_KEY => flatten_document(key, map, partition),
        Value::Array(items) if value.is_object_array() => partition.arrays.push(ArrayField {
            key: key.to_string(),
            items: items.clone(),
        }),
        Value::Object(map) if is_simple(map) => flatten_into(key, map, &mut partition.base),
        Value::Object(map) if identity_of(map).is_some() => {
            partition.base.insert(key.to_string(), value.clone());
        }
        Value::Object(_) => partition.arrays.push(ArrayField {
            key: key.to_string(),
            items: vec![value.clone()],
        }),
        _ => {
            partition.base.insert(key.to_string(), value.clone());
        }
    }
}

/// The document blob is flattened in place; its object arrays still expand rows.
fn flatten_document(prefix: &str, map: &Map, partition: &mut Partition) {
    for (name, value) in map {
        let key = join_key(prefix, name);
        match value {
            Value::Object(inner) => flatten_document(&key, inner, partition),
            Value::Array(items) if value.is_object_array() => partition.arrays.push(ArrayField {
                key,
                items: items.clone(),
            }),
            _ => {
                partition.base.insert(key, value.clone());
            }
        }
    }
}

/// Every value scalar, or a small object.
fn is_simple(map: &Map) -> bool {
    map.values().all(|v| match v {
        Value::Object(inner) => inner.len() <= SMALL_OBJECT_FIELDS,
        other => other.is_scalar(),
    })
}

fn flatten_into(prefix: &str, map: &Map, row: &mut RowRecord) {
    for (name, value) in map {
        let key = join_key(prefix, name);
        match value {
            Value::Object(inner) => flatten_into(&key, inner, row),
            _ => {
                row.insert(key, value.clone());
            }
        }
    }
}

fn place_item(key: &str, item: &Value, row: &mut RowRecord) {
    match item {
        Value::Object(map) => flatten_into(key, map, row),
        _ => {
            row.insert(key.to_string(), item.clone());
        }
    }
}

fn join_key(prefix: &str, name: &str) -> String {
    format!("{}.{}", prefix, name)
}
