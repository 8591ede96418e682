//! Declared field layout for a record type.
//!
//! Without a schema, import infers which columns are arrays from how values
//! vary across rows sharing an `id`. That guess fails for arrays whose items
//! happen to be identical. A [`RecordSchema`] states the layout instead:
//!
//! ```json
//! {
//!   "fields": {
//!     "tags": "array-of-scalar",
//!     "data.equipment_details": "array-of-object",
//!     "reference": "scalar"
//!   }
//! }
//! ```
//!
//! Keys are flattened paths, the same text as CSV column names (or, for
//! object arrays, the column prefix).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Shape of one declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Scalar,
    ArrayOfScalar,
    ArrayOfObject,
}

/// Field layout of one record type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSchema {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldKind>,
}

impl RecordSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style declaration.
    pub fn with_field(mut self, path: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.insert(path.into(), kind);
        self
    }

    /// Declared kind of a column, by exact path.
    pub fn kind_of(&self, path: &str) -> Option<FieldKind> {
        self.fields.get(path).copied()
    }

    /// Paths declared as arrays of objects.
    pub fn object_arrays(&self) -> BTreeSet<String> {
        self.fields
            .iter()
            .filter(|(_, kind)| **kind == FieldKind::ArrayOfObject)
            .map(|(path, _)| path.clone())
            .collect()
    }
}
