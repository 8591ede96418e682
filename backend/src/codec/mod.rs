//! Record ⇄ CSV codec.
//!
//! Export and import are each a chain of small, pure steps:
//!
//! ```text
//! export:  Record ─▶ expand ─▶ collect_headers ─▶ format ─▶ write_csv ─▶ text
//! import:  text ─▶ tokenize ─▶ coerce ─▶ is_multi_row ─▶ reconstruct ─▶ Record
//! ```
//!
//! - `format`: one value → one cell
//! - `expand`: one record → row-records, with pluggable [`ExpansionPolicy`]
//! - `headers`: sorted union of flattened keys
//! - `writer`: quoted CSV text
//! - `coerce`: one cell → typed value guess
//! - `classify`: does the file spread records over several rows?
//! - `reconstruct`: raw rows → nested records
//!
//! Tokenizing lives in [`crate::parser`].

pub mod classify;
pub mod coerce;
pub mod expand;
pub mod format;
pub mod headers;
pub mod reconstruct;
pub mod writer;

pub use classify::is_multi_row;
pub use coerce::{coerce, coerce_as};
pub use expand::{
    expand_record, expand_records, ArrayField, CrossProduct, Cycle, ExpansionPolicy, PolicyKind,
    RejectOnMismatch,
};
pub use format::format_value;
pub use headers::collect_headers;
pub use reconstruct::reconstruct;
pub use writer::write_csv;

use crate::error::ExportError;
use crate::models::Record;

/// Encode a batch of records as one CSV document.
pub fn encode(records: &[Record], policy: &dyn ExpansionPolicy) -> Result<String, ExportError> {
    let rows = expand_records(records, policy)?;
    let headers = collect_headers(&rows);
    Ok(write_csv(&headers, &rows)?)
}
