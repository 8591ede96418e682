//! # Recordport - nested records to and from spreadsheet CSV
//!
//! Recordport exports structured records (nested objects, arrays of objects,
//! dates) as flat CSV a spreadsheet user can edit, and imports such CSV back
//! into structured records.
//!
//! ## Architecture
//!
//! ```text
//!  export:  Records ──▶ Expand ──▶ Headers ──▶ Format ──▶ CSV text
//!                     (policy)    (sorted)   (Yes/No, ;)
//!
//!  import:  CSV bytes ──▶ Parser ──▶ Coerce ──▶ Classify ──▶ Reconstruct ──▶ Store
//!                       (auto-enc)  (bool,num,  (id groups)   (nest, arrays)  (batch)
//!                                    list)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use recordport::{decode_text, export_document, CodecConfig};
//!
//! let config = CodecConfig::default();
//! let doc = export_document("bookings", &records, &config)?;
//! let back = decode_text(&doc.body, None)?;
//! assert_eq!(back.records.len(), records.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Value and record model
//! - [`parser`] - CSV reading with encoding/delimiter detection
//! - [`codec`] - Expansion, formatting, coercion, reconstruction
//! - [`schema`] - Optional declared field layouts
//! - [`import`] - Batch import into a record store
//! - [`store`] - In-memory and JSON-file stores
//! - [`config`] - Runtime configuration
//! - [`pipeline`] - High-level export/import entry points
//! - [`api`] - HTTP API server and progress log

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Codec
pub mod codec;
pub mod schema;

// Persistence
pub mod import;
pub mod store;

// Configuration
pub mod config;

// Entry points
pub mod pipeline;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, CsvError, ExportError, ImportError, ServerError, StoreError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{record_from_json, record_to_json, ImportBatchResult, RawRow, Record, RowRecord, Value};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes_auto,
    parse_string_with_metadata, tokenize, ParseResult,
};

// =============================================================================
// Re-exports - Codec
// =============================================================================

pub use codec::{
    coerce, coerce_as, collect_headers, encode, expand_record, expand_records, format_value,
    is_multi_row, reconstruct, write_csv, CrossProduct, Cycle, ExpansionPolicy, PolicyKind,
    RejectOnMismatch,
};
pub use schema::{FieldKind, RecordSchema};

// =============================================================================
// Re-exports - Import and stores
// =============================================================================

pub use import::{import_records, RecordStore};
pub use store::{JsonFileStore, MemoryStore};

// =============================================================================
// Re-exports - Config
// =============================================================================

pub use config::{CodecConfig, RecordTypeConfig};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use pipeline::{
    decode_document, decode_text, export_document, export_filename, import_document, CsvInfo,
    DecodedDocument, ExportDocument, ImportReport,
};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, ImportMetadata, ImportResponse, RecordTypeInfo};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
