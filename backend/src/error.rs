//! Error types for the Recordport codec.
//!
//! This module defines the error hierarchy used across the crate:
//!
//! - [`CsvError`] - CSV decoding and writing errors
//! - [`ExportError`] - Export (flatten + write) errors
//! - [`StoreError`] - Errors raised by a [`crate::import::RecordStore`]
//! - [`ImportError`] - Import (decode + reconstruct + persist) errors
//! - [`ConfigError`] - Configuration loading errors
//! - [`ServerError`] - HTTP boundary errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while decoding or writing CSV text.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to decode bytes with the detected encoding.
    #[error("Failed to decode content: {0}")]
    EncodingError(String),

    /// No non-blank line at all.
    #[error("CSV file is empty")]
    EmptyFile,

    /// The underlying CSV writer failed.
    #[error("Failed to write CSV: {0}")]
    WriteError(String),
}

impl From<csv::Error> for CsvError {
    fn from(e: csv::Error) -> Self {
        CsvError::WriteError(e.to_string())
    }
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors during export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The record type label is not configured.
    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),

    /// Array-producing fields of one record have different lengths
    /// and the active expansion policy refuses to reconcile them.
    #[error("Array field '{field}' has {found} items, expected {expected}")]
    ArrayLengthMismatch {
        field: String,
        expected: usize,
        found: usize,
    },

    /// Writing the document failed.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Listing the records to export failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors from the external record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refused the record.
    #[error("{0}")]
    Rejected(String),

    /// The record type label cannot name a store file.
    #[error("Invalid record type label: '{0}'")]
    InvalidRecordType(String),

    /// A uniqueness constraint was violated.
    #[error("Duplicate key: {0}")]
    Conflict(String),

    /// IO error.
    #[error("Store IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error.
    #[error("Store JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Import Errors
// =============================================================================

/// Errors that abort an import as a whole.
///
/// Per-record failures never end up here; they are collected in
/// [`crate::models::ImportBatchResult::errors`].
#[derive(Debug, Error)]
pub enum ImportError {
    /// The record type label is not configured.
    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),

    /// The uploaded document could not be decoded.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error.
    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error.
    #[error("Invalid config JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Record type label is not usable in a filename.
    #[error("Invalid record type label: '{0}'")]
    InvalidRecordType(String),

    /// Environment override could not be parsed.
    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: String, value: String },
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Export failed.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Import failed.
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),
}
