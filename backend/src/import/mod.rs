//! Batch import of reconstructed records into an external store.
//!
//! Records are handed to the store one at a time, in order, awaiting each
//! call. A record that misses a required field or that the store rejects is
//! reported in [`ImportBatchResult::errors`] and the batch moves on; nothing
//! is rolled back.

use async_trait::async_trait;

use crate::api::logs::{log_error, log_success, log_warning};
use crate::error::StoreError;
use crate::models::{ImportBatchResult, Record, Value};

/// How many per-record errors are echoed to the log before summarizing.
const LOGGED_ERRORS: usize = 3;

/// External persistence for records of a given type.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist one record, or explain why not.
    async fn create(&self, record_type: &str, record: Record) -> Result<(), StoreError>;

    /// All records of a type, in insertion order.
    async fn list(&self, record_type: &str) -> Result<Vec<Record>, StoreError>;
}

/// Import `records` into `store`, checking `required_fields` first.
///
/// Required fields may be dot paths into nested objects (`data.customer`).
pub async fn import_records<S>(
    store: &S,
    record_type: &str,
    records: Vec<Record>,
    required_fields: &[String],
) -> ImportBatchResult
where
    S: RecordStore + ?Sized,
{
    let mut result = ImportBatchResult::default();

    for (index, record) in records.into_iter().enumerate() {
        let row = index + 1;
        let cleaned = strip_blank_fields(record);

        if let Some(field) = first_missing(&cleaned, required_fields) {
            push_error(
                &mut result,
                format!("Row {}: Missing required field '{}'", row, field),
            );
            continue;
        }

        match store.create(record_type, cleaned).await {
            Ok(()) => result.success_count += 1,
            Err(e) => push_error(&mut result, format!("Row {}: {}", row, e)),
        }
    }

    if result.errors.len() > LOGGED_ERRORS {
        log_warning(format!(
            "... {} more failed records",
            result.errors.len() - LOGGED_ERRORS
        ));
    }
    log_success(result.summary());

    result
}

fn push_error(result: &mut ImportBatchResult, message: String) {
    if result.errors.len() < LOGGED_ERRORS {
        log_error(&message);
    }
    result.errors.push(message);
}

/// Drop null and empty-text fields at the top level.
pub fn strip_blank_fields(record: Record) -> Record {
    record.into_iter().filter(|(_, v)| !v.is_blank()).collect()
}

fn first_missing<'a>(record: &Record, required_fields: &'a [String]) -> Option<&'a str> {
    required_fields
        .iter()
        .find(|field| !has_field(record, field))
        .map(String::as_str)
}

fn has_field(record: &Record, path: &str) -> bool {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };
    let value = match record.get(head) {
        Some(v) if !v.is_blank() => v,
        _ => return false,
    };
    match rest {
        None => true,
        Some(rest) => value.pointer(rest).is_some_and(|v| !v.is_blank()),
    }
}
