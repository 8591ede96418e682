//! High-level export and import entry points.
//!
//! These tie the codec to a record type's configuration and report progress
//! through the log broadcaster. The codec itself keeps no state between
//! calls; every call builds and drops its own rows, headers and groupings.
//!
//! # Example
//!
//! ```rust,ignore
//! use recordport::{export_document, import_document, CodecConfig, MemoryStore};
//!
//! let config = CodecConfig::default();
//! let doc = export_document("bookings", &records, &config)?;
//! std::fs::write(&doc.filename, &doc.body)?;
//!
//! let store = MemoryStore::new();
//! let report = import_document(doc.body.as_bytes(), "bookings", &config, &store).await?;
//! println!("{} imported, {} failed", report.result.success_count, report.result.errors.len());
//! ```

use serde::Serialize;

use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::codec::{self, is_multi_row, reconstruct};
use crate::config::{CodecConfig, RecordTypeConfig};
use crate::error::{CsvError, ExportError, ImportError};
use crate::import::{import_records, RecordStore};
use crate::models::Record;
use crate::parser::{parse_bytes_auto, parse_string_with_metadata, ParseResult, DEFAULT_DELIMITER};
use crate::schema::RecordSchema;

/// MIME type of exported documents.
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// A CSV file ready for download.
#[derive(Debug, Clone, Serialize)]
pub struct ExportDocument {
    /// `<record_type>-export.csv`
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
    pub record_count: usize,
    pub row_count: usize,
}

impl ExportDocument {
    /// `Content-Disposition` header value.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

/// CSV file information
#[derive(Debug, Clone, Serialize)]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

impl From<&ParseResult> for CsvInfo {
    fn from(parsed: &ParseResult) -> Self {
        Self {
            encoding: parsed.encoding.clone(),
            delimiter: parsed.delimiter,
            headers: parsed.headers.clone(),
            row_count: parsed.rows.len(),
        }
    }
}

/// Records rebuilt from a CSV document.
#[derive(Debug, Clone, Serialize)]
pub struct DecodedDocument {
    pub records: Vec<Record>,
    pub csv: CsvInfo,
    pub multi_row: bool,
}

/// Outcome of importing one document.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub result: crate::models::ImportBatchResult,
    pub csv: CsvInfo,
    pub multi_row: bool,
    pub record_count: usize,
}

pub fn export_filename(record_type: &str) -> String {
    format!("{}-export.csv", record_type)
}

fn lookup<'a>(config: &'a CodecConfig, record_type: &str) -> Option<&'a RecordTypeConfig> {
    config.record_type(record_type)
}

/// Export `records` of a configured type as a CSV document.
///
/// Fails as a whole (no partial document) on an unknown type or when the
/// configured expansion policy rejects a record.
pub fn export_document(
    record_type: &str,
    records: &[Record],
    config: &CodecConfig,
) -> Result<ExportDocument, ExportError> {
    if lookup(config, record_type).is_none() {
        return Err(ExportError::UnknownRecordType(record_type.to_string()));
    }

    let policy = config.expansion_policy.policy();
    log_info(format!(
        "📤 Exporting {} {} records (policy: {})",
        records.len(),
        record_type,
        policy.name()
    ));

    let rows = codec::expand_records(records, policy)?;
    let headers = codec::collect_headers(&rows);
    let body = codec::write_csv(&headers, &rows)?;
    log_success(format!("{} rows × {} columns", rows.len(), headers.len()));

    Ok(ExportDocument {
        filename: export_filename(record_type),
        content_type: CSV_CONTENT_TYPE,
        body,
        record_count: records.len(),
        row_count: rows.len(),
    })
}

/// Decode uploaded bytes into records, detecting encoding and delimiter.
pub fn decode_document(
    bytes: &[u8],
    schema: Option<&RecordSchema>,
) -> Result<DecodedDocument, CsvError> {
    log_info("📖 Reading CSV...");
    let parsed = parse_bytes_auto(bytes)?;
    Ok(decode_parsed(parsed, schema))
}

/// Decode CSV text that is already a string (comma-delimited).
pub fn decode_text(
    text: &str,
    schema: Option<&RecordSchema>,
) -> Result<DecodedDocument, CsvError> {
    let parsed = parse_string_with_metadata(text, DEFAULT_DELIMITER, "utf-8".to_string())?;
    Ok(decode_parsed(parsed, schema))
}

fn decode_parsed(parsed: ParseResult, schema: Option<&RecordSchema>) -> DecodedDocument {
    let csv = CsvInfo::from(&parsed);
    log_success(format!(
        "Encoding {}, separator '{}', {} rows",
        csv.encoding,
        format_delimiter(csv.delimiter),
        csv.row_count
    ));
    log_info(format!("📋 {} columns:", csv.headers.len()));
    for (i, header) in csv.headers.iter().enumerate() {
        log_info_indent(format!("[{:2}] {}", i + 1, header), 1);
    }

    let multi_row = is_multi_row(&parsed.rows);
    if multi_row {
        log_info("Rows share ids: rebuilding arrays from row groups");
    }
    if schema.is_some() {
        log_info("Using declared schema for array columns");
    }

    let records = reconstruct(&parsed.rows, schema);
    log_success(format!("{} records rebuilt", records.len()));

    DecodedDocument {
        records,
        csv,
        multi_row,
    }
}

/// Import an uploaded document into `store` as records of `record_type`.
///
/// Per-record failures are collected in the report; only an unknown type or
/// an undecodable document fails the call.
pub async fn import_document<S>(
    bytes: &[u8],
    record_type: &str,
    config: &CodecConfig,
    store: &S,
) -> Result<ImportReport, ImportError>
where
    S: RecordStore + ?Sized,
{
    let type_config = lookup(config, record_type)
        .ok_or_else(|| ImportError::UnknownRecordType(record_type.to_string()))?;

    let decoded = decode_document(bytes, type_config.schema.as_ref())?;
    if decoded.records.is_empty() {
        log_warning("No data rows found");
    }

    log_info(format!(
        "📥 Importing {} {} records...",
        decoded.records.len(),
        record_type
    ));
    let record_count = decoded.records.len();
    let result = import_records(
        store,
        record_type,
        decoded.records,
        &type_config.required_fields,
    )
    .await;

    Ok(ImportReport {
        result,
        csv: decoded.csv,
        multi_row: decoded.multi_row,
        record_count,
    })
}

/// Format delimiter for display
fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Cycle, PolicyKind};
    use crate::models::{record_from_json, Value};
    use crate::schema::FieldKind;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn record(json: serde_json::Value) -> Record {
        record_from_json(json).unwrap()
    }

    fn header_line(csv: &str) -> String {
        csv.lines().next().unwrap_or_default().to_string()
    }

    fn config_with(record_type: &str, type_config: RecordTypeConfig) -> CodecConfig {
        let mut config = CodecConfig::default();
        config.record_types.insert(record_type.to_string(), type_config);
        config
    }

    #[test]
    fn test_header_set_ignores_record_order() {
        let a = record(json!({ "id": 1, "name": "a", "contacts": [{ "email": "x" }] }));
        let b = record(json!({ "id": 2, "data": { "mode": "sea" }, "tags": ["t"] }));
        let c = record(json!({ "id": 3, "owner": { "name": "Ann" } }));

        let forward = codec::encode(&[a.clone(), b.clone(), c.clone()], &Cycle).unwrap();
        let backward = codec::encode(&[c, b, a], &Cycle).unwrap();

        assert_eq!(header_line(&forward), header_line(&backward));
        assert_eq!(
            header_line(&forward),
            r#""contacts.email","data.mode","id","name","owner.name","tags""#
        );
    }

    #[test]
    fn test_row_count_is_longest_array() {
        let rec = record(json!({
            "id": "r",
            "pair": [{ "v": "p0" }, { "v": "p1" }],
            "five": [{ "v": 0 }, { "v": 1 }, { "v": 2 }, { "v": 3 }, { "v": 4 }]
        }));
        let rows = codec::expand_record(&rec, &Cycle).unwrap();

        assert_eq!(rows.len(), 5);
        let pair: Vec<String> = rows.iter().map(|r| codec::format_value(&r["pair.v"])).collect();
        assert_eq!(pair, vec!["p0", "p1", "p0", "p1", "p0"]);
    }

    #[test]
    fn test_scalar_round_trip() {
        let original = record(json!({
            "name": "Acme Freight",
            "weight": 1250.5,
            "pallets": 12,
            "hazardous": false,
            "note": "  keep upright "
        }));
        let sent = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap();
        let mut with_date = original.clone();
        with_date.insert("sent_at".into(), Value::Date(sent));

        let csv = codec::encode(&[with_date], &Cycle).unwrap();
        let decoded = decode_text(&csv, None).unwrap();
        assert_eq!(decoded.records.len(), 1);
        let back = &decoded.records[0];

        for (field, value) in &original {
            assert_eq!(back.get(field), Some(value), "field {}", field);
        }
        // Dates come back as ISO text that parses to the same instant.
        let text = back["sent_at"].as_str().unwrap();
        assert_eq!(text.parse::<chrono::DateTime<Utc>>().unwrap(), sent);
    }

    #[test]
    fn test_timestamp_text_written_verbatim() {
        let stamp = "2024-05-01T12:00:00+02:00";
        let rec = record(json!({ "name": "a", "note": stamp }));

        let csv = codec::encode(&[rec], &Cycle).unwrap();
        assert_eq!(csv.lines().nth(1), Some(r#""a","2024-05-01T12:00:00+02:00""#));

        let decoded = decode_text(&csv, None).unwrap();
        assert_eq!(decoded.records[0]["note"], Value::from(stamp));
    }

    #[test]
    fn test_quoting_round_trip() {
        let literal = r#"He said "hi", twice"#;
        let csv = codec::encode(&[record(json!({ "quote": literal }))], &Cycle).unwrap();

        assert_eq!(csv.lines().nth(1), Some(r#""He said ""hi"", twice""#));
        let decoded = decode_text(&csv, None).unwrap();
        assert_eq!(decoded.records[0]["quote"], Value::from(literal));
    }

    #[test]
    fn test_multi_row_grouping() {
        let csv = [
            r#""equipment_details.status","id","name""#,
            r#""empty","A","Alpha""#,
            r#""loaded","A","Alpha""#,
            r#""returned","A","Alpha""#,
            r#""empty","B","Beta""#,
        ]
        .join("\n");

        let decoded = decode_text(&csv, None).unwrap();
        assert!(decoded.multi_row);
        assert_eq!(decoded.records.len(), 2);

        let lens: Vec<usize> = decoded
            .records
            .iter()
            .map(|r| match r.get("equipment_details") {
                Some(Value::Array(items)) => items.len(),
                _ => 0,
            })
            .collect();
        assert_eq!(lens, vec![3, 1]);
    }

    #[test]
    fn test_contacts_scenario() {
        let rec = record(json!({
            "id": "x",
            "name": "Acme",
            "tags": ["a", "b"],
            "contacts": [{ "email": "a@x.com" }, { "email": "b@x.com" }]
        }));
        let csv = codec::encode(&[rec], &Cycle).unwrap();

        assert_eq!(
            csv,
            [
                r#""contacts.email","id","name","tags""#,
                r#""a@x.com","x","Acme","a;b""#,
                r#""b@x.com","x","Acme","a;b""#,
            ]
            .join("\n")
        );

        let decoded = decode_text(&csv, None).unwrap();
        assert_eq!(decoded.records.len(), 1);
        let back = Value::Object(decoded.records[0].clone());
        assert_eq!(
            back.pointer("tags"),
            Some(&Value::Array(vec![Value::from("a"), Value::from("b")]))
        );
        match back.pointer("contacts") {
            Some(Value::Array(items)) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[1].pointer("email"), Some(&Value::from("b@x.com")));
            }
            other => panic!("contacts should be an array, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_import_isolates_missing_required_field() {
        let csv = [
            r#""id","name""#,
            r#""1","one""#,
            r#""2","two""#,
            r#""3","""#,
            r#""4","four""#,
            r#""5","five""#,
        ]
        .join("\n");
        let config = config_with("plans", RecordTypeConfig::requiring(&["name"]));
        let store = MemoryStore::new();

        let report = import_document(csv.as_bytes(), "plans", &config, &store)
            .await
            .unwrap();

        assert_eq!(report.result.success_count, 4);
        assert_eq!(report.result.errors.len(), 1);
        assert!(report.result.errors[0].contains("Row 3"));
        assert!(!report.multi_row);
    }

    #[tokio::test]
    async fn test_export_then_import_through_store() {
        let config = CodecConfig::default();
        let source = MemoryStore::new();
        source
            .seed(
                "bookings",
                vec![
                    record(json!({
                        "id": "b-1",
                        "booking_number": "BK100",
                        "data": { "equipment_details": [{ "status": "empty" }, { "status": "full" }] }
                    })),
                    record(json!({ "id": "b-2", "booking_number": "BK200" })),
                ],
            )
            .await;

        let records = source.list("bookings").await.unwrap();
        let doc = export_document("bookings", &records, &config).unwrap();
        assert_eq!(doc.filename, "bookings-export.csv");
        assert_eq!(doc.content_disposition(), "attachment; filename=\"bookings-export.csv\"");
        assert_eq!(doc.row_count, 3);

        let target = MemoryStore::new();
        let report = import_document(doc.body.as_bytes(), "bookings", &config, &target)
            .await
            .unwrap();
        assert_eq!(report.result.success_count, 2);
        assert!(report.result.is_clean());

        let imported = target.list("bookings").await.unwrap();
        let first = Value::Object(imported[0].clone());
        assert!(matches!(
            first.pointer("data.equipment_details"),
            Some(Value::Array(items)) if items.len() == 2
        ));
    }

    #[test]
    fn test_unknown_record_type_is_hard_failure() {
        let err = export_document("invoices", &[], &CodecConfig::default()).unwrap_err();
        assert!(matches!(err, ExportError::UnknownRecordType(ref t) if t == "invoices"));
    }

    #[tokio::test]
    async fn test_import_unknown_type_and_empty_file() {
        let config = CodecConfig::default();
        let store = MemoryStore::new();

        let err = import_document(b"\"id\"\n\"1\"", "invoices", &config, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::UnknownRecordType(_)));

        let err = import_document(b"", "bookings", &config, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Csv(CsvError::EmptyFile)));
    }

    #[test]
    fn test_configured_policy_applies_to_export() {
        let mut config = CodecConfig::default();
        config.expansion_policy = PolicyKind::RejectOnMismatch;
        let rec = record(json!({
            "name": "p",
            "a": [{ "n": 1 }, { "n": 2 }],
            "b": [{ "n": 1 }]
        }));

        let err = export_document("shipment_plans", &[rec], &config).unwrap_err();
        assert!(matches!(err, ExportError::ArrayLengthMismatch { .. }));
    }

    #[test]
    fn test_declared_schema_keeps_identical_items() {
        let schema = RecordSchema::new()
            .with_field("containers", FieldKind::ArrayOfObject)
            .with_field("reference", FieldKind::Scalar);
        let rec = record(json!({
            "id": "p1",
            "reference": "A;B",
            "containers": [{ "type": "40HC" }, { "type": "40HC" }]
        }));

        let csv = codec::encode(&[rec], &Cycle).unwrap();
        let decoded = decode_text(&csv, Some(&schema)).unwrap();

        let back = &decoded.records[0];
        assert_eq!(back["reference"], Value::from("A;B"));
        assert!(matches!(back.get("containers"), Some(Value::Array(items)) if items.len() == 2));
    }
}
