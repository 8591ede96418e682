//! REST API response types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::CodecConfig;
use crate::models::ImportBatchResult;
use crate::pipeline::ImportReport;

/// Response sent after an import upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    /// Unique job identifier
    pub job_id: String,

    /// "ok" when every record was stored, "partial" when some failed,
    /// "failed" when none was stored
    pub status: String,

    pub record_type: String,

    /// `{ successCount, errors }`
    pub result: ImportBatchResult,

    pub metadata: ImportMetadata,
}

/// Information about the uploaded document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportMetadata {
    pub file_name: Option<String>,
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub record_count: usize,
    pub columns: Vec<String>,
    /// Records were spread across several rows sharing an id
    pub multi_row: bool,
}

impl ImportResponse {
    pub fn new(record_type: &str, file_name: Option<String>, report: ImportReport) -> Self {
        let status = match (report.result.success_count, report.result.errors.len()) {
            (_, 0) => "ok",
            (0, _) => "failed",
            _ => "partial",
        };

        ImportResponse {
            job_id: Uuid::new_v4().to_string(),
            status: status.to_string(),
            record_type: record_type.to_string(),
            result: report.result,
            metadata: ImportMetadata {
                file_name,
                encoding: report.csv.encoding,
                delimiter: report.csv.delimiter.to_string(),
                row_count: report.csv.row_count,
                record_count: report.record_count,
                columns: report.csv.headers,
                multi_row: report.multi_row,
            },
        }
    }
}

/// One configured record type, as listed by `GET /api/types`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordTypeInfo {
    pub name: String,
    pub required_fields: Vec<String>,
    pub has_schema: bool,
    pub export_file_name: String,
}

pub fn record_type_infos(config: &CodecConfig) -> Vec<RecordTypeInfo> {
    config
        .record_types
        .iter()
        .map(|(name, type_config)| RecordTypeInfo {
            name: name.clone(),
            required_fields: type_config.required_fields.clone(),
            has_schema: type_config.schema.is_some(),
            export_file_name: crate::pipeline::export_filename(name),
        })
        .collect()
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "result": { "successCount": 0, "errors": [] }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::CsvInfo;

    fn report(success_count: usize, errors: &[&str]) -> ImportReport {
        ImportReport {
            result: ImportBatchResult {
                success_count,
                errors: errors.iter().map(|s| s.to_string()).collect(),
            },
            csv: CsvInfo {
                encoding: "utf-8".into(),
                delimiter: ',',
                headers: vec!["id".into(), "name".into()],
                row_count: 3,
            },
            multi_row: false,
            record_count: 3,
        }
    }

    #[test]
    fn test_status_from_outcome() {
        assert_eq!(ImportResponse::new("plans", None, report(3, &[])).status, "ok");
        assert_eq!(
            ImportResponse::new("plans", None, report(2, &["Row 1: x"])).status,
            "partial"
        );
        assert_eq!(
            ImportResponse::new("plans", None, report(0, &["Row 1: x"])).status,
            "failed"
        );
    }

    #[test]
    fn test_response_is_camel_case() {
        let response = ImportResponse::new("plans", Some("plans.csv".into()), report(3, &[]));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["recordType"], "plans");
        assert_eq!(json["result"]["successCount"], 3);
        assert_eq!(json["metadata"]["fileName"], "plans.csv");
        assert_eq!(json["metadata"]["multiRow"], false);
    }

    #[test]
    fn test_type_listing() {
        let infos = record_type_infos(&CodecConfig::default());
        let bookings = infos.iter().find(|i| i.name == "bookings").unwrap();
        assert_eq!(bookings.export_file_name, "bookings-export.csv");
        assert!(!bookings.has_schema);
    }
}
