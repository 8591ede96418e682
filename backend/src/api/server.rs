//! HTTP server for the recordport API.
//!
//! # API Endpoints
//!
//! | Method | Path                        | Description                     |
//! |--------|-----------------------------|---------------------------------|
//! | GET    | `/health`                   | Health check                    |
//! | GET    | `/api/types`                | Configured record types         |
//! | GET    | `/api/export/{record_type}` | Download stored records as CSV  |
//! | POST   | `/api/import/{record_type}` | Upload a CSV (multipart `file`) |
//! | GET    | `/api/logs`                 | SSE stream for real-time logs   |

use axum::{
    extract::{Multipart, Path, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, record_type_infos, ImportResponse, RecordTypeInfo};
use crate::config::CodecConfig;
use crate::error::{CsvError, ExportError, ImportError, ServerError};
use crate::import::RecordStore;
use crate::pipeline::{export_document, import_document};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub config: Arc<CodecConfig>,
}

type ApiError = (StatusCode, Json<Value>);

/// Build the router without binding a socket.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/types", get(list_types))
        .route("/api/export/{record_type}", get(export_csv))
        .route("/api/import/{record_type}", post(import_csv))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(
    config: CodecConfig,
    store: Arc<dyn RecordStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    let port = config.port;
    let state = AppState {
        store,
        config: Arc::new(config),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Recordport server running on http://localhost:{}", port);
    println!("   GET  /api/types               - Record types");
    println!("   GET  /api/export/:record_type - Download CSV");
    println!("   POST /api/import/:record_type - Upload CSV file");
    println!("   GET  /api/logs                - SSE log stream");
    println!("   GET  /health                  - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "recordport",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "types": "GET /api/types",
            "export": "GET /api/export/{record_type}",
            "import": "POST /api/import/{record_type}",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn list_types(State(state): State<AppState>) -> Json<Vec<RecordTypeInfo>> {
    Json(record_type_infos(&state.config))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        // Lagged receivers just skip ahead.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Export every stored record of a type as a CSV attachment
async fn export_csv(
    State(state): State<AppState>,
    Path(record_type): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.config.record_type(&record_type).is_none() {
        return Err(reject(ExportError::UnknownRecordType(record_type).into()));
    }

    let records = state
        .store
        .list(&record_type)
        .await
        .map_err(|e| reject(ExportError::from(e).into()))?;

    let doc = export_document(&record_type, &records, &state.config)
        .map_err(|e| reject(e.into()))?;

    let headers = [
        (header::CONTENT_TYPE, format!("{}; charset=utf-8", doc.content_type)),
        (header::CONTENT_DISPOSITION, doc.content_disposition()),
    ];
    Ok((headers, doc.body))
}

/// Upload CSV endpoint
async fn import_csv(
    State(state): State<AppState>,
    Path(record_type): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        reject(ServerError::BadRequest(format!("Multipart error: {}", e)))
    })? {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| reject(ServerError::BadRequest(format!("Read error: {}", e))))?
                    .to_vec(),
            );
        }
    }

    let bytes = file_data
        .ok_or_else(|| reject(ServerError::BadRequest("No file provided".to_string())))?;

    log_info(format!(
        "📄 New upload: {} ({} bytes) as {}",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len(),
        record_type
    ));

    let report = import_document(&bytes, &record_type, &state.config, state.store.as_ref())
        .await
        .map_err(|e| reject(e.into()))?;

    Ok(Json(ImportResponse::new(&record_type, file_name, report)))
}

fn status_of(err: &ServerError) -> StatusCode {
    match err {
        ServerError::Export(ExportError::UnknownRecordType(_))
        | ServerError::Import(ImportError::UnknownRecordType(_)) => StatusCode::NOT_FOUND,
        ServerError::Export(ExportError::ArrayLengthMismatch { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ServerError::Import(ImportError::Csv(CsvError::IoError(_))) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        ServerError::Import(ImportError::Csv(_)) | ServerError::BadRequest(_) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(err: ServerError) -> ApiError {
    let status = status_of(&err);
    if status.is_server_error() {
        log_error(err.to_string());
    }
    (status, Json(error_response(&err.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::Record;
    use async_trait::async_trait;

    /// Fails every call, so a 500 means the store was reached.
    struct OffLimitsStore;

    #[async_trait]
    impl RecordStore for OffLimitsStore {
        async fn create(&self, _record_type: &str, _record: Record) -> Result<(), StoreError> {
            Err(StoreError::Rejected("store reached".into()))
        }

        async fn list(&self, _record_type: &str) -> Result<Vec<Record>, StoreError> {
            Err(StoreError::Rejected("store reached".into()))
        }
    }

    fn state() -> AppState {
        AppState {
            store: Arc::new(OffLimitsStore),
            config: Arc::new(CodecConfig::default()),
        }
    }

    #[tokio::test]
    async fn test_export_checks_label_before_store() {
        for label in ["../../secret", "invoices"] {
            match export_csv(State(state()), Path(label.to_string())).await {
                Err((status, body)) => {
                    assert_eq!(status, StatusCode::NOT_FOUND, "label {}", label);
                    assert!(!body.0["error"].as_str().unwrap().contains("store reached"));
                }
                Ok(_) => panic!("export of '{}' should fail", label),
            }
        }
    }

    #[tokio::test]
    async fn test_export_of_known_type_reaches_store() {
        match export_csv(State(state()), Path("bookings".to_string())).await {
            Err((status, _)) => assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR),
            Ok(_) => panic!("store failure should surface"),
        }
    }

    #[test]
    fn test_unknown_type_is_not_found() {
        let err = ServerError::from(ExportError::UnknownRecordType("ghosts".into()));
        assert_eq!(status_of(&err), StatusCode::NOT_FOUND);

        let err = ServerError::from(ImportError::UnknownRecordType("ghosts".into()));
        assert_eq!(status_of(&err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_bad_upload_is_client_error() {
        let err = ServerError::from(ImportError::from(CsvError::EmptyFile));
        assert_eq!(status_of(&err), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(&ServerError::BadRequest("No file provided".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_store_failure_is_server_error() {
        let err = ServerError::from(ExportError::from(StoreError::Rejected("disk full".into())));
        assert_eq!(status_of(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_policy_rejection_is_unprocessable() {
        let err = ServerError::from(ExportError::ArrayLengthMismatch {
            field: "legs".into(),
            expected: 2,
            found: 3,
        });
        let (status, body) = reject(err);
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.0["status"], "error");
    }
}
