use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use ridership_core::TransportType;
use ridership_infra::{ConfigError, IngestError, StorageError};

pub fn storage_error_to_response(err: StorageError) -> axum::response::Response {
    match err {
        StorageError::DuplicateKey(msg) => json_error(StatusCode::CONFLICT, "duplicate_key", msg),
        StorageError::Unavailable(msg) => json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg),
        StorageError::Backend(msg) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg),
        StorageError::Poisoned => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            StorageError::Poisoned.to_string(),
        ),
    }
}

pub fn ingest_error_to_response(err: IngestError) -> axum::response::Response {
    match err {
        IngestError::Parse(e) => json_error(StatusCode::BAD_REQUEST, "parse_error", e.to_string()),
        IngestError::Rejected(msg) => json_error(StatusCode::UNPROCESSABLE_ENTITY, "ingest_rejected", msg),
        IngestError::Storage(e) => storage_error_to_response(e),
    }
}

pub fn source_error_to_response(err: ConfigError) -> axum::response::Response {
    match err {
        ConfigError::MissingSource => json_error(StatusCode::BAD_REQUEST, "missing_source", err.to_string()),
        other => json_error(StatusCode::INTERNAL_SERVER_ERROR, "source_unavailable", other.to_string()),
    }
}

pub fn internal_error(err: impl std::fmt::Display) -> axum::response::Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn parse_transport_type(s: &str) -> Result<TransportType, axum::response::Response> {
    TransportType::new(s)
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, "invalid_transport_type", e.to_string()))
}
