use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// Replace the passenger dataset with the posted wide table.
///
/// An empty body ingests the configured default source file instead.
pub async fn run_etl(Extension(services): Extension<Arc<AppServices>>, body: String) -> axum::response::Response {
    let outcome = services
        .blocking(move |s| {
            let source = if body.trim().is_empty() {
                s.config.load_source().map_err(errors::source_error_to_response)?
            } else {
                body
            };
            s.pipeline
                .run_ingest(&source)
                .map_err(errors::ingest_error_to_response)
        })
        .await;

    match outcome {
        Ok(Ok(summary)) => (StatusCode::OK, Json(dto::EtlResponse::from(summary))).into_response(),
        Ok(Err(res)) => res,
        Err(e) => errors::internal_error(e),
    }
}

/// Regenerate forecasts from the current passenger dataset.
pub async fn generate_predictions(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let outcome = services.blocking(|s| s.pipeline.run_forecast()).await;

    match outcome {
        Ok(Ok(summary)) => (StatusCode::OK, Json(dto::GenerateResponse::from(summary))).into_response(),
        Ok(Err(e)) => errors::storage_error_to_response(e),
        Err(e) => errors::internal_error(e),
    }
}
