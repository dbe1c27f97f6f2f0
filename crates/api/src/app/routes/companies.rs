use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use ridership_infra::record_analysis;

use crate::app::errors;
use crate::app::services::AppServices;

pub async fn list(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.blocking(|s| s.companies.list()).await {
        Ok(Ok(entries)) => Json(entries).into_response(),
        Ok(Err(e)) => errors::storage_error_to_response(e),
        Err(e) => errors::internal_error(e),
    }
}

pub async fn get_analysis(
    Extension(services): Extension<Arc<AppServices>>,
    Path(transport_type): Path<String>,
) -> axum::response::Response {
    let transport_type = match errors::parse_transport_type(&transport_type) {
        Ok(t) => t,
        Err(res) => return res,
    };

    match services.blocking(move |s| s.companies.get(&transport_type)).await {
        Ok(Ok(Some(analysis))) => Json(analysis).into_response(),
        Ok(Ok(None)) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "no analysis for transport type"),
        Ok(Err(e)) => errors::storage_error_to_response(e),
        Err(e) => errors::internal_error(e),
    }
}

/// Store free-text research for a transport type, replacing any previous entry.
pub async fn put_analysis(
    Extension(services): Extension<Arc<AppServices>>,
    Path(transport_type): Path<String>,
    body: String,
) -> axum::response::Response {
    let transport_type = match errors::parse_transport_type(&transport_type) {
        Ok(t) => t,
        Err(res) => return res,
    };
    if body.trim().is_empty() {
        return errors::json_error(StatusCode::BAD_REQUEST, "empty_analysis", "analysis text is required");
    }

    match services
        .blocking(move |s| record_analysis(s.companies.as_ref(), transport_type, &body, Utc::now()))
        .await
    {
        Ok(Ok(analysis)) => Json(analysis).into_response(),
        Ok(Err(e)) => errors::storage_error_to_response(e),
        Err(e) => errors::internal_error(e),
    }
}
