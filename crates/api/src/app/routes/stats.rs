use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::errors;
use crate::app::services::AppServices;

pub async fn overview(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.blocking(|s| s.pipeline.overview()).await {
        Ok(Ok(overview)) => Json(overview).into_response(),
        Ok(Err(e)) => errors::storage_error_to_response(e),
        Err(e) => errors::internal_error(e),
    }
}

pub async fn all_series(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.blocking(|s| s.pipeline.all_series_stats()).await {
        Ok(Ok(stats)) => Json(stats).into_response(),
        Ok(Err(e)) => errors::storage_error_to_response(e),
        Err(e) => errors::internal_error(e),
    }
}

pub async fn series(
    Extension(services): Extension<Arc<AppServices>>,
    Path(transport_type): Path<String>,
) -> axum::response::Response {
    let transport_type = match errors::parse_transport_type(&transport_type) {
        Ok(t) => t,
        Err(res) => return res,
    };

    match services
        .blocking(move |s| s.pipeline.series_stats(&transport_type))
        .await
    {
        Ok(Ok(Some(stats))) => Json(stats).into_response(),
        Ok(Ok(None)) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "no records for transport type"),
        Ok(Err(e)) => errors::storage_error_to_response(e),
        Err(e) => errors::internal_error(e),
    }
}
