use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    response::IntoResponse,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn transport_data(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::TransportDataQuery>,
) -> axum::response::Response {
    let filter = match query.transport_type.as_deref() {
        Some(t) => match errors::parse_transport_type(t) {
            Ok(t) => Some(t),
            Err(res) => return res,
        },
        None => None,
    };

    match services
        .blocking(move |s| s.pipeline.passenger_records(filter.as_ref()))
        .await
    {
        Ok(Ok(records)) => Json(records).into_response(),
        Ok(Err(e)) => errors::storage_error_to_response(e),
        Err(e) => errors::internal_error(e),
    }
}

pub async fn predictions(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.blocking(|s| s.pipeline.forecasts()).await {
        Ok(Ok(records)) => Json(records).into_response(),
        Ok(Err(e)) => errors::storage_error_to_response(e),
        Err(e) => errors::internal_error(e),
    }
}

pub async fn prediction_summary(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.blocking(|s| s.pipeline.prediction_summary()).await {
        Ok(Ok(summary)) => Json(summary).into_response(),
        Ok(Err(e)) => errors::storage_error_to_response(e),
        Err(e) => errors::internal_error(e),
    }
}
