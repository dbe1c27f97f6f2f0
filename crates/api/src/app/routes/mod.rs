use axum::{
    Router,
    routing::{get, post},
};

pub mod companies;
pub mod data;
pub mod etl;
pub mod stats;
pub mod system;

/// Router for every endpoint except `/health`.
pub fn router() -> Router {
    Router::new()
        .route("/etl", post(etl::run_etl))
        .route("/predictions/generate", post(etl::generate_predictions))
        .route("/transport-data", get(data::transport_data))
        .route("/predictions", get(data::predictions))
        .route("/predictions/summary", get(data::prediction_summary))
        .route("/stats", get(stats::all_series))
        .route("/stats/overview", get(stats::overview))
        .route("/stats/:transport_type", get(stats::series))
        .route("/companies", get(companies::list))
        .route(
            "/companies/:transport_type",
            get(companies::get_analysis).put(companies::put_analysis),
        )
}
