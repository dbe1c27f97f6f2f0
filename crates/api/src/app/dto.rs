use serde::{Deserialize, Serialize};

use ridership_analytics::FailedSeries;
use ridership_infra::{ForecastSummary, IngestSummary};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct TransportDataQuery {
    pub transport_type: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct EtlResponse {
    pub success: bool,
    pub run_id: String,
    pub records: usize,
    pub transport_types: usize,
    pub years: usize,
}

impl From<IngestSummary> for EtlResponse {
    fn from(s: IngestSummary) -> Self {
        Self {
            success: true,
            run_id: s.run_id.to_string(),
            records: s.records_loaded,
            transport_types: s.transport_types,
            years: s.years,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub run_id: String,
    pub predictions: usize,
    pub types_forecast: usize,
    pub types_failed: Vec<FailedSeries>,
}

impl From<ForecastSummary> for GenerateResponse {
    fn from(s: ForecastSummary) -> Self {
        Self {
            success: true,
            run_id: s.run_id.to_string(),
            predictions: s.predictions,
            types_forecast: s.types_forecast,
            types_failed: s.types_failed,
        }
    }
}
