//! `ridership-analytics`
//!
//! **Responsibility:** the computational core of the workspace.
//!
//! - [`ingest`]: reshape a wide `year;<type>...` table into long-format records.
//! - [`stats`]: descriptive aggregates and year-over-year variation.
//! - [`forecast`]: per-series OLS fit, R² confidence and five-year extrapolation.
//!
//! This crate stays storage-agnostic: inputs are record snapshots handed over
//! by callers (infra/pipeline), outputs are plain values. Nothing here performs
//! I/O or keeps state between calls.

pub mod error;
pub mod forecast;
pub mod ingest;
pub mod job;
pub mod series;
pub mod stats;

pub use error::{AnalyticsError, ParseError};
pub use forecast::{
    FailedSeries, ForecastBatch, ForecastEngine, ForecastJob, LinearFit, PredictionSummary,
    SeriesForecast, FORECAST_HORIZON, fit_ols, summarize_predictions,
};
pub use ingest::{DEFAULT_DELIMITER, IngestJob, MAX_YEAR, WideTableParser};
pub use job::AnalyticsJob;
pub use series::{Series, SeriesPoint, group_by_type};
pub use stats::{
    DatasetOverview, Extremum, SeriesStats, StatsCalculator, Trend, TypeTotal, Variation, YearOverYear,
    YearTotal,
};
