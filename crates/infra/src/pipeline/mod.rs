//! Orchestration of the two batch runs (ingest, forecast) and the read-side
//! statistics queries.
//!
//! The pipeline owns no data: it reads snapshots from the stores, hands them
//! to analytics jobs, and writes results back with a single `replace_all`.
//! Writers of each dataset are serialized by a per-dataset lock; readers rely
//! on the stores' atomic replace and never take the lock.
//!
//! Callers sequence the runs: forecast regeneration is meaningful only after
//! a successful ingest, but the pipeline does not enforce that ordering.

use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use ridership_analytics::{
    AnalyticsError, AnalyticsJob, DatasetOverview, FailedSeries, ForecastJob, IngestJob, ParseError,
    PredictionSummary, SeriesStats, StatsCalculator, WideTableParser, summarize_predictions,
};
use ridership_core::{ForecastRecord, PassengerRecord, RunId, TransportType};

use crate::store::{RecordStore, StorageError};

/// Result of a successful ingest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub run_id: RunId,
    pub records_loaded: usize,
    pub transport_types: usize,
    pub years: usize,
    pub completed_at: DateTime<Utc>,
}

/// Result of a forecast run; per-type failures are reported, not fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub run_id: RunId,
    pub predictions: usize,
    pub types_forecast: usize,
    pub types_failed: Vec<FailedSeries>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Non-parse failure of the ingest job. Parsing is currently the only
    /// way the job fails, so this is a catch-all for [`AnalyticsError`].
    #[error("ingest rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<AnalyticsError> for IngestError {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::Parse(e) => IngestError::Parse(e),
            other => IngestError::Rejected(other.to_string()),
        }
    }
}

/// Ingest/forecast orchestration over a series store `S` and a prediction store `P`.
pub struct Pipeline<S, P> {
    series: S,
    predictions: P,
    parser: WideTableParser,
    stats: StatsCalculator,
    series_writer: Mutex<()>,
    prediction_writer: Mutex<()>,
}

impl<S, P> Pipeline<S, P>
where
    S: RecordStore<PassengerRecord>,
    P: RecordStore<ForecastRecord>,
{
    pub fn new(series: S, predictions: P) -> Self {
        Self {
            series,
            predictions,
            parser: WideTableParser::default(),
            stats: StatsCalculator::new(),
            series_writer: Mutex::new(()),
            prediction_writer: Mutex::new(()),
        }
    }

    pub fn with_parser(mut self, parser: WideTableParser) -> Self {
        self.parser = parser;
        self
    }

    /// Parse `source` and replace the whole passenger dataset with it.
    ///
    /// All-or-nothing: a parse error leaves the store untouched, and the
    /// replace itself is atomic.
    pub fn run_ingest(&self, source: &str) -> Result<IngestSummary, IngestError> {
        let run_id = RunId::new();
        let job = IngestJob::new(source).with_parser(self.parser);

        let records = run_job(run_id, &job).map_err(|e| {
            warn!(run_id = %run_id, error = %e, "ingest source rejected");
            IngestError::from(e)
        })?;

        let transport_types = count_distinct(records.iter().map(|r| r.transport_type.clone()));
        let years = count_distinct(records.iter().map(|r| r.year));

        let records_loaded = {
            let _guard = lock_writer(&self.series_writer)?;
            self.series.replace_all(records).map_err(|e| {
                warn!(run_id = %run_id, error = %e, "failed to replace passenger records");
                e
            })?
        };

        info!(
            run_id = %run_id,
            records = records_loaded,
            transport_types,
            years,
            "ingest completed"
        );

        Ok(IngestSummary {
            run_id,
            records_loaded,
            transport_types,
            years,
            completed_at: Utc::now(),
        })
    }

    /// Regenerate forecasts for every type from the current passenger snapshot.
    ///
    /// Types that cannot be fitted are listed in `types_failed`; the
    /// prediction store is still replaced with the forecasts of the others.
    /// Runs hold the prediction writer from snapshot to replace, so the stored
    /// predictions always come from the latest snapshot read.
    pub fn run_forecast(&self) -> Result<ForecastSummary, StorageError> {
        let run_id = RunId::new();
        let _guard = lock_writer(&self.prediction_writer)?;
        let snapshot = self.series.read_all()?;
        let job = ForecastJob::new(snapshot);

        let batch = run_job(run_id, &job).map_err(|e| StorageError::Backend(e.to_string()))?;

        for failure in &batch.failures {
            warn!(
                run_id = %run_id,
                transport_type = %failure.transport_type,
                reason = %failure.reason,
                "series not forecast"
            );
        }

        let types_forecast = batch.forecast_types.len();
        let predictions = self.predictions.replace_all(batch.records).map_err(|e| {
            warn!(run_id = %run_id, error = %e, "failed to replace predictions");
            e
        })?;

        info!(
            run_id = %run_id,
            predictions,
            types_forecast,
            types_failed = batch.failures.len(),
            "forecast completed"
        );

        Ok(ForecastSummary {
            run_id,
            predictions,
            types_forecast,
            types_failed: batch.failures,
            completed_at: Utc::now(),
        })
    }

    /// Passenger records, optionally restricted to one type.
    pub fn passenger_records(
        &self,
        transport_type: Option<&TransportType>,
    ) -> Result<Vec<PassengerRecord>, StorageError> {
        let mut records = self.series.read_all()?;
        if let Some(t) = transport_type {
            records.retain(|r| &r.transport_type == t);
        }
        Ok(records)
    }

    pub fn forecasts(&self) -> Result<Vec<ForecastRecord>, StorageError> {
        self.predictions.read_all()
    }

    pub fn prediction_summary(&self) -> Result<Vec<PredictionSummary>, StorageError> {
        Ok(summarize_predictions(&self.predictions.read_all()?))
    }

    pub fn overview(&self) -> Result<DatasetOverview, StorageError> {
        Ok(self.stats.overview(&self.series.read_all()?))
    }

    pub fn series_stats(&self, transport_type: &TransportType) -> Result<Option<SeriesStats>, StorageError> {
        Ok(self.stats.series_stats(&self.series.read_all()?, transport_type))
    }

    pub fn all_series_stats(&self) -> Result<Vec<SeriesStats>, StorageError> {
        Ok(self.stats.all_series_stats(&self.series.read_all()?))
    }
}

fn run_job<J: AnalyticsJob>(run_id: RunId, job: &J) -> Result<J::Output, AnalyticsError> {
    let started = Instant::now();
    let out = job.run();
    info!(
        run_id = %run_id,
        job = job.name(),
        ok = out.is_ok(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "analytics job finished"
    );
    out
}

fn lock_writer(lock: &Mutex<()>) -> Result<MutexGuard<'_, ()>, StorageError> {
    lock.lock().map_err(|_| StorageError::Poisoned)
}

fn count_distinct<T: Ord>(items: impl Iterator<Item = T>) -> usize {
    items.collect::<std::collections::BTreeSet<_>>().len()
}

#[cfg(test)]
mod tests;
