//! Per-series linear forecasting.
//!
//! Model:
//! - Fit ordinary least squares `y = slope·year + intercept` over the series.
//! - Score the fit with R², clamped into \[0, 1\], and use it as the confidence
//!   of every forecast point.
//! - Extrapolate [`FORECAST_HORIZON`] years past the last observation, clamping
//!   predictions at zero since passenger counts cannot be negative.
//!
//! Every series is fitted independently: a series that cannot be fitted is
//! reported in [`ForecastBatch::failures`] and does not affect the others.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use ridership_core::{ForecastRecord, PassengerRecord, TransportType, Year};

use crate::error::AnalyticsError;
use crate::job::AnalyticsJob;
use crate::series::{Series, group_by_type};
use crate::stats::Trend;

/// Number of future years produced per series.
pub const FORECAST_HORIZON: Year = 5;

/// Fitted OLS line for one series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    /// Value of the line at year 0 (`y = slope·year + intercept`).
    pub intercept: f64,
    /// Coefficient of determination. Always finite; see [`fit_ols`] for the
    /// zero-variance policy.
    pub r_squared: f64,
    pub observations: usize,
    pub last_year: Year,
    /// First observed year; predictions are evaluated relative to it.
    pub anchor_year: Year,
    /// Fitted value at `anchor_year`.
    pub anchor_value: f64,
}

impl LinearFit {
    pub fn predict(&self, year: Year) -> f64 {
        self.anchor_value + self.slope * year_offset(year, self.anchor_year)
    }

    /// R² clamped into \[0, 1\].
    pub fn confidence(&self) -> f64 {
        self.r_squared.clamp(0.0, 1.0)
    }

    pub fn trend(&self) -> Trend {
        Trend::from_slope(self.slope)
    }
}

/// `year − anchor` computed in `i64`, so it is exact for every `i32` pair.
fn year_offset(year: Year, anchor: Year) -> f64 {
    (i64::from(year) - i64::from(anchor)) as f64
}

/// Fit `y = slope·x + intercept` by ordinary least squares.
///
/// ```text
/// slope     = Σ(x − x̄)(y − ȳ) / Σ(x − x̄)²
/// intercept = ȳ − slope·x̄
/// ```
///
/// Years are shifted to the first observed year before summing, so large
/// years do not lose precision in the sums. Fewer than two distinct years fails with
/// [`AnalyticsError::InsufficientData`]. When all observed values are equal
/// (`SStotal == 0`) R² is 1.0 for an exact fit and 0.0 otherwise.
pub fn fit_ols(series: &Series) -> Result<LinearFit, AnalyticsError> {
    let insufficient = || AnalyticsError::InsufficientData {
        transport_type: series.transport_type().clone(),
        points: series.distinct_years(),
    };

    if series.distinct_years() < 2 {
        return Err(insufficient());
    }
    let points = series.points();
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Err(insufficient());
    };
    let (anchor_year, last_year) = (first.year, last.year);

    // Flat series: exact horizontal fit, independent of rounding in the sums.
    if series.values().all(|v| v == first.value) {
        return Ok(LinearFit {
            slope: 0.0,
            intercept: first.value,
            r_squared: 1.0,
            observations: series.len(),
            last_year,
            anchor_year,
            anchor_value: first.value,
        });
    }

    let n = series.len() as f64;
    let mean_x = points.iter().map(|p| year_offset(p.year, anchor_year)).sum::<f64>() / n;
    let mean_y = series.values().sum::<f64>() / n;

    let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), p| {
        let dx = year_offset(p.year, anchor_year) - mean_x;
        (sxx + dx * dx, sxy + dx * (p.value - mean_y))
    });
    if sxx == 0.0 || !sxx.is_finite() {
        return Err(insufficient());
    }

    let slope = sxy / sxx;
    let anchor_value = mean_y - slope * mean_x;
    let intercept = anchor_value - slope * f64::from(anchor_year);

    let (ss_total, ss_residual) = points.iter().fold((0.0, 0.0), |(tot, res), p| {
        let fitted = anchor_value + slope * year_offset(p.year, anchor_year);
        (
            tot + (p.value - mean_y).powi(2),
            res + (p.value - fitted).powi(2),
        )
    });

    Ok(LinearFit {
        slope,
        intercept,
        r_squared: r_squared(ss_residual, ss_total),
        observations: series.len(),
        last_year,
        anchor_year,
        anchor_value,
    })
}

fn r_squared(ss_residual: f64, ss_total: f64) -> f64 {
    let r2 = if ss_total == 0.0 {
        if ss_residual == 0.0 { 1.0 } else { 0.0 }
    } else {
        1.0 - ss_residual / ss_total
    };
    if r2.is_finite() { r2 } else { 0.0 }
}

/// Fit plus the forecast points derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesForecast {
    pub fit: LinearFit,
    pub records: Vec<ForecastRecord>,
}

/// A series that could not be forecast, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedSeries {
    pub transport_type: TransportType,
    pub reason: String,
}

/// Outcome of forecasting every series in a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastBatch {
    pub records: Vec<ForecastRecord>,
    /// Types that produced forecasts, in type-code order.
    pub forecast_types: Vec<TransportType>,
    pub failures: Vec<FailedSeries>,
}

/// Deterministic OLS forecaster.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForecastEngine;

impl ForecastEngine {
    pub fn new() -> Self {
        Self
    }

    /// Forecast one series `FORECAST_HORIZON` years past its last observation.
    pub fn forecast_series(&self, series: &Series) -> Result<SeriesForecast, AnalyticsError> {
        let fit = fit_ols(series)?;
        let confidence = fit.confidence();

        let records = (1..=FORECAST_HORIZON)
            .map(|offset| {
                let year = fit.last_year.checked_add(offset).ok_or_else(|| {
                    AnalyticsError::InvalidInput(format!(
                        "forecast year past {} is out of range",
                        fit.last_year
                    ))
                })?;
                // `+ 0.0` normalizes a -0.0 prediction to 0.0.
                let predicted = fit.predict(year).max(0.0) + 0.0;
                ForecastRecord::new(series.transport_type().clone(), year, predicted, confidence)
                    .map_err(|e| AnalyticsError::InvalidInput(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SeriesForecast { fit, records })
    }

    /// Forecast every type present in `records`, isolating failures per type.
    pub fn forecast_all(&self, records: &[PassengerRecord]) -> ForecastBatch {
        group_by_type(records)
            .into_iter()
            .fold(ForecastBatch::default(), |mut batch, (transport_type, series)| {
                match self.forecast_series(&series) {
                    Ok(forecast) => {
                        batch.records.extend(forecast.records);
                        batch.forecast_types.push(transport_type);
                    }
                    Err(e) => batch.failures.push(FailedSeries {
                        transport_type,
                        reason: e.to_string(),
                    }),
                }
                batch
            })
    }
}

/// Forecast job over a passenger-record snapshot.
#[derive(Debug, Clone)]
pub struct ForecastJob {
    input: Vec<PassengerRecord>,
    engine: ForecastEngine,
}

impl ForecastJob {
    pub fn new(input: Vec<PassengerRecord>) -> Self {
        Self {
            input,
            engine: ForecastEngine::new(),
        }
    }
}

impl AnalyticsJob for ForecastJob {
    type Input = Vec<PassengerRecord>;
    type Output = ForecastBatch;

    fn name(&self) -> &'static str {
        "forecast.linear_regression"
    }

    fn input(&self) -> &Self::Input {
        &self.input
    }

    /// Per-type failures are part of the output, never an `Err`.
    fn run(&self) -> Result<Self::Output, AnalyticsError> {
        Ok(self.engine.forecast_all(&self.input))
    }
}

/// Per-type digest of stored forecasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSummary {
    pub transport_type: TransportType,
    pub label: String,
    pub average_confidence: f64,
    pub final_year: Year,
    pub final_prediction: f64,
}

/// Summarize forecasts per type, largest final prediction first.
pub fn summarize_predictions(records: &[ForecastRecord]) -> Vec<PredictionSummary> {
    let by_type = records.iter().fold(
        BTreeMap::<&TransportType, Vec<&ForecastRecord>>::new(),
        |mut acc, r| {
            acc.entry(&r.transport_type).or_default().push(r);
            acc
        },
    );

    let mut summaries: Vec<PredictionSummary> = by_type
        .into_iter()
        .filter_map(|(transport_type, preds)| {
            let last = preds.iter().max_by_key(|p| p.prediction_year)?;
            let average_confidence =
                preds.iter().map(|p| p.confidence_level).sum::<f64>() / preds.len() as f64;
            Some(PredictionSummary {
                transport_type: transport_type.clone(),
                label: transport_type.label(),
                average_confidence,
                final_year: last.prediction_year,
                final_prediction: last.predicted_passengers,
            })
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.final_prediction
            .total_cmp(&a.final_prediction)
            .then_with(|| a.transport_type.cmp(&b.transport_type))
    });
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::SeriesPoint;

    fn tt(code: &str) -> TransportType {
        TransportType::new(code).unwrap()
    }

    fn series(code: &str, points: &[(Year, f64)]) -> Series {
        Series::new(
            tt(code),
            points
                .iter()
                .map(|&(year, value)| SeriesPoint { year, value })
                .collect(),
        )
    }

    fn records(code: &str, points: &[(Year, f64)]) -> Vec<PassengerRecord> {
        points
            .iter()
            .map(|&(y, v)| PassengerRecord::new(y, tt(code), v).unwrap())
            .collect()
    }

    #[test]
    fn perfect_line_has_full_confidence() {
        let points: Vec<_> = (1..=10).map(|x| (x, 2.0 * f64::from(x) + 3.0)).collect();
        let fit = fit_ols(&series("rail", &points)).unwrap();

        assert!((fit.slope - 2.0).abs() < 1e-9);
        assert!((fit.intercept - 3.0).abs() < 1e-9);
        assert_eq!(fit.r_squared, 1.0);
        assert_eq!(fit.confidence(), 1.0);
        assert_eq!(fit.trend(), Trend::Increasing);
    }

    #[test]
    fn forecasts_start_after_last_year_and_span_horizon() {
        let points: Vec<_> = (1..=10).map(|x| (x, 2.0 * f64::from(x) + 3.0)).collect();
        let forecast = ForecastEngine::new()
            .forecast_series(&series("rail", &points))
            .unwrap();

        let years: Vec<_> = forecast.records.iter().map(|r| r.prediction_year).collect();
        assert_eq!(years, vec![11, 12, 13, 14, 15]);
        assert!((forecast.records[0].predicted_passengers - 25.0).abs() < 1e-9);
        assert!(forecast.records.iter().all(|r| r.confidence_level == 1.0));
    }

    #[test]
    fn strongly_decreasing_series_is_clamped_to_zero() {
        let s = series("sea", &[(1, 100.0), (2, 80.0), (3, 60.0), (4, 40.0), (5, 20.0)]);
        let forecast = ForecastEngine::new().forecast_series(&s).unwrap();

        assert_eq!(forecast.records.len(), 5);
        for r in &forecast.records {
            assert_eq!(r.predicted_passengers, 0.0);
        }
        assert_eq!(forecast.fit.trend(), Trend::Decreasing);
    }

    #[test]
    fn constant_series_is_an_exact_fit() {
        let s = series("river", &[(2000, 5.0), (2001, 5.0), (2002, 5.0)]);
        let fit = fit_ols(&s).unwrap();
        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.r_squared, 1.0);
        assert_eq!(fit.trend(), Trend::Decreasing);
    }

    #[test]
    fn zero_variance_policy() {
        assert_eq!(r_squared(0.0, 0.0), 1.0);
        assert_eq!(r_squared(1e-3, 0.0), 0.0);
        assert_eq!(r_squared(f64::NAN, 1.0), 0.0);
        assert!((r_squared(1.0, 4.0) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn noisy_series_has_partial_confidence() {
        let s = series("air", &[(1, 1.0), (2, 3.0), (3, 2.0), (4, 5.0), (5, 4.0)]);
        let fit = fit_ols(&s).unwrap();
        assert!((fit.slope - 0.8).abs() < 1e-9);
        assert!((fit.intercept - 0.6).abs() < 1e-9);
        assert!(fit.confidence() > 0.0 && fit.confidence() < 1.0);
    }

    #[test]
    fn single_observation_is_insufficient() {
        let err = fit_ols(&series("tram", &[(2020, 10.0)])).unwrap_err();
        assert_eq!(
            err,
            AnalyticsError::InsufficientData {
                transport_type: tt("tram"),
                points: 1
            }
        );
        assert!(fit_ols(&series("tram", &[])).is_err());
    }

    #[test]
    fn years_near_i32_max_still_fit() {
        for (first, last) in [(Year::MAX - 1, Year::MAX), (Year::MAX - 7, Year::MAX)] {
            let fit = fit_ols(&series("rail", &[(first, 10.0), (last, 20.0)])).unwrap();
            let expected = 10.0 / f64::from(last - first);

            assert!((fit.slope - expected).abs() < 1e-9);
            assert!((fit.r_squared - 1.0).abs() < 1e-9);
            assert!((fit.predict(first) - 10.0).abs() < 1e-9);
            assert!((fit.predict(last) - 20.0).abs() < 1e-9);
        }
    }

    #[test]
    fn horizon_past_year_range_is_a_per_type_failure() {
        let mut input = records("rail", &[(Year::MAX - 647, 10.0), (Year::MAX, 20.0)]);
        input.extend(records("tram", &[(2019, 1.0), (2020, 2.0)]));

        let batch = ForecastEngine::new().forecast_all(&input);

        assert_eq!(batch.forecast_types, vec![tt("tram")]);
        assert_eq!(batch.records.len(), 5);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].transport_type, tt("rail"));
        assert!(batch.failures[0].reason.contains("out of range"));
    }

    #[test]
    fn clamped_predictions_are_positive_zero() {
        let forecast = ForecastEngine::new()
            .forecast_series(&series("ferry", &[(2000, 100.0), (2001, 0.0)]))
            .unwrap();
        assert!(
            forecast
                .records
                .iter()
                .all(|r| r.predicted_passengers == 0.0 && r.predicted_passengers.is_sign_positive())
        );
    }

    #[test]
    fn failures_are_isolated_per_type() {
        let mut input = records("air", &[(2020, 4797.5)]);
        input.extend(records(
            "railway",
            &(1995..=2020).map(|y| (y, 1000.0 + f64::from(y - 1995) * 10.0)).collect::<Vec<_>>(),
        ));

        let batch = ForecastEngine::new().forecast_all(&input);

        assert_eq!(batch.records.len(), 5);
        assert!(batch.records.iter().all(|r| r.transport_type == tt("railway")));
        assert_eq!(batch.records[0].prediction_year, 2021);
        assert_eq!(batch.forecast_types, vec![tt("railway")]);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].transport_type, tt("air"));
    }

    #[test]
    fn forecast_job_never_fails_on_bad_series() {
        let job = ForecastJob::new(records("air", &[(2020, 1.0)]));
        let batch = job.run().unwrap();
        assert!(batch.records.is_empty());
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(job.name(), "forecast.linear_regression");
    }

    #[test]
    fn summary_orders_by_final_prediction() {
        let batch = ForecastEngine::new().forecast_all(&[
            records("sea", &[(1, 10.0), (2, 20.0)]),
            records("auto_bus", &[(1, 100.0), (2, 200.0)]),
        ]
        .concat());

        let summary = summarize_predictions(&batch.records);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].transport_type, tt("auto_bus"));
        assert_eq!(summary[0].label, "AUTO BUS");
        assert_eq!(summary[0].final_year, 7);
        assert!((summary[0].final_prediction - 700.0).abs() < 1e-9);
        assert_eq!(summary[0].average_confidence, 1.0);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: forecasts are never negative and confidence stays in [0, 1].
            #[test]
            fn forecasts_are_bounded(values in proptest::collection::vec(0.0f64..1e8, 2..30)) {
                let points: Vec<_> = values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (1995 + i as Year, *v))
                    .collect();
                let forecast = ForecastEngine::new().forecast_series(&series("bus", &points)).unwrap();

                prop_assert_eq!(forecast.records.len(), FORECAST_HORIZON as usize);
                for r in &forecast.records {
                    prop_assert!(r.predicted_passengers >= 0.0);
                    prop_assert!(r.predicted_passengers.is_finite());
                    prop_assert!((0.0..=1.0).contains(&r.confidence_level));
                }
            }
        }
    }
}
