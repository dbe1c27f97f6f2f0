//! Descriptive statistics over passenger records.
//!
//! All aggregates are built by folding the record snapshot into ordered maps;
//! results are immutable values recomputed on every call and never stored.

use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use ridership_core::{PassengerRecord, TransportType, Year};

use crate::forecast::fit_ols;
use crate::series::{Series, SeriesPoint, group_by_type};

/// Round to two decimals (display precision of variation percentages).
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Year-over-year change of one point relative to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearOverYear {
    Percent(f64),
    /// Previous value was zero, so no percentage is defined.
    NoBaseline,
}

impl fmt::Display for YearOverYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearOverYear::Percent(p) => write!(f, "{p:+.2}%"),
            YearOverYear::NoBaseline => f.write_str("n/a"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Variation {
    /// Year of the later of the two compared points.
    pub year: Year,
    pub change: YearOverYear,
}

impl Variation {
    pub fn percent(&self) -> Option<f64> {
        match self.change {
            YearOverYear::Percent(p) => Some(p),
            YearOverYear::NoBaseline => None,
        }
    }

    pub fn rounded(&self) -> Option<f64> {
        self.percent().map(round2)
    }
}

/// `(value[i] − value[i-1]) / value[i-1] × 100` for `i = 1..n-1`.
pub fn year_over_year(points: &[SeriesPoint]) -> Vec<Variation> {
    points
        .windows(2)
        .map(|w| {
            let (prev, cur) = (w[0], w[1]);
            let change = if prev.value == 0.0 {
                YearOverYear::NoBaseline
            } else {
                YearOverYear::Percent((cur.value - prev.value) / prev.value * 100.0)
            };
            Variation {
                year: cur.year,
                change,
            }
        })
        .collect()
}

/// Mean of the defined variation points; `None` when there are none.
pub fn average_variation(variations: &[Variation]) -> Option<f64> {
    let (sum, count) = variations
        .iter()
        .filter_map(Variation::percent)
        .fold((0.0, 0usize), |(s, c), p| (s + p, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Direction of a series, read off the regression slope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
}

impl Trend {
    /// `slope > 0` is increasing; everything else, zero included, is decreasing.
    pub fn from_slope(slope: f64) -> Self {
        if slope > 0.0 {
            Trend::Increasing
        } else {
            Trend::Decreasing
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extremum {
    pub year: Year,
    pub value: f64,
}

/// Statistics for a single transport type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub transport_type: TransportType,
    pub observations: usize,
    pub total: f64,
    pub average: f64,
    pub max: Extremum,
    pub min: Extremum,
    pub variations: Vec<Variation>,
    /// Regression slope (passengers per year); `None` below two distinct years.
    pub slope: Option<f64>,
    pub trend: Option<Trend>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeTotal {
    pub transport_type: TransportType,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearTotal {
    pub year: Year,
    pub total: f64,
}

/// Cross-type view of the whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetOverview {
    pub record_count: usize,
    /// Totals per type, largest first (ties by type code).
    pub totals_by_type: Vec<TypeTotal>,
    pub most_used: Option<TypeTotal>,
    pub least_used: Option<TypeTotal>,
    /// Totals per year, ascending by year.
    pub totals_by_year: Vec<YearTotal>,
    pub peak_year: Option<YearTotal>,
    /// Year-over-year variation of the yearly totals.
    pub variations: Vec<Variation>,
    pub average_variation: Option<f64>,
}

/// Stateless calculator; every call works on the snapshot it is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsCalculator;

impl StatsCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn overview(&self, records: &[PassengerRecord]) -> DatasetOverview {
        let (by_type, by_year) = records.iter().fold(
            (BTreeMap::<&TransportType, f64>::new(), BTreeMap::<Year, f64>::new()),
            |(mut by_type, mut by_year), r| {
                *by_type.entry(&r.transport_type).or_default() += r.passengers;
                *by_year.entry(r.year).or_default() += r.passengers;
                (by_type, by_year)
            },
        );

        let mut totals_by_type: Vec<TypeTotal> = by_type
            .into_iter()
            .map(|(t, total)| TypeTotal {
                transport_type: t.clone(),
                total,
            })
            .collect();
        totals_by_type.sort_by(|a, b| {
            b.total
                .total_cmp(&a.total)
                .then_with(|| a.transport_type.cmp(&b.transport_type))
        });

        let totals_by_year: Vec<YearTotal> = by_year
            .into_iter()
            .map(|(year, total)| YearTotal { year, total })
            .collect();

        // Earliest year wins a tie: later years must be strictly larger.
        let peak_year = totals_by_year
            .iter()
            .copied()
            .reduce(|best, y| if y.total > best.total { y } else { best });

        let yearly_points: Vec<SeriesPoint> = totals_by_year
            .iter()
            .map(|y| SeriesPoint {
                year: y.year,
                value: y.total,
            })
            .collect();
        let variations = year_over_year(&yearly_points);

        DatasetOverview {
            record_count: records.len(),
            most_used: totals_by_type.first().cloned(),
            least_used: totals_by_type.last().cloned(),
            totals_by_type,
            totals_by_year,
            peak_year,
            average_variation: average_variation(&variations),
            variations,
        }
    }

    /// Statistics for one type; `None` when the type has no records.
    pub fn series_stats(
        &self,
        records: &[PassengerRecord],
        transport_type: &TransportType,
    ) -> Option<SeriesStats> {
        let points: Vec<SeriesPoint> = records
            .iter()
            .filter(|r| &r.transport_type == transport_type)
            .map(|r| SeriesPoint {
                year: r.year,
                value: r.passengers,
            })
            .collect();
        self.summarize(&Series::new(transport_type.clone(), points))
    }

    /// Statistics for every type, ordered by type code.
    pub fn all_series_stats(&self, records: &[PassengerRecord]) -> Vec<SeriesStats> {
        group_by_type(records)
            .values()
            .filter_map(|s| self.summarize(s))
            .collect()
    }

    pub fn summarize(&self, series: &Series) -> Option<SeriesStats> {
        let points = series.points();
        let first = *points.first()?;

        let (total, max, min) = points.iter().skip(1).fold(
            (
                first.value,
                Extremum {
                    year: first.year,
                    value: first.value,
                },
                Extremum {
                    year: first.year,
                    value: first.value,
                },
            ),
            |(total, max, min), p| {
                let here = Extremum {
                    year: p.year,
                    value: p.value,
                };
                (
                    total + p.value,
                    if p.value > max.value { here } else { max },
                    if p.value < min.value { here } else { min },
                )
            },
        );

        let slope = fit_ols(series).ok().map(|fit| fit.slope);

        Some(SeriesStats {
            transport_type: series.transport_type().clone(),
            observations: points.len(),
            total,
            average: total / points.len() as f64,
            max,
            min,
            variations: year_over_year(points),
            slope,
            trend: slope.map(Trend::from_slope),
        })
    }
}
