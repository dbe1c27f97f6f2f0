//! Per-type time series built from long-format records.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use ridership_core::{PassengerRecord, TransportType, Year};

/// One observation of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub year: Year,
    pub value: f64,
}

/// Observations for one transport type, ordered by year ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    transport_type: TransportType,
    points: Vec<SeriesPoint>,
}

impl Series {
    /// Build a series; points are sorted by year (stable for equal years).
    pub fn new(transport_type: TransportType, mut points: Vec<SeriesPoint>) -> Self {
        points.sort_by_key(|p| p.year);
        Self {
            transport_type,
            points,
        }
    }

    pub fn transport_type(&self) -> &TransportType {
        &self.transport_type
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn distinct_years(&self) -> usize {
        self.points.iter().map(|p| p.year).collect::<BTreeSet<_>>().len()
    }

    pub fn last_year(&self) -> Option<Year> {
        self.points.last().map(|p| p.year)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }
}

/// Group records into one series per transport type.
///
/// Single fold into an ordered map; the result is keyed by type code so
/// iteration order is deterministic regardless of record order.
pub fn group_by_type(records: &[PassengerRecord]) -> BTreeMap<TransportType, Series> {
    records
        .iter()
        .fold(BTreeMap::<TransportType, Vec<SeriesPoint>>::new(), |mut acc, r| {
            acc.entry(r.transport_type.clone()).or_default().push(SeriesPoint {
                year: r.year,
                value: r.passengers,
            });
            acc
        })
        .into_iter()
        .map(|(t, points)| (t.clone(), Series::new(t, points)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(year: Year, t: &str, v: f64) -> PassengerRecord {
        PassengerRecord::new(year, TransportType::new(t).unwrap(), v).unwrap()
    }

    #[test]
    fn groups_and_orders_by_year() {
        let records = vec![
            rec(1997, "air", 3.0),
            rec(1995, "rail", 10.0),
            rec(1995, "air", 1.0),
            rec(1996, "air", 2.0),
        ];
        let grouped = group_by_type(&records);
        assert_eq!(grouped.len(), 2);

        let air = &grouped[&TransportType::new("air").unwrap()];
        let years: Vec<_> = air.points().iter().map(|p| p.year).collect();
        assert_eq!(years, vec![1995, 1996, 1997]);
        assert_eq!(air.last_year(), Some(1997));
        assert_eq!(air.values().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);

        let rail = &grouped[&TransportType::new("rail").unwrap()];
        assert_eq!(rail.len(), 1);
        assert_eq!(rail.distinct_years(), 1);
    }

    #[test]
    fn empty_input_groups_to_nothing() {
        assert!(group_by_type(&[]).is_empty());
    }
}
