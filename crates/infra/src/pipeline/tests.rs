use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use super::*;
use crate::store::InMemoryRecordStore;

const SOURCE: &str = "\
year;auto_bus;rail;air
1995;100;50;10
1996;110;55;12
1997;90;60;14
";

type MemPipeline = Pipeline<
    Arc<InMemoryRecordStore<PassengerRecord>>,
    Arc<InMemoryRecordStore<ForecastRecord>>,
>;

fn pipeline() -> (
    MemPipeline,
    Arc<InMemoryRecordStore<PassengerRecord>>,
    Arc<InMemoryRecordStore<ForecastRecord>>,
) {
    let series = Arc::new(InMemoryRecordStore::new());
    let predictions = Arc::new(InMemoryRecordStore::new());
    (
        Pipeline::new(series.clone(), predictions.clone()),
        series,
        predictions,
    )
}

fn tt(code: &str) -> TransportType {
    TransportType::new(code).unwrap()
}

/// Store whose writes always fail; reads return an empty set.
struct FailingStore;

impl<R> RecordStore<R> for FailingStore {
    fn replace_all(&self, _records: Vec<R>) -> Result<usize, StorageError> {
        Err(StorageError::Unavailable("connection refused".to_string()))
    }

    fn read_all(&self) -> Result<Vec<R>, StorageError> {
        Ok(Vec::new())
    }
}

#[test]
fn ingest_loads_every_cell() {
    let (p, series, _) = pipeline();
    let summary = p.run_ingest(SOURCE).unwrap();

    assert_eq!(summary.records_loaded, 9);
    assert_eq!(summary.transport_types, 3);
    assert_eq!(summary.years, 3);
    assert_eq!(series.read_all().unwrap().len(), 9);
}

#[test]
fn ingest_twice_is_idempotent() {
    let (p, series, _) = pipeline();
    p.run_ingest(SOURCE).unwrap();
    let first = series.read_all().unwrap();
    p.run_ingest(SOURCE).unwrap();

    assert_eq!(series.read_all().unwrap(), first);
}

#[test]
fn ingest_replaces_previous_dataset() {
    let (p, series, _) = pipeline();
    p.run_ingest(SOURCE).unwrap();
    p.run_ingest("year;ferry\n2001;7\n").unwrap();

    let stored = series.read_all().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].transport_type, tt("ferry"));
}

#[test]
fn parse_error_leaves_store_untouched() {
    let (p, series, _) = pipeline();
    p.run_ingest(SOURCE).unwrap();
    let before = series.read_all().unwrap();

    let err = p.run_ingest("year;rail\n1995;abc\n").unwrap_err();
    assert!(matches!(err, IngestError::Parse(ParseError::InvalidNumber { row: 1, .. })));
    assert_eq!(series.read_all().unwrap(), before);
}

#[test]
fn analytics_errors_map_onto_ingest_errors() {
    assert_eq!(
        IngestError::from(AnalyticsError::Parse(ParseError::EmptyInput)),
        IngestError::Parse(ParseError::EmptyInput)
    );
    let err = IngestError::from(AnalyticsError::InvalidInput("bad".to_string()));
    assert_eq!(err, IngestError::Rejected("invalid job input: bad".to_string()));
}

#[test]
fn storage_failure_on_ingest_is_reported() {
    let p = Pipeline::new(FailingStore, InMemoryRecordStore::<ForecastRecord>::new());
    let err = p.run_ingest(SOURCE).unwrap_err();
    assert!(matches!(err, IngestError::Storage(StorageError::Unavailable(_))));
}

#[test]
fn forecast_produces_horizon_per_type() {
    let (p, _, predictions) = pipeline();
    p.run_ingest(SOURCE).unwrap();
    let summary = p.run_forecast().unwrap();

    assert_eq!(summary.types_forecast, 3);
    assert_eq!(summary.predictions, 15);
    assert!(summary.types_failed.is_empty());

    let stored = predictions.read_all().unwrap();
    assert_eq!(stored.len(), 15);
    assert!(stored.iter().all(|f| (1998..=2002).contains(&f.prediction_year)));
    assert!(
        stored
            .iter()
            .all(|f| f.predicted_passengers >= 0.0 && (0.0..=1.0).contains(&f.confidence_level))
    );
}

#[test]
fn forecast_isolates_short_series() {
    let (p, series, predictions) = pipeline();
    let mut records: Vec<PassengerRecord> = (1995..=2020)
        .map(|y| PassengerRecord::new(y, tt("rail"), 100.0 + y as f64).unwrap())
        .collect();
    records.push(PassengerRecord::new(2020, tt("ferry"), 5.0).unwrap());
    series.replace_all(records).unwrap();

    let summary = p.run_forecast().unwrap();
    assert_eq!(summary.types_forecast, 1);
    assert_eq!(summary.types_failed.len(), 1);
    assert_eq!(summary.types_failed[0].transport_type, tt("ferry"));

    let stored = predictions.read_all().unwrap();
    assert_eq!(stored.len(), 5);
    assert!(stored.iter().all(|f| f.transport_type == tt("rail")));
}

#[test]
fn forecast_on_empty_dataset_clears_predictions() {
    let (p, _, predictions) = pipeline();
    p.run_ingest(SOURCE).unwrap();
    p.run_forecast().unwrap();
    p.run_ingest("year;rail\n").unwrap();

    let summary = p.run_forecast().unwrap();
    assert_eq!(summary.predictions, 0);
    assert!(predictions.read_all().unwrap().is_empty());
}

#[test]
fn forecast_store_failure_is_fatal() {
    let p = Pipeline::new(InMemoryRecordStore::<PassengerRecord>::new(), FailingStore);
    p.run_ingest(SOURCE).unwrap();

    assert!(matches!(p.run_forecast(), Err(StorageError::Unavailable(_))));
}

#[test]
fn read_side_queries() {
    let (p, _, _) = pipeline();
    p.run_ingest(SOURCE).unwrap();
    p.run_forecast().unwrap();

    assert_eq!(p.passenger_records(None).unwrap().len(), 9);
    assert_eq!(p.passenger_records(Some(&tt("air"))).unwrap().len(), 3);
    assert!(p.passenger_records(Some(&tt("ferry"))).unwrap().is_empty());

    let overview = p.overview().unwrap();
    assert_eq!(overview.record_count, 9);
    assert_eq!(overview.most_used.as_ref().map(|t| t.transport_type.clone()), Some(tt("auto_bus")));

    let bus = p.series_stats(&tt("auto_bus")).unwrap().unwrap();
    assert_eq!(bus.observations, 3);
    assert!(p.series_stats(&tt("ferry")).unwrap().is_none());
    assert_eq!(p.all_series_stats().unwrap().len(), 3);

    let summary = p.prediction_summary().unwrap();
    assert_eq!(summary.len(), 3);
    assert!(summary.windows(2).all(|w| w[0].final_prediction >= w[1].final_prediction));
    assert_eq!(p.forecasts().unwrap().len(), 15);
}

/// Store that counts calls running concurrently with another call.
#[derive(Default)]
struct OverlapCounter {
    inner: InMemoryRecordStore<PassengerRecord>,
    active: AtomicUsize,
    overlaps: AtomicUsize,
}

impl OverlapCounter {
    fn tracked<T>(&self, f: impl FnOnce() -> T) -> T {
        if self.active.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        thread::sleep(std::time::Duration::from_millis(2));
        let out = f();
        self.active.fetch_sub(1, Ordering::SeqCst);
        out
    }
}

impl RecordStore<PassengerRecord> for OverlapCounter {
    fn replace_all(&self, records: Vec<PassengerRecord>) -> Result<usize, StorageError> {
        self.tracked(|| self.inner.replace_all(records))
    }

    fn read_all(&self) -> Result<Vec<PassengerRecord>, StorageError> {
        self.tracked(|| self.inner.read_all())
    }
}

#[test]
fn concurrent_ingests_are_serialized() {
    let counter = Arc::new(OverlapCounter::default());
    let p = Arc::new(Pipeline::new(
        counter.clone(),
        InMemoryRecordStore::<ForecastRecord>::new(),
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let p = p.clone();
            thread::spawn(move || p.run_ingest(SOURCE).map(|s| s.records_loaded))
        })
        .collect();

    for h in handles {
        assert_eq!(h.join().unwrap().unwrap(), 9);
    }
    assert_eq!(counter.overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(counter.read_all().unwrap().len(), 9);
}

#[test]
fn concurrent_forecasts_snapshot_and_replace_under_one_writer() {
    let counter = Arc::new(OverlapCounter::default());
    counter
        .replace_all(WideTableParser::new().parse(SOURCE).unwrap())
        .unwrap();
    let predictions = Arc::new(InMemoryRecordStore::<ForecastRecord>::new());
    let p = Arc::new(Pipeline::new(counter.clone(), predictions.clone()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let p = p.clone();
            thread::spawn(move || p.run_forecast().map(|s| s.predictions))
        })
        .collect();

    for h in handles {
        assert_eq!(h.join().unwrap().unwrap(), 15);
    }
    assert_eq!(counter.overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(predictions.read_all().unwrap().len(), 15);
}
