//! End-to-end pipeline runs against in-memory caches and scripted providers.

use chrono::{Duration as DateDuration, NaiveDate};
use sigflow_core::data::{DataError, MemoryCache, PriceIngestor, PriceProvider, RawBar};
use sigflow_core::domain::{SignalKind, ValidationError};
use sigflow_core::retry::{RetryPolicy, Sleeper};
use sigflow_core::store::{SignalStore, StoreError};
use sigflow_runner::{Pipeline, PipelineConfig, PipelineContext, RunError, RunRequest, RunStatus};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&self, _: Duration) {}
}

/// Serves a fixed close series for every symbol and counts calls.
struct SeriesProvider {
    closes: Vec<f64>,
    calls: AtomicUsize,
}

impl SeriesProvider {
    fn new(closes: Vec<f64>) -> Self {
        Self {
            closes,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PriceProvider for SeriesProvider {
    fn name(&self) -> &str {
        "series"
    }

    fn history(&self, _symbol: &str, _start: NaiveDate, end: NaiveDate) -> Result<Vec<RawBar>, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let n = self.closes.len() as i64;
        Ok(self
            .closes
            .iter()
            .enumerate()
            .map(|(i, &close)| RawBar {
                date: end - DateDuration::days(n - 1 - i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000,
            })
            .collect())
    }
}

fn end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
}

fn offline_pipeline() -> Pipeline {
    let ctx = PipelineContext::in_memory(PipelineConfig::default(), Arc::new(MemoryCache::default())).unwrap();
    Pipeline::new(ctx)
}

fn live_pipeline(provider: Arc<SeriesProvider>) -> Pipeline {
    let ingestor = PriceIngestor::new(Arc::new(MemoryCache::default()))
        .with_provider(provider)
        .with_rate_limit(Duration::ZERO)
        .with_sleeper(Arc::new(NoSleep));
    let store = SignalStore::open_in_memory().unwrap();
    Pipeline::new(PipelineContext::from_parts(PipelineConfig::default(), ingestor, store))
}

#[test]
fn empty_batch_succeeds_with_zero_counts() {
    let mut pipeline = offline_pipeline();
    let summary = pipeline.run(&RunRequest::new(Vec::<String>::new())).unwrap();

    assert_eq!(summary.status, RunStatus::Success);
    assert_eq!(summary.symbols_processed, 0);
    assert_eq!(summary.signals_generated, 0);
    assert!(!summary.correlation_id.is_empty());
    assert_eq!(pipeline.context().store.count_prices().unwrap(), 0);
}

#[test]
fn sample_series_yields_stale_holds() {
    let mut pipeline = offline_pipeline();
    let summary = pipeline.run(&RunRequest::new(["TEST"]).end_date(end())).unwrap();

    assert_eq!(summary.symbols_processed, 1);
    assert_eq!(summary.signals_generated, 5);
    assert_eq!(summary.stale_symbols, vec!["TEST".to_string()]);

    let store = &pipeline.context().store;
    let signals = store.get_signals_for_symbol("TEST", 10).unwrap();
    assert_eq!(signals.len(), 5);
    assert!(signals.iter().all(|s| s.signal == SignalKind::Hold && s.is_stale));
    let closes: Vec<f64> = store.get_prices("TEST").unwrap().iter().map(|p| p.close).collect();
    assert_eq!(closes, vec![150.0, 151.0, 152.0, 151.5, 152.5]);
}

#[test]
fn rerunning_the_same_day_is_idempotent() {
    let mut pipeline = offline_pipeline();
    let request = RunRequest::new(["TEST", "SPY"]).end_date(end());

    let first = pipeline.run(&request).unwrap();
    let store = &pipeline.context().store;
    let (prices, signals) = (store.count_prices().unwrap(), store.count_signals().unwrap());

    let second = pipeline.run(&request).unwrap();
    let store = &pipeline.context().store;
    assert_eq!(store.count_prices().unwrap(), prices);
    assert_eq!(store.count_signals().unwrap(), signals);
    assert_eq!(first.signals_generated, second.signals_generated);
    assert_ne!(first.correlation_id, second.correlation_id);
}

#[test]
fn validation_failure_never_fetches() {
    let provider = Arc::new(SeriesProvider::new(vec![100.0; 10]));
    let mut pipeline = live_pipeline(provider.clone());

    let err = pipeline.run(&RunRequest::new(["SPY", "brk.b"])).unwrap_err();
    assert!(matches!(
        &err,
        RunError::Validation { source: ValidationError::InvalidSymbol(s), .. } if s == "brk.b"
    ));
    assert!(!err.correlation_id().is_empty());

    let err = pipeline.run(&RunRequest::new(["SPY"]).lookback_days(0)).unwrap_err();
    assert!(matches!(err, RunError::Validation { source: ValidationError::LookbackOutOfRange(0), .. }));

    assert_eq!(provider.calls(), 0);
    assert_eq!(pipeline.context().store.count_signals().unwrap(), 0);
}

#[test]
fn live_data_is_fresh_and_cached() {
    // Long decline, then a sideways stretch: negative trend, mid-range RSI.
    let mut closes: Vec<f64> = (0..50).map(|i| 200.0 - i as f64).collect();
    closes.extend((0..14).map(|i| if i % 2 == 0 { 152.0 } else { 151.0 }));
    let provider = Arc::new(SeriesProvider::new(closes));
    let mut pipeline = live_pipeline(provider.clone());

    let request = RunRequest::new(["SPY", "SPY"]).end_date(end());
    let summary = pipeline.run(&request).unwrap();
    assert_eq!(summary.symbols_processed, 1);
    assert_eq!(summary.signals_generated, 5);
    assert!(summary.stale_symbols.is_empty());

    let latest = pipeline.context().store.get_latest_signals(1).unwrap();
    assert_eq!(latest[0].ts, end());
    assert_eq!(latest[0].signal, SignalKind::Sell);
    assert!(!latest[0].is_stale);

    // Second run is served from the fresh cache.
    pipeline.run(&request).unwrap();
    assert_eq!(provider.calls(), 1);
}

#[test]
fn locked_database_fails_the_run_with_correlation_id() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sigflow.db");
    let store = SignalStore::open(&db_path)
        .unwrap()
        .with_retry(RetryPolicy::new(2, Duration::ZERO, StoreError::is_transient))
        .with_sleeper(Arc::new(NoSleep));
    store.set_busy_timeout(Duration::ZERO).unwrap();

    let ingestor = PriceIngestor::new(Arc::new(MemoryCache::default()));
    let mut pipeline = Pipeline::new(PipelineContext::from_parts(PipelineConfig::default(), ingestor, store));

    let holder = rusqlite::Connection::open(&db_path).unwrap();
    holder.execute_batch("BEGIN EXCLUSIVE;").unwrap();

    let err = pipeline.run(&RunRequest::new(["TEST"]).end_date(end())).unwrap_err();
    match &err {
        RunError::Storage { source, .. } => assert!(source.is_transient()),
        other => panic!("expected storage error, got {other:?}"),
    }
    assert!(!err.correlation_id().is_empty());
    holder.execute_batch("ROLLBACK;").unwrap();
    assert_eq!(pipeline.context().store.count_prices().unwrap(), 0);
}
