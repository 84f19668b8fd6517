//! Integration tests for the Metrics Collector
//!
//! Runs the collector against an in-memory SQLite store and scripted
//! backends.

mod common;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use common::{status_with_counters, FakeBackend, FakeFactory};
use docwatch::adapters::outbound::SqliteMetricsStore;
use docwatch::application::ConnectionRegistry;
use docwatch::domain::entities::MetricEvent;
use docwatch::domain::errors::{StatusError, StoreError};
use docwatch::domain::ports::MetricsStore;
use docwatch::domain::value_objects::ConnectionOptions;
use docwatch::infrastructure::{MetricsCollector, MonitoringConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_test::traced_test;

const LOCAL: &str = "mongodb://localhost:27017";

struct Harness {
    factory: Arc<FakeFactory>,
    registry: Arc<ConnectionRegistry>,
    store: Arc<SqliteMetricsStore>,
    collector: MetricsCollector,
}

fn harness(config: MonitoringConfig) -> Harness {
    let factory = FakeFactory::new();
    let registry = Arc::new(ConnectionRegistry::new(factory.clone()));
    let store = Arc::new(SqliteMetricsStore::open_in_memory().unwrap());
    let collector = MetricsCollector::new(config, registry.clone(), store.clone());
    Harness {
        factory,
        registry,
        store,
        collector,
    }
}

fn fast_config() -> MonitoringConfig {
    MonitoringConfig {
        enabled: true,
        interval: Duration::from_millis(20),
        retain: 2880,
    }
}

/// SQLite store whose writes fail while `failing` is set.
struct FlakyStore {
    inner: SqliteMetricsStore,
    failing: AtomicBool,
}

impl FlakyStore {
    fn new(failing: bool) -> Self {
        Self {
            inner: SqliteMetricsStore::open_in_memory().unwrap(),
            failing: AtomicBool::new(failing),
        }
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Task("disk unavailable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MetricsStore for FlakyStore {
    async fn append(&self, event: &MetricEvent) -> Result<(), StoreError> {
        self.check()?;
        self.inner.append(event).await
    }

    async fn evict(&self, retain: usize) -> Result<usize, StoreError> {
        self.check()?;
        self.inner.evict(retain).await
    }

    async fn query(&self, since: DateTime<Utc>) -> Result<Vec<MetricEvent>, StoreError> {
        self.inner.query(since).await
    }

    async fn query_connection(
        &self,
        connection: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MetricEvent>, StoreError> {
        self.inner.query_connection(connection, since).await
    }

    async fn count(&self) -> Result<usize, StoreError> {
        self.inner.count().await
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.inner.close().await
    }
}

async fn all_events(store: &SqliteMetricsStore) -> Vec<MetricEvent> {
    store
        .query(Utc::now() - ChronoDuration::days(1))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_first_sample_delta_is_zero_then_tracks_growth() {
    let h = harness(MonitoringConfig::default());
    let backend = h.factory.serve(LOCAL, FakeBackend::new());
    backend.push(Ok(status_with_counters(100, 10, 0, 5)));
    backend.push(Ok(status_with_counters(130, 12, 1, 5)));
    h.registry
        .add("local", LOCAL, ConnectionOptions::new())
        .await
        .unwrap();

    assert_eq!(h.collector.collect_once().await, 1);
    assert_eq!(h.collector.collect_once().await, 1);

    let events = all_events(&h.store).await;
    assert_eq!(events.len(), 2);

    let first = events[0].doc_counts.unwrap();
    assert_eq!(first.queried, 0);
    assert_eq!(first.inserted, 0);

    let second = events[1].doc_counts.unwrap();
    assert_eq!(second.queried, 30);
    assert_eq!(second.inserted, 2);
    assert_eq!(second.deleted, 0); // previous total was unset
    assert_eq!(second.updated, 0);

    let state = h.collector.counter_state("local").unwrap();
    assert_eq!(state.queried, 130);
}

#[tokio::test]
async fn test_counter_reset_yields_negative_delta() {
    let h = harness(MonitoringConfig::default());
    let backend = h.factory.serve(LOCAL, FakeBackend::new());
    backend.push(Ok(status_with_counters(500, 0, 0, 0)));
    backend.push(Ok(status_with_counters(20, 0, 0, 0)));
    h.registry
        .add("local", LOCAL, ConnectionOptions::new())
        .await
        .unwrap();

    h.collector.collect_once().await;
    h.collector.collect_once().await;

    let events = all_events(&h.store).await;
    assert_eq!(events[1].doc_counts.unwrap().queried, -480);
}

#[tokio::test]
#[traced_test]
async fn test_status_failure_records_unavailable_sample() {
    let h = harness(MonitoringConfig::default());
    h.factory.serve(
        LOCAL,
        FakeBackend::failing(StatusError::Unauthorized("not authorized on admin".into())),
    );
    h.registry
        .add("restricted", LOCAL, ConnectionOptions::new())
        .await
        .unwrap();

    assert_eq!(h.collector.collect_once().await, 1);

    let events = all_events(&h.store).await;
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert!(!event.data_retrieved);
    assert_eq!(event.connection, "restricted");
    assert!(event.connections.is_none());
    assert!(event.doc_counts.is_none());
    assert!(logs_contain("status query for 'restricted' failed"));
}

#[tokio::test]
async fn test_one_failing_connection_does_not_block_others() {
    let h = harness(MonitoringConfig::default());
    h.factory.serve(
        "mongodb://broken:27017",
        FakeBackend::failing(StatusError::Query("socket closed".into())),
    );
    h.registry
        .add("broken", "mongodb://broken:27017", ConnectionOptions::new())
        .await
        .unwrap();
    h.registry
        .add("healthy", LOCAL, ConnectionOptions::new())
        .await
        .unwrap();

    assert_eq!(h.collector.collect_once().await, 2);

    let events = all_events(&h.store).await;
    let healthy = events.iter().find(|e| e.connection == "healthy").unwrap();
    let broken = events.iter().find(|e| e.connection == "broken").unwrap();
    assert!(healthy.data_retrieved);
    assert!(!broken.data_retrieved);
}

#[tokio::test]
async fn test_tick_with_no_connections_stores_nothing() {
    let h = harness(MonitoringConfig::default());
    assert_eq!(h.collector.collect_once().await, 0);
    assert_eq!(h.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_retention_keeps_most_recent_samples() {
    let h = harness(MonitoringConfig {
        retain: 3,
        ..MonitoringConfig::default()
    });
    h.registry
        .add("local", LOCAL, ConnectionOptions::new())
        .await
        .unwrap();

    for _ in 0..5 {
        h.collector.collect_once().await;
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    assert_eq!(h.store.count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_removed_connection_counters_are_forgotten() {
    let h = harness(MonitoringConfig::default());
    let backend = h.factory.serve(LOCAL, FakeBackend::new());
    backend.push(Ok(status_with_counters(100, 0, 0, 0)));
    h.registry
        .add("local", LOCAL, ConnectionOptions::new())
        .await
        .unwrap();
    h.collector.collect_once().await;
    assert!(h.collector.counter_state("local").is_some());

    h.registry.remove("local").await.unwrap();
    h.collector.collect_once().await;

    assert!(h.collector.counter_state("local").is_none());
}

#[tokio::test]
async fn test_started_collector_samples_until_stopped() {
    let h = harness(fast_config());
    let backend = h.factory.serve(LOCAL, FakeBackend::new());
    h.registry
        .add("local", LOCAL, ConnectionOptions::new())
        .await
        .unwrap();

    assert!(h.collector.start());
    assert!(h.collector.is_running());
    tokio::time::sleep(Duration::from_millis(120)).await;
    h.collector.stop().await;
    assert!(!h.collector.is_running());

    let calls = backend.status_calls();
    let stored = h.store.count().await.unwrap();
    assert!(calls >= 2, "expected several ticks, got {}", calls);
    assert_eq!(stored, calls);

    // nothing runs after stop returns
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(backend.status_calls(), calls);
    assert_eq!(h.store.count().await.unwrap(), stored);
}

#[tokio::test]
async fn test_stop_waits_for_in_flight_tick() {
    let h = harness(fast_config());
    let backend = h
        .factory
        .serve(LOCAL, FakeBackend::new().with_delay(Duration::from_millis(100)));
    h.registry
        .add("local", LOCAL, ConnectionOptions::new())
        .await
        .unwrap();

    h.collector.start();
    // the first tick fires immediately and is now inside the slow query
    tokio::time::sleep(Duration::from_millis(20)).await;
    h.collector.stop().await;

    assert_eq!(backend.status_calls(), 1);
    assert_eq!(h.store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_slow_ticks_do_not_overlap() {
    let h = harness(fast_config());
    let backend = h.factory.serve(
        LOCAL,
        FakeBackend::new().with_delay(Duration::from_millis(60)),
    );
    h.registry
        .add("local", LOCAL, ConnectionOptions::new())
        .await
        .unwrap();

    h.collector.start();
    tokio::time::sleep(Duration::from_millis(150)).await;
    h.collector.stop().await;

    // overlapping ticks would issue one query per 20ms interval
    assert!(backend.status_calls() <= 3, "got {}", backend.status_calls());
    assert_eq!(h.store.count().await.unwrap(), backend.status_calls());
}

#[tokio::test]
async fn test_disabled_collector_never_starts() {
    let h = harness(MonitoringConfig {
        enabled: false,
        ..fast_config()
    });
    let backend = h.factory.serve(LOCAL, FakeBackend::new());
    h.registry
        .add("local", LOCAL, ConnectionOptions::new())
        .await
        .unwrap();

    assert!(!h.collector.start());
    assert!(!h.collector.is_running());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.status_calls(), 0);

    // stopping a collector that never ran is fine
    h.collector.stop().await;
}

#[tokio::test]
async fn test_start_twice_keeps_single_loop() {
    let h = harness(fast_config());
    assert!(h.collector.start());
    assert!(!h.collector.start());
    h.collector.stop().await;
    assert!(!h.collector.is_running());
}

#[tokio::test]
async fn test_store_close_after_stop() {
    let h = harness(fast_config());
    h.registry
        .add("local", LOCAL, ConnectionOptions::new())
        .await
        .unwrap();
    h.collector.start();
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.collector.stop().await;

    h.registry.close_all().await;
    h.store.close().await.unwrap();
    assert!(h.store.count().await.is_err());
}

#[tokio::test]
#[traced_test]
async fn test_store_failures_are_logged_and_sampling_continues() {
    let factory = FakeFactory::new();
    let registry = Arc::new(ConnectionRegistry::new(factory.clone()));
    let store = Arc::new(FlakyStore::new(true));
    let collector = MetricsCollector::new(fast_config(), registry.clone(), store.clone());
    let backend = factory.serve(LOCAL, FakeBackend::new());
    registry
        .add("local", LOCAL, ConnectionOptions::new())
        .await
        .unwrap();

    assert!(collector.start());
    tokio::time::sleep(Duration::from_millis(70)).await;
    let calls_while_failing = backend.status_calls();
    assert!(calls_while_failing >= 2, "got {}", calls_while_failing);
    assert_eq!(store.count().await.unwrap(), 0);
    assert!(logs_contain("failed to store sample for 'local'"));
    assert!(logs_contain("failed to evict old samples"));

    store.set_failing(false);
    tokio::time::sleep(Duration::from_millis(70)).await;
    collector.stop().await;

    assert!(backend.status_calls() > calls_while_failing);
    assert!(store.count().await.unwrap() > 0);
    assert!(!collector.is_running());
}
