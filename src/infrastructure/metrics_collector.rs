//! Metrics Collector
//!
//! Samples server status from every registered connection on a fixed
//! interval and appends the results to the metrics store.

use crate::application::ConnectionRegistry;
use crate::domain::entities::MetricEvent;
use crate::domain::ports::{ClientHandle, MetricsStore, DEFAULT_RETAIN};
use crate::domain::services::CounterState;
use chrono::Utc;
use dashmap::DashMap;
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Collector configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringConfig {
    /// Whether the collector runs at all
    pub enabled: bool,
    /// Time between samples
    pub interval: Duration,
    /// Number of most recent events kept in the store
    pub retain: usize,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(30),
            retain: DEFAULT_RETAIN,
        }
    }
}

impl MonitoringConfig {
    /// Config for `interval` keeping one day of samples.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            enabled: true,
            interval,
            retain: Self::one_day_of(interval),
        }
    }

    /// Number of samples taken at `interval` in 24 hours, at least 1.
    pub fn one_day_of(interval: Duration) -> usize {
        let secs = interval.as_secs_f64();
        if secs <= 0.0 {
            return DEFAULT_RETAIN;
        }
        ((SECONDS_PER_DAY / secs).floor() as usize).max(1)
    }
}

/// State shared between the collector handle and its background task.
struct CollectorCore {
    registry: Arc<ConnectionRegistry>,
    store: Arc<dyn MetricsStore>,
    /// Last raw counter totals per connection name
    counters: DashMap<String, CounterState>,
    retain: usize,
}

impl CollectorCore {
    /// Sample every registered connection once.
    async fn tick(&self) -> usize {
        let handles = self.registry.handles();
        self.forget_removed(&handles);

        let events = join_all(
            handles
                .iter()
                .map(|(name, handle)| self.sample(name, handle)),
        )
        .await;

        let mut stored = 0;
        for event in &events {
            match self.store.append(event).await {
                Ok(()) => stored += 1,
                Err(e) => tracing::error!(
                    "failed to store sample for '{}': {}",
                    event.connection,
                    e
                ),
            }
            match self.store.evict(self.retain).await {
                Ok(0) => {}
                Ok(n) => tracing::debug!("evicted {} old samples", n),
                Err(e) => tracing::error!("failed to evict old samples: {}", e),
            }
        }
        stored
    }

    /// Read status from one connection and build its event.
    ///
    /// Query failures are recorded as samples without data.
    async fn sample(&self, name: &str, handle: &ClientHandle) -> MetricEvent {
        match handle.server_status().await {
            Ok(status) => {
                let doc_counts = status.counters.as_ref().map(|raw| {
                    self.counters
                        .entry(name.to_string())
                        .or_default()
                        .advance(raw)
                });
                MetricEvent::from_status(name, Utc::now(), status, doc_counts)
            }
            Err(e) => {
                tracing::warn!("status query for '{}' failed: {}", name, e);
                MetricEvent::unavailable(name, Utc::now())
            }
        }
    }

    /// Drop counter state of connections that are no longer registered, so a
    /// re-added name starts from an unset state.
    fn forget_removed(&self, handles: &[(String, ClientHandle)]) {
        let live: HashSet<&str> = handles.iter().map(|(name, _)| name.as_str()).collect();
        self.counters.retain(|name, _| live.contains(name.as_str()));
    }
}

struct RunningTask {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Periodic status sampler.
///
/// The first sample fires immediately on `start`, then once per interval.
/// Ticks run one after another; a slow tick delays the next one instead of
/// overlapping it.
pub struct MetricsCollector {
    config: MonitoringConfig,
    core: Arc<CollectorCore>,
    task: Mutex<Option<RunningTask>>,
}

impl MetricsCollector {
    pub fn new(
        config: MonitoringConfig,
        registry: Arc<ConnectionRegistry>,
        store: Arc<dyn MetricsStore>,
    ) -> Self {
        let core = Arc::new(CollectorCore {
            registry,
            store,
            counters: DashMap::new(),
            retain: config.retain,
        });
        Self {
            config,
            core,
            task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &MonitoringConfig {
        &self.config
    }

    /// Start the sampling loop.
    ///
    /// Returns false when monitoring is disabled or the loop already runs.
    pub fn start(&self) -> bool {
        if !self.config.enabled {
            tracing::info!("monitoring disabled, collector not started");
            return false;
        }

        let mut task = self.task.lock();
        if task.is_some() {
            return false;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let core = self.core.clone();
        let period = self.config.interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = interval.tick() => {}
                }
                let stored = core.tick().await;
                tracing::debug!("collector tick stored {} samples", stored);
            }
        });

        tracing::info!(
            "collector started, interval={}ms retain={}",
            period.as_millis(),
            self.config.retain
        );
        *task = Some(RunningTask { stop_tx, handle });
        true
    }

    /// Whether the sampling loop is running.
    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Stop the loop and wait for any in-flight tick to finish.
    ///
    /// No tick starts after this returns.
    pub async fn stop(&self) {
        let task = self.task.lock().take();
        if let Some(RunningTask { stop_tx, handle }) = task {
            let _ = stop_tx.send(true);
            if let Err(e) = handle.await {
                tracing::error!("collector task ended abnormally: {}", e);
            }
            tracing::info!("collector stopped");
        }
    }

    /// Run one sampling pass right now, outside the schedule.
    pub async fn collect_once(&self) -> usize {
        self.core.tick().await
    }

    /// Counter state currently tracked for a connection.
    pub fn counter_state(&self, name: &str) -> Option<CounterState> {
        self.core.counters.get(name).map(|c| *c)
    }
}
