//! Telemetry Service - read path for the monitoring charts
//!
//! Loads a time window of samples, splits them into the named chart series
//! and resamples each series to the display cap.

use crate::domain::entities::{DataPoint, MetricEvent};
use crate::domain::errors::StoreError;
use crate::domain::ports::MetricsStore;
use crate::domain::services::{humanize_uptime, resample};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default maximum number of points per chart series.
pub const DEFAULT_DISPLAY_LIMIT: i64 = 1000;

/// The thirteen chart series served to the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySeries {
    pub connections_current: Vec<DataPoint>,
    pub connections_available: Vec<DataPoint>,
    pub connections_total_created: Vec<DataPoint>,
    pub clients_total: Vec<DataPoint>,
    pub clients_readers: Vec<DataPoint>,
    pub clients_writers: Vec<DataPoint>,
    pub memory_virtual: Vec<DataPoint>,
    pub memory_mapped: Vec<DataPoint>,
    pub memory_current: Vec<DataPoint>,
    pub docs_queried: Vec<DataPoint>,
    pub docs_inserted: Vec<DataPoint>,
    pub docs_deleted: Vec<DataPoint>,
    pub docs_updated: Vec<DataPoint>,
}

impl TelemetrySeries {
    fn push(&mut self, event: &MetricEvent) {
        let at = |y: i64| DataPoint::at(event.event_date, y as f64);

        if let Some(c) = &event.connections {
            self.connections_current.push(at(c.current));
            self.connections_available.push(at(c.available));
            self.connections_total_created.push(at(c.total_created));
        }
        if let Some(c) = &event.active_clients {
            self.clients_total.push(at(c.total));
            self.clients_readers.push(at(c.readers));
            self.clients_writers.push(at(c.writers));
        }
        if let Some(m) = &event.memory {
            self.memory_virtual.push(at(m.r#virtual));
            self.memory_mapped.push(at(m.mapped));
            self.memory_current.push(at(m.resident));
        }
        if let Some(d) = &event.doc_counts {
            self.docs_queried.push(at(d.queried));
            self.docs_inserted.push(at(d.inserted));
            self.docs_deleted.push(at(d.deleted));
            self.docs_updated.push(at(d.updated));
        }
    }

    fn series_mut(&mut self) -> [&mut Vec<DataPoint>; 13] {
        [
            &mut self.connections_current,
            &mut self.connections_available,
            &mut self.connections_total_created,
            &mut self.clients_total,
            &mut self.clients_readers,
            &mut self.clients_writers,
            &mut self.memory_virtual,
            &mut self.memory_mapped,
            &mut self.memory_current,
            &mut self.docs_queried,
            &mut self.docs_inserted,
            &mut self.docs_deleted,
            &mut self.docs_updated,
        ]
    }

    fn resample_all(&mut self, limit: i64) {
        for series in self.series_mut() {
            *series = resample(series, limit);
        }
    }
}

/// Monitoring payload for one time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryReport {
    pub uptime: String,
    pub pid: Option<i64>,
    pub version: Option<String>,
    pub data_retrieved: bool,
    pub data: TelemetrySeries,
}

impl TelemetryReport {
    /// Build a report from events sorted oldest first.
    ///
    /// Header fields come from the oldest event. When that event carries no
    /// data every series stays empty.
    pub fn from_events(events: &[MetricEvent], display_limit: i64) -> Self {
        let Some(head) = events.first() else {
            return Self {
                uptime: humanize_uptime(None),
                pid: None,
                version: None,
                data_retrieved: false,
                data: TelemetrySeries::default(),
            };
        };

        let mut data = TelemetrySeries::default();
        if head.data_retrieved {
            for event in events {
                data.push(event);
            }
        }
        data.resample_all(display_limit);

        Self {
            uptime: humanize_uptime(head.uptime_seconds),
            pid: head.pid,
            version: head.version.clone(),
            data_retrieved: head.data_retrieved,
            data,
        }
    }
}

/// Read API over the metrics store.
pub struct TelemetryService {
    store: Arc<dyn MetricsStore>,
    display_limit: i64,
}

impl TelemetryService {
    pub fn new(store: Arc<dyn MetricsStore>, display_limit: i64) -> Self {
        Self {
            store,
            display_limit,
        }
    }

    pub fn display_limit(&self) -> i64 {
        self.display_limit
    }

    /// Report for one connection's samples at or after `since`.
    ///
    /// A report always describes a single backend; samples of other
    /// connections never reach its header or series.
    pub async fn report(
        &self,
        since: DateTime<Utc>,
        connection: &str,
    ) -> Result<TelemetryReport, StoreError> {
        let events = self.store.query_connection(connection, since).await?;
        tracing::debug!(
            "building telemetry report for '{}' from {} events",
            connection,
            events.len()
        );
        Ok(TelemetryReport::from_events(&events, self.display_limit))
    }
}
