//! Domain Entities - Core business objects
//!
//! These entities represent the telemetry samples and the values derived
//! from them. They carry no I/O and are shared by every other layer.

use crate::domain::value_objects::{ConnectionOptions, ConnectionUri};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single point of a chart series.
///
/// `x` is the sample time in epoch milliseconds, `y` the value. Both are
/// floating point so resampled points can land between samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
}

impl DataPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Build a point from an event timestamp.
    pub fn at(date: DateTime<Utc>, y: f64) -> Self {
        Self {
            x: date.timestamp_millis() as f64,
            y,
        }
    }
}

/// Connection counters reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStats {
    pub current: i64,
    pub available: i64,
    pub total_created: i64,
}

/// Clients currently holding or waiting on locks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveClients {
    pub total: i64,
    pub readers: i64,
    pub writers: i64,
}

/// Memory usage in megabytes, as reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub r#virtual: i64,
    pub mapped: i64,
    pub resident: i64,
}

/// Cumulative document operation counters, as read from the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCounters {
    pub returned: i64,
    pub inserted: i64,
    pub deleted: i64,
    pub updated: i64,
}

/// Per-sample document counts. These are deltas since the previous
/// sample of the same connection, not running totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocCounts {
    pub queried: i64,
    pub inserted: i64,
    pub deleted: i64,
    pub updated: i64,
}

/// Parsed server status. Every group is optional because older servers
/// and restricted users omit parts of the payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawStatus {
    pub pid: Option<i64>,
    pub version: Option<String>,
    pub uptime_seconds: Option<f64>,
    pub connections: Option<ConnectionStats>,
    pub active_clients: Option<ActiveClients>,
    pub memory: Option<MemoryStats>,
    pub counters: Option<DocumentCounters>,
}

/// One telemetry sample for one connection. Immutable once built.
///
/// When `data_retrieved` is false every optional field is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricEvent {
    pub connection: String,
    pub event_date: DateTime<Utc>,
    pub pid: Option<i64>,
    pub version: Option<String>,
    pub uptime_seconds: Option<f64>,
    pub connections: Option<ConnectionStats>,
    pub active_clients: Option<ActiveClients>,
    pub memory: Option<MemoryStats>,
    pub doc_counts: Option<DocCounts>,
    pub data_retrieved: bool,
}

impl MetricEvent {
    /// A sample whose status query failed or was refused.
    pub fn unavailable(connection: &str, event_date: DateTime<Utc>) -> Self {
        Self {
            connection: connection.to_string(),
            event_date,
            pid: None,
            version: None,
            uptime_seconds: None,
            connections: None,
            active_clients: None,
            memory: None,
            doc_counts: None,
            data_retrieved: false,
        }
    }

    /// A successful sample. `doc_counts` must already be deltas.
    pub fn from_status(
        connection: &str,
        event_date: DateTime<Utc>,
        status: RawStatus,
        doc_counts: Option<DocCounts>,
    ) -> Self {
        Self {
            connection: connection.to_string(),
            event_date,
            pid: status.pid,
            version: status.version,
            uptime_seconds: status.uptime_seconds,
            connections: status.connections,
            active_clients: status.active_clients,
            memory: status.memory,
            doc_counts,
            data_retrieved: true,
        }
    }
}

/// Public view of a registered connection. Never exposes the client handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSummary {
    pub name: String,
    pub uri: ConnectionUri,
    pub options: ConnectionOptions,
}

/// Persisted definition of a connection, restored at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub name: String,
    pub connection_string: String,
    #[serde(default)]
    pub connection_options: ConnectionOptions,
}

impl From<ConnectionSummary> for ConnectionConfig {
    fn from(summary: ConnectionSummary) -> Self {
        Self {
            name: summary.name,
            connection_string: summary.uri.into(),
            connection_options: summary.options,
        }
    }
}
