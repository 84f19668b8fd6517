//! Metrics Store Port
//!
//! Defines the interface for the durable, bounded log of telemetry samples.

use crate::domain::entities::MetricEvent;
use crate::domain::errors::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Default number of events kept: one day of samples at the default
/// 30 second interval.
pub const DEFAULT_RETAIN: usize = 2880;

/// Append-only store for telemetry samples with count-based retention.
///
/// Operations are independent: there is no transaction spanning an
/// `append` and a later `evict`, so an eviction may or may not count an
/// event appended concurrently.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Persist a sample under a store-assigned identity.
    async fn append(&self, event: &MetricEvent) -> Result<(), StoreError>;

    /// Keep the `retain` most recent events by event date and delete the
    /// rest. Returns the number of deleted events.
    async fn evict(&self, retain: usize) -> Result<usize, StoreError>;

    /// All events at or after `since`, oldest first.
    async fn query(&self, since: DateTime<Utc>) -> Result<Vec<MetricEvent>, StoreError>;

    /// Events of one connection at or after `since`, oldest first.
    async fn query_connection(
        &self,
        connection: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MetricEvent>, StoreError>;

    /// Total number of stored events.
    async fn count(&self) -> Result<usize, StoreError>;

    /// Release underlying resources. Later calls fail with `StoreError::Closed`.
    async fn close(&self) -> Result<(), StoreError>;
}
