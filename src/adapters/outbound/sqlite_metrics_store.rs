//! SQLite Metrics Store
//!
//! Implements MetricsStore on a local SQLite file. Events are stored as
//! JSON payloads next to an indexed event date used for ordering, window
//! queries and retention.

use crate::domain::entities::MetricEvent;
use crate::domain::errors::StoreError;
use crate::domain::ports::MetricsStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, ToSql};
use std::path::Path;
use std::sync::Arc;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS metric_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        connection TEXT NOT NULL,
        event_date INTEGER NOT NULL,
        payload TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_metric_events_date ON metric_events (event_date);
    CREATE INDEX IF NOT EXISTS idx_metric_events_conn_date ON metric_events (connection, event_date);
";

/// SQLite-backed metrics store.
///
/// A single connection is shared behind a mutex; every call runs on the
/// blocking pool so the runtime never waits on disk I/O.
pub struct SqliteMetricsStore {
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteMetricsStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch(SCHEMA)?;
        tracing::info!("metrics store opened at {}", path.as_ref().display());
        Ok(Self::from_connection(conn))
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        }
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            match guard.as_ref() {
                Some(c) => f(c),
                None => Err(StoreError::Closed),
            }
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    fn read_events(
        conn: &Connection,
        sql: &str,
        params: &[&dyn ToSql],
    ) -> Result<Vec<MetricEvent>, StoreError> {
        let mut stmt = conn.prepare(sql)?;
        let payloads = stmt
            .query_map(params, |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        payloads
            .iter()
            .map(|p| serde_json::from_str(p).map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl MetricsStore for SqliteMetricsStore {
    async fn append(&self, event: &MetricEvent) -> Result<(), StoreError> {
        let payload = serde_json::to_string(event)?;
        let connection = event.connection.clone();
        let event_date = event.event_date.timestamp_millis();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO metric_events (connection, event_date, payload) VALUES (?1, ?2, ?3)",
                params![connection, event_date, payload],
            )?;
            Ok(())
        })
        .await
    }

    async fn evict(&self, retain: usize) -> Result<usize, StoreError> {
        let retain = i64::try_from(retain).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM metric_events WHERE id NOT IN (
                     SELECT id FROM metric_events
                     ORDER BY event_date DESC, id DESC
                     LIMIT ?1
                 )",
                params![retain],
            )?;
            Ok(deleted)
        })
        .await
    }

    async fn query(&self, since: DateTime<Utc>) -> Result<Vec<MetricEvent>, StoreError> {
        let since = since.timestamp_millis();
        self.with_conn(move |conn| {
            Self::read_events(
                conn,
                "SELECT payload FROM metric_events
                 WHERE event_date >= ?1
                 ORDER BY event_date ASC, id ASC",
                params![since],
            )
        })
        .await
    }

    async fn query_connection(
        &self,
        connection: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MetricEvent>, StoreError> {
        let since = since.timestamp_millis();
        let connection = connection.to_string();
        self.with_conn(move |conn| {
            Self::read_events(
                conn,
                "SELECT payload FROM metric_events
                 WHERE connection = ?1 AND event_date >= ?2
                 ORDER BY event_date ASC, id ASC",
                params![connection, since],
            )
        })
        .await
    }

    async fn count(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM metric_events", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    async fn close(&self) -> Result<(), StoreError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || match conn.lock().take() {
            Some(c) => c.close().map_err(|(_, e)| StoreError::from(e)),
            None => Ok(()),
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}
