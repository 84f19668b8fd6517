//! Shared fakes for integration tests.
//!
//! `FakeFactory` hands out scripted `FakeBackend` clients instead of
//! talking to a real database server.

#![allow(dead_code)]

use async_trait::async_trait;
use docwatch::domain::entities::{ConnectionStats, DocumentCounters, RawStatus};
use docwatch::domain::errors::{ConnectionError, StatusError};
use docwatch::domain::ports::{BackendClient, ClientFactory, ClientHandle};
use docwatch::domain::value_objects::{ConnectionOptions, ConnectionUri};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Scripted backend client.
///
/// Replies are served in order; once the script runs out the fallback
/// reply repeats.
pub struct FakeBackend {
    script: Mutex<VecDeque<Result<RawStatus, StatusError>>>,
    fallback: Mutex<Result<RawStatus, StatusError>>,
    delay: Option<Duration>,
    status_calls: AtomicUsize,
    close_calls: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::replying(status_with_counters(0, 0, 0, 0))
    }

    pub fn replying(status: RawStatus) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Ok(status)),
            delay: None,
            status_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: StatusError) -> Self {
        let backend = Self::new();
        *backend.fallback.lock() = Err(err);
        backend
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, reply: Result<RawStatus, StatusError>) {
        self.script.lock().push_back(reply);
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendClient for FakeBackend {
    async fn server_status(&self) -> Result<RawStatus, StatusError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().pop_front();
        match next {
            Some(reply) => reply,
            None => self.fallback.lock().clone(),
        }
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Factory returning pre-registered backends keyed by URI.
///
/// URIs whose host starts with `unreachable` fail to connect. Unknown URIs
/// get a fresh default backend.
#[derive(Default)]
pub struct FakeFactory {
    backends: Mutex<HashMap<String, Arc<FakeBackend>>>,
    connects: AtomicUsize,
    connect_delay: Option<Duration>,
}

impl FakeFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Factory whose connects take `delay` before completing.
    pub fn with_connect_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            connect_delay: Some(delay),
            ..Self::default()
        })
    }

    /// Serve `backend` for connections to `uri`.
    pub fn serve(&self, uri: &str, backend: FakeBackend) -> Arc<FakeBackend> {
        let backend = Arc::new(backend);
        self.backends.lock().insert(uri.to_string(), backend.clone());
        backend
    }

    /// Backend created for `uri`, if any connection was made.
    pub fn backend(&self, uri: &str) -> Option<Arc<FakeBackend>> {
        self.backends.lock().get(uri).cloned()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientFactory for FakeFactory {
    async fn connect(
        &self,
        uri: &ConnectionUri,
        _options: &ConnectionOptions,
    ) -> Result<ClientHandle, ConnectionError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if uri.as_str().contains("://unreachable") {
            return Err(ConnectionError::Transport(format!(
                "server selection timeout for {}",
                uri
            )));
        }
        let backend = self
            .backends
            .lock()
            .entry(uri.as_str().to_string())
            .or_insert_with(|| Arc::new(FakeBackend::new()))
            .clone();
        Ok(backend as ClientHandle)
    }
}

/// Status carrying every group, with the given raw document totals.
pub fn status_with_counters(returned: i64, inserted: i64, deleted: i64, updated: i64) -> RawStatus {
    RawStatus {
        pid: Some(4242),
        version: Some("7.0.2".to_string()),
        uptime_seconds: Some(3600.0),
        connections: Some(ConnectionStats {
            current: 5,
            available: 995,
            total_created: 20,
        }),
        active_clients: None,
        memory: None,
        counters: Some(DocumentCounters {
            returned,
            inserted,
            deleted,
            updated,
        }),
    }
}
