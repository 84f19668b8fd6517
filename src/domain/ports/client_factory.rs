//! Backend Client Ports
//!
//! Capabilities the pipeline needs from the database driver: opening a
//! client, reading server status through it, and closing it.

use crate::domain::entities::RawStatus;
use crate::domain::errors::{ConnectionError, StatusError};
use crate::domain::value_objects::{ConnectionOptions, ConnectionUri};
use async_trait::async_trait;
use std::sync::Arc;

/// Opaque, shareable handle to a live backend client.
pub type ClientHandle = Arc<dyn BackendClient>;

/// Opens clients to backend databases.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Establish a client. Implementations should verify the server is
    /// reachable before returning.
    async fn connect(
        &self,
        uri: &ConnectionUri,
        options: &ConnectionOptions,
    ) -> Result<ClientHandle, ConnectionError>;
}

/// A live client to one backend.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Read the server's health counters.
    async fn server_status(&self) -> Result<RawStatus, StatusError>;

    /// Release the client. Callers treat failures as best effort.
    async fn close(&self) -> Result<(), ConnectionError>;
}
