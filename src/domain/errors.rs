//! Domain Errors
//!
//! Typed failures for each boundary of the telemetry pipeline. Registry
//! errors are returned to the caller; status and store errors are absorbed
//! by the collector so sampling never stops.

/// Failure establishing (or tearing down) a backend client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConnectionError {
    #[error("connection failed: {0}")]
    Transport(String),
    #[error("authentication failed: {0}")]
    Auth(String),
}

/// Errors surfaced by registry mutations. The registry is left unchanged.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("a connection named '{0}' already exists")]
    DuplicateName(String),
    #[error("no connection named '{0}'")]
    NotFound(String),
    #[error("invalid connection URI: {0}")]
    InvalidUri(String),
    #[error("invalid connection options: {0}")]
    InvalidOptions(String),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Failure reading server status from a backend.
///
/// Always non-fatal: the sample is recorded with `data_retrieved = false`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StatusError {
    #[error("not authorized to read server status: {0}")]
    Unauthorized(String),
    #[error("server status query failed: {0}")]
    Query(String),
}

/// Persistence failure in the metrics store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("metrics store is closed")]
    Closed,
    #[error("store task failed: {0}")]
    Task(String),
}

/// Failure reading or writing the persisted connection list.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("connection file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("connection file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}
