//! MongoDB Client Factory
//!
//! Implements ClientFactory and BackendClient with the official driver.
//! Server status is read with the `serverStatus` admin command.

use crate::domain::entities::{
    ActiveClients, ConnectionStats, DocumentCounters, MemoryStats, RawStatus,
};
use crate::domain::errors::{ConnectionError, StatusError};
use crate::domain::ports::{BackendClient, ClientFactory, ClientHandle};
use crate::domain::value_objects::{ConnectionOptions, ConnectionUri};
use async_trait::async_trait;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::ClientOptions;
use mongodb::Client;
use std::sync::Arc;
use std::time::Duration;

/// Server error code for "Unauthorized".
const UNAUTHORIZED_CODE: i32 = 13;

/// Opens driver clients and verifies them with a ping.
#[derive(Debug, Clone, Default)]
pub struct MongoClientFactory;

impl MongoClientFactory {
    pub fn new() -> Self {
        Self
    }

    /// Copy the options the driver understands onto `client_options`.
    fn apply_options(client_options: &mut ClientOptions, options: &ConnectionOptions) {
        for (key, _) in options.iter() {
            match key.as_str() {
                "appName" => {
                    client_options.app_name = options.get_str(key).map(str::to_string);
                }
                "maxPoolSize" => {
                    client_options.max_pool_size = pool_size(options, key);
                }
                "minPoolSize" => {
                    client_options.min_pool_size = pool_size(options, key);
                }
                "connectTimeoutMS" => {
                    client_options.connect_timeout =
                        options.get_u64(key).map(Duration::from_millis);
                }
                "serverSelectionTimeoutMS" => {
                    client_options.server_selection_timeout =
                        options.get_u64(key).map(Duration::from_millis);
                }
                other => tracing::debug!("ignoring unsupported connection option '{}'", other),
            }
        }
    }
}

/// Pool size option as `u32`; values out of range are dropped.
fn pool_size(options: &ConnectionOptions, key: &str) -> Option<u32> {
    let value = options.get_u64(key)?;
    match u32::try_from(value) {
        Ok(size) => Some(size),
        Err(_) => {
            tracing::debug!("ignoring out of range {} = {}", key, value);
            None
        }
    }
}

#[async_trait]
impl ClientFactory for MongoClientFactory {
    async fn connect(
        &self,
        uri: &ConnectionUri,
        options: &ConnectionOptions,
    ) -> Result<ClientHandle, ConnectionError> {
        // SRV URIs resolve their seed list through DNS during parsing
        tracing::debug!("resolving client options (srv={})", uri.is_srv());
        let mut client_options = ClientOptions::parse(uri.as_str())
            .await
            .map_err(connection_error)?;
        Self::apply_options(&mut client_options, options);

        let client = Client::with_options(client_options).map_err(connection_error)?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(connection_error)?;

        Ok(Arc::new(MongoBackendClient { client }))
    }
}

/// A live driver client.
pub struct MongoBackendClient {
    client: Client,
}

#[async_trait]
impl BackendClient for MongoBackendClient {
    async fn server_status(&self) -> Result<RawStatus, StatusError> {
        let status = self
            .client
            .database("admin")
            .run_command(doc! { "serverStatus": 1 })
            .await
            .map_err(status_error)?;

        Ok(parse_server_status(&status))
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        self.client.clone().shutdown().await;
        Ok(())
    }
}

fn connection_error(err: MongoError) -> ConnectionError {
    match *err.kind {
        ErrorKind::Authentication { ref message, .. } => ConnectionError::Auth(message.clone()),
        _ => ConnectionError::Transport(err.to_string()),
    }
}

fn status_error(err: MongoError) -> StatusError {
    match *err.kind {
        ErrorKind::Command(ref cmd) if cmd.code == UNAUTHORIZED_CODE => {
            StatusError::Unauthorized(cmd.message.clone())
        }
        ErrorKind::Authentication { ref message, .. } => StatusError::Unauthorized(message.clone()),
        _ => StatusError::Query(err.to_string()),
    }
}

/// Extract the monitored fields from a `serverStatus` reply.
///
/// Numeric fields arrive as int32, int64 or double depending on the server
/// version. A missing group stays `None`; missing fields inside a present
/// group read as zero.
pub fn parse_server_status(status: &Document) -> RawStatus {
    let connections = status.get_document("connections").ok().map(|c| ConnectionStats {
        current: integer(c, "current"),
        available: integer(c, "available"),
        total_created: integer(c, "totalCreated"),
    });

    let active_clients = status
        .get_document("globalLock")
        .ok()
        .and_then(|g| g.get_document("activeClients").ok())
        .map(|a| ActiveClients {
            total: integer(a, "total"),
            readers: integer(a, "readers"),
            writers: integer(a, "writers"),
        });

    let memory = status.get_document("mem").ok().map(|m| MemoryStats {
        r#virtual: integer(m, "virtual"),
        mapped: integer(m, "mapped"),
        resident: integer(m, "resident"),
    });

    let counters = status
        .get_document("metrics")
        .ok()
        .and_then(|m| m.get_document("document").ok())
        .map(|d| DocumentCounters {
            returned: integer(d, "returned"),
            inserted: integer(d, "inserted"),
            deleted: integer(d, "deleted"),
            updated: integer(d, "updated"),
        });

    RawStatus {
        pid: number(status.get("pid")).map(|v| v as i64),
        version: status.get_str("version").ok().map(str::to_string),
        uptime_seconds: number(status.get("uptime")),
        connections,
        active_clients,
        memory,
        counters,
    }
}

fn number(value: Option<&Bson>) -> Option<f64> {
    match value? {
        Bson::Int32(v) => Some(*v as f64),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

fn integer(doc: &Document, key: &str) -> i64 {
    number(doc.get(key)).map(|v| v as i64).unwrap_or(0)
}
