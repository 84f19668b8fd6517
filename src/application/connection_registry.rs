//! Connection Registry - named live backend connections
//!
//! Owns every client handle in the process. The HTTP surface mutates it,
//! the collector snapshots it on every tick.

use crate::domain::entities::ConnectionSummary;
use crate::domain::errors::RegistryError;
use crate::domain::ports::{ClientFactory, ClientHandle};
use crate::domain::value_objects::{ConnectionOptions, ConnectionUri};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// A registered connection with its live client.
#[derive(Clone)]
struct RegisteredConnection {
    uri: ConnectionUri,
    options: ConnectionOptions,
    handle: ClientHandle,
}

/// Registry of named backend connections.
///
/// Names are case-sensitive keys. Mutations are expected to come from a
/// single administrator; the map itself is safe to share across tasks.
pub struct ConnectionRegistry {
    factory: Arc<dyn ClientFactory>,
    connections: DashMap<String, RegisteredConnection>,
}

impl ConnectionRegistry {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            factory,
            connections: DashMap::new(),
        }
    }

    /// Connect to a backend and register it under `name`.
    ///
    /// Fails without touching the registry when the name is taken, the URI
    /// does not parse, or the client cannot be established.
    pub async fn add(
        &self,
        name: &str,
        uri: &str,
        options: ConnectionOptions,
    ) -> Result<(), RegistryError> {
        if self.connections.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        let uri = ConnectionUri::parse(uri)?;

        let handle = self.factory.connect(&uri, &options).await.map_err(|e| {
            tracing::warn!("connection '{}' failed: {}", name, e);
            e
        })?;

        // the name may have been taken while connecting
        let inserted = match self.connections.entry(name.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(RegisteredConnection {
                    uri,
                    options,
                    handle: handle.clone(),
                });
                true
            }
        };

        if !inserted {
            let _ = handle.close().await;
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        tracing::info!("connection '{}' added", name);
        Ok(())
    }

    /// Close and forget a connection. Unknown names are a no-op.
    pub async fn remove(&self, name: &str) -> Result<(), RegistryError> {
        if let Some((_, conn)) = self.connections.remove(name) {
            if let Err(e) = conn.handle.close().await {
                tracing::debug!("closing connection '{}' failed: {}", name, e);
            }
            tracing::info!("connection '{}' removed", name);
        }
        Ok(())
    }

    /// Point an existing connection at a new URI and optionally rename it.
    ///
    /// The new client is established first; the registry only changes when
    /// that succeeds. Options carry over from the current entry.
    pub async fn update(
        &self,
        current_name: &str,
        new_name: &str,
        new_uri: &str,
    ) -> Result<(), RegistryError> {
        let options = self
            .connections
            .get(current_name)
            .map(|c| c.options.clone())
            .ok_or_else(|| RegistryError::NotFound(current_name.to_string()))?;

        if new_name != current_name && self.connections.contains_key(new_name) {
            return Err(RegistryError::DuplicateName(new_name.to_string()));
        }
        let uri = ConnectionUri::parse(new_uri)?;
        let handle = self.factory.connect(&uri, &options).await?;

        if new_name != current_name && self.connections.contains_key(new_name) {
            let _ = handle.close().await;
            return Err(RegistryError::DuplicateName(new_name.to_string()));
        }

        // removed while the new handle was connecting
        let Some((_, old)) = self.connections.remove(current_name) else {
            let _ = handle.close().await;
            return Err(RegistryError::NotFound(current_name.to_string()));
        };
        self.connections.insert(
            new_name.to_string(),
            RegisteredConnection {
                uri,
                options,
                handle,
            },
        );
        if let Err(e) = old.handle.close().await {
            tracing::debug!("closing connection '{}' failed: {}", current_name, e);
        }

        tracing::info!("connection '{}' updated as '{}'", current_name, new_name);
        Ok(())
    }

    /// Client handle for a connection.
    pub fn get(&self, name: &str) -> Option<ClientHandle> {
        self.connections.get(name).map(|c| c.handle.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.connections.contains_key(name)
    }

    /// All connections ordered by name, ignoring case.
    ///
    /// Names equal under case folding compare equal; their relative order
    /// is unspecified.
    pub fn list(&self) -> Vec<ConnectionSummary> {
        let mut summaries: Vec<ConnectionSummary> = self
            .connections
            .iter()
            .map(|entry| ConnectionSummary {
                name: entry.key().clone(),
                uri: entry.uri.clone(),
                options: entry.options.clone(),
            })
            .collect();
        summaries.sort_by_cached_key(|s| s.name.to_lowercase());
        summaries
    }

    /// Snapshot of every (name, handle) pair for sampling.
    pub fn handles(&self) -> Vec<(String, ClientHandle)> {
        self.connections
            .iter()
            .map(|entry| (entry.key().clone(), entry.handle.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Close every connection. Used at shutdown.
    pub async fn close_all(&self) {
        let names: Vec<String> = self.connections.iter().map(|e| e.key().clone()).collect();
        for name in names {
            let _ = self.remove(&name).await;
        }
    }
}
