//! JSON Connection File
//!
//! Implements ConnectionConfigRepository on a JSON file of the form
//! `{"connections": {"<name>": {"connection_string": .., "connection_options": ..}}}`.

use crate::domain::entities::ConnectionConfig;
use crate::domain::errors::ConfigFileError;
use crate::domain::ports::ConnectionConfigRepository;
use crate::domain::value_objects::ConnectionOptions;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConnectionsDocument {
    #[serde(default)]
    connections: BTreeMap<String, StoredConnection>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredConnection {
    connection_string: String,
    #[serde(default)]
    connection_options: ConnectionOptions,
}

/// File-backed connection list.
pub struct JsonConnectionFile {
    path: PathBuf,
}

impl JsonConnectionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ConnectionConfigRepository for JsonConnectionFile {
    async fn load(&self) -> Result<Vec<ConnectionConfig>, ConfigFileError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let document: ConnectionsDocument = serde_json::from_str(&raw)?;
        Ok(document
            .connections
            .into_iter()
            .map(|(name, stored)| ConnectionConfig {
                name,
                connection_string: stored.connection_string,
                connection_options: stored.connection_options,
            })
            .collect())
    }

    async fn save(&self, connections: &[ConnectionConfig]) -> Result<(), ConfigFileError> {
        let document = ConnectionsDocument {
            connections: connections
                .iter()
                .map(|c| {
                    (
                        c.name.clone(),
                        StoredConnection {
                            connection_string: c.connection_string.clone(),
                            connection_options: c.connection_options.clone(),
                        },
                    )
                })
                .collect(),
        };
        let json = serde_json::to_string_pretty(&document)?;

        // write to a sibling file, then rename over the target
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::debug!("saved {} connections to {}", connections.len(), self.path.display());
        Ok(())
    }
}
