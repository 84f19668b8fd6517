//! Connection Config Repository Port
//!
//! Persists the list of configured connections so they survive restarts.

use crate::domain::entities::ConnectionConfig;
use crate::domain::errors::ConfigFileError;
use async_trait::async_trait;

#[async_trait]
pub trait ConnectionConfigRepository: Send + Sync {
    /// Load every persisted connection. A missing store yields an empty list.
    async fn load(&self) -> Result<Vec<ConnectionConfig>, ConfigFileError>;

    /// Replace the persisted list.
    async fn save(&self, connections: &[ConnectionConfig]) -> Result<(), ConfigFileError>;
}
