mod json_connection_file;
mod mongo_client_factory;
mod sqlite_metrics_store;

pub use json_connection_file::JsonConnectionFile;
pub use mongo_client_factory::{parse_server_status, MongoBackendClient, MongoClientFactory};
pub use sqlite_metrics_store::SqliteMetricsStore;
