mod client_factory;
mod connection_config_repository;
mod metrics_store;

pub use client_factory::{BackendClient, ClientFactory, ClientHandle};
pub use connection_config_repository::ConnectionConfigRepository;
pub use metrics_store::{MetricsStore, DEFAULT_RETAIN};
