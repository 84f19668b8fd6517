//! docwatch Library
//!
//! This module exposes the docwatch components for use in integration tests
//! and as a library.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use application::{ConnectionRegistry, TelemetryReport, TelemetryService};
pub use config::load_config;
pub use domain::entities::{DataPoint, MetricEvent, RawStatus};
pub use domain::ports::{BackendClient, ClientFactory, ConnectionConfigRepository, MetricsStore};
pub use domain::services::resample;
pub use infrastructure::{MetricsCollector, MonitoringConfig, ShutdownController};
