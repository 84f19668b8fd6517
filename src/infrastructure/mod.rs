//! Infrastructure Layer
//!
//! Background tasks and process lifecycle.

pub mod metrics_collector;
pub mod shutdown;

pub use metrics_collector::{MetricsCollector, MonitoringConfig};
pub use shutdown::{shutdown_signal, ShutdownController};
