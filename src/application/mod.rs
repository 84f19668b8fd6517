//! Application Layer
//!
//! Use cases built on the domain ports: managing backend connections and
//! serving telemetry reports.

mod connection_registry;
mod telemetry_service;

pub use connection_registry::ConnectionRegistry;
pub use telemetry_service::{
    TelemetryReport, TelemetrySeries, TelemetryService, DEFAULT_DISPLAY_LIMIT,
};
