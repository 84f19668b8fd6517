//! Adapters Layer
//!
//! Inbound adapters drive the application (HTTP API). Outbound adapters
//! implement the domain ports (metrics store, backend clients, connection
//! file).

pub mod inbound;
pub mod outbound;
