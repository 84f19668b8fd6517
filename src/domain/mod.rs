//! Domain Layer
//!
//! Telemetry value types, validated primitives, capability ports and the
//! pure algorithms that run over them.

pub mod entities;
pub mod errors;
pub mod ports;
pub mod services;
pub mod value_objects;
