//! Inbound (driving) ports consumed by inbound adapters.
//!
//! - [`telemetry`]: load and health updates for running executors

pub mod telemetry;
