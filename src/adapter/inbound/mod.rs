//! Inbound adapters (driving side).
//!
//! - [`metrics`]: polls each running executor and feeds the fleet
//! - [`registry`]: serves the local catalog when this node is its own
//!   control plane

pub mod metrics;
pub mod registry;

pub use metrics::MetricsPoller;
pub use registry::RegistryServer;
