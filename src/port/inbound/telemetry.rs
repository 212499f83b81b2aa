//! Telemetry ingress from running executors.

use crate::domain::{Fqfn, LoadSample};

/// Receives self-reported load and health from executor instances.
///
/// The transport is up to the adapter; the fleet only needs to know which
/// instance a sample belongs to.
pub trait TelemetrySink: Send + Sync {
    /// Record a sample for the instance bound to `port` under `fqfn`.
    ///
    /// Returns false when the function or port is not tracked, in which
    /// case the sample is dropped.
    fn record(&self, fqfn: &Fqfn, port: u16, sample: LoadSample) -> bool;

    /// Every tracked instance, as the function it serves and its port.
    fn targets(&self) -> Vec<(Fqfn, u16)>;
}
