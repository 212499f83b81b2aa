//! Application orchestration.
//!
//! The reconciliation tick, the launch tasks it spawns, and the runtime
//! loop that drives ticks and stops on the first fatal error.

mod launch;
pub mod orchestrator;
mod runtime;

pub use orchestrator::{Orchestrator, Reconciler, TickSummary, TICK_INTERVAL};
