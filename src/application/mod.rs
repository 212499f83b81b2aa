//! Application services (use cases).
//!
//! Per-function instance tracking, the fleet map that owns it, and the
//! scaling policy the reconciliation loop applies to watcher reports.

pub mod fleet;
pub mod scaling;
pub mod watcher;

pub use fleet::Fleet;
pub use scaling::{ScaleDecision, ScalingPolicy};
pub use watcher::{LaunchGuard, Watcher};
