//! OS process management for executor instances.

mod launcher;
mod signal;

pub use launcher::ProcessLauncher;
pub use signal::SignalTerminator;
