//! Launch command construction port.

use crate::domain::{LaunchCommand, Runnable};
use crate::error::Result;

/// Builds the command that starts one executor for a runnable.
///
/// Port allocation belongs to the builder; the orchestrator only learns the
/// chosen port from the return value.
pub trait CommandBuilder: Send + Sync {
    fn build(&self, runnable: &Runnable) -> Result<(LaunchCommand, u16)>;
}
