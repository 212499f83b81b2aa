//! OS process ports.

use async_trait::async_trait;

use crate::domain::{LaunchCommand, Launched};
use crate::error::Result;

/// Starts executor processes.
///
/// One-shot: no retries and no monitoring of the child afterwards. A
/// returned error is final for that launch.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn run(&self, command: &LaunchCommand, env: &[(String, String)]) -> Result<Launched>;
}

/// Asks a running executor process to exit.
pub trait Terminator: Send + Sync {
    fn terminate(&self, pid: u32) -> Result<()>;
}
