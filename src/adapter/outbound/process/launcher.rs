//! Spawns executor processes without supervising them.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::{InstanceId, LaunchCommand, Launched};
use crate::error::{Error, Result};
use crate::port::Launcher;

/// Launches executors as child processes of the orchestrator.
///
/// The child handle is dropped right after spawn; the tokio runtime reaps
/// it when it exits. Liveness is learned through telemetry only.
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn run(&self, command: &LaunchCommand, env: &[(String, String)]) -> Result<Launched> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(false);

        let child = cmd.spawn()?;
        let pid = child
            .id()
            .ok_or_else(|| Error::Io(std::io::Error::other("child exited before reporting a pid")))?;
        let instance_id = InstanceId::generate();

        debug!(
            program = %command.program,
            pid,
            instance_id = %instance_id,
            "Process spawned"
        );

        Ok(Launched { instance_id, pid })
    }
}
