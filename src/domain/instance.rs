//! Executor instances, their telemetry, and watcher snapshots.

use serde::{Deserialize, Serialize};

use super::id::InstanceId;

/// A command ready to be handed to the process launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// Result of a successful launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launched {
    pub instance_id: InstanceId,
    pub pid: u32,
}

/// One telemetry update self-reported by a running executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSample {
    /// Threads currently busy inside the executor.
    pub threads: u32,
    pub healthy: bool,
}

impl LoadSample {
    #[must_use]
    pub const fn healthy(threads: u32) -> Self {
        Self {
            threads,
            healthy: true,
        }
    }

    #[must_use]
    pub const fn unhealthy() -> Self {
        Self {
            threads: 0,
            healthy: false,
        }
    }
}

/// Point-in-time snapshot of one watcher.
///
/// Only produced when at least one instance is tracked, so
/// `instance_count` is always greater than zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub instance_count: usize,
    /// Sum of the most recent, non-stale load figures.
    pub total_load: u64,
    /// Ports whose last telemetry sample flagged them unhealthy.
    pub unhealthy_ports: Vec<u16>,
}

impl Report {
    /// Average load per instance, truncated.
    #[must_use]
    pub fn average_load(&self) -> u64 {
        self.total_load / self.instance_count.max(1) as u64
    }
}
