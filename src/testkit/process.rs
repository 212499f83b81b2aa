//! Process doubles.
//!
//! Nothing here starts or signals a real process.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{InstanceId, LaunchCommand, Launched, Runnable};
use crate::error::{Error, Result};
use crate::port::{CommandBuilder, Launcher, Terminator};

type Call = (LaunchCommand, Vec<(String, String)>);

/// Launcher that records each call and hands back fake pids.
#[derive(Debug)]
pub struct RecordingLauncher {
    calls: Mutex<Vec<Call>>,
    next_pid: AtomicU32,
    fail: bool,
    delay: Option<Duration>,
}

impl Default for RecordingLauncher {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_pid: AtomicU32::new(1000),
            fail: false,
            delay: None,
        }
    }
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Launcher whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Sleep for `delay` before each launch completes.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn last_call(&self) -> Option<Call> {
        self.calls.lock().last().cloned()
    }
}

#[async_trait]
impl Launcher for RecordingLauncher {
    async fn run(&self, command: &LaunchCommand, env: &[(String, String)]) -> Result<Launched> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().push((command.clone(), env.to_vec()));
        if self.fail {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{}: not found", command.program),
            )));
        }
        Ok(Launched {
            instance_id: InstanceId::generate(),
            pid: self.next_pid.fetch_add(1, Ordering::SeqCst),
        })
    }
}

/// Terminator that records the pids it was asked to stop.
#[derive(Debug, Default)]
pub struct RecordingTerminator {
    terminated: Mutex<Vec<u32>>,
    fail: bool,
}

impl RecordingTerminator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the pid, then reports a signal failure.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn terminated(&self) -> Vec<u32> {
        self.terminated.lock().clone()
    }
}

impl Terminator for RecordingTerminator {
    fn terminate(&self, pid: u32) -> Result<()> {
        self.terminated.lock().push(pid);
        if self.fail {
            return Err(Error::Signal {
                pid,
                reason: "no such process".into(),
            });
        }
        Ok(())
    }
}

/// Command builder handing out increasing ports without touching the network.
#[derive(Debug)]
pub struct SequentialPorts {
    next: AtomicU16,
}

impl SequentialPorts {
    pub fn new(first: u16) -> Self {
        Self {
            next: AtomicU16::new(first),
        }
    }

    /// Builder that returns the same port forever.
    pub fn fixed(port: u16) -> FixedPort {
        FixedPort(port)
    }
}

impl CommandBuilder for SequentialPorts {
    fn build(&self, runnable: &Runnable) -> Result<(LaunchCommand, u16)> {
        let port = self.next.fetch_add(1, Ordering::SeqCst);
        Ok((executor_command(runnable), port))
    }
}

/// See [`SequentialPorts::fixed`].
#[derive(Debug, Clone, Copy)]
pub struct FixedPort(u16);

impl CommandBuilder for FixedPort {
    fn build(&self, runnable: &Runnable) -> Result<(LaunchCommand, u16)> {
        Ok((executor_command(runnable), self.0))
    }
}

/// Command builder handing out a fixed list of ports in order, for tests
/// where something real listens on each one.
#[derive(Debug)]
pub struct ListedPorts {
    ports: Mutex<VecDeque<u16>>,
}

impl ListedPorts {
    pub fn new(ports: impl IntoIterator<Item = u16>) -> Self {
        Self {
            ports: Mutex::new(ports.into_iter().collect()),
        }
    }
}

impl CommandBuilder for ListedPorts {
    fn build(&self, runnable: &Runnable) -> Result<(LaunchCommand, u16)> {
        let port = self.ports.lock().pop_front().ok_or_else(|| Error::Launch {
            fqfn: runnable.fqfn.clone(),
            reason: "no listed ports left".into(),
        })?;
        Ok((executor_command(runnable), port))
    }
}

fn executor_command(runnable: &Runnable) -> LaunchCommand {
    LaunchCommand {
        program: "sat".to_string(),
        args: vec![runnable.fqfn.to_string()],
    }
}
