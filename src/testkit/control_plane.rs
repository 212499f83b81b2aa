//! Scripted control plane for bootstrap tests.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::NodeRegistration;
use crate::error::{Error, Result};
use crate::port::ControlPlane;

/// One call made against [`ScriptedControlPlane`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Probe,
    Register,
}

/// Fails the first N probes, then answers.
#[derive(Debug, Default)]
pub struct ScriptedControlPlane {
    failures_left: AtomicU32,
    reject_registration: bool,
    calls: Mutex<Vec<Call>>,
    registrations: Mutex<Vec<NodeRegistration>>,
}

impl ScriptedControlPlane {
    pub fn reachable() -> Self {
        Self::default()
    }

    pub fn unreachable_for(failures: u32) -> Self {
        Self {
            failures_left: AtomicU32::new(failures),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn rejecting_registration(mut self) -> Self {
        self.reject_registration = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn probes(&self) -> usize {
        self.calls.lock().iter().filter(|c| **c == Call::Probe).count()
    }

    pub fn registrations(&self) -> Vec<NodeRegistration> {
        self.registrations.lock().clone()
    }
}

#[async_trait]
impl ControlPlane for ScriptedControlPlane {
    async fn probe(&self) -> Result<()> {
        self.calls.lock().push(Call::Probe);
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        Ok(())
    }

    async fn register(&self, node: &NodeRegistration) -> Result<()> {
        self.calls.lock().push(Call::Register);
        if self.reject_registration {
            return Err(Error::Registration("403 Forbidden".into()));
        }
        self.registrations.lock().push(node.clone());
        Ok(())
    }
}
