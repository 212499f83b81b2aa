//! Stops executors with `SIGTERM`.

use crate::error::{Error, Result};
use crate::port::Terminator;

/// Asks executor processes to exit by sending `SIGTERM`.
#[derive(Debug, Clone, Default)]
pub struct SignalTerminator;

impl SignalTerminator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Terminator for SignalTerminator {
    #[cfg(unix)]
    fn terminate(&self, pid: u32) -> Result<()> {
        let raw = libc::pid_t::try_from(pid).map_err(|_| Error::Signal {
            pid,
            reason: "pid out of range".to_string(),
        })?;
        // SAFETY: kill(2) has no memory-safety preconditions.
        let rc = unsafe { libc::kill(raw, libc::SIGTERM) };
        if rc == 0 {
            Ok(())
        } else {
            Err(Error::Signal {
                pid,
                reason: std::io::Error::last_os_error().to_string(),
            })
        }
    }

    #[cfg(not(unix))]
    fn terminate(&self, pid: u32) -> Result<()> {
        Err(Error::Signal {
            pid,
            reason: "signals are only supported on unix".to_string(),
        })
    }
}
