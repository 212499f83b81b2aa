//! Builds executor launch commands.

use std::net::TcpListener;

use tracing::debug;

use crate::domain::{LaunchCommand, Runnable};
use crate::error::Result;
use crate::port::CommandBuilder;

/// Launches `<binary> <fqfn> [extra args]` on a free local port.
#[derive(Debug, Clone)]
pub struct ExecutorCommandBuilder {
    binary: String,
    host: String,
    extra_args: Vec<String>,
}

impl ExecutorCommandBuilder {
    pub fn new(binary: impl Into<String>, host: impl Into<String>, extra_args: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            host: host.into(),
            extra_args,
        }
    }

    /// Ask the OS for an unused port on the configured host.
    ///
    /// The listener is dropped before the executor binds, so the port is
    /// only very likely, not guaranteed, to still be free.
    fn free_port(&self) -> Result<u16> {
        let listener = TcpListener::bind((self.host.as_str(), 0))?;
        Ok(listener.local_addr()?.port())
    }
}

impl CommandBuilder for ExecutorCommandBuilder {
    fn build(&self, runnable: &Runnable) -> Result<(LaunchCommand, u16)> {
        let port = self.free_port()?;
        let mut args = Vec::with_capacity(1 + self.extra_args.len());
        args.push(runnable.fqfn.to_string());
        args.extend(self.extra_args.iter().cloned());

        debug!(fqfn = %runnable.fqfn, port, binary = %self.binary, "Built launch command");
        Ok((
            LaunchCommand {
                program: self.binary.clone(),
                args,
            },
            port,
        ))
    }
}
