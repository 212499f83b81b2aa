//! Fire-and-forget executor launches.
//!
//! Each launch runs on its own task so a slow process start never stalls
//! reconciliation of other functions. Failures are pushed onto the shared
//! fatal-error channel; they are never retried here.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::application::Watcher;
use crate::domain::Runnable;
use crate::error::{Error, Result};
use crate::infrastructure::config::Config;
use crate::port::{CommandBuilder, Launcher};

/// Everything a launch task needs, cheap to clone into each task.
#[derive(Clone)]
pub(super) struct LaunchContext {
    pub(super) config: Arc<Config>,
    pub(super) commands: Arc<dyn CommandBuilder>,
    pub(super) launcher: Arc<dyn Launcher>,
    pub(super) errors: mpsc::Sender<Error>,
}

impl LaunchContext {
    /// Start one instance of `runnable` in the background.
    ///
    /// The watcher counts the launch as in flight until the task finishes,
    /// and only learns about the instance once the launcher returns.
    pub(super) fn spawn(&self, runnable: &Runnable, watcher: &Arc<Watcher>) {
        let guard = watcher.begin_launch();
        let ctx = self.clone();
        let runnable = runnable.clone();
        let watcher = Arc::clone(watcher);

        tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = ctx.launch(&runnable, &watcher).await {
                error!(fqfn = %runnable.fqfn, error = %e, "Instance launch failed");
                // The receiver is only gone once the orchestrator has stopped.
                let _ = ctx.errors.send(e).await;
            }
        });
    }

    async fn launch(&self, runnable: &Runnable, watcher: &Watcher) -> Result<()> {
        let launch_error = |reason: String| Error::Launch {
            fqfn: runnable.fqfn.clone(),
            reason,
        };

        let (command, port) = self
            .commands
            .build(runnable)
            .map_err(|e| launch_error(e.to_string()))?;
        let env = self.config.executor_env(port, runnable.fqfn.as_str());

        let launched = self
            .launcher
            .run(&command, &env)
            .await
            .map_err(|e| launch_error(e.to_string()))?;

        info!(
            fqfn = %runnable.fqfn,
            port,
            pid = launched.pid,
            "Instance launched"
        );
        watcher.add(port, launched.instance_id, launched.pid)
    }
}
