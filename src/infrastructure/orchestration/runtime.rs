//! Orchestrator runtime lifecycle.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::orchestrator::{Orchestrator, TICK_INTERVAL};
use crate::error::{Error, Result};

impl Orchestrator {
    /// Run the control loop until a fatal error occurs.
    pub async fn run_forever(self) -> Result<()> {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        self.run(shutdown_rx).await
    }

    /// Run with an externally controlled shutdown signal.
    ///
    /// Returns the first error any launch or companion task reports. A
    /// shutdown signal terminates every tracked instance and returns `Ok`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let policy = self.reconciler.policy();
        info!(
            threshold = policy.threshold(),
            max_instances = policy.max_instances(),
            "Starting reconciliation loop"
        );

        let reconciler = Arc::clone(&self.reconciler);
        let mut ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let summary = reconciler.tick().await;
                debug!(?summary, "Tick complete");
            }
        });

        let companions: Vec<_> = std::mem::take(&mut self.companions)
            .into_iter()
            .map(|(name, task)| {
                let errors = self.errors_tx.clone();
                tokio::spawn(async move {
                    let err = match task.await {
                        Ok(()) => Error::Stopped(format!("{name} exited")),
                        Err(e) => e,
                    };
                    error!(task = name, error = %err, "Companion task stopped");
                    let _ = errors.send(err).await;
                })
            })
            .collect();

        let mut shutdown_open = true;
        let outcome = loop {
            tokio::select! {
                err = self.errors.recv() => {
                    match err {
                        Some(e) => {
                            error!(error = %e, "Fatal error, stopping reconciliation");
                            break Err(e);
                        }
                        None => break Err(Error::Stopped("error channel closed".into())),
                    }
                }
                result = shutdown.changed(), if shutdown_open => {
                    match result {
                        Ok(()) => {
                            if *shutdown.borrow() {
                                info!("Shutdown signal received");
                                let stopped = self.reconciler.fleet().terminate_all();
                                info!(instances = stopped, "Terminated all instances");
                                break Ok(());
                            }
                        }
                        Err(_) => {
                            // Sender dropped without signalling; keep running.
                            warn!("Shutdown channel closed");
                            shutdown_open = false;
                        }
                    }
                }
                joined = &mut ticker => {
                    let reason = match joined {
                        Ok(()) => "tick loop exited".to_string(),
                        Err(e) => e.to_string(),
                    };
                    break Err(Error::Stopped(reason));
                }
            }
        };

        ticker.abort();
        for companion in companions {
            companion.abort();
        }
        outcome
    }
}
