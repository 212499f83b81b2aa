//! Handler for the `run` command.

use std::time::Duration;

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use crate::cli::RunArgs;
use crate::error::{Error, Result};
use crate::infrastructure::bootstrap::{build_orchestrator, wait_for_bundle};
use crate::infrastructure::config::Config;

/// How often `--wait` checks for the bundle.
const BUNDLE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Execute the run command.
///
/// Returns only on Ctrl-C or a startup error. A fatal error from the
/// running loop exits the process with status 1.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let mut config = Config::load_or_default(&args.config)?;
    args.apply_to(&mut config);
    config.validate()?;

    config.init_logging();
    info!(
        control_plane = %config.control_plane,
        bundle = %config.bundle_path.display(),
        self_hosted = config.is_self_hosted(),
        "constellation starting"
    );

    if args.wait && config.is_self_hosted() {
        wait_for_bundle(&config.bundle_path, BUNDLE_POLL_INTERVAL).await;
    }

    let orchestrator = tokio::select! {
        built = build_orchestrator(config) => built?,
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received during startup");
            return Ok(());
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut running = tokio::spawn(orchestrator.run(shutdown_rx));

    tokio::select! {
        joined = &mut running => {
            let result = joined.unwrap_or_else(|e| Err(Error::Stopped(e.to_string())));
            if let Err(e) = result {
                error!(error = %e, "Fatal error");
                std::process::exit(1);
            }
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
            if let Ok(Err(e)) = running.await {
                error!(error = %e, "Error during shutdown");
            }
        }
    }

    info!("constellation stopped");
    Ok(())
}
