//! Handler for the `check` command.

use std::path::Path;

use crate::adapter::outbound::catalog::ManifestSource;
use crate::error::Result;
use crate::infrastructure::config::Config;
use crate::port::AppSource;

/// Validate configuration and, when self-hosted, list the catalog.
pub async fn execute<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    println!("Checking configuration: {}", path.display());
    println!();

    let config = Config::load_or_default(path)?;
    println!("✓ Configuration is valid");
    println!();
    println!("Summary:");
    println!("  Control plane: {}", config.control_plane);
    println!("  Bundle: {}", config.bundle_path.display());
    println!("  Executor: {}", config.executor.binary);
    match config.concurrency_ceiling {
        Some(ceiling) => println!("  Concurrency ceiling: {ceiling}"),
        None => println!("  Concurrency ceiling: auto"),
    }
    println!();

    if !config.is_self_hosted() {
        println!("  Catalog is served by the remote control plane");
        return Ok(());
    }

    let source = ManifestSource::new(config.bundle_path.clone());
    println!("Catalog:");
    for app in source.applications().await? {
        println!("  {}@{}", app.identifier, app.version);
        for runnable in source.runnables(&app.identifier, &app.version).await? {
            println!("    {}", runnable.fqfn);
        }
    }

    Ok(())
}
