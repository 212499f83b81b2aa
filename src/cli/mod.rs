//! Command-line interface definitions.

pub mod check;
pub mod run;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::infrastructure::config::Config;

/// Constellation - keeps function executor fleets sized to their load.
#[derive(Parser, Debug)]
#[command(name = "constellation")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the orchestrator in the foreground
    Run(RunArgs),

    /// Validate configuration and print the catalog
    Check(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "constellation.toml")]
    pub config: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Bundle manifest to serve when acting as the control plane
    pub bundle_path: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, default_value = "constellation.toml")]
    pub config: PathBuf,

    /// Remote control plane address (host:port or URL)
    #[arg(long)]
    pub control_plane: Option<String>,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,

    /// Wait for the bundle file to appear before starting
    #[arg(long)]
    pub wait: bool,
}

impl RunArgs {
    /// Layer command-line overrides on top of a loaded config.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(path) = &self.bundle_path {
            config.bundle_path = path.clone();
        }
        if let Some(control_plane) = &self.control_plane {
            config.control_plane = control_plane.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.json_logs {
            config.logging.format = "json".to_string();
        }
    }
}
