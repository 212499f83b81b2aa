//! Constellation - keeps function executor fleets sized to their load.
//!
//! A control loop that, once per second, reads the catalog of deployed
//! functions, keeps a [`Watcher`](application::Watcher) per function, and
//! launches or terminates executor processes based on the load they report.
//!
//! # Architecture
//!
//! - **`domain`** - FQFNs, catalog entries, load samples and reports
//! - **`port`** - Traits at the seams: catalog, control plane, process
//!   launch and termination, telemetry ingress
//! - **`application`** - Watchers, the fleet registry, and the scaling policy
//! - **`adapter`** - Metrics polling and the self-hosted registry (inbound);
//!   manifest and HTTP catalogs, real process management (outbound)
//! - **`infrastructure`** - Config, startup wiring, the reconciliation loop
//! - **`cli`** - `run` and `check` subcommands
//!
//! # Features
//!
//! - `testkit` - Exposes in-memory doubles for integration tests
//!
//! # Example
//!
//! ```no_run
//! use constellation::infrastructure::bootstrap::build_orchestrator;
//! use constellation::infrastructure::config::Config;
//!
//! # async fn demo() -> constellation::error::Result<()> {
//! let orchestrator = build_orchestrator(Config::default()).await?;
//! orchestrator.run_forever().await
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod cli;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
