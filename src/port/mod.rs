//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports define the seams between the reconciliation loop and the outside
//! world: the function catalog, the remote control plane, command
//! construction, process start-up and termination, and the telemetry feed
//! that carries each running executor's load back into its watcher.
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!                    │                         │
//!     ┌──────────────┤  Watcher + Fleet        ├──────────────┐
//!     │              │                         │              │
//!     │              └─────────────────────────┘              │
//!     │                         │                             │
//!     ▼                         ▼                             ▼
//! ┌─────────┐            ┌─────────────┐              ┌───────────┐
//! │ Catalog │            │  Launcher   │              │ Terminator│
//! │ Adapter │            │   Adapter   │              │  Adapter  │
//! └─────────┘            └─────────────┘              └───────────┘
//! ```

pub mod inbound;
pub mod outbound;

pub use inbound::telemetry::TelemetrySink;
pub use outbound::catalog::AppSource;
pub use outbound::command::CommandBuilder;
pub use outbound::control_plane::ControlPlane;
pub use outbound::process::{Launcher, Terminator};
