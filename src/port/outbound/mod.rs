//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the collaborators the orchestrator drives:
//! the catalog, the remote control plane, command construction, and OS
//! process management.

pub mod catalog;
pub mod command;
pub mod control_plane;
pub mod process;
