//! Infrastructure layer.
//!
//! Technical concerns that support the application without containing
//! scaling logic: configuration, startup wiring, and the runtime loop.
//!
//! # Submodules
//!
//! - [`bootstrap`] - Composition root and control plane handshake
//! - [`config`] - Configuration loading and validation
//! - [`orchestration`] - Reconciliation tick and runtime loop

pub mod bootstrap;
pub mod config;
pub mod orchestration;
