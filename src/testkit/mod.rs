//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`catalog`] - In-memory [`AppSource`](crate::port::AppSource) that tests
//!   can edit between ticks.
//! - [`process`] - Recording launcher, terminator, and a deterministic
//!   command builder. No real processes are started.
//! - [`control_plane`] - Scripted [`ControlPlane`](crate::port::ControlPlane)
//!   for bootstrap tests.
//! - [`config`] - Canonical test configurations.
//! - [`domain`] - Builders for domain primitives.

use std::time::Duration;

pub mod catalog;
pub mod config;
pub mod control_plane;
pub mod domain;
pub mod process;

/// Poll `condition` until it holds.
///
/// # Panics
///
/// Panics if the condition is still false after five seconds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 5s"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}
