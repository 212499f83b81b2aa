//! Function catalog port.

use async_trait::async_trait;

use crate::domain::{Application, Runnable};
use crate::error::Result;

/// Read access to the deployable function catalog.
///
/// Queried fresh on every reconciliation tick. Implementations may be the
/// local authoritative registry or a client of a remote one.
#[async_trait]
pub trait AppSource: Send + Sync {
    /// List the applications currently deployable.
    async fn applications(&self) -> Result<Vec<Application>>;

    /// List the runnables belonging to one application version.
    async fn runnables(&self, identifier: &str, version: &str) -> Result<Vec<Runnable>>;
}
