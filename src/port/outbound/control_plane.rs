//! Remote control plane port used during federated bootstrap.

use async_trait::async_trait;

use crate::domain::NodeRegistration;
use crate::error::Result;

#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Connectivity probe. Idempotent and safe to call repeatedly.
    async fn probe(&self) -> Result<()>;

    /// One-shot announcement of this node to the control plane.
    async fn register(&self, node: &NodeRegistration) -> Result<()>;
}
