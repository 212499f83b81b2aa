//! Plain data shared by every layer of the orchestrator.

pub mod catalog;
pub mod id;
pub mod instance;
pub mod node;

pub use catalog::{Application, Runnable};
pub use id::{Fqfn, InstanceId};
pub use instance::{LaunchCommand, Launched, LoadSample, Report};
pub use node::NodeRegistration;
