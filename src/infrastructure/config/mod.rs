//! Infrastructure configuration modules.

pub mod logging;
pub mod settings;

pub use logging::LoggingConfig;
pub use settings::{
    BootstrapConfig, Config, ExecutorConfig, TelemetryConfig, SELF_CONTROL_PLANE,
};
