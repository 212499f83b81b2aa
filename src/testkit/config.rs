//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests.

use crate::infrastructure::config::{BootstrapConfig, Config, SELF_CONTROL_PLANE};

/// Self-hosted config with defaults everywhere else.
pub fn self_hosted() -> Config {
    Config {
        control_plane: SELF_CONTROL_PLANE.to_string(),
        env_token: "test-token".to_string(),
        bootstrap: fast_bootstrap(),
        ..Config::default()
    }
}

/// Config pointing at a remote control plane.
pub fn federated(address: &str) -> Config {
    Config {
        control_plane: address.to_string(),
        ..self_hosted()
    }
}

/// Bootstrap settings with a 1ms retry interval and no attempt limit.
pub fn fast_bootstrap() -> BootstrapConfig {
    BootstrapConfig {
        retry_interval_ms: 1,
        max_attempts: None,
        advertise_address: Some("10.0.0.7:8080".to_string()),
    }
}
