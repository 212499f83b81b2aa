//! Application configuration loading and validation.
//!
//! Provides the [`Config`] struct read once at startup. Every field has a
//! default, so a missing file yields a working self-hosted orchestrator.
//! The shared environment token is normally supplied through
//! `CONSTELLATION_ENV_TOKEN` rather than the file.
//!
//! # Example
//!
//! ```no_run
//! use constellation::infrastructure::config::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("constellation.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::logging::LoggingConfig;
use crate::error::{ConfigError, Result};

/// Control plane address meaning "act as your own control plane".
pub const SELF_CONTROL_PLANE: &str = "localhost:9090";

/// Environment variable overriding [`Config::control_plane`].
pub const ENV_CONTROL_PLANE: &str = "CONSTELLATION_CONTROL_PLANE";
/// Environment variable overriding [`Config::env_token`].
pub const ENV_TOKEN: &str = "CONSTELLATION_ENV_TOKEN";
/// Environment variable overriding [`Config::bundle_path`].
pub const ENV_BUNDLE_PATH: &str = "CONSTELLATION_BUNDLE_PATH";

/// How executor processes are started.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    /// Executor binary, resolved through `PATH` when not absolute.
    #[serde(default = "default_executor_binary")]
    pub binary: String,
    /// Host executors bind their HTTP port on.
    #[serde(default = "default_executor_host")]
    pub host: String,
    /// Extra arguments appended after the FQFN.
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_executor_binary() -> String {
    "sat".to_string()
}

fn default_executor_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            binary: default_executor_binary(),
            host: default_executor_host(),
            args: Vec::new(),
        }
    }
}

/// Federated bootstrap settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapConfig {
    /// Fixed delay between connectivity probes (milliseconds).
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    /// Give up after this many failed probes. Unset retries forever.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Address announced to the remote control plane at registration.
    #[serde(default)]
    pub advertise_address: Option<String>,
}

const fn default_retry_interval_ms() -> u64 {
    1000
}

impl BootstrapConfig {
    #[must_use]
    pub const fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: default_retry_interval_ms(),
            max_attempts: None,
            advertise_address: None,
        }
    }
}

/// Telemetry ingestion settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Samples older than this count as zero load.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
    /// Delay between metrics polls of every tracked instance (milliseconds).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Consecutive failed polls before an instance is marked unhealthy.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
}

const fn default_stale_after_secs() -> u64 {
    10
}

const fn default_poll_interval_ms() -> u64 {
    1000
}

const fn default_failure_threshold() -> u32 {
    3
}

impl TelemetryConfig {
    #[must_use]
    pub const fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: default_stale_after_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            failure_threshold: default_failure_threshold(),
        }
    }
}

/// Orchestrator configuration.
///
/// Read once at startup and immutable afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Catalog manifest read by the local registry in self mode.
    #[serde(default = "default_bundle_path")]
    pub bundle_path: PathBuf,

    /// Remote control plane address, or [`SELF_CONTROL_PLANE`].
    #[serde(default = "default_control_plane")]
    pub control_plane: String,

    /// Shared secret handed to every executor.
    #[serde(default)]
    pub env_token: String,

    /// Lowers the per-instance load threshold below the core-derived value.
    #[serde(default)]
    pub concurrency_ceiling: Option<usize>,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_bundle_path() -> PathBuf {
    PathBuf::from("./catalog.toml")
}

fn default_control_plane() -> String {
    SELF_CONTROL_PLANE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bundle_path: default_bundle_path(),
            control_plane: default_control_plane(),
            env_token: String::new(),
            concurrency_ceiling: None,
            executor: ExecutorConfig::default(),
            bootstrap: BootstrapConfig::default(),
            telemetry: TelemetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML content, then apply environment
    /// overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.apply_overrides_from(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is malformed, or fails
    /// validation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Load configuration, falling back to defaults when `path` does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file is malformed or validation fails.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            return Self::load(path);
        }
        let mut config = Self::default();
        config.apply_overrides_from(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(control_plane) = lookup(ENV_CONTROL_PLANE) {
            self.control_plane = control_plane;
        }
        if let Some(token) = lookup(ENV_TOKEN) {
            self.env_token = token;
        }
        if let Some(path) = lookup(ENV_BUNDLE_PATH) {
            self.bundle_path = PathBuf::from(path);
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<()> {
        if self.bundle_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField {
                field: "bundle_path",
            }
            .into());
        }
        if self.control_plane.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "control_plane",
            }
            .into());
        }
        if self.concurrency_ceiling == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "concurrency_ceiling",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.executor.binary.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "executor.binary",
            }
            .into());
        }
        if self.bootstrap.retry_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "bootstrap.retry_interval_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.bootstrap.max_attempts == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "bootstrap.max_attempts",
                reason: "must be greater than 0 when set".to_string(),
            }
            .into());
        }
        if self.telemetry.stale_after_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "telemetry.stale_after_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.telemetry.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "telemetry.poll_interval_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.telemetry.failure_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "telemetry.failure_threshold",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// True when this process is the registry of record.
    #[must_use]
    pub fn is_self_hosted(&self) -> bool {
        self.control_plane == SELF_CONTROL_PLANE
    }

    /// Environment handed to every executor launched on `port`.
    #[must_use]
    pub fn executor_env(&self, port: u16, fqfn: &str) -> Vec<(String, String)> {
        vec![
            ("SAT_HTTP_PORT".to_string(), port.to_string()),
            ("SAT_ENV_TOKEN".to_string(), self.env_token.clone()),
            ("SAT_CONTROL_PLANE".to_string(), self.control_plane.clone()),
            ("SAT_INSTANCE_FQFN".to_string(), fqfn.to_string()),
        ]
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn parse(content: &str) -> Config {
        let mut config: Config = toml::from_str(content).unwrap();
        config.apply_overrides_from(|_| None);
        config
    }

    #[test]
    fn empty_file_uses_self_hosted_defaults() {
        let config = parse("");
        assert!(config.is_self_hosted());
        assert_eq!(config.bundle_path, PathBuf::from("./catalog.toml"));
        assert_eq!(config.executor.binary, "sat");
        assert_eq!(config.bootstrap.retry_interval(), Duration::from_secs(1));
        assert_eq!(config.bootstrap.max_attempts, None);
        assert_eq!(config.telemetry.stale_after(), Duration::from_secs(10));
        assert_eq!(config.telemetry.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.telemetry.failure_threshold, 3);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_full_file() {
        let config = parse(
            r#"
bundle_path = "/srv/catalog.toml"
control_plane = "cp.internal:9090"
concurrency_ceiling = 2

[executor]
binary = "/usr/local/bin/sat"
host = "0.0.0.0"
args = ["--quiet"]

[bootstrap]
retry_interval_ms = 250
max_attempts = 40
advertise_address = "10.0.0.7"

[telemetry]
stale_after_secs = 3
poll_interval_ms = 500
failure_threshold = 5

[logging]
level = "debug"
format = "json"
"#,
        );
        assert!(!config.is_self_hosted());
        assert_eq!(config.concurrency_ceiling, Some(2));
        assert_eq!(config.executor.args, vec!["--quiet".to_string()]);
        assert_eq!(config.bootstrap.max_attempts, Some(40));
        assert_eq!(config.bootstrap.advertise_address.as_deref(), Some("10.0.0.7"));
        assert_eq!(config.telemetry.stale_after_secs, 3);
        assert_eq!(config.telemetry.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.telemetry.failure_threshold, 5);
        assert_eq!(config.logging.format, "json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = parse("control_plane = \"file:9090\"\nenv_token = \"from-file\"");
        config.apply_overrides_from(|key| match key {
            ENV_CONTROL_PLANE => Some("env:9090".to_string()),
            ENV_TOKEN => Some("secret".to_string()),
            _ => None,
        });
        assert_eq!(config.control_plane, "env:9090");
        assert_eq!(config.env_token, "secret");
        assert_eq!(config.bundle_path, PathBuf::from("./catalog.toml"));
    }

    #[test]
    fn rejects_zero_ceiling() {
        let config = parse("concurrency_ceiling = 0");
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::InvalidValue {
                field: "concurrency_ceiling",
                ..
            }))
        ));
    }

    #[test]
    fn rejects_zero_retry_interval() {
        let config = parse("[bootstrap]\nretry_interval_ms = 0");
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_max_attempts() {
        let config = parse("[bootstrap]\nmax_attempts = 0");
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_control_plane() {
        let config = parse("control_plane = \"  \"");
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::MissingField {
                field: "control_plane"
            }))
        ));
    }

    #[test]
    fn rejects_zero_staleness_window() {
        let config = parse("[telemetry]\nstale_after_secs = 0");
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_failure_threshold() {
        let config = parse("[telemetry]\nfailure_threshold = 0");
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::InvalidValue {
                field: "telemetry.failure_threshold",
                ..
            }))
        ));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(
            Config::parse_toml("control_plane = "),
            Err(Error::Config(ConfigError::Parse(_)))
        ));
    }

    #[test]
    fn executor_env_carries_port_token_and_control_plane() {
        let mut config = Config::default();
        config.env_token = "tok".to_string();
        let env = config.executor_env(8123, "a#default::f@v1");
        assert!(env.contains(&("SAT_HTTP_PORT".to_string(), "8123".to_string())));
        assert!(env.contains(&("SAT_ENV_TOKEN".to_string(), "tok".to_string())));
        assert!(env.contains(&("SAT_CONTROL_PLANE".to_string(), SELF_CONTROL_PLANE.to_string())));
    }
}
