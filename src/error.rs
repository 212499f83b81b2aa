use thiserror::Error;

use crate::domain::id::Fqfn;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("catalog unavailable: {0}")]
    Catalog(String),

    #[error("failed to launch instance of {fqfn}: {reason}")]
    Launch { fqfn: Fqfn, reason: String },

    #[error("port {port} is already tracked for {fqfn}")]
    DuplicatePort { fqfn: Fqfn, port: u16 },

    #[error("control plane rejected registration: {0}")]
    Registration(String),

    #[error("control plane unreachable after {attempts} attempts")]
    Bootstrap { attempts: u32 },

    #[error("reconciliation loop stopped: {0}")]
    Stopped(String),

    #[error("failed to signal pid {pid}: {reason}")]
    Signal { pid: u32, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
