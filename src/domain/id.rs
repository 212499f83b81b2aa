//! Domain identifier types with proper encapsulation.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fully-qualified function name - the sole key into the fleet map.
///
/// Composed as `{identifier}#{namespace}::{name}@{version}`. The inner
/// String is private so every FQFN is built through a constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fqfn(String);

impl Fqfn {
    /// Wrap an already-composed FQFN.
    pub fn new(fqfn: impl Into<String>) -> Self {
        Self(fqfn.into())
    }

    /// Compose an FQFN from its parts.
    #[must_use]
    pub fn compose(identifier: &str, namespace: &str, name: &str, version: &str) -> Self {
        Self(format!("{identifier}#{namespace}::{name}@{version}"))
    }

    /// Get the FQFN as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fqfn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Fqfn {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier generated for every launched executor instance.
///
/// Generated as UUID v4 at launch time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    /// Generate a fresh random instance ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing instance ID string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
