//! Deployable catalog entries as returned by a registry.

use serde::{Deserialize, Serialize};

use super::id::Fqfn;

/// One deployable application at one version.
///
/// Catalog types use camelCase on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub identifier: String,
    #[serde(rename = "appVersion", alias = "version")]
    pub version: String,
}

impl Application {
    pub fn new(identifier: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            version: version.into(),
        }
    }
}

/// The deployable unit: one function of one application version.
///
/// Immutable per catalog read; the orchestrator never caches it across ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Runnable {
    pub name: String,
    pub namespace: String,
    pub fqfn: Fqfn,
    pub version: String,
    pub app_identifier: String,
}

impl Runnable {
    /// Build a runnable, deriving its FQFN from the owning application.
    pub fn new(app: &Application, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let name = name.into();
        let fqfn = Fqfn::compose(&app.identifier, &namespace, &name, &app.version);
        Self {
            name,
            namespace,
            fqfn,
            version: app.version.clone(),
            app_identifier: app.identifier.clone(),
        }
    }
}
