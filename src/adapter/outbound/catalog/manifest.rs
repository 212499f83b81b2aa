//! Local catalog backed by a TOML manifest.
//!
//! The manifest is re-read on every query so edits on disk are picked up by
//! the next reconciliation tick.
//!
//! ```toml
//! [[application]]
//! identifier = "com.example.shop"
//! version = "v1.0.0"
//!
//! [[application.runnable]]
//! name = "checkout"
//! namespace = "default"
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{Application, Runnable};
use crate::error::{Error, Result};
use crate::port::AppSource;

const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default, rename = "application")]
    applications: Vec<ManifestApplication>,
}

#[derive(Debug, Deserialize)]
struct ManifestApplication {
    identifier: String,
    version: String,
    #[serde(default, rename = "runnable")]
    runnables: Vec<ManifestRunnable>,
}

#[derive(Debug, Deserialize)]
struct ManifestRunnable {
    name: String,
    #[serde(default = "default_namespace")]
    namespace: String,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// Authoritative catalog read from a manifest file.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    path: PathBuf,
}

impl ManifestSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Manifest> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::Catalog(format!("failed to read {}: {e}", self.path.display()))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::Catalog(format!("malformed {}: {e}", self.path.display()))
        })
    }
}

#[async_trait]
impl AppSource for ManifestSource {
    async fn applications(&self) -> Result<Vec<Application>> {
        let manifest = self.load().await?;
        Ok(manifest
            .applications
            .into_iter()
            .map(|a| Application::new(a.identifier, a.version))
            .collect())
    }

    async fn runnables(&self, identifier: &str, version: &str) -> Result<Vec<Runnable>> {
        let manifest = self.load().await?;
        let Some(entry) = manifest
            .applications
            .into_iter()
            .find(|a| a.identifier == identifier && a.version == version)
        else {
            return Ok(Vec::new());
        };

        let app = Application::new(entry.identifier, entry.version);
        Ok(entry
            .runnables
            .into_iter()
            .map(|r| Runnable::new(&app, r.namespace, r.name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MANIFEST: &str = r#"
[[application]]
identifier = "com.example.shop"
version = "v1.0.0"

[[application.runnable]]
name = "checkout"

[[application.runnable]]
name = "refund"
namespace = "billing"

[[application]]
identifier = "com.example.blog"
version = "v2.1.0"
"#;

    fn manifest_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn lists_applications() {
        let file = manifest_file(MANIFEST);
        let source = ManifestSource::new(file.path());

        let apps = source.applications().await.unwrap();
        assert_eq!(
            apps,
            vec![
                Application::new("com.example.shop", "v1.0.0"),
                Application::new("com.example.blog", "v2.1.0"),
            ]
        );
    }

    #[tokio::test]
    async fn runnables_get_fqfns_and_default_namespace() {
        let file = manifest_file(MANIFEST);
        let source = ManifestSource::new(file.path());

        let runnables = source.runnables("com.example.shop", "v1.0.0").await.unwrap();
        let fqfns: Vec<&str> = runnables.iter().map(|r| r.fqfn.as_str()).collect();
        assert_eq!(
            fqfns,
            vec![
                "com.example.shop#default::checkout@v1.0.0",
                "com.example.shop#billing::refund@v1.0.0",
            ]
        );
    }

    #[tokio::test]
    async fn unknown_application_has_no_runnables() {
        let file = manifest_file(MANIFEST);
        let source = ManifestSource::new(file.path());

        assert!(source.runnables("com.example.shop", "v9").await.unwrap().is_empty());
        assert!(source.runnables("com.example.blog", "v2.1.0").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_a_catalog_error() {
        let source = ManifestSource::new("/nonexistent/catalog.toml");
        assert!(matches!(source.applications().await, Err(Error::Catalog(_))));
    }

    #[tokio::test]
    async fn malformed_manifest_is_a_catalog_error() {
        let file = manifest_file("[[application]]\nidentifier = 3\n");
        let source = ManifestSource::new(file.path());

        assert!(matches!(source.applications().await, Err(Error::Catalog(_))));
        assert!(matches!(
            source.runnables("com.example.shop", "v1").await,
            Err(Error::Catalog(_))
        ));
    }
}
