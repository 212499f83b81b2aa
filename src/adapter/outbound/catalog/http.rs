//! Client of a remote control plane.
//!
//! Serves both the catalog queries made every tick and the bootstrap calls
//! made once at startup.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::domain::{Application, NodeRegistration, Runnable};
use crate::error::{Error, Result};
use crate::port::{AppSource, ControlPlane};

/// Per-request timeout for control plane calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Catalog and bootstrap client bound to one remote address.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base_url: Url,
    env_token: Option<String>,
}

impl HttpSource {
    /// Bind a client to `address`.
    ///
    /// Accepts either a full URL or a bare `host:port`, which is treated as
    /// plain HTTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed or the HTTP client
    /// cannot be built.
    pub fn new(address: &str, env_token: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: parse_address(address)?,
            env_token: env_token.filter(|t| !t.is_empty()),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.env_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

/// Normalize a control plane address into a base URL.
fn parse_address(address: &str) -> Result<Url> {
    let address = address.trim();
    let with_scheme = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    };
    let mut url = Url::parse(&with_scheme)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl AppSource for HttpSource {
    async fn applications(&self) -> Result<Vec<Application>> {
        let url = self.endpoint("meta/apps")?;
        debug!(url = %url, "Fetching applications");
        let apps = self
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(apps)
    }

    async fn runnables(&self, identifier: &str, version: &str) -> Result<Vec<Runnable>> {
        let mut url = self.endpoint("meta/runnables")?;
        url.path_segments_mut()
            .map_err(|()| Error::Catalog(format!("cannot extend URL {}", self.base_url)))?
            .push(identifier)
            .push(version);
        debug!(url = %url, "Fetching runnables");
        let runnables = self
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(runnables)
    }
}

#[async_trait]
impl ControlPlane for HttpSource {
    async fn probe(&self) -> Result<()> {
        let url = self.endpoint("meta/state")?;
        self.get(url).send().await?.error_for_status()?;
        Ok(())
    }

    async fn register(&self, node: &NodeRegistration) -> Result<()> {
        let url = self.endpoint("meta/nodes")?;
        let mut request = self.client.post(url).json(node);
        if let Some(token) = &self.env_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Registration(format!("{status}: {body}")));
        }
        Ok(())
    }
}
