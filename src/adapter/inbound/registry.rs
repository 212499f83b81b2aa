//! Local registry served when this node is its own control plane.
//!
//! Exposes the same endpoints [`HttpSource`] consumes, backed by the local
//! catalog, so executors told to use the self-hosted address can resolve
//! their functions.
//!
//! [`HttpSource`]: crate::adapter::outbound::catalog::HttpSource

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::domain::{Application, NodeRegistration, Runnable};
use crate::error::{Error, Result};
use crate::port::AppSource;

#[derive(Clone)]
struct RegistryState {
    source: Arc<dyn AppSource>,
    nodes: Arc<Mutex<Vec<NodeRegistration>>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StateResponse {
    version: &'static str,
    nodes: usize,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Catalog failure turned into an HTTP response.
struct RegistryError(Error);

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Catalog(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(error = %self.0, status = %status, "Registry request failed");
        let body = ErrorResponse {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// HTTP registry bound to a listening socket, ready to serve.
pub struct RegistryServer {
    listener: TcpListener,
    state: RegistryState,
}

impl RegistryServer {
    /// Bind the registry on `address` (`host:port`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the address cannot be bound.
    pub async fn bind(address: &str, source: Arc<dyn AppSource>) -> Result<Self> {
        let listener = TcpListener::bind(address).await?;
        Ok(Self {
            listener,
            state: RegistryState {
                source,
                nodes: Arc::new(Mutex::new(Vec::new())),
            },
        })
    }

    /// Address actually bound, useful when binding port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the listener fails.
    pub async fn serve(self) -> Result<()> {
        let addr = self.local_addr()?;
        info!(address = %addr, "Registry listening");
        axum::serve(self.listener, router(self.state)).await?;
        Err(Error::Stopped("registry server exited".into()))
    }
}

fn router(state: RegistryState) -> Router {
    Router::new()
        .route("/meta/state", get(registry_state))
        .route("/meta/apps", get(applications))
        .route("/meta/runnables/:identifier/:version", get(runnables))
        .route("/meta/nodes", get(list_nodes).post(register_node))
        .with_state(state)
}

async fn registry_state(State(state): State<RegistryState>) -> Json<StateResponse> {
    Json(StateResponse {
        version: env!("CARGO_PKG_VERSION"),
        nodes: state.nodes.lock().len(),
    })
}

async fn applications(
    State(state): State<RegistryState>,
) -> std::result::Result<Json<Vec<Application>>, RegistryError> {
    state.source.applications().await.map(Json).map_err(RegistryError)
}

async fn runnables(
    State(state): State<RegistryState>,
    Path((identifier, version)): Path<(String, String)>,
) -> std::result::Result<Json<Vec<Runnable>>, RegistryError> {
    state
        .source
        .runnables(&identifier, &version)
        .await
        .map(Json)
        .map_err(RegistryError)
}

async fn list_nodes(State(state): State<RegistryState>) -> Json<Vec<NodeRegistration>> {
    Json(state.nodes.lock().clone())
}

async fn register_node(
    State(state): State<RegistryState>,
    Json(node): Json<NodeRegistration>,
) -> (StatusCode, Json<NodeRegistration>) {
    info!(node_id = %node.node_id, capacity = node.capacity, "Node registered");
    state.nodes.lock().push(node.clone());
    (StatusCode::CREATED, Json(node))
}
