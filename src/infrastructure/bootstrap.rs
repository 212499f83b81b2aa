//! Composition root for runtime wiring.
//!
//! Picks the catalog source for the configured control plane, blocks until
//! a remote control plane answers, and assembles the orchestrator together
//! with its metrics poller and, in self mode, the local registry.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::adapter::inbound::{MetricsPoller, RegistryServer};
use crate::adapter::outbound::catalog::{HttpSource, ManifestSource};
use crate::adapter::outbound::command::ExecutorCommandBuilder;
use crate::adapter::outbound::process::{ProcessLauncher, SignalTerminator};
use crate::application::ScalingPolicy;
use crate::domain::NodeRegistration;
use crate::error::{Error, Result};
use crate::infrastructure::config::{BootstrapConfig, Config};
use crate::infrastructure::orchestration::Orchestrator;
use crate::port::{AppSource, CommandBuilder, ControlPlane, Launcher, Terminator};

/// Probe the control plane until it answers.
///
/// Retries at a fixed interval. Gives up with [`Error::Bootstrap`] only when
/// `max_attempts` is configured; otherwise waits indefinitely. Returns the
/// number of attempts it took.
pub async fn await_control_plane(
    control_plane: &dyn ControlPlane,
    config: &BootstrapConfig,
) -> Result<u32> {
    let mut attempts = 0u32;
    loop {
        attempts = attempts.saturating_add(1);
        match control_plane.probe().await {
            Ok(()) => {
                info!(attempts, "Control plane reachable");
                return Ok(attempts);
            }
            Err(e) => {
                warn!(
                    attempt = attempts,
                    error = %e,
                    "Failed to reach control plane, retrying"
                );
                if config.max_attempts.is_some_and(|max| attempts >= max) {
                    return Err(Error::Bootstrap { attempts });
                }
            }
        }
        tokio::time::sleep(config.retry_interval()).await;
    }
}

/// Wait for the control plane, then announce this node exactly once.
///
/// # Errors
///
/// Returns [`Error::Bootstrap`] when retries run out and
/// [`Error::Registration`] when the control plane refuses the node.
pub async fn federate(
    control_plane: &dyn ControlPlane,
    config: &BootstrapConfig,
    capacity: usize,
) -> Result<NodeRegistration> {
    await_control_plane(control_plane, config).await?;

    let node = NodeRegistration::for_this_node(config.advertise_address.clone(), capacity);
    control_plane.register(&node).await.map_err(|e| match e {
        Error::Registration(_) => e,
        other => Error::Registration(other.to_string()),
    })?;

    info!(node_id = %node.node_id, capacity, "Registered with control plane");
    Ok(node)
}

/// Select the catalog for this run.
///
/// Self-hosted runs read the local bundle manifest. Otherwise the remote
/// control plane is both the catalog and the place this node registers.
pub async fn build_app_source(config: &Config, capacity: usize) -> Result<Arc<dyn AppSource>> {
    if config.is_self_hosted() {
        info!(bundle = %config.bundle_path.display(), "Using local bundle as control plane");
        return Ok(Arc::new(ManifestSource::new(config.bundle_path.clone())));
    }

    let env_token = Some(config.env_token.clone());
    let remote = HttpSource::new(&config.control_plane, env_token)?;
    info!(control_plane = %remote.base_url(), "Joining remote control plane");
    federate(&remote, &config.bootstrap, capacity).await?;
    Ok(Arc::new(remote))
}

/// Block until `path` exists, checking every `interval`.
pub async fn wait_for_bundle(path: &Path, interval: Duration) {
    let mut logged = false;
    while !tokio::fs::try_exists(path).await.unwrap_or(false) {
        if !logged {
            info!(bundle = %path.display(), "Waiting for bundle");
            logged = true;
        }
        tokio::time::sleep(interval).await;
    }
}

pub(crate) fn build_command_builder(config: &Config) -> Arc<dyn CommandBuilder> {
    Arc::new(ExecutorCommandBuilder::new(
        config.executor.binary.clone(),
        config.executor.host.clone(),
        config.executor.args.clone(),
    ))
}

pub(crate) fn build_launcher() -> Arc<dyn Launcher> {
    Arc::new(ProcessLauncher::new())
}

pub(crate) fn build_terminator() -> Arc<dyn Terminator> {
    Arc::new(SignalTerminator::new())
}

/// Serve the local catalog on the self-hosted control plane address.
///
/// # Errors
///
/// Returns [`Error::Io`] if the address is already taken.
pub async fn build_registry(config: &Config, source: Arc<dyn AppSource>) -> Result<RegistryServer> {
    let server = RegistryServer::bind(&config.control_plane, source).await?;
    info!(address = %server.local_addr()?, "Serving local registry");
    Ok(server)
}

/// Wire a production orchestrator: real processes, real signals, the
/// catalog chosen by [`build_app_source`], and a metrics poller feeding the
/// fleet. Self-hosted runs also serve the catalog over HTTP.
///
/// # Errors
///
/// Propagates bootstrap failures from [`build_app_source`] and bind
/// failures from [`build_registry`].
pub async fn build_orchestrator(config: Config) -> Result<Orchestrator> {
    let policy = ScalingPolicy::detect(config.concurrency_ceiling);
    let source = build_app_source(&config, policy.max_instances()).await?;
    let registry = if config.is_self_hosted() {
        Some(build_registry(&config, Arc::clone(&source)).await?)
    } else {
        None
    };
    let commands = build_command_builder(&config);
    let telemetry = config.telemetry.clone();
    let executor_host = config.executor.host.clone();

    let orchestrator = Orchestrator::new(
        Arc::new(config),
        source,
        commands,
        build_launcher(),
        build_terminator(),
        policy,
    );
    let poller = MetricsPoller::new(
        &executor_host,
        Arc::clone(orchestrator.fleet()) as Arc<dyn crate::port::TelemetrySink>,
        telemetry.poll_interval(),
        telemetry.failure_threshold,
    )?;

    let mut orchestrator = orchestrator.with_task("metrics poller", poller.run());
    if let Some(registry) = registry {
        orchestrator = orchestrator.with_task("registry", registry.serve());
    }
    Ok(orchestrator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::config;
    use crate::testkit::control_plane::{Call, ScriptedControlPlane};

    #[tokio::test]
    async fn probe_retries_until_reachable() {
        let cp = ScriptedControlPlane::unreachable_for(3);

        let attempts = await_control_plane(&cp, &config::fast_bootstrap()).await.unwrap();

        assert_eq!(attempts, 4);
        assert_eq!(cp.probes(), 4);
    }

    #[tokio::test]
    async fn bounded_retries_give_up() {
        let cp = ScriptedControlPlane::unreachable_for(10);
        let mut bootstrap = config::fast_bootstrap();
        bootstrap.max_attempts = Some(2);

        let err = await_control_plane(&cp, &bootstrap).await.unwrap_err();

        assert!(matches!(err, Error::Bootstrap { attempts: 2 }));
        assert!(cp.registrations().is_empty());
    }

    #[tokio::test]
    async fn federation_registers_once_after_probe() {
        let cp = ScriptedControlPlane::unreachable_for(2);

        let node = federate(&cp, &config::fast_bootstrap(), 4).await.unwrap();

        assert_eq!(cp.calls(), vec![Call::Probe, Call::Probe, Call::Probe, Call::Register]);
        assert_eq!(cp.registrations(), vec![node]);
    }

    #[tokio::test]
    async fn rejected_registration_is_fatal() {
        let cp = ScriptedControlPlane::reachable().rejecting_registration();

        let err = federate(&cp, &config::fast_bootstrap(), 4).await.unwrap_err();

        assert!(matches!(err, Error::Registration(_)));
    }

    #[tokio::test]
    async fn self_hosted_config_uses_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("catalog.toml");
        std::fs::write(
            &bundle,
            "[[application]]\nidentifier = \"com.example.shop\"\nversion = \"v1\"\n\n[[application.runnable]]\nname = \"checkout\"\n",
        )
        .unwrap();
        let mut config = config::self_hosted();
        config.bundle_path = bundle;

        let source = build_app_source(&config, 4).await.unwrap();
        let apps = source.applications().await.unwrap();

        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].identifier, "com.example.shop");
    }

    #[tokio::test]
    async fn wait_for_bundle_returns_once_file_appears() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("late.toml");
        let writer = {
            let bundle = bundle.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                tokio::fs::write(&bundle, "").await.unwrap();
            })
        };

        tokio::time::timeout(
            Duration::from_secs(5),
            wait_for_bundle(&bundle, Duration::from_millis(5)),
        )
        .await
        .unwrap();
        writer.await.unwrap();
    }
}
