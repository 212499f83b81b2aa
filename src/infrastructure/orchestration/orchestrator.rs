//! Per-function reconciliation.
//!
//! Every tick re-reads the catalog, makes sure each function has a watcher,
//! and applies one scaling decision per function. Unhealthy-instance
//! cleanup runs after the decision, whichever way it went.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::launch::LaunchContext;
use crate::application::{Fleet, ScaleDecision, ScalingPolicy};
use crate::domain::Runnable;
use crate::error::{Error, Result};
use crate::infrastructure::config::Config;
use crate::port::{AppSource, CommandBuilder, Launcher, Terminator};

/// Fixed period between reconciliation ticks.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Capacity of the fatal-error channel shared by launch and companion tasks.
const ERROR_CHANNEL_CAPACITY: usize = 64;

/// What one tick did, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub functions: usize,
    pub launches: usize,
    pub terminations: usize,
    pub unhealthy_killed: usize,
    pub ceiling_hits: usize,
    pub deferred: usize,
}

/// Runs reconciliation passes over the fleet.
pub struct Reconciler {
    source: Arc<dyn AppSource>,
    fleet: Arc<Fleet>,
    policy: ScalingPolicy,
    launch: LaunchContext,
}

impl Reconciler {
    #[must_use]
    pub fn fleet(&self) -> &Arc<Fleet> {
        &self.fleet
    }

    #[must_use]
    pub const fn policy(&self) -> ScalingPolicy {
        self.policy
    }

    /// Run one reconciliation pass.
    ///
    /// A catalog that cannot be read skips the tick (or the affected
    /// application); nothing here is fatal. Launches complete in the
    /// background after this returns.
    pub async fn tick(&self) -> TickSummary {
        let mut summary = TickSummary::default();

        let apps = match self.source.applications().await {
            Ok(apps) => apps,
            Err(e) => {
                warn!(error = %e, "Catalog unavailable, skipping tick");
                return summary;
            }
        };

        for app in apps {
            let runnables = match self.source.runnables(&app.identifier, &app.version).await {
                Ok(runnables) => runnables,
                Err(e) => {
                    warn!(
                        app = %app.identifier,
                        version = %app.version,
                        error = %e,
                        "Failed to list runnables, skipping application"
                    );
                    continue;
                }
            };

            for runnable in &runnables {
                self.reconcile_function(runnable, &mut summary);
            }
        }

        summary
    }

    fn reconcile_function(&self, runnable: &Runnable, summary: &mut TickSummary) {
        debug!(fqfn = %runnable.fqfn, "Reconciling");
        summary.functions += 1;

        let watcher = self.fleet.watcher(&runnable.fqfn);
        let (report, in_flight) = watcher.snapshot();

        if in_flight > 0 {
            debug!(fqfn = %runnable.fqfn, "Launch in flight, deferring scale decision");
            summary.deferred += 1;
        } else {
            let decision = self.policy.decide(report.as_ref());
            match decision {
                ScaleDecision::ColdStart => {
                    warn!(fqfn = %runnable.fqfn, "Launching");
                }
                ScaleDecision::ScaleUp => {
                    if let Some(r) = &report {
                        warn!(
                            name = %runnable.name,
                            total_load = r.total_load,
                            instance_count = r.instance_count,
                            "Scaling up"
                        );
                    }
                }
                ScaleDecision::AtCeiling => {
                    warn!(
                        name = %runnable.name,
                        max_instances = self.policy.max_instances(),
                        "Maximum instance count reached"
                    );
                    summary.ceiling_hits += 1;
                }
                ScaleDecision::Hold => {}
                ScaleDecision::ScaleDown => {
                    if let Some(r) = &report {
                        warn!(
                            name = %runnable.name,
                            total_load = r.total_load,
                            instance_count = r.instance_count,
                            "Scaling down"
                        );
                    }
                    if watcher.terminate().is_some() {
                        summary.terminations += 1;
                    }
                }
            }

            if decision.launches() {
                self.launch.spawn(runnable, &watcher);
                summary.launches += 1;
            }
        }

        if let Some(report) = report {
            for port in report.unhealthy_ports {
                warn!(fqfn = %runnable.fqfn, port, "Killing unhealthy instance");
                if watcher.terminate_instance(port) {
                    summary.unhealthy_killed += 1;
                }
            }
        }
    }
}

/// Root of the control loop: owns the fleet and the fatal-error channel.
/// Long-running work started next to the tick loop.
pub(super) type CompanionTask = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

pub struct Orchestrator {
    pub(super) reconciler: Arc<Reconciler>,
    pub(super) errors: mpsc::Receiver<Error>,
    pub(super) errors_tx: mpsc::Sender<Error>,
    pub(super) companions: Vec<(&'static str, CompanionTask)>,
}

impl Orchestrator {
    /// Wire an orchestrator from its collaborators.
    pub fn new(
        config: Arc<Config>,
        source: Arc<dyn AppSource>,
        commands: Arc<dyn CommandBuilder>,
        launcher: Arc<dyn Launcher>,
        terminator: Arc<dyn Terminator>,
        policy: ScalingPolicy,
    ) -> Self {
        let (errors_tx, errors) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
        let fleet = Arc::new(Fleet::new(terminator, config.telemetry.stale_after()));
        let reconciler = Reconciler {
            source,
            fleet,
            policy,
            launch: LaunchContext {
                config,
                commands,
                launcher,
                errors: errors_tx.clone(),
            },
        };

        Self {
            reconciler: Arc::new(reconciler),
            errors,
            errors_tx,
            companions: Vec::new(),
        }
    }

    /// Run `task` alongside the tick loop once [`run`](Self::run) starts.
    ///
    /// Companions are expected to run forever. One that returns, with or
    /// without an error, stops the orchestrator like a failed launch.
    #[must_use]
    pub fn with_task<F>(mut self, name: &'static str, task: F) -> Self
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let task: CompanionTask = Box::pin(task);
        self.companions.push((name, task));
        self
    }

    #[must_use]
    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Shortcut for [`Reconciler::fleet`].
    #[must_use]
    pub fn fleet(&self) -> &Arc<Fleet> {
        self.reconciler.fleet()
    }

    /// Take a fatal error if a launch task has reported one.
    pub fn try_next_error(&mut self) -> Option<Error> {
        self.errors.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Fqfn, LoadSample};
    use crate::port::TelemetrySink;
    use crate::testkit::catalog::StaticSource;
    use crate::testkit::process::{RecordingLauncher, RecordingTerminator, SequentialPorts};
    use crate::testkit::{config, wait_until};

    struct Harness {
        orchestrator: Orchestrator,
        source: Arc<StaticSource>,
        launcher: Arc<RecordingLauncher>,
        terminator: Arc<RecordingTerminator>,
    }

    const FQFN: &str = "com.example.shop#default::checkout@v1";

    fn harness(cores: usize) -> Harness {
        harness_with(cores, RecordingLauncher::new())
    }

    fn harness_with(cores: usize, launcher: RecordingLauncher) -> Harness {
        let source = Arc::new(StaticSource::new().with_function("com.example.shop", "v1", "checkout"));
        let launcher = Arc::new(launcher);
        let terminator = Arc::new(RecordingTerminator::new());
        let orchestrator = Orchestrator::new(
            Arc::new(config::self_hosted()),
            source.clone(),
            Arc::new(SequentialPorts::new(20_000)),
            launcher.clone(),
            terminator.clone(),
            ScalingPolicy::new(cores, None),
        );
        Harness {
            orchestrator,
            source,
            launcher,
            terminator,
        }
    }

    async fn settle(h: &Harness) {
        let fleet = h.orchestrator.fleet();
        wait_until(|| fleet.launches_in_flight() == 0).await;
    }

    /// Tick until the function has `n` instances, reporting `load` on each.
    async fn grow_to(h: &Harness, n: usize, load: u32) {
        let fqfn = Fqfn::from(FQFN);
        loop {
            let watcher = h.orchestrator.fleet().watcher(&fqfn);
            for port in watcher.ports() {
                h.orchestrator.fleet().record(&fqfn, port, LoadSample::healthy(load));
            }
            if watcher.instance_count() >= n {
                return;
            }
            h.orchestrator.reconciler().tick().await;
            settle(h).await;
        }
    }

    #[tokio::test]
    async fn cold_start_launches_exactly_one_instance() {
        let h = harness(8);

        let summary = h.orchestrator.reconciler().tick().await;
        settle(&h).await;

        assert_eq!(summary.launches, 1);
        assert_eq!(h.launcher.calls(), 1);
        let watcher = h.orchestrator.fleet().get(&Fqfn::from(FQFN)).unwrap();
        assert_eq!(watcher.instance_count(), 1);
    }

    #[tokio::test]
    async fn saturated_instances_scale_up_by_one() {
        let h = harness(8);
        grow_to(&h, 2, 4).await;
        let before = h.launcher.calls();

        let summary = h.orchestrator.reconciler().tick().await;
        settle(&h).await;

        assert_eq!(summary.launches, 1);
        assert_eq!(h.launcher.calls(), before + 1);
        assert_eq!(h.orchestrator.fleet().instance_count(), 3);
    }

    #[tokio::test]
    async fn scale_up_stops_at_core_count() {
        let h = harness(2);
        grow_to(&h, 2, 10).await;
        let before = h.launcher.calls();

        let summary = h.orchestrator.reconciler().tick().await;
        settle(&h).await;

        assert_eq!(summary.ceiling_hits, 1);
        assert_eq!(summary.launches, 0);
        assert_eq!(h.launcher.calls(), before);
        assert_eq!(h.orchestrator.fleet().instance_count(), 2);
    }

    #[tokio::test]
    async fn single_idle_instance_is_never_terminated() {
        let h = harness(8);
        grow_to(&h, 1, 0).await;

        for _ in 0..3 {
            let summary = h.orchestrator.reconciler().tick().await;
            assert_eq!(summary.terminations, 0);
        }
        assert_eq!(h.orchestrator.fleet().instance_count(), 1);
        assert!(h.terminator.terminated().is_empty());
    }

    #[tokio::test]
    async fn idle_instances_scale_down_by_one() {
        let h = harness(8);
        grow_to(&h, 3, 4).await;
        let watcher = h.orchestrator.fleet().watcher(&Fqfn::from(FQFN));
        let newest = *watcher.ports().last().unwrap();
        for port in watcher.ports() {
            watcher.record(port, LoadSample::healthy(0));
        }

        let summary = h.orchestrator.reconciler().tick().await;

        assert_eq!(summary.terminations, 1);
        assert_eq!(watcher.instance_count(), 2);
        assert!(!watcher.ports().contains(&newest));
    }

    #[tokio::test]
    async fn unhealthy_ports_are_killed_alongside_scale_decision() {
        let h = harness(8);
        grow_to(&h, 3, 4).await;
        let watcher = h.orchestrator.fleet().watcher(&Fqfn::from(FQFN));
        let ports = watcher.ports();
        watcher.record(ports[0], LoadSample::unhealthy());
        watcher.record(ports[1], LoadSample::unhealthy());
        watcher.record(ports[2], LoadSample::healthy(12));

        // average 12 / 3 = 4: saturated, so the tick also scales up
        let summary = h.orchestrator.reconciler().tick().await;
        settle(&h).await;

        assert_eq!(summary.launches, 1);
        assert_eq!(summary.unhealthy_killed, 2);
        let remaining = watcher.ports();
        assert!(!remaining.contains(&ports[0]));
        assert!(!remaining.contains(&ports[1]));
        assert_eq!(remaining.len(), 2);
    }

    #[tokio::test]
    async fn unhealthy_ports_are_killed_alongside_scale_down() {
        let h = harness(8);
        grow_to(&h, 3, 4).await;
        let watcher = h.orchestrator.fleet().watcher(&Fqfn::from(FQFN));
        let ports = watcher.ports();
        watcher.record(ports[0], LoadSample::unhealthy());
        watcher.record(ports[1], LoadSample::healthy(0));
        watcher.record(ports[2], LoadSample::healthy(0));

        // average 0: idle, so the newest instance goes and the unhealthy one too
        let summary = h.orchestrator.reconciler().tick().await;

        assert_eq!(summary.launches, 0);
        assert_eq!(summary.terminations, 1);
        assert_eq!(summary.unhealthy_killed, 1);
        assert_eq!(watcher.ports(), vec![ports[1]]);
        assert_eq!(h.terminator.terminated().len(), 2);
    }

    #[tokio::test]
    async fn repeated_ticks_reuse_the_same_watcher() {
        let h = harness(8);
        h.orchestrator.reconciler().tick().await;
        settle(&h).await;
        let first = h.orchestrator.fleet().get(&Fqfn::from(FQFN)).unwrap();

        h.orchestrator.reconciler().tick().await;
        settle(&h).await;
        let second = h.orchestrator.fleet().get(&Fqfn::from(FQFN)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(h.orchestrator.fleet().len(), 1);
    }

    #[tokio::test]
    async fn launch_in_flight_defers_next_decision() {
        let h = harness_with(8, RecordingLauncher::new().with_delay(Duration::from_millis(200)));

        h.orchestrator.reconciler().tick().await;
        let summary = h.orchestrator.reconciler().tick().await;

        assert_eq!(summary.deferred, 1);
        assert_eq!(summary.launches, 0);
        settle(&h).await;
        assert_eq!(h.launcher.calls(), 1);
    }

    #[tokio::test]
    async fn catalog_failure_skips_tick() {
        let h = harness(8);
        h.source.set_failing(true);

        let summary = h.orchestrator.reconciler().tick().await;

        assert_eq!(summary, TickSummary::default());
        assert_eq!(h.launcher.calls(), 0);
    }

    #[tokio::test]
    async fn removed_function_keeps_its_instances() {
        let h = harness(8);
        grow_to(&h, 1, 0).await;
        h.source.clear();

        let summary = h.orchestrator.reconciler().tick().await;

        assert_eq!(summary.functions, 0);
        assert_eq!(h.orchestrator.fleet().instance_count(), 1);
        assert!(h.terminator.terminated().is_empty());
    }

    #[tokio::test]
    async fn failed_launch_reaches_error_channel() {
        let mut h = harness_with(8, RecordingLauncher::failing());

        h.orchestrator.reconciler().tick().await;
        settle(&h).await;

        let err = h.orchestrator.try_next_error().unwrap();
        assert!(matches!(err, Error::Launch { .. }));
        assert_eq!(h.orchestrator.fleet().instance_count(), 0);
    }

    #[tokio::test]
    async fn reused_port_is_fatal() {
        let mut orchestrator = Orchestrator::new(
            Arc::new(config::self_hosted()),
            Arc::new(StaticSource::new().with_function("com.example.shop", "v1", "checkout")),
            Arc::new(SequentialPorts::fixed(20_500)),
            Arc::new(RecordingLauncher::new()),
            Arc::new(RecordingTerminator::new()),
            ScalingPolicy::new(8, None),
        );
        let fqfn = Fqfn::from(FQFN);
        orchestrator.reconciler().tick().await;
        let fleet = Arc::clone(orchestrator.fleet());
        wait_until(|| fleet.instance_count() == 1).await;
        fleet.record(&fqfn, 20_500, LoadSample::healthy(8));

        orchestrator.reconciler().tick().await;
        wait_until(|| fleet.launches_in_flight() == 0).await;

        let err = orchestrator.try_next_error().unwrap();
        assert!(matches!(err, Error::DuplicatePort { port: 20_500, .. }));
        assert_eq!(fleet.instance_count(), 1);
    }

    #[tokio::test]
    async fn launch_env_carries_assigned_port() {
        let h = harness(8);
        h.orchestrator.reconciler().tick().await;
        settle(&h).await;

        let (_, env) = h.launcher.last_call().unwrap();
        let port = h.orchestrator.fleet().watcher(&Fqfn::from(FQFN)).ports()[0];
        assert!(env.contains(&("SAT_HTTP_PORT".to_string(), port.to_string())));
    }
}
