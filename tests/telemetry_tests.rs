//! Executor metrics polled over real HTTP driving scaling decisions.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::sync::watch;

use constellation::adapter::inbound::MetricsPoller;
use constellation::application::ScalingPolicy;
use constellation::infrastructure::orchestration::Orchestrator;
use constellation::testkit::catalog::StaticSource;
use constellation::testkit::process::{ListedPorts, RecordingLauncher, RecordingTerminator};
use constellation::testkit::{config, domain, wait_until};

/// Stand-in executor answering metrics polls with a fixed thread count.
async fn executor(threads: u32) -> SocketAddr {
    let app = Router::new().route(
        "/meta/metrics",
        get(move || async move { Json(json!({ "scheduler": { "totalThreadCount": threads } })) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });
    addr
}

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn orchestrator(cores: usize, ports: Vec<u16>, terminator: Arc<RecordingTerminator>) -> Orchestrator {
    Orchestrator::new(
        Arc::new(config::self_hosted()),
        Arc::new(StaticSource::new().with_function("com.example.shop", "v1", "checkout")),
        Arc::new(ListedPorts::new(ports)),
        Arc::new(RecordingLauncher::new()),
        terminator,
        ScalingPolicy::new(cores, None),
    )
}

fn poller(orchestrator: &Orchestrator, failure_threshold: u32) -> MetricsPoller {
    MetricsPoller::new(
        "127.0.0.1",
        Arc::clone(orchestrator.fleet()) as Arc<dyn constellation::port::TelemetrySink>,
        Duration::from_millis(20),
        failure_threshold,
    )
    .unwrap()
}

#[tokio::test]
async fn polled_load_triggers_scale_up() {
    let first = executor(6).await;
    let second = executor(6).await;
    let ports = vec![first.port(), second.port()];
    let orch = orchestrator(8, ports, Arc::new(RecordingTerminator::new()));
    let fleet = Arc::clone(orch.fleet());
    let fqfn = domain::fqfn("com.example.shop", "v1", "checkout");
    let poller = poller(&orch, 3);

    orch.reconciler().tick().await;
    wait_until(|| fleet.instance_count() == 1 && fleet.launches_in_flight() == 0).await;

    // Nothing polled yet: the lone instance looks idle and is held.
    let held = orch.reconciler().tick().await;
    assert_eq!(held.launches, 0);

    let polled = poller.poll_once().await;
    assert_eq!(polled.polled, 1);
    assert_eq!(fleet.get(&fqfn).unwrap().report().unwrap().total_load, 6);

    let summary = orch.reconciler().tick().await;
    assert_eq!(summary.launches, 1);
    wait_until(|| fleet.instance_count() == 2).await;
    assert_eq!(fleet.get(&fqfn).unwrap().ports(), vec![first.port(), second.port()]);
}

#[tokio::test]
async fn silent_executor_is_terminated() {
    let dead = closed_port();
    let terminator = Arc::new(RecordingTerminator::new());
    let orch = orchestrator(8, vec![dead], terminator.clone());
    let fleet = Arc::clone(orch.fleet());
    let poller = poller(&orch, 1);

    orch.reconciler().tick().await;
    wait_until(|| fleet.instance_count() == 1 && fleet.launches_in_flight() == 0).await;

    let polled = poller.poll_once().await;
    assert_eq!(polled.marked_unhealthy, 1);

    let summary = orch.reconciler().tick().await;
    assert_eq!(summary.unhealthy_killed, 1);
    assert_eq!(fleet.instance_count(), 0);
    assert_eq!(terminator.terminated().len(), 1);
}

#[tokio::test]
async fn running_loop_scales_from_polled_load() {
    let first = executor(4).await;
    let second = executor(4).await;
    // Two cores: threshold 1, at most two instances.
    let ports = vec![first.port(), second.port()];
    let orch = orchestrator(2, ports, Arc::new(RecordingTerminator::new()));
    let fleet = Arc::clone(orch.fleet());
    let poller = poller(&orch, 3);
    let orch = orch.with_task("metrics poller", poller.run());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(orch.run(shutdown_rx));
    {
        let fleet = Arc::clone(&fleet);
        wait_until(move || fleet.instance_count() == 2).await;
    }
    shutdown_tx.send(true).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(matches!(result, Ok(Ok(Ok(())))));
}
