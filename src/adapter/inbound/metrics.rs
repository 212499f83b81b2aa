//! Executor metrics polling.
//!
//! Every running executor serves `GET /meta/metrics` on its assigned port.
//! The poller reads the scheduler's thread count from each tracked instance
//! and records it as the instance's load. An instance that fails
//! `failure_threshold` polls in a row is recorded as unhealthy, which makes
//! the next tick terminate it.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::domain::{Fqfn, LoadSample};
use crate::error::{Error, Result};
use crate::port::TelemetrySink;

/// Path every executor serves its metrics on.
pub const METRICS_PATH: &str = "meta/metrics";

/// Per-request timeout for one metrics poll.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricsResponse {
    scheduler: SchedulerMetrics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchedulerMetrics {
    total_thread_count: u32,
}

/// What one polling pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub polled: usize,
    pub failed: usize,
    pub marked_unhealthy: usize,
}

/// Drives [`TelemetrySink`] from executor metrics endpoints.
pub struct MetricsPoller {
    client: Client,
    host: String,
    sink: Arc<dyn TelemetrySink>,
    interval: Duration,
    failure_threshold: u32,
    failures: Mutex<HashMap<(Fqfn, u16), u32>>,
}

impl MetricsPoller {
    /// Poll executors bound on `host`, feeding samples into `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        host: &str,
        sink: Arc<dyn TelemetrySink>,
        interval: Duration,
        failure_threshold: u32,
    ) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            host: reachable_host(host),
            sink,
            interval,
            failure_threshold: failure_threshold.max(1),
            failures: Mutex::new(HashMap::new()),
        })
    }

    /// Poll forever at the configured interval.
    pub async fn run(self) -> Result<()> {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let summary = self.poll_once().await;
            if summary.polled > 0 {
                debug!(?summary, "Metrics poll complete");
            }
        }
    }

    /// Poll every tracked instance once, concurrently.
    pub async fn poll_once(&self) -> PollSummary {
        let targets = self.sink.targets();
        let mut summary = PollSummary {
            polled: targets.len(),
            ..PollSummary::default()
        };

        let mut polls = JoinSet::new();
        for (fqfn, port) in &targets {
            let client = self.client.clone();
            let url = format!("http://{}:{port}/{METRICS_PATH}", self.host);
            let (fqfn, port) = (fqfn.clone(), *port);
            polls.spawn(async move {
                let result = fetch_thread_count(&client, &url).await;
                (fqfn, port, result)
            });
        }

        while let Some(joined) = polls.join_next().await {
            let (fqfn, port, result) = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "Metrics poll task failed");
                    continue;
                }
            };
            match result {
                Ok(threads) => {
                    self.failures.lock().remove(&(fqfn.clone(), port));
                    self.sink.record(&fqfn, port, LoadSample::healthy(threads));
                }
                Err(e) => {
                    summary.failed += 1;
                    if self.count_failure(&fqfn, port, &e) {
                        self.sink.record(&fqfn, port, LoadSample::unhealthy());
                        summary.marked_unhealthy += 1;
                    }
                }
            }
        }

        let live: HashSet<(Fqfn, u16)> = targets.into_iter().collect();
        self.failures.lock().retain(|key, _| live.contains(key));
        summary
    }

    /// Bump the failure streak for an instance; true once it reaches the
    /// threshold.
    fn count_failure(&self, fqfn: &Fqfn, port: u16, error: &Error) -> bool {
        let mut failures = self.failures.lock();
        let streak = failures.entry((fqfn.clone(), port)).or_insert(0);
        *streak = streak.saturating_add(1);
        if *streak == self.failure_threshold {
            warn!(
                fqfn = %fqfn,
                port,
                failures = *streak,
                error = %error,
                "Instance stopped answering metrics polls, marking unhealthy"
            );
        } else {
            debug!(fqfn = %fqfn, port, failures = *streak, error = %error, "Metrics poll failed");
        }
        *streak >= self.failure_threshold
    }
}

async fn fetch_thread_count(client: &Client, url: &str) -> Result<u32> {
    let metrics: MetricsResponse = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(metrics.scheduler.total_thread_count)
}

/// Executors bound on a wildcard address are polled over loopback.
fn reachable_host(host: &str) -> String {
    match host.trim() {
        "" | "0.0.0.0" => "127.0.0.1".to_string(),
        "::" | "[::]" => "[::1]".to_string(),
        other => other.to_string(),
    }
}
