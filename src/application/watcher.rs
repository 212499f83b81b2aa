//! Per-function instance tracking.
//!
//! A [`Watcher`] owns every executor instance launched for one FQFN. All
//! mutation goes through a single per-watcher lock, so launches completing
//! for different functions never contend with each other, and telemetry
//! updates share the same exclusion as the reconciliation loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::domain::{Fqfn, InstanceId, LoadSample, Report};
use crate::error::{Error, Result};
use crate::port::Terminator;

/// One running executor tracked by a watcher.
#[derive(Debug, Clone)]
struct InstanceRecord {
    port: u16,
    instance_id: InstanceId,
    pid: u32,
    /// Most recent telemetry sample and when it arrived.
    last_sample: Option<(LoadSample, Instant)>,
}

impl InstanceRecord {
    /// Load figure counted toward the report; stale telemetry counts as idle.
    fn current_load(&self, now: Instant, stale_after: Duration) -> u64 {
        match self.last_sample {
            Some((sample, at)) if now.duration_since(at) <= stale_after => {
                u64::from(sample.threads)
            }
            _ => 0,
        }
    }

    fn is_unhealthy(&self) -> bool {
        matches!(self.last_sample, Some((sample, _)) if !sample.healthy)
    }
}

#[derive(Debug, Default)]
struct WatcherState {
    /// Instances in launch order; the last entry is the newest.
    instances: Vec<InstanceRecord>,
    launches_in_flight: usize,
}

/// Tracks the live instance set of exactly one function.
///
/// Created lazily by the fleet the first time its FQFN is reconciled and
/// kept for the life of the process, even once it tracks no instances.
pub struct Watcher {
    fqfn: Fqfn,
    terminator: Arc<dyn Terminator>,
    stale_after: Duration,
    state: Mutex<WatcherState>,
}

impl Watcher {
    pub fn new(fqfn: Fqfn, terminator: Arc<dyn Terminator>, stale_after: Duration) -> Self {
        Self {
            fqfn,
            terminator,
            stale_after,
            state: Mutex::new(WatcherState::default()),
        }
    }

    #[must_use]
    pub fn fqfn(&self) -> &Fqfn {
        &self.fqfn
    }

    /// Start tracking a freshly launched instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicatePort`] if another instance already holds
    /// `port`. That can only happen when the command builder hands out a
    /// port twice, so callers treat it as fatal.
    pub fn add(&self, port: u16, instance_id: InstanceId, pid: u32) -> Result<()> {
        let mut state = self.state.lock();
        if state.instances.iter().any(|i| i.port == port) {
            return Err(Error::DuplicatePort {
                fqfn: self.fqfn.clone(),
                port,
            });
        }

        info!(fqfn = %self.fqfn, port, pid, instance_id = %instance_id, "Instance added");
        state.instances.push(InstanceRecord {
            port,
            instance_id,
            pid,
            last_sample: None,
        });
        Ok(())
    }

    /// Snapshot the current instance set, or `None` when nothing is tracked.
    #[must_use]
    pub fn report(&self) -> Option<Report> {
        self.build_report(&self.state.lock())
    }

    /// Report and in-flight launch count read under one lock, so a launch
    /// completing between the two reads cannot be missed.
    #[must_use]
    pub fn snapshot(&self) -> (Option<Report>, usize) {
        let state = self.state.lock();
        (self.build_report(&state), state.launches_in_flight)
    }

    fn build_report(&self, state: &WatcherState) -> Option<Report> {
        if state.instances.is_empty() {
            return None;
        }

        let now = Instant::now();
        let total_load = state
            .instances
            .iter()
            .map(|i| i.current_load(now, self.stale_after))
            .sum();
        let unhealthy_ports = state
            .instances
            .iter()
            .filter(|i| i.is_unhealthy())
            .map(|i| i.port)
            .collect();

        Some(Report {
            instance_count: state.instances.len(),
            total_load,
            unhealthy_ports,
        })
    }

    /// Stop and forget the instance bound to `port`.
    ///
    /// The record is removed even if the process cannot be signalled; a
    /// stuck process is logged and left behind. Returns false if no
    /// instance holds `port`.
    pub fn terminate_instance(&self, port: u16) -> bool {
        let removed = {
            let mut state = self.state.lock();
            state
                .instances
                .iter()
                .position(|i| i.port == port)
                .map(|idx| state.instances.remove(idx))
        };

        match removed {
            Some(record) => {
                self.stop(&record);
                true
            }
            None => {
                debug!(fqfn = %self.fqfn, port, "No instance on port");
                false
            }
        }
    }

    /// Scale-down: stop the most recently added instance and return the
    /// port it released.
    pub fn terminate(&self) -> Option<u16> {
        let removed = self.state.lock().instances.pop();
        removed.map(|record| {
            self.stop(&record);
            record.port
        })
    }

    /// Stop every tracked instance. Returns how many were released.
    pub fn terminate_all(&self) -> usize {
        let drained: Vec<InstanceRecord> = self.state.lock().instances.drain(..).collect();
        for record in &drained {
            self.stop(record);
        }
        drained.len()
    }

    /// Apply a telemetry sample to the instance on `port`.
    pub fn record(&self, port: u16, sample: LoadSample) -> bool {
        let mut state = self.state.lock();
        match state.instances.iter_mut().find(|i| i.port == port) {
            Some(record) => {
                record.last_sample = Some((sample, Instant::now()));
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.state.lock().instances.len()
    }

    /// Ports of tracked instances, oldest first.
    #[must_use]
    pub fn ports(&self) -> Vec<u16> {
        self.state.lock().instances.iter().map(|i| i.port).collect()
    }

    #[must_use]
    pub fn launches_in_flight(&self) -> usize {
        self.state.lock().launches_in_flight
    }

    /// Mark a launch as in flight until the returned guard is dropped.
    #[must_use = "the launch is only counted while the guard is alive"]
    pub fn begin_launch(self: &Arc<Self>) -> LaunchGuard {
        self.state.lock().launches_in_flight += 1;
        LaunchGuard {
            watcher: Arc::clone(self),
        }
    }

    /// Signal outside the state lock; failures are logged, never escalated.
    fn stop(&self, record: &InstanceRecord) {
        info!(
            fqfn = %self.fqfn,
            port = record.port,
            pid = record.pid,
            instance_id = %record.instance_id,
            "Terminating instance"
        );
        if let Err(e) = self.terminator.terminate(record.pid) {
            error!(
                fqfn = %self.fqfn,
                port = record.port,
                pid = record.pid,
                error = %e,
                "Failed to stop instance, process may be orphaned"
            );
        }
    }
}

/// Keeps a launch counted as in flight for its watcher.
pub struct LaunchGuard {
    watcher: Arc<Watcher>,
}

impl Drop for LaunchGuard {
    fn drop(&mut self) {
        let mut state = self.watcher.state.lock();
        state.launches_in_flight = state.launches_in_flight.saturating_sub(1);
    }
}
