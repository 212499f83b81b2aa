//! The process table: one watcher per function identity.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use super::watcher::Watcher;
use crate::domain::{Fqfn, LoadSample};
use crate::port::{TelemetrySink, Terminator};

/// Map of FQFN to [`Watcher`], owned by the orchestrator.
///
/// Grows monotonically: watchers are inserted on first sight and never
/// removed or replaced. Insert-if-absent is atomic per key, so concurrent
/// reconciliation of the same function never yields two watchers.
pub struct Fleet {
    watchers: DashMap<Fqfn, Arc<Watcher>>,
    terminator: Arc<dyn Terminator>,
    stale_after: Duration,
}

impl Fleet {
    pub fn new(terminator: Arc<dyn Terminator>, stale_after: Duration) -> Self {
        Self {
            watchers: DashMap::new(),
            terminator,
            stale_after,
        }
    }

    /// Get the watcher for `fqfn`, creating it on first sight.
    pub fn watcher(&self, fqfn: &Fqfn) -> Arc<Watcher> {
        match self.watchers.entry(fqfn.clone()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                info!(fqfn = %fqfn, "Watching new function");
                let watcher = Arc::new(Watcher::new(
                    fqfn.clone(),
                    Arc::clone(&self.terminator),
                    self.stale_after,
                ));
                entry.insert(Arc::clone(&watcher));
                watcher
            }
        }
    }

    /// Get an existing watcher without creating one.
    #[must_use]
    pub fn get(&self, fqfn: &Fqfn) -> Option<Arc<Watcher>> {
        self.watchers.get(fqfn).map(|w| Arc::clone(w.value()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    /// Total instances tracked across every function.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.watchers.iter().map(|w| w.instance_count()).sum()
    }

    /// Launches started but not yet tracked, across every function.
    #[must_use]
    pub fn launches_in_flight(&self) -> usize {
        self.watchers.iter().map(|w| w.launches_in_flight()).sum()
    }

    /// Stop every instance of every function. Watchers themselves stay.
    pub fn terminate_all(&self) -> usize {
        let watchers: Vec<Arc<Watcher>> =
            self.watchers.iter().map(|w| Arc::clone(w.value())).collect();
        watchers.iter().map(|w| w.terminate_all()).sum()
    }
}

impl TelemetrySink for Fleet {
    fn record(&self, fqfn: &Fqfn, port: u16, sample: LoadSample) -> bool {
        let Some(watcher) = self.get(fqfn) else {
            debug!(fqfn = %fqfn, port, "Telemetry for unknown function dropped");
            return false;
        };
        let applied = watcher.record(port, sample);
        if !applied {
            debug!(fqfn = %fqfn, port, "Telemetry for unknown instance dropped");
        }
        applied
    }

    fn targets(&self) -> Vec<(Fqfn, u16)> {
        self.watchers
            .iter()
            .flat_map(|w| {
                let fqfn = w.key().clone();
                w.ports().into_iter().map(move |port| (fqfn.clone(), port))
            })
            .collect()
    }
}
