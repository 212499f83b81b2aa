//! In-memory catalog.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{Application, Runnable};
use crate::error::{Error, Result};
use crate::port::AppSource;

#[derive(Debug, Default)]
struct State {
    apps: Vec<(Application, Vec<Runnable>)>,
    failing: bool,
}

/// Catalog whose contents tests change between ticks.
#[derive(Debug, Default)]
pub struct StaticSource {
    state: Mutex<State>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`add`](Self::add).
    #[must_use]
    pub fn with_function(self, app: &str, version: &str, name: &str) -> Self {
        self.add(app, version, name);
        self
    }

    /// Add function `name` to application `app@version`, creating the
    /// application if needed.
    pub fn add(&self, app: &str, version: &str, name: &str) {
        let mut state = self.state.lock();
        let application = Application::new(app, version);
        let runnable = Runnable::new(&application, "default", name);
        match state.apps.iter_mut().find(|(a, _)| *a == application) {
            Some((_, runnables)) => runnables.push(runnable),
            None => state.apps.push((application, vec![runnable])),
        }
    }

    /// Drop every application.
    pub fn clear(&self) {
        self.state.lock().apps.clear();
    }

    /// Make every query fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }
}

#[async_trait]
impl AppSource for StaticSource {
    async fn applications(&self) -> Result<Vec<Application>> {
        let state = self.state.lock();
        if state.failing {
            return Err(Error::Catalog("static source set to fail".into()));
        }
        Ok(state.apps.iter().map(|(a, _)| a.clone()).collect())
    }

    async fn runnables(&self, identifier: &str, version: &str) -> Result<Vec<Runnable>> {
        let state = self.state.lock();
        if state.failing {
            return Err(Error::Catalog("static source set to fail".into()));
        }
        Ok(state
            .apps
            .iter()
            .find(|(a, _)| a.identifier == identifier && a.version == version)
            .map(|(_, r)| r.clone())
            .unwrap_or_default())
    }
}
