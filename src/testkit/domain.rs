//! Builders for domain primitives used across tests.

use crate::domain::{Application, Fqfn, Runnable};

/// Build a runnable in the `default` namespace.
pub fn runnable(app: &str, version: &str, name: &str) -> Runnable {
    Runnable::new(&Application::new(app, version), "default", name)
}

/// FQFN of [`runnable`] with the same arguments.
pub fn fqfn(app: &str, version: &str, name: &str) -> Fqfn {
    runnable(app, version, name).fqfn
}
