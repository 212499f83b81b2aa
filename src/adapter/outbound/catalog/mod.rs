//! Function catalog sources.
//!
//! - [`ManifestSource`] - the local, authoritative catalog read from disk
//! - [`HttpSource`] - a client of a remote control plane's catalog

mod http;
mod manifest;

pub use http::HttpSource;
pub use manifest::ManifestSource;
