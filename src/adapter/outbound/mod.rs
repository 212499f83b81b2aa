//! Outbound adapters (driven side).

pub mod catalog;
pub mod command;
pub mod process;
