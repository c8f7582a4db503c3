//! replay library crate — re-exports for the binary and integration tests.
//!
//! The primary interface is the `replay` binary. This lib.rs exposes the
//! internal modules so that integration tests can drive the replay loop
//! against in-process fake clients without going through the CLI.

pub mod compose;
pub mod config;
pub mod doctor;
pub mod engine;
pub mod error;
pub mod format;
pub mod git;
pub mod materialize;
pub mod model;
pub mod reconcile;
pub mod sequencer;
pub mod telemetry;
pub mod tf;
