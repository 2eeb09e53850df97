//! query-bench: distributed load generation for BigQuery
//!
//! A dispatcher publishes one launch message per worker instance; each
//! worker loads the query templates of a bucket, resolves a batch of
//! queries and runs it in timed, concurrency-bounded cycles.
//!
//! This crate wires the component crates together:
//!
//! - [`launch`]: the worker invocation pipeline
//! - [`server`]: axum routers for the dispatcher and worker endpoints
//! - [`settings`]: startup configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod launch;
pub mod server;
pub mod settings;

#[cfg(test)]
mod testing;

pub use launch::Launcher;
pub use settings::DispatcherSettings;
