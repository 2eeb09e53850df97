//! query-bench-core: Core data structures for BigQuery load generation
//!
//! This crate provides the foundational types used across all query-bench components,
//! including:
//!
//! - The test descriptor carried from dispatcher to workers
//! - Core traits (QueryEngine, TemplateStore, MessagePublisher)
//! - The cycle orchestrator and per-query units
//! - Error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod orchestrator;
pub mod template;
pub mod traits;
pub mod worker;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, RunConfig, MAX_CONCURRENCY, QUERY_TIMEOUT};
pub use descriptor::{derive_test_id, TestDescriptor};
pub use dispatch::{Dispatcher, LaunchAck, LaunchRequest};
pub use error::*;
pub use orchestrator::{
    AggregatedStats, CycleReport, Orchestrator, OrchestratorBuilder, OrchestratorState,
    RunSummary,
};
pub use template::{QueryTemplate, QueryTemplates};
pub use traits::*;
pub use worker::{CycleStats, QueryUnit, UnitOutcome, UnitReport};
