//! Orchestrator for the cycle lifecycle
//!
//! The Orchestrator runs a fixed batch of resolved queries repeatedly:
//! - Spawning one unit per query, gated by a semaphore of `concurrency` permits
//! - Joining every unit before the cycle ends (full barrier)
//! - Sleeping `wait_time` between cycles, with nothing in flight
//! - Publishing its [`OrchestratorState`] on a watch channel
//!
//! # Example
//!
//! ```ignore
//! use query_bench_core::OrchestratorBuilder;
//!
//! let orchestrator = OrchestratorBuilder::new()
//!     .descriptor(&descriptor)
//!     .queries(queries)
//!     .engine(engine)
//!     .build()?;
//!
//! let summary = orchestrator.run_with_signal_handling().await;
//! ```

mod aggregator;
mod builder;
mod executor;

pub use aggregator::{aggregate_cycle_stats, AggregatedStats, CycleReport, RunSummary};
pub use builder::OrchestratorBuilder;
pub use executor::{Orchestrator, OrchestratorState};

#[cfg(test)]
mod tests;
