//! Query units: the per-query execution step of a cycle
//!
//! A [`QueryUnit`] runs exactly one resolved query against the engine and
//! always ends in a terminal [`UnitOutcome`]:
//!
//! 1. Submits the query, labelled with the test id, with caching disabled
//! 2. Waits for the engine to report completion, bounded by the fixed timeout
//! 3. Logs the result and returns it as a [`UnitReport`]
//!
//! Failures never escape as errors. The orchestrator joins every unit of a
//! cycle and folds the reports into [`CycleStats`].
//!
//! # Example
//!
//! ```ignore
//! use query_bench_core::worker::QueryUnit;
//! use query_bench_core::{QueryJob, QUERY_TIMEOUT};
//!
//! let unit = QueryUnit::new(0, 0, QueryJob::for_test("p1", "SELECT 1", "t1"), engine, QUERY_TIMEOUT);
//! let report = unit.run().await;
//! println!("{:?}", report.outcome);
//! ```

mod executor;
mod stats;

pub use executor::{QueryUnit, UnitOutcome, UnitReport};
pub use stats::CycleStats;

#[cfg(test)]
mod tests;
