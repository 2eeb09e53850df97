//! Single query execution

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::traits::{QueryEngine, QueryJob};

/// Terminal state of one query unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    /// The engine reported the job as done without errors
    Succeeded {
        /// Remote job identifier
        job_id: String,
    },
    /// The engine returned an error, or the unit's task died
    Failed {
        /// Error description
        error: String,
    },
    /// The job did not finish within the timeout
    TimedOut,
}

/// Outcome of one unit together with its position and duration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    /// Position of the query within the cycle
    pub unit: usize,
    /// Terminal state
    pub outcome: UnitOutcome,
    /// Time from submission to terminal state
    pub elapsed: Duration,
}

impl UnitReport {
    /// Report for a unit that never reached the engine
    pub fn failed(unit: usize, error: impl Into<String>) -> Self {
        Self {
            unit,
            outcome: UnitOutcome::Failed {
                error: error.into(),
            },
            elapsed: Duration::ZERO,
        }
    }
}

/// Executes one query against the engine
///
/// Units are cheap, single-use values created by the orchestrator for every
/// query of every cycle. They share the engine handle via `Arc`.
pub struct QueryUnit {
    /// Position of the query within the cycle
    id: usize,

    /// Cycle this unit belongs to
    cycle: usize,

    /// Query submission
    job: QueryJob,

    /// Query engine (shared across units)
    engine: Arc<dyn QueryEngine>,

    /// Completion timeout
    timeout: Duration,
}

impl QueryUnit {
    /// Create a new unit
    pub fn new(
        id: usize,
        cycle: usize,
        job: QueryJob,
        engine: Arc<dyn QueryEngine>,
        timeout: Duration,
    ) -> Self {
        Self {
            id,
            cycle,
            job,
            engine,
            timeout,
        }
    }

    /// Get the unit's position within its cycle
    pub fn id(&self) -> usize {
        self.id
    }

    /// Run the query to a terminal state
    pub async fn run(self) -> UnitReport {
        let test_id = self.job.labels.get("test_id").cloned().unwrap_or_default();
        let start = Instant::now();

        tracing::debug!(
            cycle = self.cycle,
            unit = self.id,
            test_id = %test_id,
            "Submitting query"
        );

        let outcome = match tokio::time::timeout(self.timeout, self.engine.execute(&self.job)).await
        {
            Ok(Ok(completion)) => {
                tracing::info!(
                    cycle = self.cycle,
                    unit = self.id,
                    test_id = %test_id,
                    project_id = %self.job.project_id,
                    job_id = %completion.job_id,
                    "Query completed"
                );
                UnitOutcome::Succeeded {
                    job_id: completion.job_id,
                }
            }
            Ok(Err(e)) => {
                tracing::error!(
                    cycle = self.cycle,
                    unit = self.id,
                    test_id = %test_id,
                    error = %e,
                    "Query failed"
                );
                UnitOutcome::Failed {
                    error: e.to_string(),
                }
            }
            Err(_) => {
                tracing::error!(
                    cycle = self.cycle,
                    unit = self.id,
                    test_id = %test_id,
                    timeout_secs = self.timeout.as_secs(),
                    "Query timed out"
                );
                UnitOutcome::TimedOut
            }
        };

        UnitReport {
            unit: self.id,
            outcome,
            elapsed: start.elapsed(),
        }
    }
}

impl std::fmt::Debug for QueryUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryUnit")
            .field("id", &self.id)
            .field("cycle", &self.cycle)
            .field("engine", &self.engine.engine_name())
            .field("timeout", &self.timeout)
            .finish()
    }
}
