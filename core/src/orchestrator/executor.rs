//! Orchestrator execution logic

use std::sync::Arc;

use tokio::sync::{broadcast, watch, Semaphore};
use tokio::time::Instant;

use crate::config::{RunConfig, QUERY_TIMEOUT};
use crate::traits::{QueryEngine, QueryJob};
use crate::worker::{CycleStats, QueryUnit, UnitReport};

use super::aggregator::{CycleReport, RunSummary};

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    /// Built, not started
    Idle,
    /// Units of this cycle are in flight
    Running {
        /// Cycle index
        cycle: usize,
    },
    /// Barrier of this cycle passed, sleeping before the next one
    Waiting {
        /// Index of the cycle that just finished
        cycle: usize,
    },
    /// No further cycles will run
    Done,
}

/// Orchestrator manages the cycle lifecycle
///
/// Responsible for spawning query units, enforcing the cycle barrier,
/// pacing cycles, and collecting reports.
pub struct Orchestrator {
    /// Run configuration
    pub(crate) config: RunConfig,

    /// Query engine (shared across units)
    pub(crate) engine: Arc<dyn QueryEngine>,

    /// Resolved queries submitted in every cycle
    pub(crate) queries: Arc<[String]>,

    /// Project the queries run in
    pub(crate) project_id: String,

    /// Label attached to every query
    pub(crate) test_id: String,

    /// Concurrency limiter
    pub(crate) semaphore: Arc<Semaphore>,

    /// Shutdown signal sender
    pub(crate) shutdown_tx: broadcast::Sender<()>,

    /// Current lifecycle state
    pub(crate) state_tx: watch::Sender<OrchestratorState>,
}

impl Orchestrator {
    /// Create a new orchestrator
    ///
    /// Use `OrchestratorBuilder` for a more ergonomic construction.
    pub fn new(
        config: RunConfig,
        engine: Arc<dyn QueryEngine>,
        queries: Vec<String>,
        project_id: String,
        test_id: String,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.concurrency));
        let (shutdown_tx, _) = broadcast::channel(1);
        let (state_tx, _) = watch::channel(OrchestratorState::Idle);

        Self {
            config,
            engine,
            queries: queries.into(),
            project_id,
            test_id,
            semaphore,
            shutdown_tx,
            state_tx,
        }
    }

    /// Request shutdown
    ///
    /// In-flight units are never cancelled: the current cycle runs to its
    /// barrier and no further cycle starts.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Watch the lifecycle state
    pub fn state(&self) -> watch::Receiver<OrchestratorState> {
        self.state_tx.subscribe()
    }

    /// Get the run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Get the queries submitted in every cycle
    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    /// Run every cycle
    ///
    /// Returns the per-cycle reports. Query failures are recorded in the
    /// reports; they never stop the run.
    pub async fn run(&self) -> RunSummary {
        let mut shutdown = self.shutdown_tx.subscribe();
        let mut summary = RunSummary::new(self.test_id.clone());
        let start = Instant::now();

        tracing::info!(
            test_id = %self.test_id,
            project_id = %self.project_id,
            n_queries = self.queries.len(),
            concurrency = self.config.concurrency,
            cycles = self.config.cycles,
            wait_time_secs = self.config.wait_time.as_secs_f64(),
            engine = self.engine.engine_name(),
            "Starting run"
        );

        for cycle in 0..self.config.cycles {
            self.state_tx.send_replace(OrchestratorState::Running { cycle });
            tracing::info!(test_id = %self.test_id, cycle, "Starting cycle");

            let report = self.run_cycle(cycle).await;
            tracing::info!(
                test_id = %self.test_id,
                cycle,
                succeeded = report.stats.succeeded,
                failed = report.stats.failed,
                timed_out = report.stats.timed_out,
                elapsed_ms = ?report.stats.elapsed().map(|d| d.as_millis()),
                "Cycle completed"
            );
            summary.cycles.push(report);

            if cycle + 1 < self.config.cycles {
                self.state_tx.send_replace(OrchestratorState::Waiting { cycle });
                tokio::select! {
                    biased;

                    _ = shutdown.recv() => {
                        tracing::info!(
                            test_id = %self.test_id,
                            completed_cycles = cycle + 1,
                            "Shutdown requested, skipping remaining cycles"
                        );
                        summary.interrupted = true;
                        break;
                    }

                    _ = tokio::time::sleep(self.config.wait_time) => {}
                }
            }
        }

        self.state_tx.send_replace(OrchestratorState::Done);

        let aggregated = summary.aggregate();
        tracing::info!(
            test_id = %self.test_id,
            elapsed_secs = start.elapsed().as_secs_f64(),
            cycles = aggregated.total_cycles,
            succeeded = aggregated.total_succeeded,
            failed = aggregated.total_failed,
            timed_out = aggregated.total_timed_out,
            qps = aggregated.queries_per_second,
            "Run completed"
        );

        summary
    }

    /// Run one cycle: submit every query, then join all units
    async fn run_cycle(&self, cycle: usize) -> CycleReport {
        let mut stats = CycleStats::new(cycle);
        stats.start();

        let mut handles = Vec::with_capacity(self.queries.len());
        for (unit_id, sql) in self.queries.iter().enumerate() {
            let unit = QueryUnit::new(
                unit_id,
                cycle,
                QueryJob::for_test(&self.project_id, sql, &self.test_id),
                Arc::clone(&self.engine),
                QUERY_TIMEOUT,
            );
            let semaphore = Arc::clone(&self.semaphore);

            handles.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return UnitReport::failed(unit.id(), "concurrency pool closed");
                };
                unit.run().await
            }));
        }

        // Barrier: every unit reaches a terminal state before the cycle ends
        let mut units = Vec::with_capacity(handles.len());
        for (unit_id, handle) in handles.into_iter().enumerate() {
            let report = match handle.await {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(
                        test_id = %self.test_id,
                        cycle,
                        unit = unit_id,
                        error = %e,
                        "Query unit panicked"
                    );
                    UnitReport::failed(unit_id, format!("unit task failed: {e}"))
                }
            };
            stats.record(&report.outcome);
            units.push(report);
        }

        stats.stop();
        CycleReport { stats, units }
    }

    /// Run with Ctrl+C signal handling
    ///
    /// Ctrl+C stops the run at the next cycle boundary.
    pub async fn run_with_signal_handling(&self) -> RunSummary {
        let shutdown_tx = self.shutdown_tx.clone();

        // Spawn signal handler task
        let signal_handle = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Received Ctrl+C, stopping after the current cycle...");
                    let _ = shutdown_tx.send(());
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                }
            }
        });

        let summary = self.run().await;

        // Abort signal handler if still running
        signal_handle.abort();

        summary
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("engine", &self.engine.engine_name())
            .field("queries", &self.queries.len())
            .field("project_id", &self.project_id)
            .field("test_id", &self.test_id)
            .finish()
    }
}
