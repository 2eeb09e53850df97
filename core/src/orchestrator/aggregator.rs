//! Result aggregation across cycles

use std::time::Duration;

use crate::worker::{CycleStats, UnitReport};

/// Everything one cycle produced
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Counts and timing
    pub stats: CycleStats,

    /// Per-unit outcomes, in query order
    pub units: Vec<UnitReport>,
}

/// Outcome of a whole orchestrator run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Test id the queries were labelled with
    pub test_id: String,

    /// Reports of the cycles that ran, in order
    pub cycles: Vec<CycleReport>,

    /// Whether a shutdown request stopped the run before its last cycle
    pub interrupted: bool,
}

impl RunSummary {
    /// Create an empty summary
    pub fn new(test_id: impl Into<String>) -> Self {
        Self {
            test_id: test_id.into(),
            ..Default::default()
        }
    }

    /// Number of cycles that completed their barrier
    pub fn completed_cycles(&self) -> usize {
        self.cycles.len()
    }

    /// Aggregate counts over every cycle
    pub fn aggregate(&self) -> AggregatedStats {
        let stats: Vec<CycleStats> = self.cycles.iter().map(|c| c.stats.clone()).collect();
        aggregate_cycle_stats(&stats)
    }
}

/// Aggregated statistics from all cycles
#[derive(Debug, Clone, Default)]
pub struct AggregatedStats {
    /// Number of cycles
    pub total_cycles: usize,

    /// Units that succeeded
    pub total_succeeded: usize,

    /// Units that failed with an error
    pub total_failed: usize,

    /// Units that timed out
    pub total_timed_out: usize,

    /// Sum of the cycles' durations (inter-cycle waits excluded)
    pub busy_duration: Duration,

    /// Overall queries per second while cycles were running
    pub queries_per_second: f64,
}

impl AggregatedStats {
    /// Get the total number of units
    pub fn total_units(&self) -> usize {
        self.total_succeeded + self.total_failed + self.total_timed_out
    }

    /// Get the success rate (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        let total = self.total_units();
        if total > 0 {
            self.total_succeeded as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Get the failure rate (0.0 - 1.0), timeouts included
    pub fn failure_rate(&self) -> f64 {
        if self.total_units() == 0 {
            0.0
        } else {
            1.0 - self.success_rate()
        }
    }
}

/// Aggregate statistics from multiple cycles
pub fn aggregate_cycle_stats(stats: &[CycleStats]) -> AggregatedStats {
    if stats.is_empty() {
        return AggregatedStats::default();
    }

    let mut totals = CycleStats::default();
    for cycle in stats {
        totals.merge(cycle);
    }

    let busy_duration: Duration = stats.iter().filter_map(|s| s.elapsed()).sum();
    let secs = busy_duration.as_secs_f64();
    let queries_per_second = if secs > 0.0 {
        totals.total_units() as f64 / secs
    } else {
        0.0
    };

    AggregatedStats {
        total_cycles: stats.len(),
        total_succeeded: totals.succeeded,
        total_failed: totals.failed,
        total_timed_out: totals.timed_out,
        busy_duration,
        queries_per_second,
    }
}
