//! Per-cycle statistics

use std::time::Duration;

use tokio::time::Instant;

use super::executor::UnitOutcome;

/// Counts and timing of one cycle
#[derive(Debug, Default, Clone)]
pub struct CycleStats {
    /// Cycle index
    pub cycle: usize,

    /// Units that succeeded
    pub succeeded: usize,

    /// Units that failed with an error
    pub failed: usize,

    /// Units that hit the timeout
    pub timed_out: usize,

    /// When the first unit was submitted
    pub started_at: Option<Instant>,

    /// When the barrier completed
    pub ended_at: Option<Instant>,
}

impl CycleStats {
    /// Create new empty stats for a cycle
    pub fn new(cycle: usize) -> Self {
        Self {
            cycle,
            ..Default::default()
        }
    }

    /// Start tracking (records start time)
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Stop tracking (records end time)
    pub fn stop(&mut self) {
        self.ended_at = Some(Instant::now());
    }

    /// Record a unit's terminal state
    pub fn record(&mut self, outcome: &UnitOutcome) {
        match outcome {
            UnitOutcome::Succeeded { .. } => self.succeeded += 1,
            UnitOutcome::Failed { .. } => self.failed += 1,
            UnitOutcome::TimedOut => self.timed_out += 1,
        }
    }

    /// Units that reached a terminal state
    pub fn total_units(&self) -> usize {
        self.succeeded + self.failed + self.timed_out
    }

    /// Units that did not succeed
    pub fn unsuccessful(&self) -> usize {
        self.failed + self.timed_out
    }

    /// Success rate (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.total_units() == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.total_units() as f64
        }
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|start| {
            self.ended_at
                .map(|end| end.duration_since(start))
                .unwrap_or_else(|| start.elapsed())
        })
    }

    /// Queries per second over the cycle
    pub fn queries_per_second(&self) -> f64 {
        self.elapsed()
            .map(|d| {
                let secs = d.as_secs_f64();
                if secs > 0.0 {
                    self.total_units() as f64 / secs
                } else {
                    0.0
                }
            })
            .unwrap_or(0.0)
    }

    /// Merge counts from another cycle
    pub fn merge(&mut self, other: &CycleStats) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.timed_out += other.timed_out;
    }
}
