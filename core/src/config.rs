//! Run configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

/// Fixed per-query completion timeout
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(120);

/// Largest concurrency the cycle semaphore can hold
pub const MAX_CONCURRENCY: usize = Semaphore::MAX_PERMITS;

/// Cycle configuration
///
/// Defines how the orchestrator repeats a batch of queries: how many may be
/// in flight at once, how many cycles run, and how long to pause between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum number of queries in flight within a cycle
    pub concurrency: usize,

    /// Number of cycles to run
    pub cycles: usize,

    /// Pause between the end of one cycle and the start of the next
    pub wait_time: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            cycles: 1,
            wait_time: Duration::ZERO,
        }
    }
}

impl RunConfig {
    /// Create a new config with the given concurrency
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            ..Default::default()
        }
    }

    /// Set the number of cycles
    pub fn with_cycles(mut self, cycles: usize) -> Self {
        self.cycles = cycles;
        self
    }

    /// Set the inter-cycle wait
    pub fn with_wait_time(mut self, wait_time: Duration) -> Self {
        self.wait_time = wait_time;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(
                "concurrency must be at least 1".into(),
            ));
        }

        if self.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::InvalidConcurrency(format!(
                "concurrency {} exceeds the maximum of {MAX_CONCURRENCY}",
                self.concurrency
            )));
        }

        if self.cycles == 0 {
            return Err(ConfigError::InvalidCycles(
                "cycles must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid concurrency value
    #[error("Invalid concurrency: {0}")]
    InvalidConcurrency(String),

    /// Invalid cycle count
    #[error("Invalid cycles: {0}")]
    InvalidCycles(String),
}
