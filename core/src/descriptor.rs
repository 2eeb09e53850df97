//! Test descriptor carried from the dispatcher to every worker

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::error::{LoadError, LoadResult};

/// Consumer-side default for `n_queries`
pub const DEFAULT_N_QUERIES: usize = 1;
/// Consumer-side default for `n_functions`
pub const DEFAULT_N_FUNCTIONS: usize = 1;
/// Consumer-side default for `concurrency`
pub const DEFAULT_CONCURRENCY: usize = 10;
/// Consumer-side default for `cycles`
pub const DEFAULT_CYCLES: usize = 1;
/// Consumer-side default for `wait_time` in seconds
pub const DEFAULT_WAIT_TIME_SECS: u64 = 0;

/// A fully specified load test
///
/// Serialized as the JSON message body published by the dispatcher. Field
/// order matches the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDescriptor {
    /// Queries selected per worker invocation
    pub n_queries: usize,
    /// Worker invocations launched for this test
    pub n_functions: usize,
    /// Bucket holding the query templates
    pub bucket_name: String,
    /// Maximum queries in flight per worker
    pub concurrency: usize,
    /// Cycles each worker runs
    pub cycles: usize,
    /// Pause between cycles, carried as (possibly fractional) seconds
    #[serde(with = "wait_secs")]
    pub wait_time: Duration,
    /// Correlation id attached to every query as a label
    pub test_id: String,
    /// Project the queries run in
    pub project_id: String,
}

/// Message body as it arrives, before validation
#[derive(Debug, Default, Deserialize)]
struct MessagePayload {
    n_queries: Option<usize>,
    n_functions: Option<usize>,
    bucket_name: Option<String>,
    concurrency: Option<usize>,
    cycles: Option<usize>,
    wait_time: Option<f64>,
    test_id: Option<String>,
    project_id: Option<String>,
}

impl TestDescriptor {
    /// Parse and validate a message payload
    ///
    /// `project_id`, `bucket_name` and `test_id` are required; the remaining
    /// fields fall back to the consumer-side defaults.
    pub fn from_payload(data: &[u8]) -> LoadResult<Self> {
        let payload: MessagePayload = serde_json::from_slice(data)
            .map_err(|e| LoadError::validation(format!("message payload is not valid JSON: {e}")))?;

        let project_id = required(payload.project_id, "project_id")?;
        let bucket_name = required(payload.bucket_name, "bucket_name")?;
        let test_id = required(payload.test_id, "test_id")?;
        let wait_time = match payload.wait_time {
            Some(secs) => wait_time_from_secs(secs)?,
            None => Duration::from_secs(DEFAULT_WAIT_TIME_SECS),
        };

        let descriptor = Self {
            n_queries: payload.n_queries.unwrap_or(DEFAULT_N_QUERIES),
            n_functions: payload.n_functions.unwrap_or(DEFAULT_N_FUNCTIONS),
            bucket_name,
            concurrency: payload.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
            cycles: payload.cycles.unwrap_or(DEFAULT_CYCLES),
            wait_time,
            test_id,
            project_id,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Serialize to the message wire format
    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Cycle configuration for the orchestrator
    pub fn run_config(&self) -> RunConfig {
        RunConfig::new(self.concurrency)
            .with_cycles(self.cycles)
            .with_wait_time(self.wait_time)
    }

    /// Check the numeric fields
    pub fn validate(&self) -> LoadResult<()> {
        self.run_config()
            .validate()
            .map_err(|e| LoadError::validation(e.to_string()))
    }
}

fn required(value: Option<String>, field: &str) -> LoadResult<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(LoadError::missing_field(field, "event")),
    }
}

/// Convert a `wait_time` in seconds, rejecting negative and non-finite values
pub(crate) fn wait_time_from_secs(secs: f64) -> LoadResult<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| LoadError::validation(format!("invalid wait_time {secs}: {e}")))
}

/// Whole seconds go on the wire as integers, fractions as floats
mod wait_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(wait: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        if wait.subsec_nanos() == 0 {
            serializer.serialize_u64(wait.as_secs())
        } else {
            serializer.serialize_f64(wait.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Derive a test id from the launch time and project
///
/// Minute resolution: two launches for the same project within one minute
/// share an id.
pub fn derive_test_id(now: DateTime<Utc>, project_id: &str) -> String {
    format!("{}_{}", now.format("%Y_%m_%d_%H_%M"), project_id)
}
