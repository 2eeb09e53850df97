//! Test dispatch: validate a launch request and fan it out to workers
//!
//! The dispatcher turns an inbound launch request into a [`TestDescriptor`]
//! and publishes one identical message per requested worker instance. Its
//! acknowledgement reflects publishing only; query outcomes are observed by
//! the workers.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::descriptor::{derive_test_id, wait_time_from_secs, TestDescriptor};
use crate::error::{LoadError, LoadResult};
use crate::traits::{MessagePublisher, TopicPath};

/// Dispatcher-side default for `n_queries`
pub const DEFAULT_N_QUERIES: usize = 1;
/// Dispatcher-side default for `n_functions`
pub const DEFAULT_N_FUNCTIONS: usize = 1;
/// Dispatcher-side default for `concurrency`
pub const DEFAULT_CONCURRENCY: usize = 50;
/// Dispatcher-side default for `cycles`
pub const DEFAULT_CYCLES: usize = 1;
/// Dispatcher-side default for `wait_time` in seconds
pub const DEFAULT_WAIT_TIME_SECS: u64 = 40;

/// Inbound launch request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LaunchRequest {
    /// Project the queries run in (required)
    pub project_id: Option<String>,
    /// Template bucket (required)
    pub bucket_name: Option<String>,
    /// Queries per worker
    pub n_queries: Option<usize>,
    /// Worker instances to launch
    pub n_functions: Option<usize>,
    /// Queries in flight per worker
    pub concurrency: Option<usize>,
    /// Cycles per worker
    pub cycles: Option<usize>,
    /// Seconds between cycles, fractions allowed
    pub wait_time: Option<f64>,
}

impl LaunchRequest {
    /// Validate the request and build the descriptor launched at `now`
    pub fn into_descriptor(self, now: DateTime<Utc>) -> LoadResult<TestDescriptor> {
        let project_id = self
            .project_id
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| LoadError::missing_field("project_id", "http request"))?;
        let bucket_name = self
            .bucket_name
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| LoadError::missing_field("bucket_name", "http request"))?;

        let n_functions = self.n_functions.unwrap_or(DEFAULT_N_FUNCTIONS);
        if n_functions == 0 {
            return Err(LoadError::validation("n_functions must be at least 1"));
        }

        let descriptor = TestDescriptor {
            n_queries: self.n_queries.unwrap_or(DEFAULT_N_QUERIES),
            n_functions,
            test_id: derive_test_id(now, &project_id),
            bucket_name,
            concurrency: self.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
            cycles: self.cycles.unwrap_or(DEFAULT_CYCLES),
            wait_time: match self.wait_time {
                Some(secs) => wait_time_from_secs(secs)?,
                None => Duration::from_secs(DEFAULT_WAIT_TIME_SECS),
            },
            project_id,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}

/// Acknowledgement of a launched test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchAck {
    /// Generated test id
    pub test_id: String,
    /// Project the test runs in
    pub project_id: String,
    /// Ids of the published messages, one per worker instance
    pub message_ids: Vec<String>,
}

impl fmt::Display for LaunchAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Launched test with id {} on project {}.",
            self.test_id, self.project_id
        )
    }
}

/// Publishes test descriptors to the launch topic
pub struct Dispatcher {
    publisher: Arc<dyn MessagePublisher>,
    topic: TopicPath,
}

impl Dispatcher {
    /// Create a dispatcher publishing to `topic`
    pub fn new(publisher: Arc<dyn MessagePublisher>, topic: TopicPath) -> Self {
        Self { publisher, topic }
    }

    /// Target topic
    pub fn topic(&self) -> &TopicPath {
        &self.topic
    }

    /// Launch a test stamped with the current time
    pub async fn launch(&self, request: LaunchRequest) -> LoadResult<LaunchAck> {
        self.launch_at(request, Utc::now()).await
    }

    /// Launch a test stamped with `now`
    pub async fn launch_at(
        &self,
        request: LaunchRequest,
        now: DateTime<Utc>,
    ) -> LoadResult<LaunchAck> {
        let descriptor = request.into_descriptor(now)?;
        let payload = descriptor
            .to_payload()
            .map_err(|e| LoadError::validation(format!("descriptor not serializable: {e}")))?;

        tracing::info!(
            topic = %self.topic,
            test_id = %descriptor.test_id,
            payload = %String::from_utf8_lossy(&payload),
            "Sending launch message"
        );

        let mut message_ids = Vec::with_capacity(descriptor.n_functions);
        for instance in 0..descriptor.n_functions {
            let message_id = self
                .publisher
                .publish(&self.topic, &payload)
                .await
                .map_err(|source| {
                    tracing::error!(
                        topic = %self.topic,
                        test_id = %descriptor.test_id,
                        published = instance,
                        error = %source,
                        "Publishing launch message failed"
                    );
                    LoadError::Publish {
                        topic: self.topic.to_string(),
                        source,
                    }
                })?;
            tracing::info!(instance, message_id = %message_id, "Worker instance launched");
            message_ids.push(message_id);
        }

        Ok(LaunchAck {
            test_id: descriptor.test_id,
            project_id: descriptor.project_id,
            message_ids,
        })
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("topic", &self.topic.to_string())
            .finish()
    }
}
