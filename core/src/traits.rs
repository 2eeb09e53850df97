//! Core traits for the query engine, template storage and message publishing
//!
//! These traits are defined in core to avoid circular dependencies.
//! Implementations live in their respective crates (vendors/, storage/).

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::template::QueryTemplates;

// ============================================================================
// Query Engine Trait
// ============================================================================

/// Executes one query job and waits for it to finish
///
/// Implementations submit the job, then block (asynchronously) until the remote
/// engine reports a terminal state. The orchestrator bounds the whole call with
/// its own timeout, so implementations need not enforce one.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Engine identifier (e.g., "bigquery")
    fn engine_name(&self) -> &str;

    /// Run the job to completion
    async fn execute(&self, job: &QueryJob) -> Result<QueryCompletion, EngineError>;
}

/// A query submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryJob {
    /// Project billed for the query
    pub project_id: String,
    /// SQL text with every placeholder already resolved
    pub sql: String,
    /// Labels attached to the remote job
    pub labels: BTreeMap<String, String>,
    /// Whether the engine may answer from its result cache
    pub use_query_cache: bool,
}

impl QueryJob {
    /// Create a job with caching disabled and no labels
    pub fn new(project_id: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            sql: sql.into(),
            labels: BTreeMap::new(),
            use_query_cache: false,
        }
    }

    /// Create a job labelled with the test id
    pub fn for_test(project_id: &str, sql: &str, test_id: &str) -> Self {
        Self::new(project_id, sql).with_label("test_id", test_id)
    }

    /// Add a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Successful completion of a query job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCompletion {
    /// Remote job identifier
    pub job_id: String,
}

/// Query engine errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Network or protocol failure before the engine answered
    #[error("transport error: {0}")]
    Transport(String),

    /// The engine rejected a request
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// The job ran and finished with an error
    #[error("job {job_id} failed: {message}")]
    JobFailed {
        /// Remote job identifier
        job_id: String,
        /// Error message reported by the engine
        message: String,
    },

    /// The engine answered with an unexpected body
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The job did not finish in time
    #[error("query timed out after {0:?}")]
    Timeout(Duration),
}

// ============================================================================
// Template Store Trait
// ============================================================================

/// Loads every query template held in a bucket
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Store identifier (e.g., "gcs", "local")
    fn store_name(&self) -> &str;

    /// Load every object of the bucket as a UTF-8 template
    ///
    /// Either the whole set loads or the call fails; there are no partial
    /// results and no retries.
    async fn load_all(&self, bucket: &str) -> Result<QueryTemplates, StorageError>;
}

/// Template storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Network or protocol failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The storage service rejected a request
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// An object is not valid UTF-8 text
    #[error("object {object} is not valid UTF-8: {reason}")]
    Decode {
        /// Object name
        object: String,
        /// Decoder message
        reason: String,
    },

    /// The bucket does not exist
    #[error("bucket not found: {0}")]
    NotFound(String),

    /// A listed object could not be downloaded
    #[error("object not found: {bucket}/{object}")]
    ObjectNotFound {
        /// Bucket name
        bucket: String,
        /// Object name
        object: String,
    },

    /// IO error (local stores)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Message Publisher Trait
// ============================================================================

/// Publishes raw messages to a topic
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publish one message and return its server-assigned id
    async fn publish(&self, topic: &TopicPath, data: &[u8]) -> Result<String, PublishError>;
}

/// Fully qualified topic name: `projects/<project>/topics/<topic>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPath {
    /// Project owning the topic
    pub project: String,
    /// Topic name within the project
    pub topic: String,
}

impl TopicPath {
    /// Create a topic path
    pub fn new(project: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            topic: topic.into(),
        }
    }
}

impl fmt::Display for TopicPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "projects/{}/topics/{}", self.project, self.topic)
    }
}

/// Publishing errors
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Network or protocol failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The messaging service rejected the request
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// The service answered with an unexpected body
    #[error("unexpected response: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_job_for_test() {
        let job = QueryJob::for_test("p1", "SELECT 1", "t1");
        assert_eq!(job.project_id, "p1");
        assert_eq!(job.sql, "SELECT 1");
        assert_eq!(job.labels.get("test_id").map(String::as_str), Some("t1"));
        assert!(!job.use_query_cache);
    }

    #[test]
    fn test_topic_path_display() {
        let topic = TopicPath::new("admin", "launch_queries");
        assert_eq!(topic.to_string(), "projects/admin/topics/launch_queries");
    }

    #[test]
    fn test_engine_error_messages() {
        let err = EngineError::JobFailed {
            job_id: "job_1".into(),
            message: "Syntax error".into(),
        };
        assert_eq!(err.to_string(), "job job_1 failed: Syntax error");

        let err = EngineError::Timeout(Duration::from_secs(120));
        assert!(err.to_string().contains("120s"));
    }
}
