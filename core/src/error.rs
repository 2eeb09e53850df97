//! Error types for query-bench-core

use thiserror::Error;

use crate::traits::{PublishError, StorageError};

/// Errors that terminate an invocation (dispatch or worker run)
///
/// Per-query failures are not represented here: they are recorded as
/// [`UnitOutcome`](crate::worker::UnitOutcome) values and never abort a cycle.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Missing or malformed field in a request or message payload
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or invalid process configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The template bucket could not be listed, fetched or decoded
    #[error("template bucket {bucket} unavailable: {source}")]
    StorageUnavailable {
        /// Bucket that was being loaded
        bucket: String,
        /// Underlying storage failure
        #[source]
        source: StorageError,
    },

    /// Queries were requested but the bucket holds no templates
    #[error("no query templates available")]
    NoTemplatesAvailable,

    /// A template references a placeholder its binding entry does not define
    #[error("template {template} references unbound placeholder {{{placeholder}}}")]
    UnboundPlaceholder {
        /// Template name
        template: String,
        /// Placeholder name
        placeholder: String,
    },

    /// A bound template could not be parsed as a format string
    #[error("template {template} is malformed: {reason}")]
    MalformedTemplate {
        /// Template name
        template: String,
        /// What went wrong
        reason: String,
    },

    /// Publishing a launch message failed
    #[error("failed to publish to {topic}: {source}")]
    Publish {
        /// Fully qualified topic path
        topic: String,
        /// Underlying publish failure
        #[source]
        source: PublishError,
    },
}

impl LoadError {
    /// Validation error for a required field that is absent
    pub fn missing_field(field: &str, origin: &str) -> Self {
        Self::Validation(format!("{field} not present in {origin}"))
    }

    /// Validation error with a free-form message
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Configuration error with a free-form message
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Returns true for errors caused by the caller's input
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias
pub type LoadResult<T> = std::result::Result<T, LoadError>;
