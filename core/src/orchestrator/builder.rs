//! Builder pattern for Orchestrator construction

use std::sync::Arc;
use std::time::Duration;

use crate::config::RunConfig;
use crate::descriptor::TestDescriptor;
use crate::error::{LoadError, LoadResult};
use crate::traits::QueryEngine;

use super::executor::Orchestrator;

/// Builder for creating an Orchestrator with proper configuration
///
/// # Example
///
/// ```ignore
/// let orchestrator = OrchestratorBuilder::new()
///     .project_id("p1")
///     .test_id("t1")
///     .concurrency(2)
///     .cycles(3)
///     .wait_time(Duration::from_secs(5))
///     .queries(vec!["SELECT 1".into()])
///     .engine(engine)
///     .build()?;
/// ```
pub struct OrchestratorBuilder {
    config: RunConfig,
    engine: Option<Arc<dyn QueryEngine>>,
    queries: Vec<String>,
    project_id: Option<String>,
    test_id: Option<String>,
}

impl OrchestratorBuilder {
    /// Create a new orchestrator builder with default configuration
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
            engine: None,
            queries: Vec::new(),
            project_id: None,
            test_id: None,
        }
    }

    /// Take project, test id and cycle settings from a descriptor
    pub fn descriptor(mut self, descriptor: &TestDescriptor) -> Self {
        self.config = descriptor.run_config();
        self.project_id = Some(descriptor.project_id.clone());
        self.test_id = Some(descriptor.test_id.clone());
        self
    }

    /// Set the full run configuration
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the concurrency level
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Set the number of cycles
    pub fn cycles(mut self, cycles: usize) -> Self {
        self.config.cycles = cycles;
        self
    }

    /// Set the inter-cycle wait
    pub fn wait_time(mut self, wait_time: Duration) -> Self {
        self.config.wait_time = wait_time;
        self
    }

    /// Set the resolved queries run in every cycle
    pub fn queries(mut self, queries: Vec<String>) -> Self {
        self.queries = queries;
        self
    }

    /// Set the project the queries run in
    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Set the test id used as the query label
    pub fn test_id(mut self, test_id: impl Into<String>) -> Self {
        self.test_id = Some(test_id.into());
        self
    }

    /// Set the query engine
    pub fn engine(mut self, engine: Arc<dyn QueryEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Build the orchestrator
    ///
    /// # Errors
    ///
    /// Returns an error if the engine, project or test id is not set, or if
    /// configuration validation fails.
    pub fn build(self) -> LoadResult<Orchestrator> {
        let engine = self
            .engine
            .ok_or_else(|| LoadError::configuration("query engine not set"))?;

        let project_id = self
            .project_id
            .ok_or_else(|| LoadError::validation("project_id not set"))?;

        let test_id = self
            .test_id
            .ok_or_else(|| LoadError::validation("test_id not set"))?;

        self.config
            .validate()
            .map_err(|e| LoadError::validation(e.to_string()))?;

        Ok(Orchestrator::new(
            self.config,
            engine,
            self.queries,
            project_id,
            test_id,
        ))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
