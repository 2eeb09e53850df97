//! Worker invocation pipeline
//!
//! One invocation runs one validated descriptor:
//!
//! 1. Load every template of the bucket
//! 2. Select and resolve `n_queries` queries
//! 3. Run the cycles and return the summary

use std::sync::Arc;

use query_bench_core::{
    LoadError, LoadResult, Orchestrator, OrchestratorBuilder, QueryEngine, RunSummary,
    TemplateStore, TestDescriptor,
};
use query_bench_samplers::QuerySelector;

/// Runs launch messages against a template store and a query engine
#[derive(Clone)]
pub struct Launcher {
    store: Arc<dyn TemplateStore>,
    engine: Arc<dyn QueryEngine>,
    selector: QuerySelector,
}

impl Launcher {
    /// Create a launcher
    pub fn new(
        store: Arc<dyn TemplateStore>,
        engine: Arc<dyn QueryEngine>,
        selector: QuerySelector,
    ) -> Self {
        Self {
            store,
            engine,
            selector,
        }
    }

    /// Run a validated descriptor to completion
    ///
    /// # Errors
    ///
    /// `StorageUnavailable` when the bucket cannot be loaded, and the
    /// selection errors. Query failures are part of the returned summary, not
    /// errors.
    pub async fn run(&self, descriptor: &TestDescriptor) -> LoadResult<RunSummary> {
        let orchestrator = self.prepare(descriptor).await?;
        Ok(orchestrator.run().await)
    }

    /// Load, select and build the orchestrator without running it
    pub async fn prepare(&self, descriptor: &TestDescriptor) -> LoadResult<Orchestrator> {
        tracing::info!(
            test_id = %descriptor.test_id,
            project_id = %descriptor.project_id,
            bucket_name = %descriptor.bucket_name,
            n_queries = descriptor.n_queries,
            concurrency = descriptor.concurrency,
            cycles = descriptor.cycles,
            wait_time_secs = descriptor.wait_time.as_secs_f64(),
            store = self.store.store_name(),
            "Run queries"
        );

        let templates = self
            .store
            .load_all(&descriptor.bucket_name)
            .await
            .map_err(|source| LoadError::StorageUnavailable {
                bucket: descriptor.bucket_name.clone(),
                source,
            })?;
        tracing::info!(
            test_id = %descriptor.test_id,
            templates = templates.len(),
            "Templates loaded"
        );
        tracing::debug!(
            test_id = %descriptor.test_id,
            names = ?templates.names().collect::<Vec<_>>(),
            "Template names"
        );

        let queries = self.selector.select(&templates, descriptor.n_queries)?;

        OrchestratorBuilder::new()
            .descriptor(descriptor)
            .queries(queries)
            .engine(Arc::clone(&self.engine))
            .build()
    }
}

impl std::fmt::Debug for Launcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Launcher")
            .field("store", &self.store.store_name())
            .field("engine", &self.engine.engine_name())
            .field("selector", &self.selector)
            .finish()
    }
}
