//! Query selection

use query_bench_core::{LoadError, LoadResult, QueryTemplates};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::bindings::ParameterResolver;

/// Produces the batch of ready-to-run queries for an invocation
#[derive(Debug, Clone, Default)]
pub struct QuerySelector {
    resolver: ParameterResolver,
}

impl QuerySelector {
    /// Create a selector resolving through `resolver`
    pub fn new(resolver: ParameterResolver) -> Self {
        Self { resolver }
    }

    /// Select `count` resolved queries, picking templates uniformly with replacement
    pub fn select(&self, templates: &QueryTemplates, count: usize) -> LoadResult<Vec<String>> {
        self.select_with_rng(templates, count, &mut rand::thread_rng())
    }

    /// Same as [`select`](Self::select) with a caller-supplied random source
    pub fn select_with_rng<R: Rng + ?Sized>(
        &self,
        templates: &QueryTemplates,
        count: usize,
        rng: &mut R,
    ) -> LoadResult<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let candidates = templates.as_slice();
        if candidates.is_empty() {
            return Err(LoadError::NoTemplatesAvailable);
        }

        let queries = (0..count)
            .map(|_| {
                let template = candidates
                    .choose(rng)
                    .ok_or(LoadError::NoTemplatesAvailable)?;
                self.resolver.resolve(&template.name, &template.body)
            })
            .collect::<LoadResult<Vec<_>>>()?;

        tracing::debug!(
            templates = candidates.len(),
            selected = queries.len(),
            "Selected queries"
        );

        Ok(queries)
    }
}
