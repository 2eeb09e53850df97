//! In-memory template store

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use query_bench_core::{QueryTemplates, StorageError, TemplateStore};

/// Serves fixed buckets from memory and counts loads
#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
    buckets: HashMap<String, QueryTemplates>,
    loads: AtomicUsize,
}

impl MemoryTemplateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bucket
    pub fn with_bucket(mut self, bucket: impl Into<String>, templates: QueryTemplates) -> Self {
        self.buckets.insert(bucket.into(), templates);
        self
    }

    /// Number of `load_all` calls so far, failed ones included
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    fn store_name(&self) -> &str {
        "memory"
    }

    async fn load_all(&self, bucket: &str) -> Result<QueryTemplates, StorageError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.buckets
            .get(bucket)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(bucket.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store() {
        let templates: QueryTemplates = [("q1.sql".to_string(), "SELECT 1".to_string())]
            .into_iter()
            .collect();
        let store = MemoryTemplateStore::new().with_bucket("b1", templates.clone());

        assert_eq!(store.load_all("b1").await.unwrap(), templates);
        assert!(matches!(
            store.load_all("b2").await,
            Err(StorageError::NotFound(_))
        ));
        assert_eq!(store.load_count(), 2);
    }
}
