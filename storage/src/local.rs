//! Local directory template store
//!
//! A bucket is a subdirectory of the store root. Every regular file below it
//! is one template, named by its path relative to the bucket directory with
//! `/` separators, mirroring object names.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use query_bench_core::{QueryTemplates, StorageError, TemplateStore};

/// Loads templates from the local filesystem
#[derive(Debug, Clone)]
pub struct LocalTemplateStore {
    root: PathBuf,
}

impl LocalTemplateStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(bucket);
        let single_segment = matches!(
            relative.components().collect::<Vec<_>>().as_slice(),
            [Component::Normal(_)]
        );
        if !single_segment {
            return Err(StorageError::NotFound(bucket.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn object_name(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

#[async_trait]
impl TemplateStore for LocalTemplateStore {
    fn store_name(&self) -> &str {
        "local"
    }

    async fn load_all(&self, bucket: &str) -> Result<QueryTemplates, StorageError> {
        let base = self.bucket_dir(bucket)?;
        if !tokio::fs::metadata(&base)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(StorageError::NotFound(bucket.to_string()));
        }

        let mut templates = Vec::new();
        let mut pending = vec![base.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;

                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }

                let name = object_name(&base, &path).ok_or_else(|| StorageError::Decode {
                    object: path.display().to_string(),
                    reason: "file name is not valid UTF-8".to_string(),
                })?;
                let bytes = tokio::fs::read(&path).await?;
                let body = String::from_utf8(bytes).map_err(|e| StorageError::Decode {
                    object: name.clone(),
                    reason: e.to_string(),
                })?;
                templates.push((name, body));
            }
        }

        tracing::debug!(
            bucket,
            root = %self.root.display(),
            templates = templates.len(),
            "Loaded local templates"
        );

        Ok(templates.into_iter().collect())
    }
}
