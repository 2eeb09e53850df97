//! Cloud Storage template store (JSON API)

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use query_bench_core::{QueryTemplates, StorageError, TemplateStore};
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;

/// Production JSON API endpoint
pub const DEFAULT_GCS_BASE_URL: &str = "https://storage.googleapis.com/storage/v1";

/// Object downloads in flight per `load_all`
const MAX_CONCURRENT_DOWNLOADS: usize = 16;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectList {
    #[serde(default)]
    items: Vec<ObjectItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectItem {
    name: String,
}

/// Loads templates from a Cloud Storage bucket
#[derive(Debug, Clone)]
pub struct GcsTemplateStore {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl GcsTemplateStore {
    /// Create a store against the production endpoint
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_GCS_BASE_URL.to_string(),
            access_token: None,
        }
    }

    /// Override the endpoint (emulators, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Send a bearer token with every request
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    fn url(&self, segments: &[&str]) -> Result<Url, StorageError> {
        let invalid = |reason: &str| {
            StorageError::Transport(format!("invalid base URL {}: {reason}", self.base_url))
        };

        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(&e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// List every object name, following pagination
    async fn list(&self, bucket: &str) -> Result<Vec<String>, StorageError> {
        let url = self.url(&["b", bucket, "o"])?;
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(url.clone());
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = self
                .authorize(request)
                .send()
                .await
                .map_err(|e| StorageError::Transport(e.to_string()))?;
            let response =
                check_status(response, || StorageError::NotFound(bucket.to_string())).await?;
            let page: ObjectList = response
                .json()
                .await
                .map_err(|e| StorageError::Transport(format!("invalid object listing: {e}")))?;

            names.extend(page.items.into_iter().map(|item| item.name));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(names)
    }

    /// Download one object as UTF-8 text
    async fn fetch(&self, bucket: &str, name: &str) -> Result<String, StorageError> {
        let mut url = self.url(&["b", bucket, "o", name])?;
        url.query_pairs_mut().append_pair("alt", "media");

        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;
        let response = check_status(response, || StorageError::ObjectNotFound {
            bucket: bucket.to_string(),
            object: name.to_string(),
        })
        .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        String::from_utf8(bytes.to_vec()).map_err(|e| StorageError::Decode {
            object: name.to_string(),
            reason: e.to_string(),
        })
    }
}

async fn check_status(
    response: reqwest::Response,
    not_found: impl FnOnce() -> StorageError,
) -> Result<reqwest::Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(not_found());
    }

    let message = response.text().await.unwrap_or_default();
    Err(StorageError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl TemplateStore for GcsTemplateStore {
    fn store_name(&self) -> &str {
        "gcs"
    }

    async fn load_all(&self, bucket: &str) -> Result<QueryTemplates, StorageError> {
        let names = self.list(bucket).await?;
        tracing::debug!(bucket, objects = names.len(), "Listed template objects");

        let templates: Vec<(String, String)> = futures::stream::iter(names)
            .map(|name| async move {
                let body = self.fetch(bucket, &name).await?;
                Ok::<_, StorageError>((name, body))
            })
            .buffer_unordered(MAX_CONCURRENT_DOWNLOADS)
            .try_collect()
            .await?;

        Ok(templates.into_iter().collect())
    }
}
