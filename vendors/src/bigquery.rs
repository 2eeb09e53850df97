//! BigQuery query engine over the v2 REST API
//!
//! A query is submitted with `jobs.insert` and then polled with `jobs.get`
//! until the job reports `DONE`. A `DONE` job carrying an `errorResult`
//! is a failed query.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use query_bench_core::{EngineError, QueryCompletion, QueryEngine, QueryJob};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{EndpointConfig, Service};
use crate::http::{api_error_message, authorize, endpoint_url};

/// Production REST endpoint
pub const DEFAULT_BIGQUERY_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Delay between `jobs.get` polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Longest label value BigQuery accepts
const MAX_LABEL_LEN: usize = 63;

/// Map a value onto the BigQuery label alphabet
///
/// Lowercases, replaces anything outside `[a-z0-9_-]` with `_` and truncates
/// to 63 characters.
pub fn sanitize_label(value: &str) -> String {
    value
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_LABEL_LEN)
        .collect()
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct InsertJobRequest<'a> {
    configuration: JobConfiguration<'a>,
}

#[derive(Debug, Serialize)]
struct JobConfiguration<'a> {
    query: QueryConfiguration<'a>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryConfiguration<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    use_query_cache: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Job {
    job_reference: JobReference,
    #[serde(default)]
    status: JobStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    #[serde(default)]
    state: String,
    error_result: Option<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    reason: Option<String>,
    message: Option<String>,
}

impl ErrorProto {
    fn describe(&self) -> String {
        match (&self.reason, &self.message) {
            (Some(reason), Some(message)) => format!("{reason}: {message}"),
            (None, Some(message)) => message.clone(),
            (Some(reason), None) => reason.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// BigQuery client implementing [`QueryEngine`]
#[derive(Debug, Clone)]
pub struct BigQueryClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
    poll_interval: Duration,
}

impl BigQueryClient {
    /// Create a client against the production endpoint
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BIGQUERY_BASE_URL.to_string(),
            access_token: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Create a client from endpoint configuration
    pub fn from_config(client: Client, config: &EndpointConfig) -> Self {
        let engine = Self::new(client)
            .with_base_url(config.base_url(Service::BigQuery))
            .with_poll_interval(config.poll_interval);
        match &config.access_token {
            Some(token) => engine.with_access_token(token),
            None => engine,
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

    /// Set the delay between completion polls
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn insert(&self, job: &QueryJob) -> Result<Job, EngineError> {
        let url = endpoint_url(&self.base_url, &["projects", &job.project_id, "jobs"])
            .map_err(EngineError::Transport)?;

        let body = InsertJobRequest {
            configuration: JobConfiguration {
                query: QueryConfiguration {
                    query: &job.sql,
                    use_legacy_sql: false,
                    use_query_cache: job.use_query_cache,
                },
                labels: job
                    .labels
                    .iter()
                    .map(|(k, v)| (sanitize_label(k), sanitize_label(v)))
                    .collect(),
            },
        };

        let request = authorize(self.client.post(url), self.access_token.as_deref()).json(&body);
        self.send(request).await
    }

    async fn get(&self, project_id: &str, reference: &JobReference) -> Result<Job, EngineError> {
        let mut url = endpoint_url(
            &self.base_url,
            &["projects", project_id, "jobs", &reference.job_id],
        )
        .map_err(EngineError::Transport)?;
        if let Some(location) = &reference.location {
            url.query_pairs_mut().append_pair("location", location);
        }

        let request = authorize(self.client.get(url), self.access_token.as_deref());
        self.send(request).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Job, EngineError> {
        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        response
            .json::<Job>()
            .await
            .map_err(|e| EngineError::Decode(e.to_string()))
    }
}

#[async_trait]
impl QueryEngine for BigQueryClient {
    fn engine_name(&self) -> &str {
        "bigquery"
    }

    async fn execute(&self, job: &QueryJob) -> Result<QueryCompletion, EngineError> {
        let mut current = self.insert(job).await?;
        tracing::debug!(
            job_id = %current.job_reference.job_id,
            state = %current.status.state,
            "Query job inserted"
        );

        while current.status.state != "DONE" {
            tokio::time::sleep(self.poll_interval).await;
            current = self.get(&job.project_id, &current.job_reference).await?;
        }

        if let Some(error) = &current.status.error_result {
            return Err(EngineError::JobFailed {
                job_id: current.job_reference.job_id,
                message: error.describe(),
            });
        }

        Ok(QueryCompletion {
            job_id: current.job_reference.job_id,
        })
    }
}
