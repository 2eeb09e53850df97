//! Shared HTTP plumbing for the Google REST clients

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;

// ============================================================================
// HTTP Client Pool
// ============================================================================

/// Configuration for the HTTP client pool.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Idle connection timeout
    pub pool_idle_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Request timeout (per HTTP call, not per query)
    pub request_timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// TCP keepalive interval
    pub tcp_keepalive: Option<Duration>,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 64,
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            tcp_keepalive: Some(Duration::from_secs(60)),
            user_agent: format!("query-bench/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    /// Create config with custom request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Create config with custom connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Create config with custom pool size.
    pub fn with_pool_max_idle(mut self, max_idle: usize) -> Self {
        self.pool_max_idle_per_host = max_idle;
        self
    }
}

/// Shared HTTP client with connection pooling.
///
/// One pool serves the storage, BigQuery and Pub/Sub clients of a process.
/// With high concurrency every unit polls its own job, so idle connections
/// are reused heavily.
///
/// # Example
///
/// ```rust,ignore
/// let pool = HttpClientPool::new(&HttpConfig::default())?;
/// let engine = BigQueryClient::new(pool.client().clone());
/// ```
#[derive(Debug, Clone)]
pub struct HttpClientPool {
    /// The underlying reqwest client
    client: Client,

    /// Configuration used to create this pool
    config: HttpConfig,
}

impl HttpClientPool {
    /// Create a new HTTP client pool with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent);

        if let Some(keepalive) = config.tcp_keepalive {
            builder = builder.tcp_keepalive(keepalive);
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Get a reference to the underlying HTTP client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Get the configuration for this pool.
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }
}

// ============================================================================
// Request helpers
// ============================================================================

/// Append path segments to a base URL, escaping each one
pub(crate) fn endpoint_url(base_url: &str, segments: &[&str]) -> Result<Url, String> {
    let mut url = Url::parse(base_url).map_err(|e| format!("invalid base URL {base_url}: {e}"))?;
    url.path_segments_mut()
        .map_err(|_| format!("invalid base URL {base_url}: cannot be a base"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Attach a bearer token when one is configured
pub(crate) fn authorize(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Extract `error.message` from a Google API error body, or keep the raw text
pub(crate) fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_config_builders() {
        let config = HttpConfig::default()
            .with_request_timeout(Duration::from_secs(5))
            .with_connect_timeout(Duration::from_secs(2))
            .with_pool_max_idle(4);

        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.pool_max_idle_per_host, 4);
        assert!(config.user_agent.starts_with("query-bench/"));
    }

    #[test]
    fn test_pool_builds() {
        let pool = HttpClientPool::new(&HttpConfig::default()).unwrap();
        assert_eq!(pool.config().pool_max_idle_per_host, 64);
    }

    #[test]
    fn test_endpoint_url() {
        let url = endpoint_url(
            "https://pubsub.googleapis.com/v1/",
            &["projects", "p1", "topics", "launch:publish"],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://pubsub.googleapis.com/v1/projects/p1/topics/launch:publish"
        );

        assert!(endpoint_url("not a url", &["x"]).is_err());
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error": {"code": 403, "message": "Access Denied", "status": "PERMISSION_DENIED"}}"#;
        assert_eq!(api_error_message(body), "Access Denied");
        assert_eq!(api_error_message(" upstream down \n"), "upstream down");
    }
}
