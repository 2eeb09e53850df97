//! Service enumeration and endpoint configuration

use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

use crate::bigquery::{DEFAULT_BIGQUERY_BASE_URL, DEFAULT_POLL_INTERVAL};
use crate::http::HttpConfig;
use crate::pubsub::DEFAULT_PUBSUB_BASE_URL;

/// Default Cloud Storage JSON API endpoint
pub use query_bench_storage::DEFAULT_GCS_BASE_URL as DEFAULT_STORAGE_BASE_URL;

/// Configuration validation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// An endpoint override is not an absolute http(s) URL.
    #[error("invalid {service} endpoint: {url}")]
    InvalidEndpoint {
        /// Service the endpoint belongs to
        service: Service,
        /// Rejected value
        url: String,
    },

    /// A timeout value is out of acceptable range.
    #[error("invalid timeout: {0:?}")]
    InvalidTimeout(Duration),
}

// ============================================================================
// Service Enumeration
// ============================================================================

/// Remote services the harness talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// Cloud Storage (template buckets)
    Storage,
    /// BigQuery (query engine)
    BigQuery,
    /// Pub/Sub (launch fan-out)
    PubSub,
}

impl Service {
    /// Returns the display name for this service.
    pub fn display_name(&self) -> &'static str {
        match self {
            Service::Storage => "Cloud Storage",
            Service::BigQuery => "BigQuery",
            Service::PubSub => "Pub/Sub",
        }
    }

    /// Returns the production REST endpoint.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Service::Storage => DEFAULT_STORAGE_BASE_URL,
            Service::BigQuery => DEFAULT_BIGQUERY_BASE_URL,
            Service::PubSub => DEFAULT_PUBSUB_BASE_URL,
        }
    }

    /// Returns all services.
    pub fn all() -> &'static [Service] {
        &[Service::Storage, Service::BigQuery, Service::PubSub]
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Endpoint Configuration
// ============================================================================

/// Endpoints, credentials and timeouts for the REST clients.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Cloud Storage endpoint override
    pub storage_url: Option<String>,

    /// BigQuery endpoint override
    pub bigquery_url: Option<String>,

    /// Pub/Sub endpoint override
    pub pubsub_url: Option<String>,

    /// Bearer token sent verbatim with every request
    pub access_token: Option<String>,

    /// Delay between BigQuery job polls
    pub poll_interval: Duration,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            storage_url: None,
            bigquery_url: None,
            pubsub_url: None,
            access_token: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: HttpConfig::default().request_timeout,
        }
    }
}

impl EndpointConfig {
    /// Override one service's endpoint.
    pub fn with_endpoint(mut self, service: Service, url: impl Into<String>) -> Self {
        let url = Some(url.into());
        match service {
            Service::Storage => self.storage_url = url,
            Service::BigQuery => self.bigquery_url = url,
            Service::PubSub => self.pubsub_url = url,
        }
        self
    }

    /// Set the bearer token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Set the BigQuery poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Endpoint in effect for a service.
    pub fn base_url(&self, service: Service) -> &str {
        let configured = match service {
            Service::Storage => &self.storage_url,
            Service::BigQuery => &self.bigquery_url,
            Service::PubSub => &self.pubsub_url,
        };
        configured
            .as_deref()
            .unwrap_or_else(|| service.default_base_url())
    }

    /// HTTP pool settings derived from this configuration.
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig::default().with_request_timeout(self.request_timeout)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for &service in Service::all() {
            let url = self.base_url(service);
            let valid = Url::parse(url)
                .map(|u| matches!(u.scheme(), "http" | "https") && !u.cannot_be_a_base())
                .unwrap_or(false);
            if !valid {
                return Err(ConfigValidationError::InvalidEndpoint {
                    service,
                    url: url.to_string(),
                });
            }
        }

        // 1s to 10m per request
        if self.request_timeout < Duration::from_secs(1)
            || self.request_timeout > Duration::from_secs(600)
        {
            return Err(ConfigValidationError::InvalidTimeout(self.request_timeout));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigValidationError::InvalidTimeout(self.poll_interval));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_display() {
        assert_eq!(Service::Storage.to_string(), "Cloud Storage");
        assert_eq!(Service::PubSub.to_string(), "Pub/Sub");
        assert_eq!(Service::all().len(), 3);
    }

    #[test]
    fn test_default_endpoints() {
        let config = EndpointConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.base_url(Service::BigQuery),
            "https://bigquery.googleapis.com/bigquery/v2"
        );
        assert_eq!(
            config.base_url(Service::PubSub),
            "https://pubsub.googleapis.com/v1"
        );
        assert_eq!(
            config.base_url(Service::Storage),
            query_bench_storage::DEFAULT_GCS_BASE_URL
        );
    }

    #[test]
    fn test_endpoint_override() {
        let config =
            EndpointConfig::default().with_endpoint(Service::PubSub, "http://localhost:8085/v1");
        assert_eq!(config.base_url(Service::PubSub), "http://localhost:8085/v1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = EndpointConfig::default().with_endpoint(Service::Storage, "ftp://x");
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::InvalidEndpoint {
                service: Service::Storage,
                url: "ftp://x".into(),
            })
        );

        let config = EndpointConfig::default().with_request_timeout(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidTimeout(_))
        ));

        let config = EndpointConfig::default().with_poll_interval(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
