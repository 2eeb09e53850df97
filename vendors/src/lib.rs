//! Google Cloud REST clients
//!
//! This crate provides implementations of the core traits for:
//!
//! - BigQuery (`QueryEngine`): `jobs.insert` plus `jobs.get` polling
//! - Pub/Sub (`MessagePublisher`): `topics.publish`
//!
//! plus the shared HTTP client pool and endpoint configuration.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bigquery;
pub mod config;
pub mod http;
pub mod pubsub;

pub use bigquery::{sanitize_label, BigQueryClient};
pub use config::{ConfigValidationError, EndpointConfig, Service};
pub use http::{HttpClientPool, HttpConfig};
pub use pubsub::PubSubPublisher;
