//! Template stores for query buckets
//!
//! This crate provides implementations of the `TemplateStore` trait for:
//!
//! - Google Cloud Storage (JSON API)
//! - Local filesystem
//! - In-memory fixtures

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod gcs;
pub mod local;
pub mod memory;

pub use gcs::{GcsTemplateStore, DEFAULT_GCS_BASE_URL};
pub use local::LocalTemplateStore;
pub use memory::MemoryTemplateStore;
