//! Query template resolution and selection
//!
//! This crate turns a bucket of query templates into a batch of ready-to-run
//! queries:
//!
//! - Placeholder substitution (`{name}`, with `{{`/`}}` escapes)
//! - Parameter bindings, built in code or loaded from declarative JSON specs
//! - Uniform selection with replacement

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bindings;
pub mod format;
pub mod producers;
pub mod selector;

pub use bindings::{BindingSpecs, BindingsError, ParameterBindings, ParameterResolver};
pub use producers::{Producer, ProducerSpec};
pub use selector::QuerySelector;
