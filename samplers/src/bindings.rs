//! Parameter bindings and resolution
//!
//! Bindings map template name -> placeholder name -> producer. They are
//! built once at startup and shared read-only by every selection.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use query_bench_core::{LoadError, LoadResult};

use crate::format::{render, FormatError};
use crate::producers::{Producer, ProducerSpec};

/// Declarative bindings document: template -> placeholder -> spec
pub type BindingSpecs = BTreeMap<String, BTreeMap<String, ProducerSpec>>;

/// Errors loading a bindings document
#[derive(Debug, thiserror::Error)]
pub enum BindingsError {
    /// The file could not be read
    #[error("failed to read bindings file {path}: {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON or names an unknown kind
    #[error("invalid bindings document: {0}")]
    Parse(#[from] serde_json::Error),

    /// A producer spec can never produce a value
    #[error("invalid producer for {template}/{placeholder}: {reason}")]
    InvalidProducer {
        /// Template name
        template: String,
        /// Placeholder name
        placeholder: String,
        /// What is wrong with the spec
        reason: String,
    },
}

/// Registry of producers per template and placeholder
#[derive(Clone, Default)]
pub struct ParameterBindings {
    entries: HashMap<String, BTreeMap<String, Producer>>,
}

impl ParameterBindings {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a producer to a placeholder of a template
    pub fn bind<F>(
        mut self,
        template: impl Into<String>,
        placeholder: impl Into<String>,
        producer: F,
    ) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.insert(template.into(), placeholder.into(), Arc::new(producer));
        self
    }

    fn insert(&mut self, template: String, placeholder: String, producer: Producer) {
        self.entries
            .entry(template)
            .or_default()
            .insert(placeholder, producer);
    }

    /// Whether the template has a binding entry
    pub fn contains(&self, template: &str) -> bool {
        self.entries.contains_key(template)
    }

    /// Placeholder names bound for a template
    pub fn placeholders(&self, template: &str) -> Option<impl Iterator<Item = &str>> {
        self.entries
            .get(template)
            .map(|entry| entry.keys().map(String::as_str))
    }

    /// Number of templates with a binding entry
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no template has a binding entry
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build producers from declarative specs
    pub fn from_specs(specs: BindingSpecs) -> Result<Self, BindingsError> {
        let mut bindings = Self::new();
        for (template, entry) in specs {
            // An entry with no placeholders still marks the template as bound
            bindings.entries.entry(template.clone()).or_default();

            for (placeholder, spec) in entry {
                let producer = spec
                    .into_producer()
                    .map_err(|reason| BindingsError::InvalidProducer {
                        template: template.clone(),
                        placeholder: placeholder.clone(),
                        reason,
                    })?;
                bindings.insert(template.clone(), placeholder, producer);
            }
        }
        Ok(bindings)
    }

    /// Parse a JSON bindings document
    pub fn from_json_str(json: &str) -> Result<Self, BindingsError> {
        let specs: BindingSpecs = serde_json::from_str(json)?;
        Self::from_specs(specs)
    }

    /// Load a JSON bindings document from disk
    pub fn from_path(path: &Path) -> Result<Self, BindingsError> {
        let json = std::fs::read_to_string(path).map_err(|source| BindingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

impl fmt::Debug for ParameterBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (template, entry) in &self.entries {
            map.entry(template, &entry.keys().collect::<Vec<_>>());
        }
        map.finish()
    }
}

/// Computes placeholder values and substitutes them into templates
#[derive(Debug, Clone, Default)]
pub struct ParameterResolver {
    bindings: Arc<ParameterBindings>,
}

impl ParameterResolver {
    /// Create a resolver over a registry
    pub fn new(bindings: ParameterBindings) -> Self {
        Self {
            bindings: Arc::new(bindings),
        }
    }

    /// Resolve one template
    ///
    /// Templates without a binding entry are returned unchanged. Otherwise
    /// every producer of the entry is called exactly once and the values
    /// are substituted by placeholder name.
    ///
    /// # Errors
    ///
    /// `UnboundPlaceholder` if the template references a name the entry does
    /// not define, `MalformedTemplate` on unbalanced braces.
    pub fn resolve(&self, template_name: &str, raw: &str) -> LoadResult<String> {
        let Some(entry) = self.bindings.entries.get(template_name) else {
            return Ok(raw.to_string());
        };

        let values: BTreeMap<String, String> = entry
            .iter()
            .map(|(placeholder, producer)| (placeholder.clone(), producer()))
            .collect();

        render(raw, &values).map_err(|e| match e {
            FormatError::Unbound(placeholder) => LoadError::UnboundPlaceholder {
                template: template_name.to_string(),
                placeholder,
            },
            FormatError::Malformed(reason) => LoadError::MalformedTemplate {
                template: template_name.to_string(),
                reason,
            },
        })
    }
}
