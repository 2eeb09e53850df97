//! Query templates loaded from a bucket

use std::collections::BTreeMap;

/// A named query template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    /// Storage object name, also the key for parameter bindings
    pub name: String,
    /// Raw template text
    pub body: String,
}

impl QueryTemplate {
    /// Create a template
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }
}

/// All templates of one bucket, ordered by name
///
/// Read-only after load; share it behind an `Arc` when several tasks need it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryTemplates {
    templates: Vec<QueryTemplate>,
}

impl QueryTemplates {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the set holds no templates
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Templates as a slice, ordered by name
    pub fn as_slice(&self) -> &[QueryTemplate] {
        &self.templates
    }

    /// Iterate over templates in name order
    pub fn iter(&self) -> impl Iterator<Item = &QueryTemplate> {
        self.templates.iter()
    }

    /// Template names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|t| t.name.as_str())
    }
}

impl FromIterator<(String, String)> for QueryTemplates {
    /// Later entries win on duplicate names
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let map: BTreeMap<String, String> = iter.into_iter().collect();
        Self {
            templates: map
                .into_iter()
                .map(|(name, body)| QueryTemplate { name, body })
                .collect(),
        }
    }
}

impl FromIterator<QueryTemplate> for QueryTemplates {
    fn from_iter<I: IntoIterator<Item = QueryTemplate>>(iter: I) -> Self {
        iter.into_iter().map(|t| (t.name, t.body)).collect()
    }
}
