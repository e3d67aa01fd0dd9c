//! Source selection: which documents feed the mapping and how to enter them.

use serde::{Deserialize, Serialize};

/// Shape of a source root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Every element is mapped to its own output item.
    Array,
    /// The root is mapped once.
    #[default]
    Object,
}

/// How mappings bound to secondary sources participate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Only the primary source is read; other sources resolve as missing.
    #[default]
    Single,
    /// Secondary sources are read alongside the primary one.
    Merge,
}

/// A data source the user selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Navigates into the raw document before extraction. Empty is the root.
    #[serde(default)]
    pub primary_path: String,
}

impl SourceDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source_type,
            category: None,
            primary_path: String::new(),
        }
    }

    pub fn with_primary_path(mut self, path: impl Into<String>) -> Self {
        self.primary_path = path.into();
        self
    }
}

/// The set of selected sources plus how the primary one is iterated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSelection {
    #[serde(rename = "type", default)]
    pub source_type: SourceType,
    #[serde(default)]
    pub sources: Vec<SourceDescriptor>,
    /// Path to the iterable root of the primary source. `None` is a
    /// validation error; `Some("")` is the document root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_path: Option<String>,
    #[serde(default)]
    pub merge_mode: MergeMode,
    /// Collapse a one-element array result into a single object.
    #[serde(default)]
    pub unwrap_single_items: bool,
}

impl SourceSelection {
    /// The source that drives iteration: the first selected one.
    pub fn primary(&self) -> Option<&SourceDescriptor> {
        self.sources.first()
    }

    pub fn find(&self, id: &str) -> Option<&SourceDescriptor> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Primary path for the primary source: the selection-level path if set,
    /// else the descriptor's own.
    pub fn effective_primary_path(&self) -> &str {
        match (&self.primary_path, self.primary()) {
            (Some(path), _) => path.as_str(),
            (None, Some(source)) => source.primary_path.as_str(),
            (None, None) => "",
        }
    }
}
