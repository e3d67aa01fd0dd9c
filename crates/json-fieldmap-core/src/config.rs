//! Engine options for field extraction and mapping application.
//!
//! These are the knobs a caller tunes per invocation; they are not part of the
//! persisted [`MappingConfig`](crate::model::MappingConfig).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Options controlling [`extract_fields`](crate::extract::extract_fields).
///
/// ## Serialization Format
///
/// Fields are serialized in `camelCase` (e.g., `maxDepth`, `includeWildcards`)
/// to match the JSON the editor sends across the WASM boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractOptions {
    /// Maximum recursion depth. Containers below this depth are reported as a
    /// single descriptor instead of being expanded.
    pub max_depth: usize,
    /// Generalize arrays through element 0 as `field[*]`.
    pub include_wildcards: bool,
    /// Additionally expand concrete `field[0]`, `field[1]`, … paths.
    pub include_fixed_indices: bool,
    /// Upper bound on concrete indices expanded per array.
    pub max_array_indices: usize,
    /// Attach the sample value to each leaf descriptor.
    pub include_values: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_depth: 10,
            include_wildcards: true,
            include_fixed_indices: false,
            max_array_indices: 3,
            include_values: false,
        }
    }
}

/// Options controlling [`apply_mapping_with`](crate::apply::apply_mapping_with).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplyOptions {
    /// Fill output-template `defaultValue`s at paths no mapping produced.
    pub template_defaults: bool,
    /// Pin the wrapper `timestamp` metadata. `None` reads the system clock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            template_defaults: true,
            timestamp: None,
        }
    }
}

impl ApplyOptions {
    /// The instant used for wrapper metadata.
    pub fn now(&self) -> DateTime<Utc> {
        self.timestamp.unwrap_or_else(Utc::now)
    }
}
