//! Optional metadata envelope around the mapped payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which metadata entries the wrapper emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataFields {
    pub timestamp: bool,
    pub source: bool,
    pub count: bool,
    /// Off unless explicitly enabled.
    pub version: bool,
}

impl Default for MetadataFields {
    fn default() -> Self {
        Self {
            timestamp: true,
            source: true,
            count: true,
            version: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputWrapperConfig {
    pub enabled: bool,
    /// Key the payload is stored under.
    pub wrapper_key: String,
    pub include_metadata: bool,
    pub metadata_fields: MetadataFields,
    /// Extra static entries merged into the envelope with the metadata.
    pub custom_metadata: Map<String, Value>,
}

impl Default for OutputWrapperConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            wrapper_key: "data".to_string(),
            include_metadata: false,
            metadata_fields: MetadataFields::default(),
            custom_metadata: Map::new(),
        }
    }
}

impl OutputWrapperConfig {
    /// An enabled wrapper storing the payload under `key`, without metadata.
    pub fn enabled(key: impl Into<String>) -> Self {
        Self {
            enabled: true,
            wrapper_key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_metadata(mut self, fields: MetadataFields) -> Self {
        self.include_metadata = true;
        self.metadata_fields = fields;
        self
    }
}
