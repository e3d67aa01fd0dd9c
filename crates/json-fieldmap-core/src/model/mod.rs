//! The mapping configuration and its immutable editing operations.
//!
//! [`MappingConfig`] is the only artifact exchanged with the editor. Edits
//! never mutate a config in place: every `with_*`/`without_*` method returns
//! a new value, which keeps undo history (see [`EditHistory`]) a simple stack
//! of snapshots.

pub mod history;
pub mod mapping;
pub mod source;
pub mod template;
pub mod transformation;
pub mod wrapper;

use serde::{Deserialize, Serialize};

pub use history::EditHistory;
pub use mapping::{
    ArrayIndexConfig, ArrayMappingMode, ConditionOperator, FieldMapping, MappingCondition,
};
pub use source::{MergeMode, SourceDescriptor, SourceSelection, SourceType};
pub use template::{FieldType, OutputField, OutputTemplate};
pub use transformation::MappingTransformation;
pub use wrapper::{MetadataFields, OutputWrapperConfig};

use crate::error::MappingError;

/// Read an optional JSON value, keeping an explicit `null` as `Some(Value::Null)`.
/// Pair with `#[serde(default)]` so an absent key stays `None`.
pub(crate) fn deserialize_present<'de, D>(
    deserializer: D,
) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// Aggregate root: sources, target shape, mapping rules and transformations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingConfig {
    #[serde(default)]
    pub source_selection: SourceSelection,
    #[serde(default)]
    pub output_template: OutputTemplate,
    #[serde(default)]
    pub field_mappings: Vec<FieldMapping>,
    #[serde(default)]
    pub transformations: Vec<MappingTransformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_wrapper: Option<OutputWrapperConfig>,
}

impl MappingConfig {
    /// Parse a config from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, MappingError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn find_mapping(&self, id: &str) -> Option<&FieldMapping> {
        self.field_mappings.iter().find(|m| m.id == id)
    }

    pub fn find_transformation(&self, id: &str) -> Option<&MappingTransformation> {
        self.transformations.iter().find(|t| t.id == id)
    }

    /// Mappings writing to `target_path`, from any source.
    pub fn mappings_for_target<'a>(
        &'a self,
        target_path: &'a str,
    ) -> impl Iterator<Item = &'a FieldMapping> + 'a {
        self.field_mappings
            .iter()
            .filter(move |m| m.target_path == target_path)
    }

    fn mapping_position(&self, id: &str) -> Result<usize, MappingError> {
        self.field_mappings
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| MappingError::MappingNotFound(id.to_string()))
    }

    // -----------------------------------------------------------------------
    // Sources
    // -----------------------------------------------------------------------

    /// Add a source, or replace the selected source with the same id.
    pub fn with_source(&self, source: SourceDescriptor) -> Self {
        let mut next = self.clone();
        let sources = &mut next.source_selection.sources;
        match sources.iter_mut().find(|s| s.id == source.id) {
            Some(slot) => *slot = source,
            None => sources.push(source),
        }
        next
    }

    /// Deselect a source. Mappings that read from it are kept and surface as
    /// validation warnings.
    pub fn without_source(&self, source_id: &str) -> Result<Self, MappingError> {
        let position = self
            .source_selection
            .sources
            .iter()
            .position(|s| s.id == source_id)
            .ok_or_else(|| MappingError::SourceNotFound(source_id.to_string()))?;
        let mut next = self.clone();
        next.source_selection.sources.remove(position);
        Ok(next)
    }

    pub fn with_primary_path(&self, path: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.source_selection.primary_path = Some(path.into());
        next
    }

    // -----------------------------------------------------------------------
    // Template
    // -----------------------------------------------------------------------

    /// Add an output field, or replace the field with the same path.
    pub fn with_output_field(&self, field: OutputField) -> Self {
        let mut next = self.clone();
        let fields = &mut next.output_template.fields;
        match fields.iter_mut().find(|f| f.path == field.path) {
            Some(slot) => *slot = field,
            None => fields.push(field),
        }
        next
    }

    // -----------------------------------------------------------------------
    // Mappings
    // -----------------------------------------------------------------------

    /// Insert a mapping.
    ///
    /// A mapping with the same id is replaced in place. Otherwise a mapping
    /// occupying the same `(sourceId, targetPath)` slot is replaced in place
    /// and the new mapping inherits its id. Mappings from other sources onto
    /// the same target are left alone.
    pub fn with_mapping(&self, mapping: FieldMapping) -> Self {
        let mut next = self.clone();
        if let Some(slot) = next.field_mappings.iter_mut().find(|m| m.id == mapping.id) {
            *slot = mapping;
        } else if let Some(slot) = next.field_mappings.iter_mut().find(|m| m.same_slot(&mapping)) {
            let id = std::mem::take(&mut slot.id);
            *slot = FieldMapping { id, ..mapping };
        } else {
            next.field_mappings.push(mapping);
        }
        next
    }

    pub fn without_mapping(&self, id: &str) -> Result<Self, MappingError> {
        let position = self.mapping_position(id)?;
        let mut next = self.clone();
        next.field_mappings.remove(position);
        Ok(next)
    }

    /// Edit one mapping through a closure. The mapping's id cannot change.
    pub fn update_mapping(
        &self,
        id: &str,
        edit: impl FnOnce(&mut FieldMapping),
    ) -> Result<Self, MappingError> {
        let position = self.mapping_position(id)?;
        let mut next = self.clone();
        let mapping = &mut next.field_mappings[position];
        edit(mapping);
        mapping.id = id.to_string();
        Ok(next)
    }

    /// Pin the array `field` of a mapping's source path to `index` and
    /// re-derive `sourcePath` from the index config's template.
    pub fn with_mapping_index(
        &self,
        mapping_id: &str,
        field: &str,
        index: usize,
    ) -> Result<Self, MappingError> {
        let position = self.mapping_position(mapping_id)?;
        let mapping = &self.field_mappings[position];
        let index_config = match &mapping.array_index_config {
            Some(c) => c.clone(),
            None => ArrayIndexConfig::from_source_path(&mapping.source_path)?.ok_or_else(|| {
                MappingError::InvalidPath {
                    path: mapping.source_path.clone(),
                    message: "path does not traverse an array".to_string(),
                }
            })?,
        };
        let index_config = index_config.with_index(field, index)?;
        let source_path = index_config.resolve_path()?;

        let mut next = self.clone();
        let slot = &mut next.field_mappings[position];
        slot.source_path = source_path;
        slot.array_index_config = Some(index_config);
        Ok(next)
    }

    // -----------------------------------------------------------------------
    // Transformations
    // -----------------------------------------------------------------------

    /// Add a transformation, or replace the one with the same id.
    pub fn with_transformation(&self, transformation: MappingTransformation) -> Self {
        let mut next = self.clone();
        match next
            .transformations
            .iter_mut()
            .find(|t| t.id == transformation.id)
        {
            Some(slot) => *slot = transformation,
            None => next.transformations.push(transformation),
        }
        next
    }

    /// Remove a transformation and detach it from every mapping using it.
    pub fn without_transformation(&self, id: &str) -> Result<Self, MappingError> {
        if self.find_transformation(id).is_none() {
            return Err(MappingError::TransformationNotFound(id.to_string()));
        }
        let mut next = self.clone();
        next.transformations.retain(|t| t.id != id);
        for mapping in &mut next.field_mappings {
            if mapping.transform_id.as_deref() == Some(id) {
                mapping.transform_id = None;
            }
        }
        Ok(next)
    }

    /// Point a mapping at a transformation, or detach it with `None`.
    pub fn attach_transform(
        &self,
        mapping_id: &str,
        transform_id: Option<&str>,
    ) -> Result<Self, MappingError> {
        if let Some(tid) = transform_id {
            if self.find_transformation(tid).is_none() {
                return Err(MappingError::TransformationNotFound(tid.to_string()));
            }
        }
        self.update_mapping(mapping_id, |m| {
            m.transform_id = transform_id.map(str::to_string);
        })
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    pub fn with_output_wrapper(&self, wrapper: Option<OutputWrapperConfig>) -> Self {
        let mut next = self.clone();
        next.output_wrapper = wrapper;
        next
    }

    /// Add auto-mapper proposals for every unmapped leaf target.
    pub fn with_auto_mappings(&self, source_paths: &[String], threshold: f64) -> Self {
        crate::automap::propose_for_config(self, source_paths, threshold)
            .into_iter()
            .fold(self.clone(), |config, mapping| config.with_mapping(mapping))
    }
}
