//! Pre-flight checks over a whole [`MappingConfig`].
//!
//! The applier never consults these results; they exist so an editor can
//! block saving (errors) or nudge the user (warnings).
//!
//! Only four checks block: a missing primary path, no selected sources, an
//! empty template, and a required field with neither a mapping nor a default.
//! Everything else, including unparseable paths and transformation configs
//! that [`validate_transform`](crate::transform::validate_transform) rejects,
//! is a warning and never changes `valid`.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{FieldMapping, MappingConfig};
use crate::path::{strip_wildcards, validate_path};

/// What a [`ValidationIssue`] is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingPrimaryPath,
    NoSources,
    EmptyTemplate,
    UnmappedRequiredField,
    InvalidPath,
    InvalidTransformation,
    DuplicateTarget,
    OrphanedTransformation,
    UnknownTransformation,
    UnknownSource,
    IndexConfigMismatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ValidationIssue {
    fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            mapping_id: None,
            path: None,
        }
    }

    fn for_mapping(mut self, mapping: &FieldMapping) -> Self {
        self.mapping_id = Some(mapping.id.clone());
        self
    }

    fn at(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn has_kind(&self, kind: IssueKind) -> bool {
        self.errors.iter().chain(&self.warnings).any(|i| i.kind == kind)
    }
}

/// Check `config` for structural errors and suspicious-but-legal setups.
pub fn validate_config(config: &MappingConfig) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let selection = &config.source_selection;

    // -- Sources --------------------------------------------------------------

    if selection.primary_path.is_none() {
        errors.push(ValidationIssue::new(
            IssueKind::MissingPrimaryPath,
            "Source selection has no primary path",
        ));
    }
    if selection.sources.is_empty() {
        errors.push(ValidationIssue::new(IssueKind::NoSources, "No data sources selected"));
    }

    // -- Template -------------------------------------------------------------

    if config.output_template.fields.is_empty() {
        errors.push(ValidationIssue::new(
            IssueKind::EmptyTemplate,
            "Output template has no fields",
        ));
    }
    for field in config.output_template.fields.iter().filter(|f| f.required) {
        let covered = config
            .field_mappings
            .iter()
            .any(|m| m.target_path == field.path || strip_wildcards(&m.target_path) == field.path);
        if !covered && field.default_value.is_none() {
            errors.push(
                ValidationIssue::new(
                    IssueKind::UnmappedRequiredField,
                    format!("Required field `{}` has no mapping or default value", field.path),
                )
                .at(&field.path),
            );
        }
    }

    // -- Mappings -------------------------------------------------------------

    let transform_ids: HashSet<&str> = config.transformations.iter().map(|t| t.id.as_str()).collect();
    let mut by_target: BTreeMap<&str, usize> = BTreeMap::new();

    for mapping in &config.field_mappings {
        *by_target.entry(mapping.target_path.as_str()).or_default() += 1;

        for (role, path) in [("source", &mapping.source_path), ("target", &mapping.target_path)] {
            if let Err(e) = validate_path(path) {
                warnings.push(
                    ValidationIssue::new(IssueKind::InvalidPath, format!("Invalid {} path: {}", role, e))
                        .for_mapping(mapping)
                        .at(path.as_str()),
                );
            }
        }

        if let Some(tid) = &mapping.transform_id {
            if !transform_ids.contains(tid.as_str()) {
                warnings.push(
                    ValidationIssue::new(
                        IssueKind::UnknownTransformation,
                        format!("Mapping references unknown transformation `{}`", tid),
                    )
                    .for_mapping(mapping),
                );
            }
        }

        if let Some(sid) = &mapping.source_id {
            if selection.find(sid).is_none() {
                warnings.push(
                    ValidationIssue::new(
                        IssueKind::UnknownSource,
                        format!("Mapping reads from unselected source `{}`", sid),
                    )
                    .for_mapping(mapping),
                );
            }
        }

        if let Some(index_config) = &mapping.array_index_config {
            if !index_config.round_trips(&mapping.source_path) {
                warnings.push(
                    ValidationIssue::new(
                        IssueKind::IndexConfigMismatch,
                        format!(
                            "Array index config for `{}` does not reproduce the source path",
                            mapping.source_path
                        ),
                    )
                    .for_mapping(mapping)
                    .at(mapping.source_path.as_str()),
                );
            }
        }
    }

    for (target, count) in by_target.into_iter().filter(|(_, n)| *n > 1) {
        warnings.push(
            ValidationIssue::new(
                IssueKind::DuplicateTarget,
                format!("{} mappings write to `{}`", count, target),
            )
            .at(target),
        );
    }

    // -- Transformations ------------------------------------------------------

    let referenced: HashSet<&str> = config
        .field_mappings
        .iter()
        .filter_map(|m| m.transform_id.as_deref())
        .collect();
    for transformation in &config.transformations {
        let check = transformation.kind.validate();
        for message in check.errors {
            warnings.push(ValidationIssue::new(
                IssueKind::InvalidTransformation,
                format!("Transformation `{}`: {}", transformation.name, message),
            ));
        }
        if !referenced.contains(transformation.id.as_str()) {
            warnings.push(ValidationIssue::new(
                IssueKind::OrphanedTransformation,
                format!("Transformation `{}` is not used by any mapping", transformation.name),
            ));
        }
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}
