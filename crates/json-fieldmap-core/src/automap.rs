//! Mapping proposals by path similarity.

use crate::model::{FieldMapping, MappingConfig, OutputField};
use crate::similarity::similarity;

/// Minimum similarity for a proposal when the caller has no preference.
pub const DEFAULT_THRESHOLD: f64 = 0.7;

/// Propose one mapping per target field whose best-scoring source path
/// reaches `threshold`.
///
/// The bound is inclusive (`score >= threshold`), so a threshold of `1.0`
/// still matches paths that are equal ignoring case.
///
/// The first source path wins ties. Each proposal carries the target's
/// `defaultValue` as its fallback, and source paths that traverse arrays get
/// an `arrayIndexConfig`.
pub fn propose<S: AsRef<str>>(
    source_paths: &[S],
    target_fields: &[OutputField],
    threshold: f64,
) -> Vec<FieldMapping> {
    target_fields
        .iter()
        .filter_map(|target| {
            let (best, score) = best_match(source_paths, &target.path)?;
            if score < threshold {
                tracing::trace!(target_path = %target.path, best, score, "best score below threshold");
                return None;
            }
            tracing::debug!(target_path = %target.path, source = best, score, "proposing mapping");
            Some(proposal(best, target))
        })
        .collect()
}

fn best_match<'a, S: AsRef<str>>(source_paths: &'a [S], target: &str) -> Option<(&'a str, f64)> {
    let mut best: Option<(&str, f64)> = None;
    for candidate in source_paths {
        let candidate = candidate.as_ref();
        let score = similarity(candidate, target);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((candidate, score));
        }
    }
    best
}

fn proposal(source_path: &str, target: &OutputField) -> FieldMapping {
    let mut mapping = FieldMapping::new(source_path, target.path.as_str());
    mapping.fallback_value = target.default_value.clone();
    if source_path.contains('[') {
        match mapping.clone().with_derived_index_config() {
            Ok(indexed) => mapping = indexed,
            Err(e) => {
                tracing::debug!(source = source_path, error = %e, "no array index config for proposal");
            }
        }
    }
    mapping
}

/// Propose mappings for the leaf targets of `config` that no mapping covers
/// yet.
pub fn propose_for_config<S: AsRef<str>>(
    config: &MappingConfig,
    source_paths: &[S],
    threshold: f64,
) -> Vec<FieldMapping> {
    let template = &config.output_template;
    let unmapped: Vec<OutputField> = template
        .leaves()
        .filter(|field| config.mappings_for_target(&field.path).next().is_none())
        .cloned()
        .collect();
    propose(source_paths, &unmapped, threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArrayMappingMode, FieldType, OutputTemplate};
    use serde_json::json;

    fn field(path: &str) -> OutputField {
        OutputField::new(path, FieldType::Any)
    }

    #[test]
    fn exact_threshold_only_matches_exact_paths() {
        let sources = ["Email", "name", "phone"];
        let targets = [field("email"), field("names")];
        let out = propose(&sources, &targets, 1.0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source_path, "Email");
        assert_eq!(out[0].target_path, "email");
    }

    #[test]
    fn first_candidate_wins_ties() {
        let sources = ["nameA", "nameB"];
        let out = propose(&sources, &[field("name")], 0.5);
        assert_eq!(out[0].source_path, "nameA");
    }

    #[test]
    fn below_threshold_is_skipped() {
        let out = propose(&["zzz"], &[field("email")], DEFAULT_THRESHOLD);
        assert!(out.is_empty());
        let none: [&str; 0] = [];
        assert!(propose(&none, &[field("email")], 0.0).is_empty());
    }

    #[test]
    fn carries_default_as_fallback() {
        let target = field("status").with_default(json!("active"));
        let out = propose(&["status"], &[target], DEFAULT_THRESHOLD);
        assert_eq!(out[0].fallback_value, Some(json!("active")));
    }

    #[test]
    fn array_sources_get_index_config() {
        let out = propose(&["items[*].sku"], &[field("items.sku")], 0.5);
        let cfg = out[0].array_index_config.as_ref().unwrap();
        assert_eq!(cfg.mapping_mode, ArrayMappingMode::Array);
        assert_eq!(cfg.template_path, "items[*].sku");
    }

    #[test]
    fn config_proposals_skip_mapped_and_parent_targets() {
        let config = MappingConfig {
            output_template: OutputTemplate::new(vec![
                OutputField::new("user", FieldType::Object),
                field("user.name"),
                field("user.email"),
            ]),
            ..Default::default()
        }
        .with_mapping(FieldMapping::new("name", "user.name"));
        let out = propose_for_config(&config, &["name", "user.email", "user"], 0.7);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target_path, "user.email");

        let filled = config.with_auto_mappings(&["user.email".to_string()], 0.7);
        assert_eq!(filled.field_mappings.len(), 2);
    }
}
