//! Output template: the declared shape of the mapped document.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared type of an output field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    #[default]
    Any,
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputField {
    pub path: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(
        default,
        deserialize_with = "crate::model::deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OutputField {
    pub fn new(path: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            path: path.into(),
            field_type,
            required: false,
            default_value: None,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// True if `other` lies strictly below this field (`a` contains `a.b` and `a[*].b`).
    pub fn contains(&self, other: &OutputField) -> bool {
        is_descendant_path(&self.path, &other.path)
    }
}

fn is_descendant_path(ancestor: &str, path: &str) -> bool {
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && matches!(path.as_bytes()[ancestor.len()], b'.' | b'[')
}

/// Flat list of fields; the tree is implied by path-prefix containment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputTemplate {
    #[serde(default)]
    pub fields: Vec<OutputField>,
}

impl OutputTemplate {
    pub fn new(fields: Vec<OutputField>) -> Self {
        Self { fields }
    }

    pub fn find(&self, path: &str) -> Option<&OutputField> {
        self.fields.iter().find(|f| f.path == path)
    }

    /// Every declared field strictly below `path`.
    pub fn descendants<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a OutputField> + 'a {
        self.fields
            .iter()
            .filter(move |f| is_descendant_path(path, &f.path))
    }

    /// A field is a leaf when nothing is declared below it, whatever its type.
    pub fn is_leaf(&self, field: &OutputField) -> bool {
        self.descendants(&field.path).next().is_none()
    }

    pub fn leaves(&self) -> impl Iterator<Item = &OutputField> {
        self.fields.iter().filter(move |f| self.is_leaf(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> OutputTemplate {
        OutputTemplate::new(vec![
            OutputField::new("profile", FieldType::Object),
            OutputField::new("profile.fullName", FieldType::String),
            OutputField::new("profileId", FieldType::Number),
            OutputField::new("tags", FieldType::Array),
            OutputField::new("meta", FieldType::Object),
        ])
    }

    #[test]
    fn containment_requires_separator() {
        let t = template();
        let profile = t.find("profile").unwrap();
        let descendants: Vec<&str> = t.descendants(&profile.path).map(|f| f.path.as_str()).collect();
        assert_eq!(descendants, vec!["profile.fullName"]);
        assert!(!profile.contains(t.find("profileId").unwrap()));
    }

    #[test]
    fn container_types_without_children_are_leaves() {
        let t = template();
        let leaves: Vec<&str> = t.leaves().map(|f| f.path.as_str()).collect();
        assert_eq!(leaves, vec!["profile.fullName", "profileId", "tags", "meta"]);
    }

    #[test]
    fn null_default_is_kept() {
        let field: OutputField =
            serde_json::from_value(serde_json::json!({"path": "a", "defaultValue": null})).unwrap();
        assert_eq!(field.default_value, Some(Value::Null));
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json.get("defaultValue"), Some(&Value::Null));
    }

    #[test]
    fn required_false_is_omitted_from_json() {
        let json = serde_json::to_value(OutputField::new("a", FieldType::String)).unwrap();
        assert!(json.get("required").is_none());
        assert_eq!(json["type"], "string");
    }
}
