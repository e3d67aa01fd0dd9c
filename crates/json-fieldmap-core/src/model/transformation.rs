//! Named, reusable transformation definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::transform::TransformKind;

/// A transformation a mapping can reference by id.
///
/// Serialized as `{id, name, type, config}`. An unknown `type` or a config
/// that does not fit it decodes to [`TransformKind::Invalid`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTransformation", into = "RawTransformation")]
pub struct MappingTransformation {
    pub id: String,
    pub name: String,
    pub kind: TransformKind,
}

impl MappingTransformation {
    pub fn new(name: impl Into<String>, kind: TransformKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            kind,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

#[derive(Serialize, Deserialize)]
struct RawTransformation {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    config: Value,
}

impl From<RawTransformation> for MappingTransformation {
    fn from(raw: RawTransformation) -> Self {
        Self {
            kind: TransformKind::from_parts_or_invalid(&raw.type_name, raw.config),
            id: raw.id,
            name: raw.name,
        }
    }
}

impl From<MappingTransformation> for RawTransformation {
    fn from(t: MappingTransformation) -> Self {
        Self {
            type_name: t.kind.type_name().to_string(),
            config: t.kind.config_value(),
            id: t.id,
            name: t.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::RoundConfig;
    use serde_json::json;

    #[test]
    fn wire_shape() {
        let t = MappingTransformation::new("Round", TransformKind::Round(RoundConfig { decimals: 1 }))
            .with_id("t1");
        assert_eq!(
            serde_json::to_value(&t).unwrap(),
            json!({"id": "t1", "name": "Round", "type": "round", "config": {"decimals": 1}})
        );
        let back: MappingTransformation = serde_json::from_value(serde_json::to_value(&t).unwrap()).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn unknown_type_decodes_as_invalid() {
        let wire = json!({"id": "t", "name": "x", "type": "teleport", "config": {"speed": 9}});
        let t: MappingTransformation = serde_json::from_value(wire.clone()).unwrap();
        assert!(matches!(t.kind, TransformKind::Invalid(_)));
        assert_eq!(serde_json::to_value(&t).unwrap(), wire);
    }

    #[test]
    fn mistyped_config_decodes_as_invalid() {
        let t: MappingTransformation = serde_json::from_value(
            json!({"id": "t", "name": "Add", "type": "calculate", "config": {"operation": "add", "value": "2"}}),
        )
        .unwrap();
        assert!(matches!(t.kind, TransformKind::Invalid(_)));
        let back: MappingTransformation = serde_json::from_value(serde_json::to_value(&t).unwrap()).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn missing_config_uses_defaults() {
        let t: MappingTransformation =
            serde_json::from_value(json!({"id": "t", "name": "Up", "type": "uppercase"})).unwrap();
        assert_eq!(t.kind, TransformKind::Uppercase);
    }
}
