//! Current-version portable save shape.
//!
//! Every type here describes data at [`crate::migration::CURRENT_VERSION`].
//! Older shapes exist only as JSON inside the migration steps.

use std::collections::BTreeMap;

use blockwire_core::catalog::BlockKind;
use blockwire_core::control::{ControlMode, KeyBinding};
use blockwire_core::id::BlockUuid;
use blockwire_core::value::{Color, KeyCode, Kind};
use blockwire_core::world::Pose;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveDocument {
    pub version: u32,
    #[serde(default)]
    pub blocks: Vec<SerializedBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedBlock {
    pub id: BlockKind,
    pub uuid: BlockUuid,
    pub loc: Pose,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "rgb")]
    pub col: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mat: Option<String>,
    /// Input name to persisted config. Ordered for stable output.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, PersistedConfig>,
}

/// The producing end of a wire, stored on the consuming input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRef {
    pub block: BlockUuid,
    pub output: String,
}

/// One persisted input. The rotation shape is tried first: typed entries
/// have no required fields and would match anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersistedConfig {
    Rotation(RotationConfig),
    Typed(TypedConfig),
}

impl PersistedConfig {
    pub fn wire(&self) -> Option<&WireRef> {
        match self {
            PersistedConfig::Rotation(r) => r.wire.as_ref(),
            PersistedConfig::Typed(t) => t.wire.as_ref(),
        }
    }
}

/// A literal value plus optional wire and key controller. Missing `type`
/// or `value` mean the schema default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TypedConfig {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Kind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wire: Option<WireRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<ControllerConfig>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub keys: Vec<KeyBinding>,
    #[serde(default)]
    pub mode: ControlMode,
    #[serde(default)]
    pub reset: bool,
}

/// Motor-style two-key rotation control, plus the literal the input falls
/// back to. Entries written before `enabled` existed are active unless wired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationConfig {
    pub rotation: RotationKeys,
    #[serde(default)]
    pub switchmode: bool,
    pub speed: f64,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Kind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wire: Option<WireRef>,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationKeys {
    pub add: KeyCode,
    pub sub: KeyCode,
}

/// `Option<Color>` as `[r, g, b]`.
mod rgb {
    use blockwire_core::value::Color;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(col: &Option<Color>, s: S) -> Result<S::Ok, S::Error> {
        col.map(|c| [c.r, c.g, c.b]).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Color>, D::Error> {
        let raw = Option::<[u8; 3]>::deserialize(d)?;
        Ok(raw.map(|[r, g, b]| Color::rgb(r, g, b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rotation_shape_wins_over_typed() {
        let entry: PersistedConfig = serde_json::from_value(json!({
            "rotation": {"add": "E", "sub": "Q"},
            "switchmode": true,
            "speed": 5.0
        }))
        .unwrap();
        let PersistedConfig::Rotation(rot) = entry else {
            panic!("expected rotation config, got {entry:?}");
        };
        assert_eq!(rot.rotation.add, KeyCode::new("E"));
        assert!(rot.switchmode);
        assert!(rot.enabled);
        assert_eq!(rot.value, None);
        assert!(rot.wire.is_none());
    }

    #[test]
    fn rotation_entry_keeps_inactive_flag_and_literal() {
        let entry: PersistedConfig = serde_json::from_value(json!({
            "rotation": {"add": "E", "sub": "Q"},
            "speed": 2.0,
            "enabled": false,
            "type": "number",
            "value": 5.0
        }))
        .unwrap();
        let PersistedConfig::Rotation(rot) = entry else {
            panic!("expected rotation config, got {entry:?}");
        };
        assert!(!rot.enabled);
        assert_eq!(rot.kind, Some(Kind::Number));
        assert_eq!(rot.value, Some(json!(5.0)));
    }

    #[test]
    fn typed_entry_fields_are_optional() {
        let entry: PersistedConfig = serde_json::from_value(json!({
            "wire": {"block": "6f2c1d2e-4d6b-4c1e-9a51-2b1d3f9e8a10", "output": "result"}
        }))
        .unwrap();
        let PersistedConfig::Typed(typed) = &entry else {
            panic!("expected typed config");
        };
        assert_eq!(typed.kind, None);
        assert_eq!(entry.wire().map(|w| w.output.as_str()), Some("result"));
    }

    #[test]
    fn block_serializes_colour_as_array() {
        let block = SerializedBlock {
            id: BlockKind::Lamp,
            uuid: BlockUuid::new(),
            loc: Pose::at(0.0, 1.0, 0.0),
            col: Some(Color::rgb(255, 0, 16)),
            mat: None,
            config: BTreeMap::new(),
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["col"], json!([255, 0, 16]));
        assert_eq!(json["id"], json!("lamp"));
        assert!(json.get("mat").is_none());
        assert!(json.get("config").is_none());

        let back: SerializedBlock = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }
}
