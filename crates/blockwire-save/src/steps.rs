//! Historical save-format steps, oldest first.
//!
//! Each function takes a whole document at the previous version. Steps only
//! touch what changed in their version and never look at later shapes.

use blockwire_core::catalog::BlockKind;
use serde_json::{Map, Value as Json, json};

use crate::migration::MigrationStep;

pub fn all() -> [MigrationStep; 10] {
    [
        MigrationStep { version: 1, name: "rename-pose-and-appearance", upgrade: v1_rename_fields },
        MigrationStep { version: 2, name: "hex-colours-to-rgb", upgrade: v2_hex_colours },
        MigrationStep { version: 3, name: "retag-block-ids", upgrade: v3_retag_ids },
        MigrationStep { version: 4, name: "lamp-offset", upgrade: v4_lamp_offset },
        MigrationStep { version: 5, name: "drop-health-and-weld", upgrade: v5_drop_fields },
        MigrationStep { version: 6, name: "inline-connections", upgrade: v6_inline_connections },
        MigrationStep { version: 7, name: "rename-kind-tags", upgrade: v7_kind_tags },
        MigrationStep { version: 8, name: "nest-motor-rotation", upgrade: v8_motor_rotation },
        MigrationStep { version: 9, name: "wedge-rotation", upgrade: v9_wedge_rotation },
        MigrationStep { version: 10, name: "nest-controller", upgrade: v10_nest_controller },
    ]
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Every block object in the document.
fn blocks_mut(doc: &mut Json) -> Result<impl Iterator<Item = &mut Map<String, Json>>, String> {
    let blocks = match doc.get_mut("blocks") {
        Some(Json::Array(blocks)) => blocks,
        Some(_) => return Err("`blocks` is not an array".into()),
        None => return Err("document has no `blocks`".into()),
    };
    Ok(blocks.iter_mut().filter_map(Json::as_object_mut))
}

/// Every config entry object of a block.
fn config_entries_mut(block: &mut Map<String, Json>) -> impl Iterator<Item = &mut Map<String, Json>> {
    block
        .get_mut("config")
        .and_then(Json::as_object_mut)
        .into_iter()
        .flat_map(|config| config.values_mut())
        .filter_map(Json::as_object_mut)
}

fn is_block(block: &Map<String, Json>, id: &str) -> bool {
    block.get("id").and_then(Json::as_str) == Some(id)
}

fn rename(obj: &mut Map<String, Json>, from: &str, to: &str) {
    if obj.contains_key(to) {
        return;
    }
    if let Some(value) = obj.remove(from) {
        obj.insert(to.to_string(), value);
    }
}

/// Apply `f` to one component of a block's `loc` array.
fn adjust_loc(block: &mut Map<String, Json>, index: usize, f: impl Fn(f64) -> f64) -> Result<(), String> {
    let Some(loc) = block.get_mut("loc") else {
        return Ok(());
    };
    let slot = loc
        .as_array_mut()
        .and_then(|a| a.get_mut(index))
        .ok_or_else(|| format!("`loc` has no component {index}"))?;
    let current = slot.as_f64().ok_or("`loc` holds a non-number")?;
    *slot = json!(f(current));
    Ok(())
}

fn parse_hex_colour(hex: &str) -> Result<Json, String> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.is_ascii() {
        return Err(format!("bad colour `{hex}`"));
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| format!("bad colour `{hex}`"));
    Ok(json!([channel(0)?, channel(2)?, channel(4)?]))
}

/// Unwrap a legacy flat field: either `{ "type", "value" }` or a bare value.
fn flat_value(entry: Json) -> Json {
    match entry {
        Json::Object(mut obj) if obj.contains_key("value") => obj.remove("value").unwrap_or(Json::Null),
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

fn v1_rename_fields(mut doc: Json) -> Result<Json, String> {
    for block in blocks_mut(&mut doc)? {
        rename(block, "pos", "loc");
        rename(block, "color", "col");
        rename(block, "material", "mat");
    }
    Ok(doc)
}

fn v2_hex_colours(mut doc: Json) -> Result<Json, String> {
    for block in blocks_mut(&mut doc)? {
        if let Some(Json::String(hex)) = block.get("col") {
            let rgb = parse_hex_colour(hex)?;
            block.insert("col".into(), rgb);
        }
        for entry in config_entries_mut(block) {
            if entry.get("type").and_then(Json::as_str) != Some("color") {
                continue;
            }
            if let Some(Json::String(hex)) = entry.get("value") {
                let rgb = parse_hex_colour(hex)?;
                entry.insert("value".into(), rgb);
            }
        }
    }
    Ok(doc)
}

fn v3_retag_ids(mut doc: Json) -> Result<Json, String> {
    const RETAGS: [(&str, &str); 4] = [
        ("number", "constant"),
        ("and", "andgate"),
        ("or", "orgate"),
        ("not", "notgate"),
    ];
    for block in blocks_mut(&mut doc)? {
        let Some(id) = block.get("id").and_then(Json::as_str) else {
            continue;
        };
        if let Some((_, to)) = RETAGS.iter().find(|(from, _)| *from == id) {
            debug_assert!(BlockKind::from_type_id(to).is_some(), "retag target `{to}` is not a block kind");
            block.insert("id".into(), json!(to));
        }
    }
    Ok(doc)
}

fn v4_lamp_offset(mut doc: Json) -> Result<Json, String> {
    for block in blocks_mut(&mut doc)? {
        if is_block(block, "lamp") {
            adjust_loc(block, 1, |y| y + 0.5)?;
        }
    }
    Ok(doc)
}

fn v5_drop_fields(mut doc: Json) -> Result<Json, String> {
    for block in blocks_mut(&mut doc)? {
        block.remove("health");
        block.remove("welded");
    }
    Ok(doc)
}

/// Producers used to list their consumers; consumers now name their producer.
fn v6_inline_connections(mut doc: Json) -> Result<Json, String> {
    let mut pending = Vec::new();
    for block in blocks_mut(&mut doc)? {
        let Some(connections) = block.remove("connections") else {
            continue;
        };
        let producer = block.get("uuid").cloned().unwrap_or(Json::Null);
        let Json::Object(outputs) = connections else {
            return Err("`connections` is not an object".into());
        };
        for (output, targets) in outputs {
            for target in targets.as_array().into_iter().flatten() {
                let consumer = target.get("blockUuid").cloned().unwrap_or(Json::Null);
                let input = target.get("connectionName").and_then(Json::as_str).unwrap_or_default();
                pending.push((consumer, input.to_string(), producer.clone(), output.clone()));
            }
        }
    }

    for (consumer, input, producer, output) in pending {
        let target = blocks_mut(&mut doc)?.find(|b| b.get("uuid") == Some(&consumer));
        let Some(block) = target else {
            tracing::warn!(%consumer, %input, %producer, %output, "dropping legacy connection to a missing block");
            continue;
        };
        let config = block
            .entry("config")
            .or_insert_with(|| Json::Object(Map::new()))
            .as_object_mut()
            .ok_or("`config` is not an object")?;
        let entry = config
            .entry(input)
            .or_insert_with(|| Json::Object(Map::new()))
            .as_object_mut()
            .ok_or("config entry is not an object")?;
        entry.insert("wire".into(), json!({"block": producer, "output": output}));
    }
    Ok(doc)
}

fn v7_kind_tags(mut doc: Json) -> Result<Json, String> {
    for block in blocks_mut(&mut doc)? {
        for entry in config_entries_mut(block) {
            let renamed = match entry.get("type").and_then(Json::as_str) {
                Some("boolean") => "bool",
                Some("vector") => "vector3",
                Some("key") => "keycode",
                _ => continue,
            };
            entry.insert("type".into(), json!(renamed));
        }
    }
    Ok(doc)
}

fn v8_motor_rotation(mut doc: Json) -> Result<Json, String> {
    const FLAT: [&str; 4] = ["speed", "rotate_add", "rotate_sub", "switch"];
    for block in blocks_mut(&mut doc)? {
        if !is_block(block, "motor") {
            continue;
        }
        let Some(config) = block.get_mut("config").and_then(Json::as_object_mut) else {
            continue;
        };
        if !FLAT.iter().any(|k| config.contains_key(*k)) {
            continue;
        }
        let mut take = |key: &str, fallback: Json| config.remove(key).map(flat_value).unwrap_or(fallback);
        let speed = take("speed", json!(1.0));
        let add = take("rotate_add", json!(""));
        let sub = take("rotate_sub", json!(""));
        let switch = take("switch", json!(false));
        config.insert(
            "rotationSpeed".into(),
            json!({
                "rotation": {"add": add, "sub": sub},
                "switchmode": switch,
                "speed": speed,
            }),
        );
    }
    Ok(doc)
}

fn v9_wedge_rotation(mut doc: Json) -> Result<Json, String> {
    for block in blocks_mut(&mut doc)? {
        if is_block(block, "wedge") {
            adjust_loc(block, 4, |ry| (ry + 90.0).rem_euclid(360.0))?;
        }
    }
    Ok(doc)
}

fn v10_nest_controller(mut doc: Json) -> Result<Json, String> {
    for block in blocks_mut(&mut doc)? {
        for entry in config_entries_mut(block) {
            let mut controller = Map::new();
            if let Some(enabled) = entry.remove("controllable") {
                controller.insert("enabled".into(), enabled);
            }
            for key in ["keys", "mode", "reset"] {
                if let Some(value) = entry.remove(key) {
                    controller.insert(key.into(), value);
                }
            }
            if !controller.is_empty() {
                entry.insert("controller".into(), Json::Object(controller));
            }
        }
    }
    Ok(doc)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn run(step: u32, doc: Json) -> Json {
        let upgrade = all()[step as usize - 1].upgrade;
        upgrade(doc).unwrap()
    }

    fn one_block(block: Json) -> Json {
        json!({"version": 0, "blocks": [block]})
    }

    #[test]
    fn steps_are_numbered_consecutively() {
        for (i, step) in all().iter().enumerate() {
            assert_eq!(step.version as usize, i + 1);
        }
    }

    #[test]
    fn v1_renames_without_clobbering() {
        let doc = run(1, one_block(json!({"pos": [1, 2, 3, 0, 0, 0], "color": "#ff0000", "loc": [9]})));
        let block = &doc["blocks"][0];
        assert_eq!(block["loc"], json!([9]));
        assert_eq!(block["pos"], json!([1, 2, 3, 0, 0, 0]));
        assert_eq!(block["col"], json!("#ff0000"));
    }

    #[test]
    fn v2_converts_block_and_config_colours() {
        let doc = run(
            2,
            one_block(json!({
                "col": "#10ff00",
                "config": {"color": {"type": "color", "value": "#0000fe"}, "name": {"type": "string", "value": "#abc"}}
            })),
        );
        let block = &doc["blocks"][0];
        assert_eq!(block["col"], json!([16, 255, 0]));
        assert_eq!(block["config"]["color"]["value"], json!([0, 0, 254]));
        assert_eq!(block["config"]["name"]["value"], json!("#abc"));
    }

    #[test]
    fn v2_rejects_malformed_colour() {
        let upgrade = all()[1].upgrade;
        assert!(upgrade(one_block(json!({"col": "#12"}))).is_err());
    }

    #[test]
    fn v3_retags_legacy_ids_only() {
        let doc = run(3, json!({"blocks": [{"id": "and"}, {"id": "number"}, {"id": "motor"}]}));
        assert_eq!(doc["blocks"][0]["id"], json!("andgate"));
        assert_eq!(doc["blocks"][1]["id"], json!("constant"));
        assert_eq!(doc["blocks"][2]["id"], json!("motor"));
    }

    #[test]
    fn v4_and_v9_apply_historical_corrections() {
        let doc = run(4, json!({"blocks": [{"id": "lamp", "loc": [0, 1, 0, 0, 0, 0]}, {"id": "block", "loc": [0, 1, 0, 0, 0, 0]}]}));
        assert_eq!(doc["blocks"][0]["loc"][1], json!(1.5));
        assert_eq!(doc["blocks"][1]["loc"][1], json!(1));

        let doc = run(9, json!({"blocks": [{"id": "wedge", "loc": [0, 0, 0, 0, 300, 0]}]}));
        assert_eq!(doc["blocks"][0]["loc"][4], json!(30.0));
    }

    #[test]
    fn v6_moves_connections_to_consumers() {
        let doc = run(
            6,
            json!({"blocks": [
                {"id": "constant", "uuid": "a", "connections": {"value": [
                    {"blockUuid": "b", "connectionName": "value1"},
                    {"blockUuid": "gone", "connectionName": "value1"}
                ]}},
                {"id": "add", "uuid": "b", "config": {"value2": {"type": "number", "value": 2}}}
            ]}),
        );
        assert!(doc["blocks"][0].get("connections").is_none());
        let config = &doc["blocks"][1]["config"];
        assert_eq!(config["value1"]["wire"], json!({"block": "a", "output": "value"}));
        assert_eq!(config["value2"]["value"], json!(2));
    }

    #[test]
    fn v8_nests_motor_fields() {
        let doc = run(
            8,
            one_block(json!({
                "id": "motor",
                "config": {
                    "speed": {"type": "number", "value": 3.5},
                    "rotate_add": {"type": "keycode", "value": "E"},
                    "rotate_sub": {"type": "keycode", "value": "Q"},
                    "switch": {"type": "bool", "value": true},
                    "other": {"type": "number", "value": 1}
                }
            })),
        );
        let config = &doc["blocks"][0]["config"];
        assert_eq!(
            config["rotationSpeed"],
            json!({"rotation": {"add": "E", "sub": "Q"}, "switchmode": true, "speed": 3.5})
        );
        assert_eq!(config["other"]["value"], json!(1));
        assert!(config.get("speed").is_none());
    }

    #[test]
    fn v10_nests_flat_control_fields() {
        let doc = run(
            10,
            one_block(json!({
                "config": {"value": {"type": "bool", "controllable": true, "keys": [{"key": "F", "value": true}], "mode": "toggle"}}
            })),
        );
        let entry = &doc["blocks"][0]["config"]["value"];
        assert_eq!(
            entry["controller"],
            json!({"enabled": true, "keys": [{"key": "F", "value": true}], "mode": "toggle"})
        );
        assert!(entry.get("controllable").is_none());
    }
}
