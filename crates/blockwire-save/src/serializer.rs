//! Conversion between a live [`Circuit`] and the portable document.
//!
//! The serializer holds no state. [`save`] projects live nodes into the
//! current shape; [`load`] checks the version and migrates; [`place`] turns
//! a current-shape document into live nodes, all or nothing.

use std::collections::BTreeMap;

use blockwire_core::circuit::{Circuit, PlaceError};
use blockwire_core::control::{ControlBinding, RotationBinding};
use blockwire_core::id::{BlockUuid, InputRef, OutputRef};
use blockwire_core::node::{BlockNode, NodeError};
use blockwire_core::value::{Kind, Value, ValueError};
use blockwire_core::wire::ConnectError;
use blockwire_core::world::World;
use serde_json::Value as Json;

use crate::document::{
    ControllerConfig, PersistedConfig, RotationConfig, RotationKeys, SaveDocument, SerializedBlock, TypedConfig,
    WireRef,
};
use crate::migration::{CURRENT_VERSION, MigrationChain, MigrationError};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("save is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("save has no integer `version` field")]
    MissingVersion,
    #[error("save is from future version {found} (this build supports up to {CURRENT_VERSION})")]
    FutureVersion { found: u64 },
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error("migrated save does not match the current format: {0}")]
    Malformed(serde_json::Error),
    #[error("placing block {uuid}: {source}")]
    Place { uuid: BlockUuid, source: PlaceError },
    #[error("configuring block {uuid}: {source}")]
    Block { uuid: BlockUuid, source: NodeError },
    #[error("literal for {input}: {source}")]
    Value { input: InputRef, source: ValueError },
    #[error("wire into {input} comes from missing block {block}")]
    DanglingWire { input: InputRef, block: BlockUuid },
    #[error("wiring {input}: {source}")]
    Connect { input: InputRef, source: ConnectError },
}

// ---------------------------------------------------------------------------
// Save
// ---------------------------------------------------------------------------

/// Project every live block into the current portable shape.
pub fn save(circuit: &Circuit) -> SaveDocument {
    let blocks: Vec<SerializedBlock> = circuit.blocks().map(|node| save_block(circuit, node)).collect();
    tracing::info!(blocks = blocks.len(), wires = circuit.wire_count(), "saved circuit");
    SaveDocument {
        version: CURRENT_VERSION,
        blocks,
    }
}

fn save_block(circuit: &Circuit, node: &BlockNode) -> SerializedBlock {
    let mut config = BTreeMap::new();
    for def in &node.schema().inputs {
        let Some(slot) = node.input(&def.name) else {
            continue;
        };
        let wire = circuit
            .wire_into(&InputRef::new(node.uuid(), def.name.clone()))
            .map(|o| WireRef {
                block: o.block,
                output: o.name.clone(),
            });
        let literal = slot.config.literal.as_ref();
        let entry = match &slot.config.control {
            Some(ControlBinding::Rotation(r)) => PersistedConfig::Rotation(RotationConfig {
                rotation: RotationKeys {
                    add: r.add.clone(),
                    sub: r.sub.clone(),
                },
                switchmode: r.switch_mode,
                speed: r.speed,
                enabled: slot.config.controlled,
                kind: literal.map(Value::kind),
                value: literal.map(Value::to_json),
                wire,
            }),
            binding => {
                let controller = match binding {
                    Some(ControlBinding::Keys { keys, mode, reset }) => Some(ControllerConfig {
                        enabled: slot.config.controlled,
                        keys: keys.clone(),
                        mode: *mode,
                        reset: *reset,
                    }),
                    _ => None,
                };
                let typed = TypedConfig {
                    kind: literal.map(Value::kind),
                    value: literal.map(Value::to_json),
                    wire,
                    controller,
                };
                if typed == TypedConfig::default() {
                    continue;
                }
                PersistedConfig::Typed(typed)
            }
        };
        config.insert(def.name.clone(), entry);
    }
    SerializedBlock {
        id: node.kind(),
        uuid: node.uuid(),
        loc: node.pose,
        col: node.col,
        mat: node.mat.clone(),
        config,
    }
}

/// Pretty-printed JSON for a document.
pub fn to_pretty_json(doc: &SaveDocument) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(doc)
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Read the mandatory `version` field.
pub fn version_of(json: &Json) -> Result<u32, LoadError> {
    let found = json.get("version").and_then(Json::as_u64).ok_or(LoadError::MissingVersion)?;
    if found > u64::from(CURRENT_VERSION) {
        return Err(LoadError::FutureVersion { found });
    }
    u32::try_from(found).map_err(|_| LoadError::FutureVersion { found })
}

/// Migrate raw save JSON to the current version without decoding it.
pub fn upgrade(json: Json) -> Result<Json, LoadError> {
    let from = version_of(&json)?;
    if from < CURRENT_VERSION {
        tracing::info!(from, to = CURRENT_VERSION, "upgrading save");
    }
    Ok(MigrationChain::standard().migrate(json, from, CURRENT_VERSION)?)
}

/// Check the version, migrate, and decode into the current shape.
pub fn load(json: Json) -> Result<SaveDocument, LoadError> {
    let current = upgrade(json)?;
    let doc: SaveDocument = serde_json::from_value(current).map_err(LoadError::Malformed)?;
    tracing::info!(blocks = doc.blocks.len(), "loaded save");
    Ok(doc)
}

pub fn parse(text: &str) -> Result<SaveDocument, LoadError> {
    load(serde_json::from_str(text)?)
}

// ---------------------------------------------------------------------------
// Place
// ---------------------------------------------------------------------------

/// Turn a loaded document into live, enabled blocks.
///
/// Blocks are created disabled, configured, wired, then enabled in document
/// order. On any failure every block placed so far is deleted again and the
/// error is returned. Returns the placed uuids in document order.
pub fn place(doc: &SaveDocument, circuit: &mut Circuit, world: &mut dyn World) -> Result<Vec<BlockUuid>, LoadError> {
    let mut placed = Vec::with_capacity(doc.blocks.len());
    match place_all(doc, circuit, world, &mut placed) {
        Ok(()) => {
            tracing::info!(blocks = placed.len(), wires = circuit.wire_count(), "placed save");
            Ok(placed)
        }
        Err(err) => {
            tracing::warn!(error = %err, rolled_back = placed.len(), "save could not be placed");
            for uuid in placed.iter().rev() {
                if let Err(cleanup) = circuit.delete(world, *uuid) {
                    tracing::warn!(block = %uuid, error = %cleanup, "rollback failed to delete block");
                }
            }
            Err(err)
        }
    }
}

fn place_all(
    doc: &SaveDocument,
    circuit: &mut Circuit,
    world: &mut dyn World,
    placed: &mut Vec<BlockUuid>,
) -> Result<(), LoadError> {
    for block in &doc.blocks {
        let uuid = block.uuid;
        circuit
            .insert_block(world, uuid, block.id, block.loc)
            .map_err(|source| LoadError::Place { uuid, source })?;
        placed.push(uuid);
        circuit
            .set_appearance(uuid, block.col, block.mat.clone())
            .map_err(|source| LoadError::Block { uuid, source })?;
    }

    // Literals on unwired inputs fix their kinds before any wire goes in.
    // Wired inputs get theirs afterwards, so a stale literal there cannot
    // block a connect.
    let mut wires = Vec::new();
    for block in &doc.blocks {
        for (name, entry) in &block.config {
            match entry.wire() {
                Some(wire) => wires.push((block, name, entry, wire)),
                None => configure(circuit, block, name, entry)?,
            }
        }
    }

    for &(block, name, _, wire) in &wires {
        let output = OutputRef::new(wire.block, wire.output.clone());
        let input = InputRef::new(block.uuid, name.clone());
        if circuit.block(output.block).is_none() {
            return Err(LoadError::DanglingWire {
                block: output.block,
                input,
            });
        }
        circuit
            .connect(&output, &input)
            .map_err(|source| LoadError::Connect { input, source })?;
    }
    for (block, name, entry, _) in wires {
        configure(circuit, block, name, entry)?;
    }

    for uuid in placed.iter() {
        circuit
            .enable_block(*uuid)
            .map_err(|source| LoadError::Block { uuid: *uuid, source })?;
    }
    Ok(())
}

fn configure(circuit: &mut Circuit, block: &SerializedBlock, name: &str, entry: &PersistedConfig) -> Result<(), LoadError> {
    let uuid = block.uuid;
    let node_err = |source| LoadError::Block { uuid, source };
    match entry {
        PersistedConfig::Typed(typed) => {
            if let Some(value) = literal(block, name, typed.kind, typed.value.as_ref())? {
                circuit.update_config(uuid, name, value).map_err(node_err)?;
            }
            if let Some(controller) = &typed.controller {
                let binding = ControlBinding::Keys {
                    keys: controller.keys.clone(),
                    mode: controller.mode,
                    reset: controller.reset,
                };
                circuit.set_control_binding(uuid, name, Some(binding)).map_err(node_err)?;
                if controller.enabled && typed.wire.is_none() {
                    circuit.set_control(uuid, name, true).map_err(node_err)?;
                }
            }
        }
        PersistedConfig::Rotation(rotation) => {
            let binding = ControlBinding::Rotation(RotationBinding {
                add: rotation.rotation.add.clone(),
                sub: rotation.rotation.sub.clone(),
                switch_mode: rotation.switchmode,
                speed: rotation.speed,
            });
            if let Some(value) = literal(block, name, rotation.kind, rotation.value.as_ref())? {
                circuit.update_config(uuid, name, value).map_err(node_err)?;
            }
            circuit.set_control_binding(uuid, name, Some(binding)).map_err(node_err)?;
            if rotation.enabled && rotation.wire.is_none() {
                circuit.set_control(uuid, name, true).map_err(node_err)?;
            }
        }
    }
    Ok(())
}

/// The literal an entry describes, or `None` when both type and value are
/// absent.
fn literal(
    block: &SerializedBlock,
    name: &str,
    kind: Option<Kind>,
    value: Option<&Json>,
) -> Result<Option<Value>, LoadError> {
    if kind.is_none() && value.is_none() {
        return Ok(None);
    }
    let schema = block.id.schema();
    let def = schema.find_input(name).ok_or_else(|| LoadError::Block {
        uuid: block.uuid,
        source: NodeError::UnknownInput {
            block: block.uuid,
            name: name.to_string(),
        },
    })?;
    let kind = kind.unwrap_or_else(|| def.provisional_kind());
    match value {
        None => Ok(Some(def.default_for(kind))),
        Some(json) => Value::from_json(kind, json)
            .map(Some)
            .map_err(|source| LoadError::Value {
                input: InputRef::new(block.uuid, name),
                source,
            }),
    }
}

// ===========================================================================
// Tests
// ===========================================================================
