//! Block logic nodes.
//!
//! A [`BlockNode`] wraps one placed block: its identity, its input and output
//! cells, and its behavior. The node owns its cells and is the only writer of
//! its outputs; the circuit decides when it recalculates.
//!
//! # Lifecycle
//!
//! ```text
//! Constructed -> Prepared -> Enabled <-> Disabled
//!                               |  ^
//!                               v  |
//!                              Burned
//! any -> Destroyed
//! ```
//!
//! Input subscriptions exist from `prepare` on, but only an enabled node
//! recalculates or ticks.

use std::collections::BTreeMap;

use crate::behavior::{Behavior, Fault, Inputs, Outputs, TickContext};
use crate::catalog::BlockKind;
use crate::cell::{CellError, CellStore, Target};
use crate::connector::{BlockSchema, InputConfig, Resolution, resolve_kind};
use crate::id::{BlockUuid, CellId, NodeId, ObjectRef, SubscriptionId};
use crate::value::{Color, KeyCode, Kind, KindSet, Value};
use crate::world::{Pose, World};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("no block with uuid {0}")]
    UnknownBlock(BlockUuid),

    #[error("block {block} has no input `{name}`")]
    UnknownInput { block: BlockUuid, name: String },

    #[error("block {block} has no output `{name}`")]
    UnknownOutput { block: BlockUuid, name: String },

    #[error("block {block} cannot go from {from:?} to {to:?}")]
    InvalidTransition {
        block: BlockUuid,
        from: Lifecycle,
        to: Lifecycle,
    },

    #[error("input `{name}` on block {block} does not accept {kind} values")]
    KindNotAccepted {
        block: BlockUuid,
        name: String,
        kind: Kind,
    },

    #[error("input `{name}` on block {block} is held at {held} by a wired connector")]
    KindPinned {
        block: BlockUuid,
        name: String,
        held: Kind,
    },

    #[error("input `{name}` on block {block} is not controllable")]
    NotControllable { block: BlockUuid, name: String },

    #[error("input `{name}` on block {block} has no control binding")]
    NoControlBinding { block: BlockUuid, name: String },

    #[error("the control binding on `{name}` cannot drive {kind} values")]
    ControlUnsupported { name: String, kind: Kind },

    #[error("input `{name}` on block {block} is wired; disconnect it first")]
    Wired { block: BlockUuid, name: String },

    #[error(transparent)]
    Cell(#[from] CellError),
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Constructed,
    Prepared,
    Enabled,
    Disabled,
    /// Disabled by a runtime fault; outputs frozen until re-enabled.
    Burned,
    Destroyed,
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// One connector on a node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Port {
    Input(String),
    Output(String),
}

#[derive(Debug, Clone)]
pub struct InputSlot {
    pub cell: CellId,
    pub config: InputConfig,
}

// ---------------------------------------------------------------------------
// BlockNode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BlockNode {
    uuid: BlockUuid,
    kind: BlockKind,
    object: ObjectRef,
    pub pose: Pose,
    pub col: Option<Color>,
    pub mat: Option<String>,
    schema: BlockSchema,
    behavior: Box<dyn Behavior>,
    inputs: BTreeMap<String, InputSlot>,
    outputs: BTreeMap<String, CellId>,
    subscriptions: Vec<SubscriptionId>,
    state: Lifecycle,
}

impl BlockNode {
    /// Build the node and create its cells, each holding the default of its
    /// provisional kind.
    pub fn new(
        uuid: BlockUuid,
        kind: BlockKind,
        object: ObjectRef,
        pose: Pose,
        cells: &mut CellStore,
    ) -> Self {
        let schema = kind.schema();
        let group_kind = |group: &Option<String>, own: KindSet| {
            group
                .as_deref()
                .map(|g| schema.group_declared(g))
                .unwrap_or(own)
                .first()
        };

        let mut inputs = BTreeMap::new();
        for def in &schema.inputs {
            let input_kind = group_kind(&def.group, def.accepts()).unwrap_or(def.provisional_kind());
            let cell = cells.create(def.default_for(input_kind));
            inputs.insert(
                def.name.clone(),
                InputSlot {
                    cell,
                    config: InputConfig::default(),
                },
            );
        }
        let mut outputs = BTreeMap::new();
        for def in &schema.outputs {
            let value = group_kind(&def.group, def.types)
                .map(Kind::default_value)
                .unwrap_or_else(|| def.initial_value());
            outputs.insert(def.name.clone(), cells.create(value));
        }

        Self {
            uuid,
            kind,
            object,
            pose,
            col: None,
            mat: None,
            schema,
            behavior: kind.instantiate(),
            inputs,
            outputs,
            subscriptions: Vec::new(),
            state: Lifecycle::Constructed,
        }
    }

    pub fn uuid(&self) -> BlockUuid {
        self.uuid
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn object(&self) -> ObjectRef {
        self.object
    }

    pub fn schema(&self) -> &BlockSchema {
        &self.schema
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state == Lifecycle::Enabled
    }

    pub fn ticks(&self) -> bool {
        self.behavior.ticks()
    }

    pub fn input(&self, name: &str) -> Option<&InputSlot> {
        self.inputs.get(name)
    }

    pub(crate) fn input_mut(&mut self, name: &str) -> Option<&mut InputSlot> {
        self.inputs.get_mut(name)
    }

    /// Inputs in name order.
    pub fn inputs(&self) -> impl Iterator<Item = (&str, &InputSlot)> {
        self.inputs.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn output_cell(&self, name: &str) -> Option<CellId> {
        self.outputs.get(name).copied()
    }

    pub fn outputs(&self) -> impl Iterator<Item = (&str, CellId)> {
        self.outputs.iter().map(|(n, c)| (n.as_str(), *c))
    }

    pub fn port_cell(&self, port: &Port) -> Option<CellId> {
        match port {
            Port::Input(name) => self.inputs.get(name).map(|s| s.cell),
            Port::Output(name) => self.output_cell(name),
        }
    }

    /// Kinds a connector declares, ignoring its group.
    pub fn declared(&self, port: &Port) -> KindSet {
        match port {
            Port::Input(name) => self.schema.find_input(name).map_or(KindSet::EMPTY, |d| d.accepts()),
            Port::Output(name) => self.schema.find_output(name).map_or(KindSet::EMPTY, |d| d.types),
        }
    }

    /// Every connector sharing a group with `port`, including `port` itself.
    pub fn group_members(&self, port: &Port) -> Vec<Port> {
        let group = match port {
            Port::Input(name) => self.schema.find_input(name).and_then(|d| d.group.as_deref()),
            Port::Output(name) => self.schema.find_output(name).and_then(|d| d.group.as_deref()),
        };
        let Some(group) = group else {
            return vec![port.clone()];
        };
        let inputs = self
            .schema
            .inputs
            .iter()
            .filter(|d| d.group.as_deref() == Some(group))
            .map(|d| Port::Input(d.name.clone()));
        let outputs = self
            .schema
            .outputs
            .iter()
            .filter(|d| d.group.as_deref() == Some(group))
            .map(|d| Port::Output(d.name.clone()));
        inputs.chain(outputs).collect()
    }

    /// How an input's kind is currently decided. `wired` is the kind of the
    /// connected output, if any.
    pub fn resolution(&self, name: &str, wired: Option<Kind>) -> Option<Resolution> {
        let def = self.schema.find_input(name)?;
        let slot = self.inputs.get(name)?;
        let chosen = slot.config.literal.as_ref().map(|v| v.kind());
        Some(resolve_kind(def.accepts(), wired, chosen))
    }

    // -- Lifecycle --

    fn transition(&mut self, allowed: &[Lifecycle], to: Lifecycle) -> Result<(), NodeError> {
        if !allowed.contains(&self.state) {
            return Err(NodeError::InvalidTransition {
                block: self.uuid,
                from: self.state,
                to,
            });
        }
        tracing::debug!(block = %self.uuid, from = ?self.state, ?to, "node lifecycle");
        self.state = to;
        Ok(())
    }

    /// Subscribe the node to its own input cells. No externally visible effect
    /// until the node is enabled.
    pub fn prepare(&mut self, id: NodeId, cells: &mut CellStore) -> Result<(), NodeError> {
        self.transition(&[Lifecycle::Constructed], Lifecycle::Prepared)?;
        for slot in self.inputs.values() {
            let sub = cells.subscribe(slot.cell, Target::Node(id))?;
            self.subscriptions.push(sub);
        }
        Ok(())
    }

    pub fn enable(&mut self) -> Result<(), NodeError> {
        self.transition(
            &[Lifecycle::Prepared, Lifecycle::Disabled, Lifecycle::Burned],
            Lifecycle::Enabled,
        )
    }

    /// Stop recalculating and ticking. Identity and cells are kept.
    pub fn disable(&mut self) -> Result<(), NodeError> {
        self.transition(&[Lifecycle::Enabled, Lifecycle::Burned], Lifecycle::Disabled)?;
        self.behavior.reset();
        Ok(())
    }

    /// Enter the burned state after a fault. Outputs keep their last value.
    pub fn disable_and_burn(&mut self) -> Result<(), NodeError> {
        self.transition(&[Lifecycle::Enabled], Lifecycle::Burned)?;
        self.behavior.reset();
        Ok(())
    }

    /// Release every subscription and cell. The node is unusable afterwards.
    pub fn destroy(&mut self, cells: &mut CellStore) {
        for sub in self.subscriptions.drain(..) {
            cells.unsubscribe(sub);
        }
        for slot in self.inputs.values() {
            cells.remove(slot.cell);
        }
        for cell in self.outputs.values() {
            cells.remove(*cell);
        }
        tracing::debug!(block = %self.uuid, "node destroyed");
        self.state = Lifecycle::Destroyed;
    }

    // -- Evaluation --

    pub fn gather(&self, cells: &CellStore) -> Inputs {
        let mut inputs = Inputs::new();
        for (name, slot) in &self.inputs {
            if let Some(value) = cells.get(slot.cell) {
                inputs.insert(name.clone(), value.clone());
            }
        }
        inputs
    }

    pub fn calculate(&mut self, cells: &CellStore) -> Result<Outputs, Fault> {
        let inputs = self.gather(cells);
        self.behavior.calculate(&inputs)
    }

    pub fn tick(&mut self, cells: &CellStore, world: &mut dyn World, dt: f64) -> Result<Outputs, Fault> {
        let inputs = self.gather(cells);
        let mut ctx = TickContext {
            dt,
            inputs: &inputs,
            world,
            object: self.object,
        };
        self.behavior.on_tick(&mut ctx)
    }

    // -- Controls --

    /// Feed a key event to every controlled input. Returns the cell writes
    /// for bindings that jump straight to their target.
    pub(crate) fn control_event(
        &mut self,
        cells: &CellStore,
        key: &KeyCode,
        pressed: bool,
    ) -> Vec<(CellId, Value)> {
        let mut writes = Vec::new();
        for def in &self.schema.inputs {
            let Some(slot) = self.inputs.get_mut(&def.name) else {
                continue;
            };
            let Some(kind) = cells.kind(slot.cell) else {
                continue;
            };
            if !slot.config.controlled {
                continue;
            }
            let rest = slot.config.literal_for(def, kind);
            let Some(binding) = &slot.config.control else {
                continue;
            };
            let target = binding.on_key(&mut slot.config.control_state, key, pressed, kind, &rest);
            if let Some(target) = target {
                if !binding.is_smooth() {
                    writes.push((slot.cell, target));
                }
            }
        }
        writes
    }

    /// Next values for smooth bindings still moving toward their target.
    pub(crate) fn smooth_step(&self, cells: &CellStore, rate: f64, dt: f64) -> Vec<(CellId, Value)> {
        self.inputs
            .values()
            .filter(|slot| slot.config.controlled)
            .filter(|slot| slot.config.control.as_ref().is_some_and(|b| b.is_smooth()))
            .filter_map(|slot| {
                let current = cells.get(slot.cell)?;
                let next = slot.config.control_state.step_smooth(current, rate, dt)?;
                Some((slot.cell, next))
            })
            .collect()
    }
}
