//! The circuit: every placed block, its cells, and the wires between them.
//!
//! [`Circuit`] is the engine's single entry point. All propagation for one
//! external stimulus (a placement, a config update, a key event, a tick)
//! finishes before the call returns.
//!
//! Engine-internal listeners are routed through [`Propagation`], which
//! forwards values across wires, retypes consumers whose producer changed
//! kind, and recalculates enabled nodes. Wires whose consumer cannot follow
//! a producer's new kind are collected during the cascade and dropped when
//! it completes.

use std::collections::BTreeMap;

use slotmap::SlotMap;

use crate::behavior::{Fault, Outputs};
use crate::catalog::BlockKind;
use crate::cell::{CellChange, CellError, CellStore, Dispatch, Observer, Target};
use crate::config::CircuitConfig;
use crate::connector::Resolution;
use crate::control::ControlBinding;
use crate::event::CircuitEvent;
use crate::graph::Graph;
use crate::id::{BlockUuid, CellId, InputRef, NodeId, ObjectRef, OutputRef, SubscriptionId};
use crate::node::{BlockNode, Lifecycle, NodeError, Port};
use crate::value::{Color, KeyCode, Value};
use crate::world::{Pose, World, WorldError};

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum PlaceError {
    #[error("a block with uuid {0} already exists")]
    DuplicateUuid(BlockUuid),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Node(#[from] NodeError),
}

// ===========================================================================
// Propagation
// ===========================================================================

/// Routes cell notifications to wires and nodes during a cascade.
pub(crate) struct Propagation<'a> {
    graph: &'a mut Graph,
    events: &'a mut Vec<CircuitEvent>,
    burns: &'a mut Vec<ObjectRef>,
    stale: &'a mut Vec<InputRef>,
}

impl Propagation<'_> {
    /// Re-run a node's `calculate` and write its outputs. Disabled, burned
    /// and unprepared nodes are skipped.
    pub(crate) fn recalculate(&mut self, cells: &mut CellStore, id: NodeId) -> Result<(), CellError> {
        let Some(node) = self.graph.nodes.get_mut(id) else {
            return Ok(());
        };
        if !node.is_enabled() {
            return Ok(());
        }
        let result = node.calculate(cells);
        self.apply(cells, id, result)
    }

    /// Write a node's outputs, or burn it on a fault.
    pub(crate) fn apply(
        &mut self,
        cells: &mut CellStore,
        id: NodeId,
        result: Result<Outputs, Fault>,
    ) -> Result<(), CellError> {
        match result {
            Ok(outputs) => {
                for (name, value) in outputs {
                    let Some(cell) = self.graph.nodes.get(id).and_then(|n| n.output_cell(name)) else {
                        continue;
                    };
                    cells.set(cell, value, false, self)?;
                }
                Ok(())
            }
            Err(fault) => {
                self.burn(id, fault);
                Ok(())
            }
        }
    }

    fn burn(&mut self, id: NodeId, fault: Fault) {
        let Some(node) = self.graph.nodes.get_mut(id) else {
            return;
        };
        if node.disable_and_burn().is_err() {
            return;
        }
        tracing::warn!(block = %node.uuid(), kind = %node.kind(), %fault, "block burned");
        self.burns.push(node.object());
        self.events.push(CircuitEvent::Burned {
            uuid: node.uuid(),
            fault,
        });
    }

    /// Carry a producer's new value into a wired input.
    fn forward(
        &mut self,
        cells: &mut CellStore,
        input_cell: CellId,
        input: &InputRef,
        value: &Value,
    ) -> Result<(), CellError> {
        let incoming = value.kind();
        match cells.kind(input_cell) {
            None => Ok(()),
            Some(kind) if kind == incoming => {
                cells.set(input_cell, value.clone(), false, self)?;
                Ok(())
            }
            Some(_) => {
                // The producer changed kind: the consumer side follows if it
                // can, otherwise the wire goes stale.
                let Some(id) = self.graph.node_id(input.block) else {
                    return Ok(());
                };
                let component = self
                    .graph
                    .component((id, Port::Input(input.name.clone())), Some(input));
                if self.graph.allowed(&component).contains(incoming) {
                    let touched = self.graph.retype(cells, &component, incoming)?;
                    cells.set(input_cell, value.clone(), false, self)?;
                    for node in touched {
                        self.recalculate(cells, node)?;
                    }
                } else if !self.stale.contains(input) {
                    self.stale.push(input.clone());
                }
                Ok(())
            }
        }
    }
}

impl Dispatch for Propagation<'_> {
    fn deliver(
        &mut self,
        cells: &mut CellStore,
        target: &Target,
        change: &CellChange,
    ) -> Result<(), CellError> {
        match target {
            Target::Wire { input_cell, input } => self.forward(cells, *input_cell, input, &change.current),
            Target::Node(id) => self.recalculate(cells, *id),
        }
    }
}

// ===========================================================================
// Circuit
// ===========================================================================

/// State taken before a graph edit, restored if the edit fails.
struct Checkpoint {
    nodes: SlotMap<NodeId, BlockNode>,
    values: Vec<(CellId, Value)>,
    wires: BTreeMap<InputRef, OutputRef>,
    events: usize,
    burns: usize,
}

/// A live block circuit.
///
/// Owns the cell store, the nodes, and the wire manager. Collaborators are
/// passed into the operations that need them; the circuit holds no
/// reference to the host.
#[derive(Debug)]
pub struct Circuit {
    pub(crate) config: CircuitConfig,
    pub(crate) cells: CellStore,
    pub(crate) graph: Graph,
    pub(crate) events: Vec<CircuitEvent>,
    pending_burns: Vec<ObjectRef>,
    stale: Vec<InputRef>,
    ticks: u64,
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new(CircuitConfig::default())
    }
}

impl Circuit {
    pub fn new(config: CircuitConfig) -> Self {
        Self {
            cells: CellStore::with_limits(config.max_propagation_depth, config.reentrancy),
            config,
            graph: Graph::default(),
            events: Vec::new(),
            pending_burns: Vec::new(),
            stale: Vec::new(),
            ticks: 0,
        }
    }

    pub fn config(&self) -> &CircuitConfig {
        &self.config
    }

    /// Run a cascade with the engine dispatcher.
    pub(crate) fn propagate<R>(
        &mut self,
        f: impl FnOnce(&mut CellStore, &mut Propagation<'_>) -> Result<R, CellError>,
    ) -> Result<R, CellError> {
        let mut prop = Propagation {
            graph: &mut self.graph,
            events: &mut self.events,
            burns: &mut self.pending_burns,
            stale: &mut self.stale,
        };
        f(&mut self.cells, &mut prop)
    }

    /// Drop every wire marked stale during the last cascade. Dropping a wire
    /// reverts its input, which may mark further wires stale.
    pub(crate) fn prune_stale(&mut self) -> Result<(), CellError> {
        while !self.stale.is_empty() {
            let input = self.stale.remove(0);
            let Some(wire) = self.graph.wires.remove(&input) else {
                continue;
            };
            self.cells.unsubscribe(wire.subscription);
            tracing::warn!(output = %wire.output, %input, "dropped wire after producer changed kind");
            self.events.push(CircuitEvent::WireDropped {
                output: wire.output,
                input: input.clone(),
            });
            self.revert_input(&input)?;
        }
        Ok(())
    }

    /// Put an unwired input back on its literal value at its current kind.
    pub(crate) fn revert_input(&mut self, input: &InputRef) -> Result<(), CellError> {
        let Some(node) = self.graph.node(input.block) else {
            return Ok(());
        };
        let (Some(def), Some(slot)) = (node.schema().find_input(&input.name), node.input(&input.name)) else {
            return Ok(());
        };
        let cell = slot.cell;
        let Some(kind) = self.cells.kind(cell) else {
            return Ok(());
        };
        let value = slot.config.literal_for(def, kind);
        self.propagate(|cells, prop| cells.set(cell, value, false, prop).map(|_| ()))
    }

    fn lookup(&self, uuid: BlockUuid) -> Result<NodeId, NodeError> {
        self.graph.node_id(uuid).ok_or(NodeError::UnknownBlock(uuid))
    }

    /// Run a graph edit. If it fails, nodes, cell values, wires and queued
    /// events go back to how they were before the edit started.
    pub(crate) fn transaction<R, E>(&mut self, edit: impl FnOnce(&mut Self) -> Result<R, E>) -> Result<R, E> {
        let checkpoint = Checkpoint {
            nodes: self.graph.nodes.clone(),
            values: self.cells.values(),
            wires: self.wires().map(|(i, o)| (i.clone(), o.clone())).collect(),
            events: self.events.len(),
            burns: self.pending_burns.len(),
        };
        let result = edit(self);
        if result.is_err() {
            self.rollback(checkpoint);
        }
        result
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        self.graph.nodes = checkpoint.nodes;
        let before = checkpoint.wires;
        let added: Vec<InputRef> = self
            .wires()
            .filter(|(i, o)| before.get(*i) != Some(*o))
            .map(|(i, _)| i.clone())
            .collect();
        for input in added {
            if let Some(wire) = self.graph.wires.remove(&input) {
                self.cells.unsubscribe(wire.subscription);
            }
        }
        for (input, output) in before {
            if self.graph.wires.source(&input).is_some() {
                continue;
            }
            let (Some(out_cell), Some(in_cell)) = (self.graph.output_cell(&output), self.graph.input_cell(&input))
            else {
                continue;
            };
            let target = Target::Wire {
                input_cell: in_cell,
                input: input.clone(),
            };
            match self.cells.subscribe(out_cell, target) {
                Ok(subscription) => self.graph.wires.insert(input, output, subscription),
                Err(err) => tracing::warn!(%input, error = %err, "could not restore wire"),
            }
        }
        self.cells.restore(checkpoint.values);
        self.events.truncate(checkpoint.events);
        self.pending_burns.truncate(checkpoint.burns);
        self.stale.clear();
        tracing::debug!("rolled back failed edit");
    }

    // -----------------------------------------------------------------------
    // Placement
    // -----------------------------------------------------------------------

    /// Place a new block and enable it.
    pub fn place(&mut self, world: &mut dyn World, kind: BlockKind, pose: Pose) -> Result<BlockUuid, PlaceError> {
        let uuid = BlockUuid::new();
        self.insert_block(world, uuid, kind, pose)?;
        self.enable_block(uuid)?;
        Ok(uuid)
    }

    /// Create and prepare a block with a known uuid, leaving it disabled.
    /// Used by loaders that configure and wire everything before enabling.
    pub fn insert_block(
        &mut self,
        world: &mut dyn World,
        uuid: BlockUuid,
        kind: BlockKind,
        pose: Pose,
    ) -> Result<(), PlaceError> {
        if self.graph.by_uuid.contains_key(&uuid) {
            return Err(PlaceError::DuplicateUuid(uuid));
        }
        let object = world.spawn(kind, &pose)?;
        let node = BlockNode::new(uuid, kind, object, pose, &mut self.cells);
        let id = self.graph.nodes.insert(node);
        self.graph.by_uuid.insert(uuid, id);
        self.graph.order.push(id);

        if let Err(err) = self.graph.nodes[id].prepare(id, &mut self.cells) {
            self.forget(world, id);
            return Err(err.into());
        }
        tracing::debug!(block = %uuid, %kind, "block placed");
        self.events.push(CircuitEvent::Placed { uuid, kind });
        Ok(())
    }

    pub fn set_appearance(
        &mut self,
        uuid: BlockUuid,
        col: Option<Color>,
        mat: Option<String>,
    ) -> Result<(), NodeError> {
        let node = self.graph.node_mut(uuid).ok_or(NodeError::UnknownBlock(uuid))?;
        node.col = col;
        node.mat = mat;
        Ok(())
    }

    pub fn move_block(&mut self, world: &mut dyn World, uuid: BlockUuid, pose: Pose) -> Result<(), NodeError> {
        let node = self.graph.node_mut(uuid).ok_or(NodeError::UnknownBlock(uuid))?;
        node.pose = pose;
        world.move_object(node.object(), &pose);
        Ok(())
    }

    /// Remove a block. Its incoming wires vanish with it; inputs it drove
    /// revert to their literal values.
    pub fn delete(&mut self, world: &mut dyn World, uuid: BlockUuid) -> Result<(), NodeError> {
        let id = self.lookup(uuid)?;
        self.transaction(|circuit| circuit.detach(uuid))?;
        self.forget(world, id);
        self.events.push(CircuitEvent::Removed { uuid });
        Ok(())
    }

    /// Drop every wire touching a block, reverting the inputs it drove.
    fn detach(&mut self, uuid: BlockUuid) -> Result<(), NodeError> {
        for (input, output) in self.graph.wires.touching(uuid) {
            let Some(wire) = self.graph.wires.remove(&input) else {
                continue;
            };
            self.cells.unsubscribe(wire.subscription);
            self.events.push(CircuitEvent::Disconnected {
                output,
                input: input.clone(),
            });
            if input.block != uuid {
                self.revert_input(&input)?;
            }
        }
        self.prune_stale()?;
        Ok(())
    }

    /// Destroy a node and release its object. Wires must already be gone.
    fn forget(&mut self, world: &mut dyn World, id: NodeId) {
        let Some(mut node) = self.graph.nodes.remove(id) else {
            return;
        };
        self.graph.by_uuid.remove(&node.uuid());
        self.graph.order.retain(|n| *n != id);
        node.destroy(&mut self.cells);
        let object = node.object();
        self.pending_burns.retain(|o| *o != object);
        world.despawn(object);
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Enable a prepared, disabled or burned block and recalculate it.
    pub fn enable_block(&mut self, uuid: BlockUuid) -> Result<(), NodeError> {
        let id = self.lookup(uuid)?;
        let node = &mut self.graph.nodes[id];
        let previous = node.state();
        node.enable()?;
        if matches!(previous, Lifecycle::Disabled | Lifecycle::Burned) {
            self.events.push(CircuitEvent::Reenabled { uuid });
        }
        self.propagate(|cells, prop| prop.recalculate(cells, id))?;
        self.prune_stale()?;
        Ok(())
    }

    pub fn disable_block(&mut self, uuid: BlockUuid) -> Result<(), NodeError> {
        let id = self.lookup(uuid)?;
        self.graph.nodes[id].disable()
    }

    // -----------------------------------------------------------------------
    // Config
    // -----------------------------------------------------------------------

    /// Set an input's literal value.
    ///
    /// The literal is always stored. It reaches the cell only when the input
    /// is neither wired nor controlled. A literal of a new kind retypes the
    /// input's group, and everything connected to it when possible; wires
    /// whose consumer cannot follow are dropped.
    pub fn update_config(&mut self, uuid: BlockUuid, name: &str, value: Value) -> Result<(), NodeError> {
        self.transaction(|circuit| circuit.apply_config(uuid, name, value))
    }

    fn apply_config(&mut self, uuid: BlockUuid, name: &str, value: Value) -> Result<(), NodeError> {
        let id = self.lookup(uuid)?;
        let input = InputRef::new(uuid, name);
        let node = &self.graph.nodes[id];
        let unknown_input = || NodeError::UnknownInput {
            block: uuid,
            name: name.to_string(),
        };
        let def = node.schema().find_input(name).ok_or_else(unknown_input)?;
        let slot = node.input(name).ok_or_else(unknown_input)?;
        let kind = value.kind();
        if !def.accepts().contains(kind) {
            return Err(NodeError::KindNotAccepted {
                block: uuid,
                name: name.to_string(),
                kind,
            });
        }
        let cell = slot.cell;
        let wired = self.graph.wires.source(&input).is_some();
        let controlled = slot.config.controlled;
        let current = self.cells.kind(cell);

        // Work out the retype plan before touching anything.
        let port = Port::Input(name.to_string());
        let retype = if wired || controlled || current == Some(kind) {
            None
        } else {
            let component = self.graph.component((id, port.clone()), None);
            if self.graph.allowed(&component).contains(kind) {
                Some(component)
            } else {
                let members = node.group_members(&port);
                for member in &members {
                    if let Port::Input(sibling) = member {
                        let sibling_ref = InputRef::new(uuid, sibling.clone());
                        if self.graph.wires.source(&sibling_ref).is_some() {
                            return Err(NodeError::KindPinned {
                                block: uuid,
                                name: name.to_string(),
                                held: current.unwrap_or(kind),
                            });
                        }
                    }
                }
                Some(members.into_iter().map(|p| (id, p)).collect())
            }
        };

        if let Some(slot) = self.graph.nodes[id].input_mut(name) {
            slot.config.literal = Some(value.clone());
        }
        if wired || controlled {
            return Ok(());
        }

        match retype {
            Some(component) => {
                let touched = self.graph.retype(&mut self.cells, &component, kind)?;
                let mismatched = self.mismatched_consumers(&component);
                self.propagate(|cells, prop| {
                    for node in touched {
                        prop.recalculate(cells, node)?;
                    }
                    // A local retype may leave consumers on the old kind even
                    // when the recalculated output happens to equal the default.
                    for (input_cell, input, value) in mismatched {
                        prop.forward(cells, input_cell, &input, &value)?;
                    }
                    Ok(())
                })?;
            }
            None => {
                self.propagate(|cells, prop| cells.set(cell, value, false, prop).map(|_| ()))?;
            }
        }
        self.prune_stale()?;
        Ok(())
    }

    /// Wires leaving `component` whose consumer holds a different kind than
    /// the producer, with the producer's current value.
    fn mismatched_consumers(&self, component: &[(NodeId, Port)]) -> Vec<(CellId, InputRef, Value)> {
        let mut found = Vec::new();
        for (id, port) in component {
            let (Some(node), Port::Output(name)) = (self.graph.nodes.get(*id), port) else {
                continue;
            };
            let output = OutputRef::new(node.uuid(), name.clone());
            let Some(value) = node.output_cell(name).and_then(|c| self.cells.get(c)) else {
                continue;
            };
            for input in self.graph.wires.consumers(&output) {
                let Some(cell) = self.graph.input_cell(input) else {
                    continue;
                };
                if self.cells.kind(cell) != Some(value.kind()) {
                    found.push((cell, input.clone(), value.clone()));
                }
            }
        }
        found
    }

    /// Install or clear the control binding of a controllable input.
    pub fn set_control_binding(
        &mut self,
        uuid: BlockUuid,
        name: &str,
        binding: Option<ControlBinding>,
    ) -> Result<(), NodeError> {
        self.transaction(|circuit| circuit.bind_control(uuid, name, binding))
    }

    fn bind_control(&mut self, uuid: BlockUuid, name: &str, binding: Option<ControlBinding>) -> Result<(), NodeError> {
        let id = self.lookup(uuid)?;
        let node = &self.graph.nodes[id];
        let def = node.schema().find_input(name).ok_or_else(|| NodeError::UnknownInput {
            block: uuid,
            name: name.to_string(),
        })?;
        if !def.controllable {
            return Err(NodeError::NotControllable {
                block: uuid,
                name: name.to_string(),
            });
        }
        let cleared = binding.is_none();
        let was_controlled = node.input(name).is_some_and(|s| s.config.controlled);
        if let Some(slot) = self.graph.nodes[id].input_mut(name) {
            slot.config.control = binding;
            slot.config.reset_control_state();
        }
        if cleared && was_controlled {
            self.switch_control(uuid, name, false)?;
        }
        Ok(())
    }

    /// Switch an input between its literal config and its control binding.
    /// Either way the input restarts from its literal value.
    pub fn set_control(&mut self, uuid: BlockUuid, name: &str, enabled: bool) -> Result<(), NodeError> {
        self.transaction(|circuit| circuit.switch_control(uuid, name, enabled))
    }

    fn switch_control(&mut self, uuid: BlockUuid, name: &str, enabled: bool) -> Result<(), NodeError> {
        let id = self.lookup(uuid)?;
        let input = InputRef::new(uuid, name);
        let node = &self.graph.nodes[id];
        let def = node.schema().find_input(name).ok_or_else(|| NodeError::UnknownInput {
            block: uuid,
            name: name.to_string(),
        })?;
        let slot = node.input(name).ok_or_else(|| NodeError::UnknownInput {
            block: uuid,
            name: name.to_string(),
        })?;
        let cell = slot.cell;
        let kind = self.cells.kind(cell).unwrap_or(def.provisional_kind());
        if enabled {
            if !def.controllable {
                return Err(NodeError::NotControllable {
                    block: uuid,
                    name: name.to_string(),
                });
            }
            let binding = slot.config.control.as_ref().ok_or_else(|| NodeError::NoControlBinding {
                block: uuid,
                name: name.to_string(),
            })?;
            if !binding.supports(kind) {
                return Err(NodeError::ControlUnsupported {
                    name: name.to_string(),
                    kind,
                });
            }
            if self.graph.wires.source(&input).is_some() {
                return Err(NodeError::Wired {
                    block: uuid,
                    name: name.to_string(),
                });
            }
        }
        let rest = slot.config.literal_for(def, kind);
        let wired = self.graph.wires.source(&input).is_some();
        if let Some(slot) = self.graph.nodes[id].input_mut(name) {
            slot.config.controlled = enabled;
            slot.config.reset_control_state();
        }
        if !wired {
            self.propagate(|cells, prop| cells.set(cell, rest, false, prop).map(|_| ()))?;
            self.prune_stale()?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Stimuli
    // -----------------------------------------------------------------------

    pub fn key_down(&mut self, key: &KeyCode) -> Result<(), CellError> {
        self.key_event(key, true)
    }

    pub fn key_up(&mut self, key: &KeyCode) -> Result<(), CellError> {
        self.key_event(key, false)
    }

    fn key_event(&mut self, key: &KeyCode, pressed: bool) -> Result<(), CellError> {
        let mut writes = Vec::new();
        for &id in &self.graph.order {
            if let Some(node) = self.graph.nodes.get_mut(id) {
                if node.is_enabled() {
                    writes.extend(node.control_event(&self.cells, key, pressed));
                }
            }
        }
        self.propagate(|cells, prop| {
            for (cell, value) in writes {
                cells.set(cell, value, false, prop)?;
            }
            Ok(())
        })?;
        self.prune_stale()
    }

    /// Advance one frame: step smooth controls, then run every tick-driven
    /// block in construction order.
    pub fn tick(&mut self, world: &mut dyn World, dt: f64) -> Result<(), CellError> {
        self.ticks += 1;
        let order = self.graph.order.clone();
        let rate = self.config.smoothing_rate;

        for &id in &order {
            let writes = match self.graph.nodes.get(id) {
                Some(node) if node.is_enabled() => node.smooth_step(&self.cells, rate, dt),
                _ => continue,
            };
            self.propagate(|cells, prop| {
                for (cell, value) in writes {
                    cells.set(cell, value, false, prop)?;
                }
                Ok(())
            })?;
        }

        for &id in &order {
            let result = match self.graph.nodes.get_mut(id) {
                Some(node) if node.is_enabled() && node.ticks() => node.tick(&self.cells, world, dt),
                _ => continue,
            };
            self.propagate(|cells, prop| prop.apply(cells, id, result))?;
        }
        self.prune_stale()
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    // -----------------------------------------------------------------------
    // Host hand-off
    // -----------------------------------------------------------------------

    /// Take every event queued since the last drain.
    pub fn drain_events(&mut self) -> Vec<CircuitEvent> {
        std::mem::take(&mut self.events)
    }

    /// Forward queued burn effects to the world.
    pub fn flush_effects(&mut self, world: &mut dyn World) {
        for object in self.pending_burns.drain(..) {
            world.burn(object);
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.graph.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.nodes.is_empty()
    }

    pub fn block(&self, uuid: BlockUuid) -> Option<&BlockNode> {
        self.graph.node(uuid)
    }

    /// Blocks in construction order.
    pub fn blocks(&self) -> impl Iterator<Item = &BlockNode> {
        self.graph.order.iter().filter_map(|id| self.graph.nodes.get(*id))
    }

    pub fn input_value(&self, input: &InputRef) -> Option<&Value> {
        self.cells.get(self.graph.input_cell(input)?)
    }

    pub fn output_value(&self, output: &OutputRef) -> Option<&Value> {
        self.cells.get(self.graph.output_cell(output)?)
    }

    pub fn wire_into(&self, input: &InputRef) -> Option<&OutputRef> {
        self.graph.wires.source(input)
    }

    /// Every wire as `(input, output)`.
    pub fn wires(&self) -> impl Iterator<Item = (&InputRef, &OutputRef)> {
        self.graph.wires.iter()
    }

    pub fn wire_count(&self) -> usize {
        self.graph.wires.len()
    }

    /// How an input's kind is currently decided.
    pub fn resolution(&self, input: &InputRef) -> Option<Resolution> {
        let node = self.graph.node(input.block)?;
        let wired = self
            .wire_into(input)
            .and_then(|o| self.graph.output_cell(o))
            .and_then(|c| self.cells.kind(c));
        node.resolution(&input.name, wired)
    }

    /// Writes that hit a cell while it was notifying.
    pub fn reentrant_writes(&self) -> u64 {
        self.cells.reentrant_writes()
    }

    /// Watch an output cell. The observer runs synchronously on every change.
    pub fn observe_output(&mut self, output: &OutputRef, observer: Observer) -> Result<SubscriptionId, NodeError> {
        let cell = self
            .graph
            .output_cell(output)
            .ok_or_else(|| NodeError::UnknownOutput {
                block: output.block,
                name: output.name.clone(),
            })?;
        Ok(self.cells.observe(cell, observer)?)
    }

    pub fn unobserve(&mut self, subscription: SubscriptionId) -> bool {
        self.cells.unsubscribe(subscription)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReentrancyPolicy;
    use crate::control::{ControlMode, ControlValue, KeyBinding, RotationBinding};
    use crate::value::{Kind, Vec3};
    use crate::wire::{ConnectError, DisconnectError};
    use crate::world::{Actuation, HeadlessWorld, Sensor};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn out(block: BlockUuid, name: &str) -> OutputRef {
        OutputRef::new(block, name)
    }

    fn inp(block: BlockUuid, name: &str) -> InputRef {
        InputRef::new(block, name)
    }

    fn setup() -> (Circuit, HeadlessWorld) {
        (Circuit::default(), HeadlessWorld::new())
    }

    fn constant(circuit: &mut Circuit, world: &mut HeadlessWorld, value: Value) -> BlockUuid {
        let uuid = circuit.place(world, BlockKind::Constant, Pose::default()).unwrap();
        circuit.update_config(uuid, "value", value).unwrap();
        uuid
    }

    fn counter(circuit: &mut Circuit, output: &OutputRef) -> Rc<RefCell<Vec<Value>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        circuit
            .observe_output(
                output,
                Box::new(move |change| {
                    sink.borrow_mut().push(change.current.clone());
                    Vec::new()
                }),
            )
            .unwrap();
        log
    }

    // -----------------------------------------------------------------------
    // Propagation
    // -----------------------------------------------------------------------

    #[test]
    fn and_gate_notifies_once_per_transition() {
        let (mut circuit, mut world) = setup();
        let a = constant(&mut circuit, &mut world, Value::Bool(true));
        let b = constant(&mut circuit, &mut world, Value::Bool(false));
        let gate = circuit.place(&mut world, BlockKind::AndGate, Pose::default()).unwrap();
        circuit.connect(&out(a, "value"), &inp(gate, "value1")).unwrap();
        circuit.connect(&out(b, "value"), &inp(gate, "value2")).unwrap();
        assert_eq!(circuit.output_value(&out(gate, "result")), Some(&Value::Bool(false)));

        let log = counter(&mut circuit, &out(gate, "result"));
        circuit.update_config(b, "value", Value::Bool(true)).unwrap();
        assert_eq!(*log.borrow(), vec![Value::Bool(true)]);

        circuit.update_config(b, "value", Value::Bool(true)).unwrap();
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn chained_math_settles_in_one_cascade() {
        let (mut circuit, mut world) = setup();
        let x = constant(&mut circuit, &mut world, Value::Number(2.0));
        let y = constant(&mut circuit, &mut world, Value::Number(3.0));
        let add = circuit.place(&mut world, BlockKind::Add, Pose::default()).unwrap();
        let mul = circuit.place(&mut world, BlockKind::Multiply, Pose::default()).unwrap();
        circuit.connect(&out(x, "value"), &inp(add, "value1")).unwrap();
        circuit.connect(&out(y, "value"), &inp(add, "value2")).unwrap();
        circuit.connect(&out(add, "result"), &inp(mul, "value1")).unwrap();
        circuit.update_config(mul, "value2", Value::Number(10.0)).unwrap();
        assert_eq!(circuit.output_value(&out(mul, "result")), Some(&Value::Number(50.0)));

        circuit.update_config(x, "value", Value::Number(7.0)).unwrap();
        assert_eq!(circuit.output_value(&out(mul, "result")), Some(&Value::Number(100.0)));
    }

    #[test]
    fn not_gate_outputs_true_after_placement() {
        let (mut circuit, mut world) = setup();
        let not = circuit.place(&mut world, BlockKind::NotGate, Pose::default()).unwrap();
        assert_eq!(circuit.output_value(&out(not, "result")), Some(&Value::Bool(true)));
    }

    #[test]
    fn feedback_loop_through_not_gate_settles() {
        let (mut circuit, mut world) = setup();
        let not = circuit.place(&mut world, BlockKind::NotGate, Pose::default()).unwrap();
        circuit.connect(&out(not, "result"), &inp(not, "value")).unwrap();
        // true flows in, the gate answers false, and that write lands on the
        // input while it is still notifying.
        assert_eq!(circuit.reentrant_writes(), 1);
        assert_eq!(circuit.input_value(&inp(not, "value")), Some(&Value::Bool(false)));
        assert_eq!(circuit.output_value(&out(not, "result")), Some(&Value::Bool(false)));
        assert_eq!(circuit.wire_count(), 1);
    }

    // -----------------------------------------------------------------------
    // Rollback
    // -----------------------------------------------------------------------

    fn limited(max_propagation_depth: u32, reentrancy: ReentrancyPolicy) -> Circuit {
        Circuit::new(CircuitConfig {
            max_propagation_depth,
            reentrancy,
            ..CircuitConfig::default()
        })
    }

    #[test]
    fn rejected_feedback_connect_leaves_graph_unchanged() {
        let mut circuit = limited(256, ReentrancyPolicy::Reject);
        let mut world = HeadlessWorld::new();
        let not = circuit.place(&mut world, BlockKind::NotGate, Pose::default()).unwrap();
        circuit.update_config(not, "value", Value::Bool(true)).unwrap();
        circuit.drain_events();

        let err = circuit.connect(&out(not, "result"), &inp(not, "value")).unwrap_err();
        assert!(matches!(err, ConnectError::Cell(CellError::Reentrant(_))));
        assert_eq!(circuit.wire_count(), 0);
        assert!(circuit.drain_events().is_empty());
        assert_eq!(circuit.input_value(&inp(not, "value")), Some(&Value::Bool(true)));
        assert_eq!(circuit.output_value(&out(not, "result")), Some(&Value::Bool(false)));

        circuit.update_config(not, "value", Value::Bool(false)).unwrap();
        assert_eq!(circuit.output_value(&out(not, "result")), Some(&Value::Bool(true)));
    }

    #[test]
    fn config_update_past_depth_limit_is_undone() {
        let mut circuit = limited(2, ReentrancyPolicy::Settle);
        let mut world = HeadlessWorld::new();
        let c = constant(&mut circuit, &mut world, Value::Number(1.0));
        let add = circuit.place(&mut world, BlockKind::Add, Pose::default()).unwrap();
        circuit.connect(&out(c, "value"), &inp(add, "value1")).unwrap();
        assert_eq!(circuit.output_value(&out(add, "result")), Some(&Value::Number(1.0)));

        let err = circuit.update_config(c, "value", Value::Number(2.0)).unwrap_err();
        assert!(matches!(err, NodeError::Cell(CellError::DepthExceeded { limit: 2 })));
        let slot = circuit.block(c).unwrap().input("value").unwrap();
        assert_eq!(slot.config.literal, Some(Value::Number(1.0)));
        assert_eq!(circuit.output_value(&out(c, "value")), Some(&Value::Number(1.0)));
        assert_eq!(circuit.output_value(&out(add, "result")), Some(&Value::Number(1.0)));
    }

    #[test]
    fn failed_delete_keeps_block_and_wires() {
        let mut circuit = limited(2, ReentrancyPolicy::Settle);
        let mut world = HeadlessWorld::new();
        let c = constant(&mut circuit, &mut world, Value::Number(1.0));
        let add = circuit.place(&mut world, BlockKind::Add, Pose::default()).unwrap();
        let mul = circuit.place(&mut world, BlockKind::Multiply, Pose::default()).unwrap();
        circuit.update_config(add, "value1", Value::Number(7.0)).unwrap();
        circuit.connect(&out(c, "value"), &inp(add, "value1")).unwrap();
        circuit.connect(&out(add, "result"), &inp(mul, "value1")).unwrap();
        circuit.drain_events();

        // Reverting add.value1 to 7 pushes a change one level too deep.
        let err = circuit.delete(&mut world, c).unwrap_err();
        assert!(matches!(err, NodeError::Cell(CellError::DepthExceeded { .. })));
        assert_eq!(circuit.len(), 3);
        assert_eq!(world.objects.len(), 3);
        assert_eq!(circuit.wire_count(), 2);
        assert_eq!(circuit.wire_into(&inp(add, "value1")), Some(&out(c, "value")));
        assert_eq!(circuit.output_value(&out(add, "result")), Some(&Value::Number(1.0)));
        assert!(circuit.drain_events().is_empty());
    }

    // -----------------------------------------------------------------------
    // Connect / disconnect
    // -----------------------------------------------------------------------

    #[test]
    fn connect_rejects_second_wire_and_incompatible_kinds() {
        let (mut circuit, mut world) = setup();
        let a = constant(&mut circuit, &mut world, Value::Bool(true));
        let b = constant(&mut circuit, &mut world, Value::Bool(false));
        let gate = circuit.place(&mut world, BlockKind::AndGate, Pose::default()).unwrap();
        let concat = circuit.place(&mut world, BlockKind::Concat, Pose::default()).unwrap();
        circuit.connect(&out(a, "value"), &inp(gate, "value1")).unwrap();

        let err = circuit.connect(&out(b, "value"), &inp(gate, "value1")).unwrap_err();
        assert!(matches!(err, ConnectError::AlreadyWired { .. }));
        let err = circuit.connect(&out(gate, "result"), &inp(concat, "value1")).unwrap_err();
        assert!(matches!(err, ConnectError::IncompatibleKinds { .. }));
        assert_eq!(circuit.wire_count(), 1);
    }

    #[test]
    fn group_conflict_leaves_graph_unchanged() {
        let (mut circuit, mut world) = setup();
        let speedo = circuit.place(&mut world, BlockKind::Speedometer, Pose::default()).unwrap();
        let add = circuit.place(&mut world, BlockKind::Add, Pose::default()).unwrap();
        let split = circuit.place(&mut world, BlockKind::VectorSplit, Pose::default()).unwrap();
        circuit.connect(&out(speedo, "speed"), &inp(add, "value1")).unwrap();
        assert_eq!(circuit.input_value(&inp(add, "value2")).map(Value::kind), Some(Kind::Number));

        // add.result is pinned to number through its group; the splitter wants vectors.
        let err = circuit.connect(&out(add, "result"), &inp(split, "vector")).unwrap_err();
        assert!(matches!(err, ConnectError::GroupConflict { .. }));
        assert_eq!(circuit.wire_count(), 1);
        assert_eq!(circuit.input_value(&inp(split, "vector")), Some(&Value::Vector3(Vec3::ZERO)));
    }

    #[test]
    fn connect_respects_literal_kinds_on_the_other_side() {
        let (mut circuit, mut world) = setup();
        let v = constant(&mut circuit, &mut world, Value::Vector3(Vec3::new(1.0, 2.0, 3.0)));
        let n = constant(&mut circuit, &mut world, Value::Number(4.0));
        let add = circuit.place(&mut world, BlockKind::Add, Pose::default()).unwrap();
        circuit.connect(&out(v, "value"), &inp(add, "value1")).unwrap();

        let err = circuit.connect(&out(n, "value"), &inp(add, "value2")).unwrap_err();
        assert!(matches!(err, ConnectError::GroupConflict { .. }));
        assert_eq!(circuit.wire_count(), 1);
        assert_eq!(
            circuit.output_value(&out(v, "value")),
            Some(&Value::Vector3(Vec3::new(1.0, 2.0, 3.0)))
        );
        assert_eq!(circuit.output_value(&out(n, "value")), Some(&Value::Number(4.0)));
        assert_eq!(
            circuit.resolution(&inp(v, "value")),
            Some(Resolution::Chosen(Kind::Vector3))
        );
    }

    #[test]
    fn connect_retypes_polymorphic_consumer_group() {
        let (mut circuit, mut world) = setup();
        let v = constant(&mut circuit, &mut world, Value::Vector3(Vec3::new(1.0, 2.0, 3.0)));
        let add = circuit.place(&mut world, BlockKind::Add, Pose::default()).unwrap();
        circuit.connect(&out(v, "value"), &inp(add, "value1")).unwrap();
        assert_eq!(
            circuit.output_value(&out(add, "result")),
            Some(&Value::Vector3(Vec3::new(1.0, 2.0, 3.0)))
        );
        assert_eq!(
            circuit.resolution(&inp(add, "value1")),
            Some(Resolution::Wired(Kind::Vector3))
        );
    }

    #[test]
    fn disconnect_reverts_to_literal() {
        let (mut circuit, mut world) = setup();
        let a = constant(&mut circuit, &mut world, Value::Number(4.0));
        let add = circuit.place(&mut world, BlockKind::Add, Pose::default()).unwrap();
        circuit.update_config(add, "value1", Value::Number(1.0)).unwrap();
        circuit.connect(&out(a, "value"), &inp(add, "value1")).unwrap();
        assert_eq!(circuit.output_value(&out(add, "result")), Some(&Value::Number(4.0)));

        let from = circuit.disconnect(&inp(add, "value1")).unwrap();
        assert_eq!(from, out(a, "value"));
        assert_eq!(circuit.output_value(&out(add, "result")), Some(&Value::Number(1.0)));
        assert!(matches!(
            circuit.disconnect(&inp(add, "value1")),
            Err(DisconnectError::NotWired(_))
        ));
    }

    #[test]
    fn producer_retype_drops_incompatible_wire() {
        let (mut circuit, mut world) = setup();
        let c = constant(&mut circuit, &mut world, Value::Number(2.0));
        let greater = circuit.place(&mut world, BlockKind::Greater, Pose::default()).unwrap();
        circuit.connect(&out(c, "value"), &inp(greater, "value1")).unwrap();
        assert_eq!(circuit.output_value(&out(greater, "result")), Some(&Value::Bool(true)));
        circuit.drain_events();

        circuit.update_config(c, "value", Value::String("hello".into())).unwrap();
        assert_eq!(circuit.wire_count(), 0);
        assert_eq!(circuit.output_value(&out(greater, "result")), Some(&Value::Bool(false)));
        let events = circuit.drain_events();
        assert!(events.contains(&CircuitEvent::WireDropped {
            output: out(c, "value"),
            input: inp(greater, "value1"),
        }));
    }

    #[test]
    fn producer_retype_carries_compatible_consumer() {
        let (mut circuit, mut world) = setup();
        let c = constant(&mut circuit, &mut world, Value::Number(2.0));
        let add = circuit.place(&mut world, BlockKind::Add, Pose::default()).unwrap();
        circuit.connect(&out(c, "value"), &inp(add, "value1")).unwrap();

        let v = Vec3::new(1.0, 1.0, 0.0);
        circuit.update_config(c, "value", Value::Vector3(v)).unwrap();
        assert_eq!(circuit.wire_count(), 1);
        assert_eq!(circuit.output_value(&out(add, "result")), Some(&Value::Vector3(v)));
    }

    // -----------------------------------------------------------------------
    // Burn
    // -----------------------------------------------------------------------

    #[test]
    fn divide_by_zero_burns_and_freezes_outputs() {
        let (mut circuit, mut world) = setup();
        let div = circuit.place(&mut world, BlockKind::Divide, Pose::default()).unwrap();
        circuit.update_config(div, "value1", Value::Number(8.0)).unwrap();
        circuit.update_config(div, "value2", Value::Number(2.0)).unwrap();
        assert_eq!(circuit.output_value(&out(div, "result")), Some(&Value::Number(4.0)));

        circuit.update_config(div, "value2", Value::Number(0.0)).unwrap();
        assert_eq!(circuit.block(div).unwrap().state(), Lifecycle::Burned);
        assert_eq!(circuit.output_value(&out(div, "result")), Some(&Value::Number(4.0)));

        circuit.update_config(div, "value1", Value::Number(100.0)).unwrap();
        assert_eq!(circuit.output_value(&out(div, "result")), Some(&Value::Number(4.0)));

        circuit.flush_effects(&mut world);
        assert_eq!(world.burns, vec![circuit.block(div).unwrap().object()]);

        circuit.update_config(div, "value2", Value::Number(4.0)).unwrap();
        circuit.enable_block(div).unwrap();
        assert_eq!(circuit.output_value(&out(div, "result")), Some(&Value::Number(25.0)));
        assert!(circuit.drain_events().contains(&CircuitEvent::Reenabled { uuid: div }));
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    #[test]
    fn delete_reverts_consumers_and_releases_object() {
        let (mut circuit, mut world) = setup();
        let a = constant(&mut circuit, &mut world, Value::Bool(true));
        let not = circuit.place(&mut world, BlockKind::NotGate, Pose::default()).unwrap();
        circuit.connect(&out(a, "value"), &inp(not, "value")).unwrap();
        assert_eq!(circuit.output_value(&out(not, "result")), Some(&Value::Bool(false)));

        circuit.delete(&mut world, a).unwrap();
        assert_eq!(circuit.len(), 1);
        assert_eq!(circuit.wire_count(), 0);
        assert_eq!(world.objects.len(), 1);
        assert_eq!(circuit.output_value(&out(not, "result")), Some(&Value::Bool(true)));
        assert!(matches!(circuit.delete(&mut world, a), Err(NodeError::UnknownBlock(_))));
    }

    #[test]
    fn disabled_block_ignores_inputs_until_enabled() {
        let (mut circuit, mut world) = setup();
        let not = circuit.place(&mut world, BlockKind::NotGate, Pose::default()).unwrap();
        circuit.disable_block(not).unwrap();
        circuit.update_config(not, "value", Value::Bool(true)).unwrap();
        assert_eq!(circuit.output_value(&out(not, "result")), Some(&Value::Bool(true)));
        circuit.enable_block(not).unwrap();
        assert_eq!(circuit.output_value(&out(not, "result")), Some(&Value::Bool(false)));
    }

    #[test]
    fn update_config_rejects_unaccepted_kind() {
        let (mut circuit, mut world) = setup();
        let not = circuit.place(&mut world, BlockKind::NotGate, Pose::default()).unwrap();
        let err = circuit.update_config(not, "value", Value::Number(1.0)).unwrap_err();
        assert!(matches!(err, NodeError::KindNotAccepted { kind: Kind::Number, .. }));
        let err = circuit.update_config(not, "missing", Value::Bool(true)).unwrap_err();
        assert!(matches!(err, NodeError::UnknownInput { .. }));
    }

    #[test]
    fn wired_group_pins_sibling_kind() {
        let (mut circuit, mut world) = setup();
        let c = constant(&mut circuit, &mut world, Value::Number(1.0));
        let greater = circuit.place(&mut world, BlockKind::Greater, Pose::default()).unwrap();
        let add = circuit.place(&mut world, BlockKind::Add, Pose::default()).unwrap();
        circuit.connect(&out(c, "value"), &inp(add, "value1")).unwrap();
        circuit.connect(&out(add, "result"), &inp(greater, "value1")).unwrap();

        let err = circuit
            .update_config(add, "value2", Value::Vector3(Vec3::ZERO))
            .unwrap_err();
        assert!(matches!(err, NodeError::KindPinned { held: Kind::Number, .. }));
    }

    // -----------------------------------------------------------------------
    // Ticks and controls
    // -----------------------------------------------------------------------

    #[test]
    fn sensor_to_motor_runs_on_tick() {
        let (mut circuit, mut world) = setup();
        let speedo = circuit.place(&mut world, BlockKind::Speedometer, Pose::default()).unwrap();
        let motor = circuit.place(&mut world, BlockKind::Motor, Pose::default()).unwrap();
        circuit.connect(&out(speedo, "speed"), &inp(motor, "rotationSpeed")).unwrap();
        world.set_reading(Sensor::Speed, Value::Number(6.0));

        circuit.tick(&mut world, 0.1).unwrap();
        let object = circuit.block(motor).unwrap().object();
        assert_eq!(world.last_actuation(object), Some(&Actuation::Motor { speed: 6.0 }));
        assert_eq!(circuit.tick_count(), 1);
    }

    #[test]
    fn delay_lags_one_tick() {
        let (mut circuit, mut world) = setup();
        let c = constant(&mut circuit, &mut world, Value::Number(5.0));
        let delay = circuit.place(&mut world, BlockKind::Delay, Pose::default()).unwrap();
        circuit.connect(&out(c, "value"), &inp(delay, "value")).unwrap();

        circuit.tick(&mut world, 0.1).unwrap();
        assert_eq!(circuit.output_value(&out(delay, "value")), Some(&Value::Number(0.0)));
        circuit.tick(&mut world, 0.1).unwrap();
        assert_eq!(circuit.output_value(&out(delay, "value")), Some(&Value::Number(5.0)));
    }

    #[test]
    fn switch_follows_bound_key() {
        let (mut circuit, mut world) = setup();
        let switch = circuit.place(&mut world, BlockKind::Switch, Pose::default()).unwrap();
        let binding = ControlBinding::Keys {
            keys: vec![KeyBinding::new("F", ControlValue::Bool(true))],
            mode: ControlMode::Instant,
            reset: true,
        };
        assert!(matches!(
            circuit.set_control(switch, "value", true),
            Err(NodeError::NoControlBinding { .. })
        ));
        circuit.set_control_binding(switch, "value", Some(binding)).unwrap();
        circuit.set_control(switch, "value", true).unwrap();

        circuit.key_down(&KeyCode::new("F")).unwrap();
        assert_eq!(circuit.output_value(&out(switch, "value")), Some(&Value::Bool(true)));
        circuit.key_up(&KeyCode::new("F")).unwrap();
        assert_eq!(circuit.output_value(&out(switch, "value")), Some(&Value::Bool(false)));
    }

    #[test]
    fn smooth_control_ramps_over_ticks() {
        let (mut circuit, mut world) = setup();
        let motor = circuit.place(&mut world, BlockKind::Motor, Pose::default()).unwrap();
        let binding = ControlBinding::Keys {
            keys: vec![KeyBinding::new("W", ControlValue::Number(1.0))],
            mode: ControlMode::Smooth,
            reset: true,
        };
        circuit.set_control_binding(motor, "rotationSpeed", Some(binding)).unwrap();
        circuit.set_control(motor, "rotationSpeed", true).unwrap();
        circuit.key_down(&KeyCode::new("W")).unwrap();
        let speed = inp(motor, "rotationSpeed");
        assert_eq!(circuit.input_value(&speed), Some(&Value::Number(0.0)));

        circuit.tick(&mut world, 0.125).unwrap();
        assert_eq!(circuit.input_value(&speed), Some(&Value::Number(0.5)));
        circuit.tick(&mut world, 0.125).unwrap();
        assert_eq!(circuit.input_value(&speed), Some(&Value::Number(1.0)));
    }

    #[test]
    fn rotation_binding_drives_motor() {
        let (mut circuit, mut world) = setup();
        let motor = circuit.place(&mut world, BlockKind::Motor, Pose::default()).unwrap();
        let binding = ControlBinding::Rotation(RotationBinding {
            add: KeyCode::new("E"),
            sub: KeyCode::new("Q"),
            switch_mode: false,
            speed: 4.0,
        });
        circuit.set_control_binding(motor, "rotationSpeed", Some(binding)).unwrap();
        circuit.set_control(motor, "rotationSpeed", true).unwrap();
        circuit.key_down(&KeyCode::new("Q")).unwrap();
        circuit.tick(&mut world, 0.1).unwrap();
        let object = circuit.block(motor).unwrap().object();
        assert_eq!(world.last_actuation(object), Some(&Actuation::Motor { speed: -4.0 }));
    }

    #[test]
    fn connecting_a_controlled_input_hands_authority_to_the_wire() {
        let (mut circuit, mut world) = setup();
        let switch = circuit.place(&mut world, BlockKind::Switch, Pose::default()).unwrap();
        let binding = ControlBinding::Keys {
            keys: vec![KeyBinding::new("F", ControlValue::Bool(true))],
            mode: ControlMode::Toggle,
            reset: false,
        };
        circuit.set_control_binding(switch, "value", Some(binding)).unwrap();
        circuit.set_control(switch, "value", true).unwrap();
        let c = constant(&mut circuit, &mut world, Value::Bool(false));
        circuit.connect(&out(c, "value"), &inp(switch, "value")).unwrap();

        circuit.key_down(&KeyCode::new("F")).unwrap();
        assert_eq!(circuit.output_value(&out(switch, "value")), Some(&Value::Bool(false)));
        assert!(!circuit.block(switch).unwrap().input("value").unwrap().config.controlled);
    }
}
