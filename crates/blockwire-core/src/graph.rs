//! Node storage and the connector-kind resolver.
//!
//! Connectors joined by a wire must hold the same kind, and so must
//! connectors sharing a group on one block. The transitive closure of those
//! two relations is a *component*: every connector in it must agree on one
//! concrete kind, drawn from the intersection of their declared sets.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use slotmap::SlotMap;

use crate::cell::{CellChange, CellError, CellStore, Dispatch, Target};
use crate::id::{BlockUuid, CellId, InputRef, NodeId, OutputRef};
use crate::node::{BlockNode, Port};
use crate::value::{Kind, KindSet, intersect_types};
use crate::wire::WireManager;

/// A dispatcher that delivers nothing. Used while retyping, when the caller
/// recalculates the affected nodes itself.
struct Quiet;

impl Dispatch for Quiet {
    fn deliver(&mut self, _: &mut CellStore, _: &Target, _: &CellChange) -> Result<(), CellError> {
        Ok(())
    }
}

pub type Endpoint = (NodeId, Port);

#[derive(Debug, Default)]
pub struct Graph {
    pub nodes: SlotMap<NodeId, BlockNode>,
    pub by_uuid: BTreeMap<BlockUuid, NodeId>,
    /// Construction order; ticks and key events visit nodes in this order.
    pub order: Vec<NodeId>,
    pub wires: WireManager,
}

impl Graph {
    pub fn node_id(&self, uuid: BlockUuid) -> Option<NodeId> {
        self.by_uuid.get(&uuid).copied()
    }

    pub fn node(&self, uuid: BlockUuid) -> Option<&BlockNode> {
        self.node_id(uuid).and_then(|id| self.nodes.get(id))
    }

    pub fn node_mut(&mut self, uuid: BlockUuid) -> Option<&mut BlockNode> {
        let id = self.node_id(uuid)?;
        self.nodes.get_mut(id)
    }

    pub fn input_cell(&self, input: &InputRef) -> Option<CellId> {
        self.node(input.block)?.input(&input.name).map(|s| s.cell)
    }

    pub fn output_cell(&self, output: &OutputRef) -> Option<CellId> {
        self.node(output.block)?.output_cell(&output.name)
    }

    /// All connectors that must share a kind with `start`, in breadth-first
    /// order. `skip` excludes one wire from the walk.
    pub fn component(&self, start: Endpoint, skip: Option<&InputRef>) -> Vec<Endpoint> {
        let mut seen = BTreeSet::new();
        let mut found = Vec::new();
        let mut queue = VecDeque::from([start]);

        while let Some((id, port)) = queue.pop_front() {
            if !seen.insert((id, port.clone())) {
                continue;
            }
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            for member in node.group_members(&port) {
                queue.push_back((id, member));
            }
            match &port {
                Port::Input(name) => {
                    let input = InputRef::new(node.uuid(), name.clone());
                    if skip != Some(&input) {
                        if let Some(src) = self.wires.source(&input) {
                            if let Some(src_id) = self.node_id(src.block) {
                                queue.push_back((src_id, Port::Output(src.name.clone())));
                            }
                        }
                    }
                }
                Port::Output(name) => {
                    let output = OutputRef::new(node.uuid(), name.clone());
                    for input in self.wires.consumers(&output) {
                        if skip == Some(input) {
                            continue;
                        }
                        if let Some(dst_id) = self.node_id(input.block) {
                            queue.push_back((dst_id, Port::Input(input.name.clone())));
                        }
                    }
                }
            }
            found.push((id, port));
        }
        found
    }

    /// Kinds every connector in a component accepts.
    pub fn allowed(&self, component: &[Endpoint]) -> KindSet {
        let sets: Vec<KindSet> = component
            .iter()
            .filter_map(|(id, port)| self.nodes.get(*id).map(|n| n.declared(port)))
            .collect();
        intersect_types(&sets)
    }

    /// Kinds still open once the literals the user set on unwired inputs are
    /// taken into account. `except` is the input about to be wired.
    pub fn pinned(&self, component: &[Endpoint], except: &InputRef) -> KindSet {
        let mut open = KindSet::ALL;
        for (id, port) in component {
            let (Some(node), Port::Input(name)) = (self.nodes.get(*id), port) else {
                continue;
            };
            let input = InputRef::new(node.uuid(), name.clone());
            if &input == except || self.wires.source(&input).is_some() {
                continue;
            }
            if let Some(literal) = node.input(name).and_then(|s| s.config.literal.as_ref()) {
                open = open.intersect(KindSet::single(literal.kind()));
            }
        }
        open
    }

    /// Move every connector of a component to `kind`. Cells are written
    /// without notifying engine listeners; returns the nodes whose cells
    /// changed, in component order, so the caller can recalculate them.
    pub fn retype(
        &self,
        cells: &mut CellStore,
        component: &[Endpoint],
        kind: Kind,
    ) -> Result<Vec<NodeId>, CellError> {
        let mut touched = Vec::new();
        for (id, port) in component {
            let Some(node) = self.nodes.get(*id) else {
                continue;
            };
            let Some(cell) = node.port_cell(port) else {
                continue;
            };
            if cells.kind(cell) == Some(kind) {
                continue;
            }
            let value = match port {
                Port::Input(name) => {
                    let wired = self
                        .wires
                        .source(&InputRef::new(node.uuid(), name.clone()))
                        .is_some();
                    match (node.schema().find_input(name), node.input(name)) {
                        (Some(def), Some(slot)) if !wired => slot.config.literal_for(def, kind),
                        (Some(def), _) => def.default_for(kind),
                        _ => kind.default_value(),
                    }
                }
                Port::Output(_) => kind.default_value(),
            };
            cells.set(cell, value, false, &mut Quiet)?;
            if !touched.contains(id) {
                touched.push(*id);
            }
        }
        Ok(touched)
    }
}
