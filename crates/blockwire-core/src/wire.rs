//! Wire manager: the only writer of connection state.
//!
//! A wire is a directed edge from one block's output to another block's
//! input. An input has at most one incoming wire; an output may drive any
//! number of inputs. Cycles are allowed. Propagation is an event cascade, so
//! a cyclic circuit settles only if it reaches a fixed point or a stateful
//! block (memory, delay) breaks the loop.

use std::collections::{BTreeMap, BTreeSet};

use crate::cell::{CellError, Target};
use crate::circuit::Circuit;
use crate::event::CircuitEvent;
use crate::id::{BlockUuid, InputRef, OutputRef, SubscriptionId};
use crate::node::Port;
use crate::value::KindSet;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("no block with uuid {0}")]
    UnknownBlock(BlockUuid),

    #[error("no output {0}")]
    UnknownOutput(OutputRef),

    #[error("no input {0}")]
    UnknownInput(InputRef),

    #[error("input {input} is already wired from {existing}")]
    AlreadyWired { input: InputRef, existing: OutputRef },

    #[error("{output} produces {output_kinds:?} but {input} accepts {input_kinds:?}")]
    IncompatibleKinds {
        output: OutputRef,
        input: InputRef,
        output_kinds: KindSet,
        input_kinds: KindSet,
    },

    #[error("connecting {output} to {input} leaves no kind shared by their connector groups")]
    GroupConflict { output: OutputRef, input: InputRef },

    #[error(transparent)]
    Cell(#[from] CellError),
}

#[derive(Debug, thiserror::Error)]
pub enum DisconnectError {
    #[error("input {0} is not wired")]
    NotWired(InputRef),

    #[error(transparent)]
    Cell(#[from] CellError),
}

// ---------------------------------------------------------------------------
// WireManager
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Wire {
    pub output: OutputRef,
    pub(crate) subscription: SubscriptionId,
}

/// Wire bookkeeping, indexed both ways. Ordered maps keep iteration
/// deterministic.
#[derive(Debug, Default)]
pub struct WireManager {
    wires: BTreeMap<InputRef, Wire>,
    consumers: BTreeMap<OutputRef, BTreeSet<InputRef>>,
}

impl WireManager {
    pub fn len(&self) -> usize {
        self.wires.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wires.is_empty()
    }

    pub fn source(&self, input: &InputRef) -> Option<&OutputRef> {
        self.wires.get(input).map(|w| &w.output)
    }

    pub fn consumers(&self, output: &OutputRef) -> impl Iterator<Item = &InputRef> {
        self.consumers.get(output).into_iter().flatten()
    }

    /// Every wire as `(input, output)`, ordered by input.
    pub fn iter(&self) -> impl Iterator<Item = (&InputRef, &OutputRef)> {
        self.wires.iter().map(|(i, w)| (i, &w.output))
    }

    /// Wires with either end on `block`, as `(input, output)` pairs.
    pub fn touching(&self, block: BlockUuid) -> Vec<(InputRef, OutputRef)> {
        self.iter()
            .filter(|(i, o)| i.block == block || o.block == block)
            .map(|(i, o)| (i.clone(), o.clone()))
            .collect()
    }

    pub(crate) fn insert(&mut self, input: InputRef, output: OutputRef, subscription: SubscriptionId) {
        self.consumers
            .entry(output.clone())
            .or_default()
            .insert(input.clone());
        self.wires.insert(
            input,
            Wire {
                output,
                subscription,
            },
        );
    }

    pub(crate) fn remove(&mut self, input: &InputRef) -> Option<Wire> {
        let wire = self.wires.remove(input)?;
        if let Some(set) = self.consumers.get_mut(&wire.output) {
            set.remove(input);
            if set.is_empty() {
                self.consumers.remove(&wire.output);
            }
        }
        Some(wire)
    }
}

// ---------------------------------------------------------------------------
// Connect / disconnect
// ---------------------------------------------------------------------------

impl Circuit {
    /// Wire an output to an input.
    ///
    /// Fails without changing anything if the input is already wired, the
    /// two connectors share no kind, or their groups cannot agree on one.
    /// Literals set on unwired inputs of either side hold their kind. A
    /// cascade that fails after the wire went in undoes the whole connect.
    /// On success both sides take the chosen kind and the input block
    /// recalculates.
    pub fn connect(&mut self, output: &OutputRef, input: &InputRef) -> Result<(), ConnectError> {
        self.transaction(|circuit| circuit.try_connect(output, input))
    }

    fn try_connect(&mut self, output: &OutputRef, input: &InputRef) -> Result<(), ConnectError> {
        let graph = &self.graph;
        let src = graph
            .node_id(output.block)
            .ok_or(ConnectError::UnknownBlock(output.block))?;
        let dst = graph
            .node_id(input.block)
            .ok_or(ConnectError::UnknownBlock(input.block))?;
        let out_port = Port::Output(output.name.clone());
        let in_port = Port::Input(input.name.clone());
        let out_cell = graph
            .output_cell(output)
            .ok_or_else(|| ConnectError::UnknownOutput(output.clone()))?;
        let in_cell = graph
            .input_cell(input)
            .ok_or_else(|| ConnectError::UnknownInput(input.clone()))?;

        if let Some(existing) = graph.wires.source(input) {
            return Err(ConnectError::AlreadyWired {
                input: input.clone(),
                existing: existing.clone(),
            });
        }

        let output_kinds = graph.nodes[src].declared(&out_port);
        let input_kinds = graph.nodes[dst].declared(&in_port);
        if output_kinds.intersect(input_kinds).is_empty() {
            return Err(ConnectError::IncompatibleKinds {
                output: output.clone(),
                input: input.clone(),
                output_kinds,
                input_kinds,
            });
        }

        let out_component = graph.component((src, out_port), None);
        let in_component = graph.component((dst, in_port.clone()), None);
        let candidates = graph
            .allowed(&out_component)
            .intersect(graph.allowed(&in_component))
            .intersect(graph.pinned(&out_component, input))
            .intersect(graph.pinned(&in_component, input));
        let group_conflict = || ConnectError::GroupConflict {
            output: output.clone(),
            input: input.clone(),
        };
        // Prefer the kind already flowing out of the producer.
        let kind = [self.cells.kind(out_cell), self.cells.kind(in_cell)]
            .into_iter()
            .flatten()
            .find(|k| candidates.contains(*k))
            .or_else(|| candidates.first())
            .ok_or_else(group_conflict)?;

        // Validation done; from here on the graph changes.
        let subscription = self.cells.subscribe(
            out_cell,
            Target::Wire {
                input_cell: in_cell,
                input: input.clone(),
            },
        )?;
        self.graph
            .wires
            .insert(input.clone(), output.clone(), subscription);
        if let Some(slot) = self.graph.nodes[dst].input_mut(&input.name) {
            if slot.config.controlled {
                slot.config.controlled = false;
                slot.config.reset_control_state();
            }
        }

        let component = self.graph.component((dst, in_port), None);
        let touched = self.graph.retype(&mut self.cells, &component, kind)?;
        tracing::debug!(%output, %input, %kind, retyped = touched.len(), "wire connected");
        self.events.push(CircuitEvent::Connected {
            output: output.clone(),
            input: input.clone(),
        });

        self.propagate(|cells, prop| {
            for id in touched {
                prop.recalculate(cells, id)?;
            }
            if let Some(value) = cells.get(out_cell).cloned() {
                if value.kind() == kind {
                    cells.set(in_cell, value, false, prop)?;
                }
            }
            Ok(())
        })?;
        self.prune_stale()?;
        Ok(())
    }

    /// Remove the wire into `input`; the input reverts to its literal value.
    /// Returns the output it was wired from.
    pub fn disconnect(&mut self, input: &InputRef) -> Result<OutputRef, DisconnectError> {
        self.transaction(|circuit| circuit.try_disconnect(input))
    }

    fn try_disconnect(&mut self, input: &InputRef) -> Result<OutputRef, DisconnectError> {
        let wire = self
            .graph
            .wires
            .remove(input)
            .ok_or_else(|| DisconnectError::NotWired(input.clone()))?;
        self.cells.unsubscribe(wire.subscription);
        tracing::debug!(output = %wire.output, %input, "wire disconnected");
        self.events.push(CircuitEvent::Disconnected {
            output: wire.output.clone(),
            input: input.clone(),
        });
        self.revert_input(input)?;
        self.prune_stale()?;
        Ok(wire.output)
    }
}
