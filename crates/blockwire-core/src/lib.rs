//! Blockwire Core -- the block-logic dataflow engine.
//!
//! Players place blocks (sensors, gates, math operators, actuators) and wire
//! their typed connectors together. This crate resolves connector kinds at
//! edit time and propagates values through the resulting circuit reactively.
//!
//! # Propagation
//!
//! Every connector is backed by a reactive cell. Writing a cell notifies its
//! subscribers synchronously, in subscription order:
//!
//! 1. **Wires** carry an output cell's value into the input cell they feed.
//! 2. **Nodes** re-run their block's `calculate` when any input changes and
//!    write the results into their output cells.
//! 3. **Observers** registered by the host see the change last.
//!
//! Equal writes are dropped, so stable circuits stop propagating on their
//! own. A cascade started by one stimulus (an edit, a key event, a tick)
//! completes before control returns to the host.
//!
//! # Kind resolution
//!
//! Connectors joined by a wire or by a connector group must hold the same
//! kind. Connecting, disconnecting and config updates keep each such
//! component on a kind every member accepts; a producer retype that a
//! consumer cannot follow drops the wire.
//!
//! # Key Types
//!
//! - [`circuit::Circuit`] -- Engine entry point owning cells, nodes and wires.
//! - [`cell::CellStore`] -- Arena of reactive value cells.
//! - [`node::BlockNode`] -- Lifecycle wrapper around one placed block.
//! - [`catalog::BlockKind`] -- Block type tag and behavior factory.
//! - [`connector::BlockSchema`] -- Declared inputs, outputs and groups.
//! - [`world::World`] -- Collaborator boundary to the game world.

pub mod behavior;
pub mod catalog;
pub mod cell;
pub mod circuit;
pub mod config;
pub mod connector;
pub mod control;
pub mod event;
mod graph;
pub mod id;
pub mod node;
pub mod request;
pub mod value;
pub mod wire;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
