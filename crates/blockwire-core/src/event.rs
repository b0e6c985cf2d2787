//! Notifications queued by the circuit for the host.
//!
//! Events accumulate during an operation and are handed over in emission
//! order by [`crate::circuit::Circuit::drain_events`].

use crate::behavior::Fault;
use crate::catalog::BlockKind;
use crate::id::{BlockUuid, InputRef, OutputRef};

#[derive(Debug, Clone, PartialEq)]
pub enum CircuitEvent {
    Placed { uuid: BlockUuid, kind: BlockKind },
    Removed { uuid: BlockUuid },
    Connected { output: OutputRef, input: InputRef },
    Disconnected { output: OutputRef, input: InputRef },
    /// A producer retyped to a kind the consumer could not accept.
    WireDropped { output: OutputRef, input: InputRef },
    Burned { uuid: BlockUuid, fault: Fault },
    /// A disabled or burned block was enabled again.
    Reenabled { uuid: BlockUuid },
}

impl CircuitEvent {
    /// The block this event is chiefly about.
    pub fn block(&self) -> BlockUuid {
        match self {
            CircuitEvent::Placed { uuid, .. }
            | CircuitEvent::Removed { uuid }
            | CircuitEvent::Burned { uuid, .. }
            | CircuitEvent::Reenabled { uuid } => *uuid,
            CircuitEvent::Connected { input, .. }
            | CircuitEvent::Disconnected { input, .. }
            | CircuitEvent::WireDropped { input, .. } => input.block,
        }
    }
}
