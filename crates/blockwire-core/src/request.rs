//! Edit requests arriving from the networking layer.
//!
//! Authority and permissions are checked before a request reaches the
//! circuit. Each request runs synchronously and reports back a [`Response`].

use crate::catalog::BlockKind;
use crate::circuit::Circuit;
use crate::control::ControlBinding;
use crate::id::{BlockUuid, InputRef, OutputRef};
use crate::value::{Color, Value};
use crate::world::{Pose, World};

// ---------------------------------------------------------------------------
// Request enum
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Request {
    /// Place a new block. The response carries its uuid.
    Place {
        kind: BlockKind,
        pose: Pose,
        col: Option<Color>,
        mat: Option<String>,
    },
    Move { uuid: BlockUuid, pose: Pose },
    Delete { uuid: BlockUuid },
    Connect { output: OutputRef, input: InputRef },
    Disconnect { input: InputRef },
    /// Set an input's literal value.
    ConfigUpdate {
        block_uuid: BlockUuid,
        input_name: String,
        new_value: Value,
    },
    SetControl {
        uuid: BlockUuid,
        input: String,
        enabled: bool,
    },
    /// Install or clear a control binding on a controllable input.
    BindControl {
        uuid: BlockUuid,
        input: String,
        binding: Option<ControlBinding>,
    },
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    pub success: bool,
    pub message: Option<String>,
    pub uuid: Option<BlockUuid>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn placed(uuid: BlockUuid) -> Self {
        Self {
            success: true,
            message: None,
            uuid: Some(uuid),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            uuid: None,
        }
    }
}

impl<E: std::error::Error> From<Result<(), E>> for Response {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Response::ok(),
            Err(err) => Response::failed(err.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

impl Circuit {
    /// Apply one request. Failures leave the circuit unchanged and are
    /// reported in the response rather than returned as errors.
    pub fn handle(&mut self, world: &mut dyn World, request: Request) -> Response {
        match request {
            Request::Place { kind, pose, col, mat } => match self.place(world, kind, pose) {
                Ok(uuid) => match self.set_appearance(uuid, col, mat) {
                    Ok(()) => Response::placed(uuid),
                    Err(err) => Response::failed(err.to_string()),
                },
                Err(err) => Response::failed(err.to_string()),
            },
            Request::Move { uuid, pose } => self.move_block(world, uuid, pose).into(),
            Request::Delete { uuid } => self.delete(world, uuid).into(),
            Request::Connect { output, input } => self.connect(&output, &input).into(),
            Request::Disconnect { input } => self.disconnect(&input).map(|_| ()).into(),
            Request::ConfigUpdate {
                block_uuid,
                input_name,
                new_value,
            } => self.update_config(block_uuid, &input_name, new_value).into(),
            Request::SetControl { uuid, input, enabled } => self.set_control(uuid, &input, enabled).into(),
            Request::BindControl { uuid, input, binding } => {
                self.set_control_binding(uuid, &input, binding).into()
            }
        }
    }
}
