//! The per-block behavior contract.
//!
//! A behavior is a small value: a `calculate` function over the block's input
//! values, plus optional per-tick work for sensors, actuators and other
//! time-driven blocks. The engine decides when to call it.

use std::collections::BTreeMap;

use crate::id::ObjectRef;
use crate::value::{Color, Value, Vec3};
use crate::world::World;

/// A runtime calculation fault. The node that raised it burns.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Fault {
    #[error("division by zero")]
    DivideByZero,
    #[error("invalid input: {0}")]
    InvalidDomain(String),
}

/// Output writes produced by one evaluation, in declaration order.
pub type Outputs = Vec<(&'static str, Value)>;

/// Snapshot of a node's input values, by connector name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs {
    values: BTreeMap<String, Value>,
}

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Look up an input that must exist.
    pub fn require(&self, name: &str) -> Result<&Value, Fault> {
        self.get(name)
            .ok_or_else(|| Fault::InvalidDomain(format!("missing input `{name}`")))
    }

    pub fn bool(&self, name: &str) -> Result<bool, Fault> {
        let v = self.require(name)?;
        v.as_bool().ok_or_else(|| mismatch(name, v))
    }

    pub fn number(&self, name: &str) -> Result<f64, Fault> {
        let v = self.require(name)?;
        v.as_number().ok_or_else(|| mismatch(name, v))
    }

    pub fn vector(&self, name: &str) -> Result<Vec3, Fault> {
        let v = self.require(name)?;
        v.as_vector3().ok_or_else(|| mismatch(name, v))
    }

    pub fn string(&self, name: &str) -> Result<&str, Fault> {
        let v = self.require(name)?;
        v.as_str().ok_or_else(|| mismatch(name, v))
    }

    pub fn color(&self, name: &str) -> Result<Color, Fault> {
        match self.require(name)? {
            Value::Color(c) => Ok(*c),
            other => Err(mismatch(name, other)),
        }
    }

    pub fn byte(&self, name: &str) -> Result<u8, Fault> {
        match self.require(name)? {
            Value::Byte(b) => Ok(*b),
            other => Err(mismatch(name, other)),
        }
    }
}

fn mismatch(name: &str, value: &Value) -> Fault {
    Fault::InvalidDomain(format!("input `{name}` holds a {} value", value.kind()))
}

/// Context handed to tick-driven behaviors.
pub struct TickContext<'a> {
    /// Seconds since the previous tick.
    pub dt: f64,
    pub inputs: &'a Inputs,
    pub world: &'a mut dyn World,
    /// The game object owned by this block.
    pub object: ObjectRef,
}

pub trait Behavior: std::fmt::Debug + BehaviorClone {
    /// Recompute outputs from the current inputs. Called whenever an input
    /// changes while the node is enabled.
    fn calculate(&mut self, inputs: &Inputs) -> Result<Outputs, Fault>;

    /// Whether the node wants [`Behavior::on_tick`] once per frame.
    fn ticks(&self) -> bool {
        false
    }

    /// Per-frame work. Returned writes are applied like `calculate` output.
    fn on_tick(&mut self, ctx: &mut TickContext<'_>) -> Result<Outputs, Fault> {
        let _ = ctx;
        Ok(Vec::new())
    }

    /// Drop transient state. Called when the node is disabled.
    fn reset(&mut self) {}
}

/// Clone a behavior behind a trait object, so a circuit can checkpoint its
/// nodes before a fallible edit.
pub trait BehaviorClone {
    fn clone_box(&self) -> Box<dyn Behavior>;
}

impl<T: Behavior + Clone + 'static> BehaviorClone for T {
    fn clone_box(&self) -> Box<dyn Behavior> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Behavior> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
