//! The game-world collaborator boundary.
//!
//! The engine never touches physics, rendering or the scene graph itself.
//! Everything it needs from the host goes through the [`World`] trait, which
//! is passed explicitly into the entry points that need it. [`HeadlessWorld`]
//! is a complete in-memory implementation used by tools and tests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::BlockKind;
use crate::id::ObjectRef;
use crate::value::{Color, Value, Vec3};

// ---------------------------------------------------------------------------
// Pose
// ---------------------------------------------------------------------------

/// Position and Euler rotation (degrees). Persisted as
/// `[x, y, z, rx, ry, rz]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Vec3,
}

impl Pose {
    pub const fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            rotation: Vec3::ZERO,
        }
    }

    pub fn to_array(self) -> [f64; 6] {
        let Pose { position: p, rotation: r } = self;
        [p.x, p.y, p.z, r.x, r.y, r.z]
    }

    pub fn from_array(a: [f64; 6]) -> Self {
        Self {
            position: Vec3::new(a[0], a[1], a[2]),
            rotation: Vec3::new(a[3], a[4], a[5]),
        }
    }
}

impl Serialize for Pose {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_array().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Pose {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <[f64; 6]>::deserialize(deserializer).map(Pose::from_array)
    }
}

// ---------------------------------------------------------------------------
// Sensor readings and actuations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Sensor {
    /// Speed of the owning vehicle, units per second.
    Speed,
    /// Height above ground.
    Altitude,
}

/// A physical effect requested by an actuator block.
#[derive(Debug, Clone, PartialEq)]
pub enum Actuation {
    Motor { speed: f64 },
    Lamp { on: bool, color: Color },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("world rejected the request: {0}")]
pub struct WorldError(pub String);

// ---------------------------------------------------------------------------
// World trait
// ---------------------------------------------------------------------------

/// Host services the circuit depends on.
pub trait World {
    /// Create the game object for a newly placed block.
    fn spawn(&mut self, kind: BlockKind, pose: &Pose) -> Result<ObjectRef, WorldError>;

    fn move_object(&mut self, object: ObjectRef, pose: &Pose);

    fn despawn(&mut self, object: ObjectRef);

    /// Read external physical state for a sensor block.
    fn sample(&mut self, object: ObjectRef, sensor: Sensor) -> Value;

    fn actuate(&mut self, object: ObjectRef, actuation: Actuation);

    /// Show the in-world failure effect for a burned block.
    fn burn(&mut self, object: ObjectRef);
}

// ---------------------------------------------------------------------------
// HeadlessWorld
// ---------------------------------------------------------------------------

/// In-memory world: records every call and serves scripted sensor readings.
#[derive(Debug, Default)]
pub struct HeadlessWorld {
    next_object: u64,
    pub objects: BTreeMap<ObjectRef, (BlockKind, Pose)>,
    readings: BTreeMap<Sensor, Value>,
    pub actuations: Vec<(ObjectRef, Actuation)>,
    pub burns: Vec<ObjectRef>,
    /// Refuse spawns once this many objects have been created.
    pub spawn_limit: Option<usize>,
    spawned: usize,
}

impl HeadlessWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value every sensor of this type reads from now on.
    pub fn set_reading(&mut self, sensor: Sensor, value: Value) {
        self.readings.insert(sensor, value);
    }

    /// The most recent actuation sent to an object.
    pub fn last_actuation(&self, object: ObjectRef) -> Option<&Actuation> {
        self.actuations
            .iter()
            .rev()
            .find(|(o, _)| *o == object)
            .map(|(_, a)| a)
    }
}

impl World for HeadlessWorld {
    fn spawn(&mut self, kind: BlockKind, pose: &Pose) -> Result<ObjectRef, WorldError> {
        if self.spawn_limit.is_some_and(|limit| self.spawned >= limit) {
            return Err(WorldError(format!("no room to spawn {kind}")));
        }
        self.next_object += 1;
        self.spawned += 1;
        let object = ObjectRef(self.next_object);
        self.objects.insert(object, (kind, *pose));
        Ok(object)
    }

    fn move_object(&mut self, object: ObjectRef, pose: &Pose) {
        if let Some(entry) = self.objects.get_mut(&object) {
            entry.1 = *pose;
        }
    }

    fn despawn(&mut self, object: ObjectRef) {
        self.objects.remove(&object);
    }

    fn sample(&mut self, _object: ObjectRef, sensor: Sensor) -> Value {
        self.readings
            .get(&sensor)
            .cloned()
            .unwrap_or(Value::Number(0.0))
    }

    fn actuate(&mut self, object: ObjectRef, actuation: Actuation) {
        self.actuations.push((object, actuation));
    }

    fn burn(&mut self, object: ObjectRef) {
        self.burns.push(object);
    }
}
