//! Shared test helpers for unit and integration tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::catalog::BlockKind;
use crate::circuit::Circuit;
use crate::id::{BlockUuid, InputRef, OutputRef};
use crate::value::Value;
use crate::world::Pose;

pub use crate::world::HeadlessWorld;

// ===========================================================================
// Fixtures
// ===========================================================================

/// A default circuit paired with an empty headless world.
pub fn headless() -> (Circuit, HeadlessWorld) {
    (Circuit::default(), HeadlessWorld::new())
}

pub fn out(block: BlockUuid, name: &str) -> OutputRef {
    OutputRef::new(block, name)
}

pub fn inp(block: BlockUuid, name: &str) -> InputRef {
    InputRef::new(block, name)
}

// ===========================================================================
// Placement helpers
// ===========================================================================

/// Place an enabled block at the origin.
pub fn place(circuit: &mut Circuit, world: &mut HeadlessWorld, kind: BlockKind) -> BlockUuid {
    circuit
        .place(world, kind, Pose::default())
        .expect("placement in a headless world")
}

/// Place a constant block emitting `value`.
pub fn constant(circuit: &mut Circuit, world: &mut HeadlessWorld, value: Value) -> BlockUuid {
    let uuid = place(circuit, world, BlockKind::Constant);
    circuit
        .update_config(uuid, "value", value)
        .expect("constants accept every kind");
    uuid
}

/// Wire `from.output` to `to.input`, panicking on failure.
pub fn wire(circuit: &mut Circuit, from: BlockUuid, output: &str, to: BlockUuid, input: &str) {
    circuit
        .connect(&out(from, output), &inp(to, input))
        .unwrap_or_else(|err| panic!("wiring {from}.{output} -> {to}.{input}: {err}"));
}

pub fn output(circuit: &Circuit, block: BlockUuid, name: &str) -> Value {
    circuit
        .output_value(&out(block, name))
        .cloned()
        .unwrap_or_else(|| panic!("no output {block}.{name}"))
}

// ===========================================================================
// Canned circuits
// ===========================================================================

/// Two boolean constants feeding an AND gate. Returns `(a, b, gate)`.
pub fn and_circuit(circuit: &mut Circuit, world: &mut HeadlessWorld, a: bool, b: bool) -> (BlockUuid, BlockUuid, BlockUuid) {
    let left = constant(circuit, world, Value::Bool(a));
    let right = constant(circuit, world, Value::Bool(b));
    let gate = place(circuit, world, BlockKind::AndGate);
    wire(circuit, left, "value", gate, "value1");
    wire(circuit, right, "value", gate, "value2");
    (left, right, gate)
}

/// `(x + y) * z` over numeric constants. Returns the constants and the
/// multiply block.
pub fn math_chain(
    circuit: &mut Circuit,
    world: &mut HeadlessWorld,
    x: f64,
    y: f64,
    z: f64,
) -> ([BlockUuid; 3], BlockUuid) {
    let cx = constant(circuit, world, Value::Number(x));
    let cy = constant(circuit, world, Value::Number(y));
    let cz = constant(circuit, world, Value::Number(z));
    let add = place(circuit, world, BlockKind::Add);
    let mul = place(circuit, world, BlockKind::Multiply);
    wire(circuit, cx, "value", add, "value1");
    wire(circuit, cy, "value", add, "value2");
    wire(circuit, add, "result", mul, "value1");
    wire(circuit, cz, "value", mul, "value2");
    ([cx, cy, cz], mul)
}
