//! The block catalog: one tag per block type, its connector schema, and a
//! factory for its behavior.
//!
//! Type ids are the persisted lowercase names (`"andgate"`, `"motor"`, ...).

use serde::{Deserialize, Serialize};

use crate::behavior::{Behavior, Fault, Inputs, Outputs, TickContext};
use crate::connector::{BlockSchema, InputDef, OutputDef};
use crate::value::{Color, Kind, KindSet, Value, Vec3};
use crate::world::{Actuation, Sensor};

// ===========================================================================
// BlockKind
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    // Structural
    Block,
    Wedge,
    Seat,
    // Sources and gates
    Constant,
    AndGate,
    OrGate,
    XorGate,
    NandGate,
    NotGate,
    // Math and comparison
    Add,
    Subtract,
    Multiply,
    Divide,
    Greater,
    Equals,
    // Stateful
    Memory,
    Delay,
    Switch,
    // Conversion
    VectorSplit,
    VectorJoin,
    Concat,
    ByteToNumber,
    // Sensors
    Speedometer,
    Altimeter,
    // Actuators
    Motor,
    Lamp,
}

impl BlockKind {
    pub const ALL: [BlockKind; 26] = [
        BlockKind::Block,
        BlockKind::Wedge,
        BlockKind::Seat,
        BlockKind::Constant,
        BlockKind::AndGate,
        BlockKind::OrGate,
        BlockKind::XorGate,
        BlockKind::NandGate,
        BlockKind::NotGate,
        BlockKind::Add,
        BlockKind::Subtract,
        BlockKind::Multiply,
        BlockKind::Divide,
        BlockKind::Greater,
        BlockKind::Equals,
        BlockKind::Memory,
        BlockKind::Delay,
        BlockKind::Switch,
        BlockKind::VectorSplit,
        BlockKind::VectorJoin,
        BlockKind::Concat,
        BlockKind::ByteToNumber,
        BlockKind::Speedometer,
        BlockKind::Altimeter,
        BlockKind::Motor,
        BlockKind::Lamp,
    ];

    pub fn type_id(self) -> &'static str {
        match self {
            BlockKind::Block => "block",
            BlockKind::Wedge => "wedge",
            BlockKind::Seat => "seat",
            BlockKind::Constant => "constant",
            BlockKind::AndGate => "andgate",
            BlockKind::OrGate => "orgate",
            BlockKind::XorGate => "xorgate",
            BlockKind::NandGate => "nandgate",
            BlockKind::NotGate => "notgate",
            BlockKind::Add => "add",
            BlockKind::Subtract => "subtract",
            BlockKind::Multiply => "multiply",
            BlockKind::Divide => "divide",
            BlockKind::Greater => "greater",
            BlockKind::Equals => "equals",
            BlockKind::Memory => "memory",
            BlockKind::Delay => "delay",
            BlockKind::Switch => "switch",
            BlockKind::VectorSplit => "vectorsplit",
            BlockKind::VectorJoin => "vectorjoin",
            BlockKind::Concat => "concat",
            BlockKind::ByteToNumber => "bytetonumber",
            BlockKind::Speedometer => "speedometer",
            BlockKind::Altimeter => "altimeter",
            BlockKind::Motor => "motor",
            BlockKind::Lamp => "lamp",
        }
    }

    pub fn from_type_id(id: &str) -> Option<BlockKind> {
        BlockKind::ALL.into_iter().find(|k| k.type_id() == id)
    }

    /// Blocks with no connectors at all.
    pub fn is_structural(self) -> bool {
        matches!(self, BlockKind::Block | BlockKind::Wedge | BlockKind::Seat)
    }

    /// The connector schema for this block type.
    pub fn schema(self) -> BlockSchema {
        let numeric = [Kind::Number, Kind::Vector3];
        let bool_out = || KindSet::single(Kind::Bool);
        let binary = |kinds: &[Kind]| {
            BlockSchema::new()
                .input(InputDef::new("value1").kinds(kinds).group("value"))
                .input(InputDef::new("value2").kinds(kinds).group("value"))
        };
        match self {
            BlockKind::Block | BlockKind::Wedge | BlockKind::Seat => BlockSchema::new(),
            BlockKind::Constant => BlockSchema::new()
                .input(InputDef::new("value").any().group("value"))
                .output(OutputDef::new("value", KindSet::ALL).group("value")),
            BlockKind::AndGate | BlockKind::OrGate | BlockKind::XorGate | BlockKind::NandGate => {
                binary(&[Kind::Bool]).output(OutputDef::new("result", bool_out()))
            }
            BlockKind::NotGate => BlockSchema::new()
                .input(InputDef::new("value").kind(Kind::Bool))
                .output(OutputDef::new("result", bool_out())),
            BlockKind::Add | BlockKind::Subtract | BlockKind::Multiply => binary(&numeric)
                .output(OutputDef::new("result", KindSet::of(&numeric)).group("value")),
            BlockKind::Divide => BlockSchema::new()
                .input(InputDef::new("value1").kinds(&numeric).group("value"))
                .input(InputDef::new("value2").kind_default(Kind::Number, Value::Number(1.0)))
                .output(OutputDef::new("result", KindSet::of(&numeric)).group("value")),
            BlockKind::Greater => binary(&[Kind::Number]).output(OutputDef::new("result", bool_out())),
            BlockKind::Equals => binary(&Kind::ALL).output(OutputDef::new("result", bool_out())),
            BlockKind::Memory => BlockSchema::new()
                .input(InputDef::new("value").any().group("value"))
                .input(InputDef::new("write").kind(Kind::Bool))
                .output(OutputDef::new("value", KindSet::ALL).group("value")),
            BlockKind::Delay => BlockSchema::new()
                .input(InputDef::new("value").any().group("value"))
                .output(OutputDef::new("value", KindSet::ALL).group("value")),
            BlockKind::Switch => BlockSchema::new()
                .input(InputDef::new("value").kind(Kind::Bool).controllable())
                .output(OutputDef::new("value", bool_out())),
            BlockKind::VectorSplit => BlockSchema::new()
                .input(InputDef::new("vector").kind(Kind::Vector3))
                .output(OutputDef::new("x", KindSet::single(Kind::Number)))
                .output(OutputDef::new("y", KindSet::single(Kind::Number)))
                .output(OutputDef::new("z", KindSet::single(Kind::Number))),
            BlockKind::VectorJoin => BlockSchema::new()
                .input(InputDef::new("x").kind(Kind::Number))
                .input(InputDef::new("y").kind(Kind::Number))
                .input(InputDef::new("z").kind(Kind::Number))
                .output(OutputDef::new("vector", KindSet::single(Kind::Vector3))),
            BlockKind::Concat => binary(&[Kind::String])
                .output(OutputDef::new("result", KindSet::single(Kind::String))),
            BlockKind::ByteToNumber => BlockSchema::new()
                .input(InputDef::new("value").kind(Kind::Byte))
                .output(OutputDef::new("result", KindSet::single(Kind::Number))),
            BlockKind::Speedometer => {
                BlockSchema::new().output(OutputDef::new("speed", KindSet::single(Kind::Number)))
            }
            BlockKind::Altimeter => BlockSchema::new()
                .output(OutputDef::new("altitude", KindSet::single(Kind::Number))),
            BlockKind::Motor => BlockSchema::new()
                .input(InputDef::new("rotationSpeed").kind(Kind::Number).controllable()),
            BlockKind::Lamp => BlockSchema::new()
                .input(
                    InputDef::new("on")
                        .kind_default(Kind::Bool, Value::Bool(true))
                        .controllable(),
                )
                .input(InputDef::new("color").kind(Kind::Color)),
        }
    }

    /// Construct a fresh behavior for this block type.
    pub fn instantiate(self) -> Box<dyn Behavior> {
        match self {
            BlockKind::Block | BlockKind::Wedge | BlockKind::Seat => Box::new(Inert),
            BlockKind::Constant => Box::new(PassThrough { input: "value", output: "value" }),
            BlockKind::Switch => Box::new(PassThrough { input: "value", output: "value" }),
            BlockKind::AndGate => Box::new(Gate(GateOp::And)),
            BlockKind::OrGate => Box::new(Gate(GateOp::Or)),
            BlockKind::XorGate => Box::new(Gate(GateOp::Xor)),
            BlockKind::NandGate => Box::new(Gate(GateOp::Nand)),
            BlockKind::NotGate => Box::new(Not),
            BlockKind::Add => Box::new(Arithmetic(ArithmeticOp::Add)),
            BlockKind::Subtract => Box::new(Arithmetic(ArithmeticOp::Subtract)),
            BlockKind::Multiply => Box::new(Arithmetic(ArithmeticOp::Multiply)),
            BlockKind::Divide => Box::new(Arithmetic(ArithmeticOp::Divide)),
            BlockKind::Greater => Box::new(Greater),
            BlockKind::Equals => Box::new(Equals),
            BlockKind::Memory => Box::new(Memory::default()),
            BlockKind::Delay => Box::new(Delay::default()),
            BlockKind::VectorSplit => Box::new(VectorSplit),
            BlockKind::VectorJoin => Box::new(VectorJoin),
            BlockKind::Concat => Box::new(Concat),
            BlockKind::ByteToNumber => Box::new(ByteToNumber),
            BlockKind::Speedometer => Box::new(SensorReader {
                sensor: Sensor::Speed,
                output: "speed",
            }),
            BlockKind::Altimeter => Box::new(SensorReader {
                sensor: Sensor::Altitude,
                output: "altitude",
            }),
            BlockKind::Motor => Box::new(Motor::default()),
            BlockKind::Lamp => Box::new(Lamp::default()),
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_id())
    }
}

// ===========================================================================
// Pure behaviors
// ===========================================================================

/// Structural blocks: no connectors, nothing to compute.
#[derive(Debug, Clone)]
struct Inert;

impl Behavior for Inert {
    fn calculate(&mut self, _inputs: &Inputs) -> Result<Outputs, Fault> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone)]
struct PassThrough {
    input: &'static str,
    output: &'static str,
}

impl Behavior for PassThrough {
    fn calculate(&mut self, inputs: &Inputs) -> Result<Outputs, Fault> {
        Ok(vec![(self.output, inputs.require(self.input)?.clone())])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOp {
    And,
    Or,
    Xor,
    Nand,
}

pub fn evaluate_gate(op: GateOp, a: bool, b: bool) -> bool {
    match op {
        GateOp::And => a && b,
        GateOp::Or => a || b,
        GateOp::Xor => a != b,
        GateOp::Nand => !(a && b),
    }
}

#[derive(Debug, Clone)]
struct Gate(GateOp);

impl Behavior for Gate {
    fn calculate(&mut self, inputs: &Inputs) -> Result<Outputs, Fault> {
        let result = evaluate_gate(self.0, inputs.bool("value1")?, inputs.bool("value2")?);
        Ok(vec![("result", Value::Bool(result))])
    }
}

#[derive(Debug, Clone)]
struct Not;

impl Behavior for Not {
    fn calculate(&mut self, inputs: &Inputs) -> Result<Outputs, Fault> {
        Ok(vec![("result", Value::Bool(!inputs.bool("value")?))])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// Apply an arithmetic operation to numbers or vectors. Vectors combine
/// component-wise; a vector may be divided by a number. Division by zero is
/// a fault.
pub fn apply_arithmetic(op: ArithmeticOp, left: &Value, right: &Value) -> Result<Value, Fault> {
    use ArithmeticOp::*;
    match (op, left, right) {
        (Divide, _, Value::Number(d)) if *d == 0.0 => Err(Fault::DivideByZero),
        (Add, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Subtract, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
        (Multiply, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
        (Divide, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
        (Add, Value::Vector3(a), Value::Vector3(b)) => Ok(Value::Vector3(*a + *b)),
        (Subtract, Value::Vector3(a), Value::Vector3(b)) => Ok(Value::Vector3(*a - *b)),
        (Multiply, Value::Vector3(a), Value::Vector3(b)) => {
            Ok(Value::Vector3(Vec3::new(a.x * b.x, a.y * b.y, a.z * b.z)))
        }
        (Divide, Value::Vector3(a), Value::Number(d)) => {
            Ok(Value::Vector3(Vec3::new(a.x / d, a.y / d, a.z / d)))
        }
        _ => Err(Fault::InvalidDomain(format!(
            "cannot apply {op:?} to {} and {}",
            left.kind(),
            right.kind()
        ))),
    }
}

#[derive(Debug, Clone)]
struct Arithmetic(ArithmeticOp);

impl Behavior for Arithmetic {
    fn calculate(&mut self, inputs: &Inputs) -> Result<Outputs, Fault> {
        let result = apply_arithmetic(self.0, inputs.require("value1")?, inputs.require("value2")?)?;
        Ok(vec![("result", result)])
    }
}

#[derive(Debug, Clone)]
struct Greater;

impl Behavior for Greater {
    fn calculate(&mut self, inputs: &Inputs) -> Result<Outputs, Fault> {
        let result = inputs.number("value1")? > inputs.number("value2")?;
        Ok(vec![("result", Value::Bool(result))])
    }
}

#[derive(Debug, Clone)]
struct Equals;

impl Behavior for Equals {
    fn calculate(&mut self, inputs: &Inputs) -> Result<Outputs, Fault> {
        let result = inputs.require("value1")?.same(inputs.require("value2")?);
        Ok(vec![("result", Value::Bool(result))])
    }
}

#[derive(Debug, Clone)]
struct VectorSplit;

impl Behavior for VectorSplit {
    fn calculate(&mut self, inputs: &Inputs) -> Result<Outputs, Fault> {
        let v = inputs.vector("vector")?;
        Ok(vec![
            ("x", Value::Number(v.x)),
            ("y", Value::Number(v.y)),
            ("z", Value::Number(v.z)),
        ])
    }
}

#[derive(Debug, Clone)]
struct VectorJoin;

impl Behavior for VectorJoin {
    fn calculate(&mut self, inputs: &Inputs) -> Result<Outputs, Fault> {
        let v = Vec3::new(inputs.number("x")?, inputs.number("y")?, inputs.number("z")?);
        Ok(vec![("vector", Value::Vector3(v))])
    }
}

#[derive(Debug, Clone)]
struct Concat;

impl Behavior for Concat {
    fn calculate(&mut self, inputs: &Inputs) -> Result<Outputs, Fault> {
        let joined = format!("{}{}", inputs.string("value1")?, inputs.string("value2")?);
        Ok(vec![("result", Value::String(joined))])
    }
}

#[derive(Debug, Clone)]
struct ByteToNumber;

impl Behavior for ByteToNumber {
    fn calculate(&mut self, inputs: &Inputs) -> Result<Outputs, Fault> {
        Ok(vec![("result", Value::Number(f64::from(inputs.byte("value")?)))])
    }
}

// ===========================================================================
// Stateful behaviors
// ===========================================================================

/// Latches `value` while `write` is true.
#[derive(Debug, Clone, Default)]
struct Memory {
    stored: Option<Value>,
}

impl Behavior for Memory {
    fn calculate(&mut self, inputs: &Inputs) -> Result<Outputs, Fault> {
        let value = inputs.require("value")?;
        if inputs.bool("write")? {
            self.stored = Some(value.clone());
        }
        // A retyped group invalidates whatever was stored.
        let out = match &self.stored {
            Some(stored) if stored.kind() == value.kind() => stored.clone(),
            _ => value.kind().default_value(),
        };
        Ok(vec![("value", out)])
    }
}

/// Outputs the value its input had on the previous tick.
#[derive(Debug, Clone, Default)]
struct Delay {
    previous: Option<Value>,
}

impl Behavior for Delay {
    fn calculate(&mut self, _inputs: &Inputs) -> Result<Outputs, Fault> {
        Ok(Vec::new())
    }

    fn ticks(&self) -> bool {
        true
    }

    fn on_tick(&mut self, ctx: &mut TickContext<'_>) -> Result<Outputs, Fault> {
        let current = ctx.inputs.require("value")?.clone();
        let kind = current.kind();
        let out = match self.previous.replace(current) {
            Some(prev) if prev.kind() == kind => prev,
            _ => kind.default_value(),
        };
        Ok(vec![("value", out)])
    }

    fn reset(&mut self) {
        self.previous = None;
    }
}

// ===========================================================================
// Sensors and actuators
// ===========================================================================

#[derive(Debug, Clone)]
struct SensorReader {
    sensor: Sensor,
    output: &'static str,
}

impl Behavior for SensorReader {
    fn calculate(&mut self, _inputs: &Inputs) -> Result<Outputs, Fault> {
        Ok(Vec::new())
    }

    fn ticks(&self) -> bool {
        true
    }

    fn on_tick(&mut self, ctx: &mut TickContext<'_>) -> Result<Outputs, Fault> {
        let reading = ctx.world.sample(ctx.object, self.sensor);
        if reading.kind() != Kind::Number {
            return Err(Fault::InvalidDomain(format!(
                "{:?} sensor returned a {} value",
                self.sensor,
                reading.kind()
            )));
        }
        Ok(vec![(self.output, reading)])
    }
}

/// Drives the world motor; only sends an actuation when the speed changes.
#[derive(Debug, Clone, Default)]
struct Motor {
    last: Option<f64>,
}

impl Behavior for Motor {
    fn calculate(&mut self, _inputs: &Inputs) -> Result<Outputs, Fault> {
        Ok(Vec::new())
    }

    fn ticks(&self) -> bool {
        true
    }

    fn on_tick(&mut self, ctx: &mut TickContext<'_>) -> Result<Outputs, Fault> {
        let speed = ctx.inputs.number("rotationSpeed")?;
        if self.last != Some(speed) {
            ctx.world.actuate(ctx.object, Actuation::Motor { speed });
            self.last = Some(speed);
        }
        Ok(Vec::new())
    }

    fn reset(&mut self) {
        self.last = None;
    }
}

#[derive(Debug, Clone, Default)]
struct Lamp {
    last: Option<(bool, Color)>,
}

impl Behavior for Lamp {
    fn calculate(&mut self, _inputs: &Inputs) -> Result<Outputs, Fault> {
        Ok(Vec::new())
    }

    fn ticks(&self) -> bool {
        true
    }

    fn on_tick(&mut self, ctx: &mut TickContext<'_>) -> Result<Outputs, Fault> {
        let state = (ctx.inputs.bool("on")?, ctx.inputs.color("color")?);
        if self.last != Some(state) {
            let (on, color) = state;
            ctx.world.actuate(ctx.object, Actuation::Lamp { on, color });
            self.last = Some(state);
        }
        Ok(Vec::new())
    }

    fn reset(&mut self) {
        self.last = None;
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ObjectRef;
    use crate::world::HeadlessWorld;

    #[test]
    fn type_ids_round_trip() {
        for kind in BlockKind::ALL {
            assert_eq!(BlockKind::from_type_id(kind.type_id()), Some(kind));
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::json!(kind.type_id()));
        }
        assert_eq!(BlockKind::from_type_id("number"), None);
    }

    #[test]
    fn every_group_has_a_shared_kind() {
        for kind in BlockKind::ALL {
            let schema = kind.schema();
            for group in schema.groups() {
                assert!(
                    !schema.group_declared(group).is_empty(),
                    "{kind} group {group} has no common kind"
                );
            }
        }
    }

    #[test]
    fn every_behavior_calculates_on_defaults() {
        for kind in BlockKind::ALL {
            let schema = kind.schema();
            let mut inputs = Inputs::new();
            for def in &schema.inputs {
                let input_kind = match &def.group {
                    Some(g) => schema.group_declared(g).first().unwrap(),
                    None => def.provisional_kind(),
                };
                inputs.insert(def.name.clone(), def.default_for(input_kind));
            }
            let mut behavior = kind.instantiate();
            let outputs = behavior.calculate(&inputs).unwrap();
            for (name, _) in outputs {
                assert!(schema.find_output(name).is_some(), "{kind} wrote unknown output {name}");
            }
        }
    }

    #[test]
    fn gate_truth_tables() {
        let cases = [(false, false), (false, true), (true, false), (true, true)];
        let and: Vec<bool> = cases.iter().map(|(a, b)| evaluate_gate(GateOp::And, *a, *b)).collect();
        let xor: Vec<bool> = cases.iter().map(|(a, b)| evaluate_gate(GateOp::Xor, *a, *b)).collect();
        let nand: Vec<bool> = cases.iter().map(|(a, b)| evaluate_gate(GateOp::Nand, *a, *b)).collect();
        assert_eq!(and, [false, false, false, true]);
        assert_eq!(xor, [false, true, true, false]);
        assert_eq!(nand, [true, true, true, false]);
    }

    #[test]
    fn arithmetic_on_numbers_and_vectors() {
        let n = |v| Value::Number(v);
        assert_eq!(apply_arithmetic(ArithmeticOp::Add, &n(2.0), &n(3.0)), Ok(n(5.0)));
        assert_eq!(apply_arithmetic(ArithmeticOp::Divide, &n(9.0), &n(3.0)), Ok(n(3.0)));
        let a = Value::Vector3(Vec3::new(1.0, 2.0, 3.0));
        let b = Value::Vector3(Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(
            apply_arithmetic(ArithmeticOp::Subtract, &a, &b),
            Ok(Value::Vector3(Vec3::new(0.0, 1.0, 2.0)))
        );
        assert_eq!(
            apply_arithmetic(ArithmeticOp::Divide, &a, &n(2.0)),
            Ok(Value::Vector3(Vec3::new(0.5, 1.0, 1.5)))
        );
    }

    #[test]
    fn divide_by_zero_faults() {
        let result = apply_arithmetic(ArithmeticOp::Divide, &Value::Number(1.0), &Value::Number(0.0));
        assert_eq!(result, Err(Fault::DivideByZero));
    }

    #[test]
    fn mixed_operands_are_invalid() {
        let result = apply_arithmetic(
            ArithmeticOp::Add,
            &Value::Number(1.0),
            &Value::Vector3(Vec3::ZERO),
        );
        assert!(matches!(result, Err(Fault::InvalidDomain(_))));
    }

    #[test]
    fn memory_latches_on_write() {
        let mut memory = BlockKind::Memory.instantiate();
        let write = |v: f64, w: bool| {
            Inputs::new()
                .with("value", Value::Number(v))
                .with("write", Value::Bool(w))
        };
        assert_eq!(memory.calculate(&write(5.0, false)).unwrap(), vec![("value", Value::Number(0.0))]);
        assert_eq!(memory.calculate(&write(5.0, true)).unwrap(), vec![("value", Value::Number(5.0))]);
        assert_eq!(memory.calculate(&write(9.0, false)).unwrap(), vec![("value", Value::Number(5.0))]);
    }

    #[test]
    fn delay_outputs_previous_tick() {
        let mut delay = BlockKind::Delay.instantiate();
        let mut world = HeadlessWorld::new();
        let mut tick = |delay: &mut Box<dyn Behavior>, v: f64| {
            let inputs = Inputs::new().with("value", Value::Number(v));
            let mut ctx = TickContext {
                dt: 0.1,
                inputs: &inputs,
                world: &mut world,
                object: ObjectRef(1),
            };
            delay.on_tick(&mut ctx).unwrap()
        };
        assert_eq!(tick(&mut delay, 1.0), vec![("value", Value::Number(0.0))]);
        assert_eq!(tick(&mut delay, 2.0), vec![("value", Value::Number(1.0))]);
        assert_eq!(tick(&mut delay, 2.0), vec![("value", Value::Number(2.0))]);
    }

    #[test]
    fn motor_actuates_only_on_change() {
        let mut motor = BlockKind::Motor.instantiate();
        let mut world = HeadlessWorld::new();
        let inputs = Inputs::new().with("rotationSpeed", Value::Number(3.0));
        for _ in 0..3 {
            let mut ctx = TickContext {
                dt: 0.1,
                inputs: &inputs,
                world: &mut world,
                object: ObjectRef(7),
            };
            motor.on_tick(&mut ctx).unwrap();
        }
        assert_eq!(
            world.actuations,
            vec![(ObjectRef(7), Actuation::Motor { speed: 3.0 })]
        );
    }
}
