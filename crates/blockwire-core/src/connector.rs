//! Typed connector declarations and per-input live configuration.
//!
//! Each block declares its inputs and outputs with the set of kinds they
//! accept. Connectors that share a group name must agree on one concrete kind
//! (a generic `add` keeps both operands and its result numeric, or all
//! vectors).

use std::collections::BTreeMap;

use crate::control::{ControlBinding, ControlState};
use crate::value::{Kind, KindSet, Value};

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// Declared shape of one input connector.
#[derive(Debug, Clone)]
pub struct InputDef {
    pub name: String,
    /// Accepted kinds and the default literal for each.
    pub types: BTreeMap<Kind, Value>,
    pub group: Option<String>,
    /// Whether a control binding may drive this input.
    pub controllable: bool,
}

impl InputDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: BTreeMap::new(),
            group: None,
            controllable: false,
        }
    }

    /// Accept a kind with its synthesized default.
    pub fn kind(self, kind: Kind) -> Self {
        self.kind_default(kind, kind.default_value())
    }

    /// Accept a kind with an explicit default literal.
    pub fn kind_default(mut self, kind: Kind, default: Value) -> Self {
        debug_assert_eq!(default.kind(), kind);
        self.types.insert(kind, default);
        self
    }

    pub fn kinds(self, kinds: &[Kind]) -> Self {
        kinds.iter().fold(self, |def, k| def.kind(*k))
    }

    pub fn any(self) -> Self {
        self.kinds(&Kind::ALL)
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn controllable(mut self) -> Self {
        self.controllable = true;
        self
    }

    pub fn accepts(&self) -> KindSet {
        self.types.keys().copied().collect()
    }

    /// Default literal for a kind, synthesized if the declaration has none.
    pub fn default_for(&self, kind: Kind) -> Value {
        self.types
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| kind.default_value())
    }

    /// The kind used before anything is chosen: the first declared kind.
    pub fn provisional_kind(&self) -> Kind {
        self.types.keys().next().copied().unwrap_or(Kind::Number)
    }
}

/// Declared shape of one output connector.
#[derive(Debug, Clone)]
pub struct OutputDef {
    pub name: String,
    pub types: KindSet,
    pub group: Option<String>,
}

impl OutputDef {
    pub fn new(name: impl Into<String>, types: KindSet) -> Self {
        Self {
            name: name.into(),
            types,
            group: None,
        }
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Initial value written into the output cell.
    pub fn initial_value(&self) -> Value {
        self.types.first().unwrap_or(Kind::Number).default_value()
    }
}

/// The full connector schema of a block type.
#[derive(Debug, Clone, Default)]
pub struct BlockSchema {
    pub inputs: Vec<InputDef>,
    pub outputs: Vec<OutputDef>,
}

impl BlockSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, def: InputDef) -> Self {
        self.inputs.push(def);
        self
    }

    pub fn output(mut self, def: OutputDef) -> Self {
        self.outputs.push(def);
        self
    }

    pub fn find_input(&self, name: &str) -> Option<&InputDef> {
        self.inputs.iter().find(|d| d.name == name)
    }

    pub fn find_output(&self, name: &str) -> Option<&OutputDef> {
        self.outputs.iter().find(|d| d.name == name)
    }

    /// Names of all groups declared by this schema, in first-seen order.
    pub fn groups(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        let names = self
            .inputs
            .iter()
            .filter_map(|d| d.group.as_deref())
            .chain(self.outputs.iter().filter_map(|d| d.group.as_deref()));
        for name in names {
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
        seen
    }

    /// Intersection of every member's declared kinds for a group.
    pub fn group_declared(&self, group: &str) -> KindSet {
        let inputs = self
            .inputs
            .iter()
            .filter(|d| d.group.as_deref() == Some(group))
            .map(InputDef::accepts);
        let outputs = self
            .outputs
            .iter()
            .filter(|d| d.group.as_deref() == Some(group))
            .map(|d| d.types);
        inputs.chain(outputs).fold(KindSet::ALL, KindSet::intersect)
    }
}

// ---------------------------------------------------------------------------
// Kind resolution
// ---------------------------------------------------------------------------

/// How a polymorphic input's concrete kind was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Adopted from the connected output.
    Wired(Kind),
    /// The declaration allows exactly one kind.
    Single(Kind),
    /// Chosen explicitly through config.
    Chosen(Kind),
    /// Several kinds possible and none chosen yet.
    Unset,
}

impl Resolution {
    pub fn kind(self) -> Option<Kind> {
        match self {
            Resolution::Wired(k) | Resolution::Single(k) | Resolution::Chosen(k) => Some(k),
            Resolution::Unset => None,
        }
    }
}

/// Resolve an input's kind: the wire wins, then a single declared kind, then
/// an explicit choice, else unset.
pub fn resolve_kind(declared: KindSet, wired: Option<Kind>, chosen: Option<Kind>) -> Resolution {
    if let Some(kind) = wired {
        return Resolution::Wired(kind);
    }
    if let Some(kind) = declared.only() {
        return Resolution::Single(kind);
    }
    match chosen {
        Some(kind) if declared.contains(kind) => Resolution::Chosen(kind),
        _ => Resolution::Unset,
    }
}

// ---------------------------------------------------------------------------
// Live input configuration
// ---------------------------------------------------------------------------

/// Live configuration of one input. Never aliases persisted data; the
/// serializer copies out of it.
///
/// Whether the input is wired is owned by the wire manager, not recorded
/// here. A wire overrides both the literal and any control binding.
#[derive(Debug, Clone, Default)]
pub struct InputConfig {
    /// The user's literal value. `None` means no kind has been chosen.
    pub literal: Option<Value>,
    pub control: Option<ControlBinding>,
    /// Whether the control binding currently drives the input.
    pub controlled: bool,
    pub(crate) control_state: ControlState,
}

impl InputConfig {
    pub fn with_literal(value: Value) -> Self {
        Self {
            literal: Some(value),
            ..Self::default()
        }
    }

    /// The literal to show in the cell: the user's value if it matches the
    /// required kind, else the declaration's default for that kind.
    pub fn literal_for(&self, def: &InputDef, kind: Kind) -> Value {
        match &self.literal {
            Some(v) if v.kind() == kind => v.clone(),
            _ => def.default_for(kind),
        }
    }

    pub(crate) fn reset_control_state(&mut self) {
        self.control_state = ControlState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_schema() -> BlockSchema {
        let numeric = [Kind::Number, Kind::Vector3];
        BlockSchema::new()
            .input(InputDef::new("value1").kinds(&numeric).group("value"))
            .input(InputDef::new("value2").kinds(&numeric).group("value"))
            .output(OutputDef::new("result", KindSet::of(&numeric)).group("value"))
    }

    #[test]
    fn input_def_builder_collects_kinds() {
        let def = InputDef::new("value")
            .kind(Kind::Number)
            .kind_default(Kind::Bool, Value::Bool(true));
        assert_eq!(def.accepts(), KindSet::of(&[Kind::Bool, Kind::Number]));
        assert_eq!(def.default_for(Kind::Bool), Value::Bool(true));
        assert_eq!(def.default_for(Kind::Number), Value::Number(0.0));
        assert_eq!(def.provisional_kind(), Kind::Bool);
    }

    #[test]
    fn resolve_prefers_wire_then_single_then_choice() {
        let both = KindSet::of(&[Kind::Number, Kind::Vector3]);
        assert_eq!(
            resolve_kind(both, Some(Kind::Vector3), Some(Kind::Number)),
            Resolution::Wired(Kind::Vector3)
        );
        assert_eq!(
            resolve_kind(KindSet::single(Kind::Bool), None, None),
            Resolution::Single(Kind::Bool)
        );
        assert_eq!(
            resolve_kind(both, None, Some(Kind::Number)),
            Resolution::Chosen(Kind::Number)
        );
        assert_eq!(resolve_kind(both, None, None), Resolution::Unset);
        assert_eq!(resolve_kind(both, None, Some(Kind::Color)), Resolution::Unset);
    }

    #[test]
    fn group_declared_intersects_members() {
        let schema = add_schema()
            .input(InputDef::new("scale").kind(Kind::Number).group("value"));
        assert_eq!(schema.group_declared("value"), KindSet::single(Kind::Number));
        assert_eq!(schema.groups(), vec!["value"]);
    }

    #[test]
    fn literal_for_falls_back_on_kind_mismatch() {
        let schema = add_schema();
        let def = schema.find_input("value1").unwrap();
        let config = InputConfig::with_literal(Value::Number(5.0));
        assert_eq!(config.literal_for(def, Kind::Number), Value::Number(5.0));
        assert_eq!(
            config.literal_for(def, Kind::Vector3),
            Kind::Vector3.default_value()
        );
    }
}
