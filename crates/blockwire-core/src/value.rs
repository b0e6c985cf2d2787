//! Value kinds, the tagged value union, and kind sets.
//!
//! Every connector declares which [`Kind`]s it accepts as a [`KindSet`].
//! Payloads are persisted without their tag through [`Value::to_json`] and
//! [`Value::from_json`]; the kind travels alongside.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

/// The tag of the value union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Bool,
    Number,
    Vector3,
    Color,
    String,
    Byte,
    ByteArray,
    KeyCode,
}

impl Kind {
    /// All kinds in declaration order.
    pub const ALL: [Kind; 8] = [
        Kind::Bool,
        Kind::Number,
        Kind::Vector3,
        Kind::Color,
        Kind::String,
        Kind::Byte,
        Kind::ByteArray,
        Kind::KeyCode,
    ];

    fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// The synthesized default for this kind. A freshly placed block uses
    /// these so it is calculable before anything is wired.
    pub fn default_value(self) -> Value {
        match self {
            Kind::Bool => Value::Bool(false),
            Kind::Number => Value::Number(0.0),
            Kind::Vector3 => Value::Vector3(Vec3::ZERO),
            Kind::Color => Value::Color(Color::WHITE),
            Kind::String => Value::String(String::new()),
            Kind::Byte => Value::Byte(0),
            Kind::ByteArray => Value::ByteArray(Vec::new()),
            Kind::KeyCode => Value::KeyCode(KeyCode::default()),
        }
    }

    /// The persisted tag name.
    pub fn tag(self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Number => "number",
            Kind::Vector3 => "vector3",
            Kind::Color => "color",
            Kind::String => "string",
            Kind::Byte => "byte",
            Kind::ByteArray => "bytearray",
            Kind::KeyCode => "keycode",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

// ---------------------------------------------------------------------------
// KindSet
// ---------------------------------------------------------------------------

/// A set of kinds, stored as a bitset. Iterates in [`Kind::ALL`] order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KindSet(u16);

impl KindSet {
    pub const EMPTY: KindSet = KindSet(0);
    pub const ALL: KindSet = KindSet(0xFF);

    pub fn of(kinds: &[Kind]) -> Self {
        kinds.iter().copied().collect()
    }

    pub fn single(kind: Kind) -> Self {
        Self(kind.bit())
    }

    pub fn insert(&mut self, kind: Kind) {
        self.0 |= kind.bit();
    }

    pub fn contains(self, kind: Kind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn intersect(self, other: KindSet) -> KindSet {
        KindSet(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// The only member, if the set has exactly one.
    pub fn only(self) -> Option<Kind> {
        if self.len() == 1 { self.first() } else { None }
    }

    /// The lowest member in declaration order.
    pub fn first(self) -> Option<Kind> {
        self.iter().next()
    }

    pub fn iter(self) -> impl Iterator<Item = Kind> {
        Kind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl FromIterator<Kind> for KindSet {
    fn from_iter<I: IntoIterator<Item = Kind>>(iter: I) -> Self {
        let mut set = KindSet::EMPTY;
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl std::fmt::Debug for KindSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Serialize for KindSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for KindSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let kinds = Vec::<Kind>::deserialize(deserializer)?;
        Ok(kinds.into_iter().collect())
    }
}

/// Intersect any number of candidate kind sets.
///
/// The intersection of zero sets is [`KindSet::ALL`]. The result does not
/// depend on argument order.
pub fn intersect_types(sets: &[KindSet]) -> KindSet {
    sets.iter().fold(KindSet::ALL, |acc, set| acc.intersect(*set))
}

// ---------------------------------------------------------------------------
// Primitive payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Name of an input-device key, e.g. `"W"` or `"LeftShift"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub String);

impl KeyCode {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A single typed value held by a cell.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Vector3(Vec3),
    Color(Color),
    String(String),
    Byte(u8),
    ByteArray(Vec<u8>),
    KeyCode(KeyCode),
}

/// Errors converting persisted JSON into a [`Value`].
#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    #[error("expected {expected} value, got {found}")]
    Mismatch { expected: Kind, found: String },
}

fn same_f64(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::Number(_) => Kind::Number,
            Value::Vector3(_) => Kind::Vector3,
            Value::Color(_) => Kind::Color,
            Value::String(_) => Kind::String,
            Value::Byte(_) => Kind::Byte,
            Value::ByteArray(_) => Kind::ByteArray,
            Value::KeyCode(_) => Kind::KeyCode,
        }
    }

    /// Structural equality. Two NaNs compare equal so a NaN-producing
    /// circuit still settles.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => same_f64(*a, *b),
            (Value::Vector3(a), Value::Vector3(b)) => {
                same_f64(a.x, b.x) && same_f64(a.y, b.y) && same_f64(a.z, b.z)
            }
            (Value::Color(a), Value::Color(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::ByteArray(a), Value::ByteArray(b)) => a == b,
            (Value::KeyCode(a), Value::KeyCode(b)) => a == b,
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vector3(&self) -> Option<Vec3> {
        match self {
            Value::Vector3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Encode the payload (without the kind tag) for persistence.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;
        match self {
            Value::Bool(v) => json!(v),
            Value::Number(v) => number_to_json(*v),
            Value::Vector3(v) => json!([
                number_to_json(v.x),
                number_to_json(v.y),
                number_to_json(v.z)
            ]),
            Value::Color(c) => json!([c.r, c.g, c.b]),
            Value::String(v) => json!(v),
            Value::Byte(v) => json!(v),
            Value::ByteArray(v) => json!(v),
            Value::KeyCode(k) => json!(k.0),
        }
    }

    /// Decode a persisted payload of the given kind.
    pub fn from_json(kind: Kind, json: &serde_json::Value) -> Result<Value, ValueError> {
        let mismatch = || ValueError::Mismatch {
            expected: kind,
            found: json.to_string(),
        };
        match kind {
            Kind::Bool => json.as_bool().map(Value::Bool).ok_or_else(mismatch),
            Kind::Number => number_from_json(json).map(Value::Number).ok_or_else(mismatch),
            Kind::Vector3 => {
                let parts = json.as_array().filter(|a| a.len() == 3).ok_or_else(mismatch)?;
                let mut xyz = [0.0; 3];
                for (slot, part) in xyz.iter_mut().zip(parts) {
                    *slot = number_from_json(part).ok_or_else(mismatch)?;
                }
                Ok(Value::Vector3(Vec3::new(xyz[0], xyz[1], xyz[2])))
            }
            Kind::Color => {
                let parts = json.as_array().filter(|a| a.len() == 3).ok_or_else(mismatch)?;
                let mut rgb = [0u8; 3];
                for (slot, part) in rgb.iter_mut().zip(parts) {
                    *slot = part
                        .as_u64()
                        .and_then(|v| u8::try_from(v).ok())
                        .ok_or_else(mismatch)?;
                }
                Ok(Value::Color(Color::rgb(rgb[0], rgb[1], rgb[2])))
            }
            Kind::String => json
                .as_str()
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(mismatch),
            Kind::Byte => json
                .as_u64()
                .and_then(|v| u8::try_from(v).ok())
                .map(Value::Byte)
                .ok_or_else(mismatch),
            Kind::ByteArray => {
                let items = json.as_array().ok_or_else(mismatch)?;
                items
                    .iter()
                    .map(|item| item.as_u64().and_then(|v| u8::try_from(v).ok()))
                    .collect::<Option<Vec<u8>>>()
                    .map(Value::ByteArray)
                    .ok_or_else(mismatch)
            }
            Kind::KeyCode => json
                .as_str()
                .map(|s| Value::KeyCode(KeyCode::new(s)))
                .ok_or_else(mismatch),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.same(other)
    }
}

// JSON has no representation for non-finite numbers; they are written as
// strings so a save never silently turns NaN into null.
fn number_to_json(v: f64) -> serde_json::Value {
    if v.is_nan() {
        serde_json::Value::from("nan")
    } else if v == f64::INFINITY {
        serde_json::Value::from("inf")
    } else if v == f64::NEG_INFINITY {
        serde_json::Value::from("-inf")
    } else {
        serde_json::Value::from(v)
    }
}

fn number_from_json(json: &serde_json::Value) -> Option<f64> {
    match json {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => match s.as_str() {
            "nan" => Some(f64::NAN),
            "inf" => Some(f64::INFINITY),
            "-inf" => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_set_basic_operations() {
        let numeric = KindSet::of(&[Kind::Number, Kind::Vector3]);
        assert_eq!(numeric.len(), 2);
        assert!(numeric.contains(Kind::Number));
        assert!(!numeric.contains(Kind::Bool));
        assert_eq!(numeric.first(), Some(Kind::Number));
        assert_eq!(numeric.only(), None);
        assert_eq!(KindSet::single(Kind::Bool).only(), Some(Kind::Bool));
    }

    #[test]
    fn intersect_types_over_many_sets() {
        let a = KindSet::of(&[Kind::Number, Kind::Vector3, Kind::Bool]);
        let b = KindSet::of(&[Kind::Number, Kind::Vector3]);
        let c = KindSet::of(&[Kind::Vector3, Kind::Color]);
        assert_eq!(intersect_types(&[a, b, c]), KindSet::single(Kind::Vector3));
        assert_eq!(intersect_types(&[]), KindSet::ALL);
        assert!(intersect_types(&[a, KindSet::single(Kind::String)]).is_empty());
    }

    #[test]
    fn kind_set_serializes_as_list() {
        let set = KindSet::of(&[Kind::Vector3, Kind::Bool]);
        let json = serde_json::to_value(set).unwrap();
        assert_eq!(json, json!(["bool", "vector3"]));
        let back: KindSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn defaults_match_their_kind() {
        for kind in Kind::ALL {
            assert_eq!(kind.default_value().kind(), kind);
        }
    }

    #[test]
    fn nan_is_structurally_equal_to_nan() {
        assert!(Value::Number(f64::NAN).same(&Value::Number(f64::NAN)));
        assert!(!Value::Number(1.0).same(&Value::Number(2.0)));
        assert!(!Value::Number(0.0).same(&Value::Bool(false)));
    }

    #[test]
    fn non_finite_numbers_survive_json() {
        let json = Value::Number(f64::INFINITY).to_json();
        assert_eq!(json, json!("inf"));
        let back = Value::from_json(Kind::Number, &json).unwrap();
        assert_eq!(back.as_number(), Some(f64::INFINITY));
    }

    #[test]
    fn color_channels_must_fit_a_byte() {
        assert!(Value::from_json(Kind::Color, &json!([255, 0, 12])).is_ok());
        assert!(Value::from_json(Kind::Color, &json!([256, 0, 0])).is_err());
    }
}
