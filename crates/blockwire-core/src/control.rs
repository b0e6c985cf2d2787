//! Input-device control bindings.
//!
//! A controllable input can be driven directly by key presses instead of a
//! wire or its literal config. Two binding shapes exist: a list of keys each
//! mapped to a target value, and the two-key rotation binding used by motors.

use serde::{Deserialize, Serialize};

use crate::value::{Kind, KeyCode, Value};

// ---------------------------------------------------------------------------
// Binding types
// ---------------------------------------------------------------------------

/// How a key binding moves its input toward the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    /// Jump to the target while the key is held.
    #[default]
    Instant,
    /// Approach the target at the configured smoothing rate each tick.
    Smooth,
    /// Each press flips between the key's value and the rest value.
    Toggle,
}

/// Target value of one bound key. Only booleans and numbers are controllable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    Bool(bool),
    Number(f64),
}

impl ControlValue {
    /// Convert to a value of the input's kind. Numbers map to `true` when
    /// non-zero; booleans map to `1` or `0`.
    pub fn coerce(self, kind: Kind) -> Option<Value> {
        match (self, kind) {
            (ControlValue::Bool(b), Kind::Bool) => Some(Value::Bool(b)),
            (ControlValue::Number(n), Kind::Bool) => Some(Value::Bool(n != 0.0)),
            (ControlValue::Number(n), Kind::Number) => Some(Value::Number(n)),
            (ControlValue::Bool(b), Kind::Number) => Some(Value::Number(if b { 1.0 } else { 0.0 })),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub key: KeyCode,
    pub value: ControlValue,
}

impl KeyBinding {
    pub fn new(key: impl Into<String>, value: ControlValue) -> Self {
        Self {
            key: KeyCode::new(key),
            value,
        }
    }
}

/// Two-key rotation control. In switch mode a press latches the direction
/// until the same key is pressed again; otherwise the motor only turns while
/// a key is held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationBinding {
    pub add: KeyCode,
    pub sub: KeyCode,
    pub switch_mode: bool,
    pub speed: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlBinding {
    Keys {
        keys: Vec<KeyBinding>,
        mode: ControlMode,
        /// Return to the rest value when every key is released.
        reset: bool,
    },
    Rotation(RotationBinding),
}

impl ControlBinding {
    pub fn binds(&self, key: &KeyCode) -> bool {
        match self {
            ControlBinding::Keys { keys, .. } => keys.iter().any(|b| &b.key == key),
            ControlBinding::Rotation(r) => &r.add == key || &r.sub == key,
        }
    }

    pub fn is_smooth(&self) -> bool {
        matches!(
            self,
            ControlBinding::Keys {
                mode: ControlMode::Smooth,
                ..
            }
        )
    }

    /// Whether this binding can drive an input of the given kind.
    pub fn supports(&self, kind: Kind) -> bool {
        match self {
            ControlBinding::Keys { .. } => matches!(kind, Kind::Bool | Kind::Number),
            ControlBinding::Rotation(_) => kind == Kind::Number,
        }
    }

    /// Feed a key event. Returns the new target if it changed.
    ///
    /// `rest` is the value the input returns to when released: its literal
    /// config.
    pub fn on_key(
        &self,
        state: &mut ControlState,
        key: &KeyCode,
        pressed: bool,
        kind: Kind,
        rest: &Value,
    ) -> Option<Value> {
        if !self.binds(key) {
            return None;
        }
        let target = match self {
            ControlBinding::Keys { keys, mode, reset } => {
                let value_of = |k: &KeyCode| {
                    keys.iter()
                        .find(|b| &b.key == k)
                        .and_then(|b| b.value.coerce(kind))
                };
                match (mode, pressed) {
                    (ControlMode::Toggle, true) => {
                        let pressed_value = value_of(key)?;
                        if state.latched.as_ref() == Some(key) {
                            state.latched = None;
                            rest.clone()
                        } else {
                            state.latched = Some(key.clone());
                            pressed_value
                        }
                    }
                    (ControlMode::Toggle, false) => return None,
                    (_, true) => {
                        state.held.retain(|k| k != key);
                        state.held.push(key.clone());
                        value_of(key)?
                    }
                    (_, false) => {
                        state.held.retain(|k| k != key);
                        match state.held.last() {
                            Some(last) => value_of(last)?,
                            None if *reset => rest.clone(),
                            None => return None,
                        }
                    }
                }
            }
            ControlBinding::Rotation(rotation) => {
                let sign = if key == &rotation.add { 1 } else { -1 };
                if rotation.switch_mode {
                    if !pressed {
                        return None;
                    }
                    state.direction = if state.direction == sign { 0 } else { sign };
                } else {
                    if pressed {
                        state.held.retain(|k| k != key);
                        state.held.push(key.clone());
                    } else {
                        state.held.retain(|k| k != key);
                    }
                    let add = state.held.contains(&rotation.add) as i8;
                    let sub = state.held.contains(&rotation.sub) as i8;
                    state.direction = add - sub;
                }
                Value::Number(rotation.speed * f64::from(state.direction))
            }
        };
        state.target = Some(target.clone());
        Some(target)
    }
}

// ---------------------------------------------------------------------------
// Runtime state
// ---------------------------------------------------------------------------

/// Per-input control state. Reset whenever the input changes source.
#[derive(Debug, Clone, Default)]
pub struct ControlState {
    /// Bound keys currently held, in press order.
    held: Vec<KeyCode>,
    /// Toggle mode: the key whose value is latched on.
    latched: Option<KeyCode>,
    /// Rotation: -1, 0 or 1.
    direction: i8,
    /// Last target produced; smooth bindings approach it each tick.
    target: Option<Value>,
}

impl ControlState {
    pub fn target(&self) -> Option<&Value> {
        self.target.as_ref()
    }

    /// Advance a smooth binding by `dt` seconds. Returns the next value, or
    /// `None` once the target is reached.
    pub fn step_smooth(&self, current: &Value, rate: f64, dt: f64) -> Option<Value> {
        let target = self.target.as_ref()?;
        if current.same(target) {
            return None;
        }
        match (current, target) {
            (Value::Number(from), Value::Number(to)) => {
                let max_step = rate * dt;
                let delta = to - from;
                if delta.abs() <= max_step {
                    Some(Value::Number(*to))
                } else {
                    Some(Value::Number(from + max_step.copysign(delta)))
                }
            }
            _ => Some(target.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(mode: ControlMode, reset: bool) -> ControlBinding {
        ControlBinding::Keys {
            keys: vec![
                KeyBinding::new("W", ControlValue::Number(1.0)),
                KeyBinding::new("S", ControlValue::Number(-1.0)),
            ],
            mode,
            reset,
        }
    }

    fn key(name: &str) -> KeyCode {
        KeyCode::new(name)
    }

    const REST: Value = Value::Number(0.0);

    #[test]
    fn instant_follows_most_recent_held_key() {
        let binding = keys(ControlMode::Instant, true);
        let mut state = ControlState::default();
        let w = binding.on_key(&mut state, &key("W"), true, Kind::Number, &REST);
        assert_eq!(w, Some(Value::Number(1.0)));
        let s = binding.on_key(&mut state, &key("S"), true, Kind::Number, &REST);
        assert_eq!(s, Some(Value::Number(-1.0)));
        let release_s = binding.on_key(&mut state, &key("S"), false, Kind::Number, &REST);
        assert_eq!(release_s, Some(Value::Number(1.0)));
        let release_w = binding.on_key(&mut state, &key("W"), false, Kind::Number, &REST);
        assert_eq!(release_w, Some(REST));
    }

    #[test]
    fn instant_without_reset_holds_last_value() {
        let binding = keys(ControlMode::Instant, false);
        let mut state = ControlState::default();
        binding.on_key(&mut state, &key("W"), true, Kind::Number, &REST);
        assert_eq!(
            binding.on_key(&mut state, &key("W"), false, Kind::Number, &REST),
            None
        );
        assert_eq!(state.target(), Some(&Value::Number(1.0)));
    }

    #[test]
    fn toggle_latches_and_unlatches() {
        let binding = keys(ControlMode::Toggle, false);
        let mut state = ControlState::default();
        assert_eq!(
            binding.on_key(&mut state, &key("W"), true, Kind::Number, &REST),
            Some(Value::Number(1.0))
        );
        assert_eq!(
            binding.on_key(&mut state, &key("W"), false, Kind::Number, &REST),
            None
        );
        assert_eq!(
            binding.on_key(&mut state, &key("W"), true, Kind::Number, &REST),
            Some(REST)
        );
    }

    #[test]
    fn unbound_key_is_ignored() {
        let binding = keys(ControlMode::Instant, true);
        let mut state = ControlState::default();
        assert_eq!(
            binding.on_key(&mut state, &key("Q"), true, Kind::Number, &REST),
            None
        );
    }

    #[test]
    fn values_coerce_to_bool_inputs() {
        let binding = keys(ControlMode::Instant, true);
        let mut state = ControlState::default();
        let rest = Value::Bool(false);
        assert_eq!(
            binding.on_key(&mut state, &key("S"), true, Kind::Bool, &rest),
            Some(Value::Bool(true))
        );
    }

    #[test]
    fn rotation_hold_mode() {
        let binding = ControlBinding::Rotation(RotationBinding {
            add: key("E"),
            sub: key("Q"),
            switch_mode: false,
            speed: 3.0,
        });
        let mut state = ControlState::default();
        assert_eq!(
            binding.on_key(&mut state, &key("E"), true, Kind::Number, &REST),
            Some(Value::Number(3.0))
        );
        assert_eq!(
            binding.on_key(&mut state, &key("Q"), true, Kind::Number, &REST),
            Some(Value::Number(0.0))
        );
        assert_eq!(
            binding.on_key(&mut state, &key("E"), false, Kind::Number, &REST),
            Some(Value::Number(-3.0))
        );
    }

    #[test]
    fn rotation_switch_mode_latches_direction() {
        let binding = ControlBinding::Rotation(RotationBinding {
            add: key("E"),
            sub: key("Q"),
            switch_mode: true,
            speed: 2.0,
        });
        let mut state = ControlState::default();
        binding.on_key(&mut state, &key("E"), true, Kind::Number, &REST);
        assert_eq!(
            binding.on_key(&mut state, &key("E"), false, Kind::Number, &REST),
            None
        );
        assert_eq!(state.target(), Some(&Value::Number(2.0)));
        assert_eq!(
            binding.on_key(&mut state, &key("Q"), true, Kind::Number, &REST),
            Some(Value::Number(-2.0))
        );
        assert_eq!(
            binding.on_key(&mut state, &key("Q"), true, Kind::Number, &REST),
            Some(Value::Number(0.0))
        );
    }

    #[test]
    fn smooth_step_approaches_target() {
        let binding = keys(ControlMode::Smooth, true);
        let mut state = ControlState::default();
        binding.on_key(&mut state, &key("W"), true, Kind::Number, &REST);

        let next = state.step_smooth(&Value::Number(0.0), 4.0, 0.1).unwrap();
        assert!((next.as_number().unwrap() - 0.4).abs() < 1e-12);
        let last = state.step_smooth(&Value::Number(0.9), 4.0, 0.1).unwrap();
        assert_eq!(last, Value::Number(1.0));
        assert_eq!(state.step_smooth(&Value::Number(1.0), 4.0, 0.1), None);
    }
}
