//! Pins: typed endpoints on a node.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ScriptError};
use crate::model::{DataType, Value};

/// Direction of a pin.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PinDirection {
    Input,
    Output,
}

/// Per-node pin identifier. Keys are allocated by the owning node and never reused.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinKey(pub u32);

impl fmt::Display for PinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a specific pin on a specific node.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PinId {
    pub node_id: Uuid,
    pub key: PinKey,
}

impl PinId {
    pub fn new(node_id: Uuid, key: PinKey) -> Self {
        Self { node_id, key }
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.node_id, self.key)
    }
}

/// Can an output of type `source` feed an input of type `target`.
///
/// `Any` inputs take everything, `Numeric` bridges every number kind in both
/// directions (values are converted when they cross the connection).
pub fn types_connectable(source: &DataType, target: &DataType) -> bool {
    source == target
        || *target == DataType::Any
        || (*target == DataType::Numeric && source.is_numeric())
        || (*source == DataType::Numeric && target.is_numeric())
}

/// A typed, named endpoint on a node.
#[derive(Clone, Debug)]
pub struct Pin {
    key: PinKey,
    pub name: String,
    direction: PinDirection,
    data_type: DataType,
    value: Value,
    is_evaluated: bool,
    connected_to: Vec<PinId>,
}

impl Pin {
    pub fn new(key: PinKey, name: impl Into<String>, direction: PinDirection, data_type: DataType) -> Self {
        Self {
            key,
            name: name.into(),
            direction,
            value: Value::default_for(&data_type),
            data_type,
            is_evaluated: false,
            connected_to: Vec::new(),
        }
    }

    pub fn key(&self) -> PinKey {
        self.key
    }

    pub fn direction(&self) -> PinDirection {
        self.direction
    }

    pub fn is_input(&self) -> bool {
        self.direction == PinDirection::Input
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// The cached value. Only trustworthy while `is_evaluated()` is true;
    /// use `NodeScript::pin_value` to read with lazy evaluation.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn is_evaluated(&self) -> bool {
        self.is_evaluated
    }

    pub fn connected_to(&self) -> &[PinId] {
        &self.connected_to
    }

    pub fn is_connected(&self) -> bool {
        !self.connected_to.is_empty()
    }

    /// Direction-aware compatibility with a partner pin of type `other`.
    pub fn is_type_compatible(&self, other: &DataType) -> bool {
        match self.direction {
            PinDirection::Input => types_connectable(other, &self.data_type),
            PinDirection::Output => types_connectable(&self.data_type, other),
        }
    }

    /// Stores a value and marks the pin evaluated.
    ///
    /// `Null` on a value type stores the type default. Returns whether the stored
    /// value changed.
    pub fn set_value(&mut self, value: Value) -> Result<bool> {
        let value = if value.is_null() {
            Value::default_for(&self.data_type)
        } else if value.is_assignable_to(&self.data_type) {
            value
        } else {
            return Err(ScriptError::InvalidAssignment {
                value_type: value.type_label(),
                pin_type: self.data_type.clone(),
            });
        };

        let changed = self.value != value;
        self.value = value;
        self.is_evaluated = true;
        Ok(changed)
    }

    /// Stores the type default and marks the pin evaluated.
    pub(crate) fn set_default(&mut self) {
        self.value = Value::default_for(&self.data_type);
        self.is_evaluated = true;
    }

    pub(crate) fn invalidate(&mut self) {
        self.is_evaluated = false;
    }

    /// Rewrites the declared type in place. Connections are left to the caller.
    pub(crate) fn set_type(&mut self, data_type: DataType) {
        self.value = Value::default_for(&data_type);
        self.data_type = data_type;
        self.is_evaluated = false;
    }

    pub(crate) fn add_connection(&mut self, other: PinId) {
        if !self.connected_to.contains(&other) {
            self.connected_to.push(other);
        }
    }

    pub(crate) fn remove_connection(&mut self, other: PinId) -> bool {
        let before = self.connected_to.len();
        self.connected_to.retain(|p| *p != other);
        let removed = before != self.connected_to.len();
        if removed && self.is_input() {
            self.is_evaluated = false;
        }
        removed
    }

    pub(crate) fn take_connections(&mut self) -> Vec<PinId> {
        self.is_evaluated = false;
        std::mem::take(&mut self.connected_to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Numeric;

    #[test]
    fn test_set_value_validates_type() {
        let mut pin = Pin::new(PinKey(0), "Out", PinDirection::Output, DataType::Int);
        let err = pin.set_value(Value::from("text")).unwrap_err();
        match err {
            ScriptError::InvalidAssignment { value_type, pin_type } => {
                assert_eq!(value_type, DataType::Text);
                assert_eq!(pin_type, DataType::Int);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!pin.is_evaluated());
    }

    #[test]
    fn test_null_on_value_type_substitutes_default() {
        let mut pin = Pin::new(PinKey(0), "Out", PinDirection::Output, DataType::Boolean);
        pin.set_value(Value::from(true)).unwrap();
        pin.set_value(Value::Null).unwrap();
        assert_eq!(pin.value(), &Value::Boolean(false));
        assert!(pin.is_evaluated());
    }

    #[test]
    fn test_numeric_pin_accepts_every_number() {
        let mut pin = Pin::new(PinKey(0), "In", PinDirection::Input, DataType::Numeric);
        assert!(pin.set_value(Value::from(7)).unwrap());
        assert_eq!(pin.value(), &Value::Number(Numeric::Int(7)));
        assert!(pin.set_value(Value::from(2.5f32)).unwrap());
        assert!(!pin.set_value(Value::from(2.5f32)).unwrap());
    }

    #[test]
    fn test_direction_aware_compatibility() {
        let input = Pin::new(PinKey(0), "In", PinDirection::Input, DataType::Any);
        assert!(input.is_type_compatible(&DataType::Color));

        let output = Pin::new(PinKey(1), "Out", PinDirection::Output, DataType::Any);
        assert!(!output.is_type_compatible(&DataType::Color));
        assert!(output.is_type_compatible(&DataType::Any));

        let numeric = Pin::new(PinKey(2), "In", PinDirection::Input, DataType::Numeric);
        assert!(numeric.is_type_compatible(&DataType::Byte));
        assert!(!numeric.is_type_compatible(&DataType::Text));
    }

    #[test]
    fn test_set_type_resets_value() {
        let mut pin = Pin::new(PinKey(0), "In", PinDirection::Input, DataType::Int);
        pin.set_value(Value::from(5)).unwrap();
        pin.set_type(DataType::Text);
        assert_eq!(pin.value(), &Value::Text(String::new()));
        assert!(!pin.is_evaluated());
    }
}
