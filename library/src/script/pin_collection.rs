use serde::{Deserialize, Serialize};

use super::pin::{Pin, PinDirection, PinKey};
use crate::model::DataType;

/// Per-node collection identifier, allocated from the same counter as pin keys.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionKey(pub u32);

/// A growable, ordered group of same-typed pins, e.g. the operands of a sum node.
#[derive(Clone, Debug)]
pub struct PinCollection {
    key: CollectionKey,
    pub name: String,
    direction: PinDirection,
    data_type: DataType,
    min: usize,
    max: Option<usize>,
    pins: Vec<Pin>,
}

impl PinCollection {
    pub(crate) fn new(
        key: CollectionKey,
        name: impl Into<String>,
        direction: PinDirection,
        data_type: DataType,
    ) -> Self {
        Self {
            key,
            name: name.into(),
            direction,
            data_type,
            min: 0,
            max: None,
            pins: Vec::new(),
        }
    }

    pub(crate) fn with_bounds(mut self, min: usize, max: Option<usize>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn key(&self) -> CollectionKey {
        self.key
    }

    pub fn direction(&self) -> PinDirection {
        self.direction
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// New pins take this type; existing pins are retyped by the script.
    pub(crate) fn set_type(&mut self, data_type: DataType) {
        self.data_type = data_type;
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> Option<usize> {
        self.max
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    pub fn keys(&self) -> Vec<PinKey> {
        self.pins.iter().map(Pin::key).collect()
    }

    pub fn can_add(&self) -> bool {
        self.max.is_none_or(|max| self.pins.len() < max)
    }

    pub fn can_remove(&self) -> bool {
        self.pins.len() > self.min
    }

    /// Label of the next pin, e.g. "Values 3".
    pub(crate) fn next_pin_name(&self) -> String {
        format!("{} {}", self.name, self.pins.len() + 1)
    }

    pub(crate) fn insert(&mut self, index: usize, pin: Pin) {
        let index = index.min(self.pins.len());
        self.pins.insert(index, pin);
    }

    pub(crate) fn push(&mut self, pin: Pin) {
        self.pins.push(pin);
    }

    pub(crate) fn remove(&mut self, key: PinKey) -> Option<(usize, Pin)> {
        let index = self.index_of(key)?;
        Some((index, self.pins.remove(index)))
    }

    pub fn index_of(&self, key: PinKey) -> Option<usize> {
        self.pins.iter().position(|p| p.key() == key)
    }

    pub fn pin(&self, key: PinKey) -> Option<&Pin> {
        self.pins.iter().find(|p| p.key() == key)
    }

    pub(crate) fn pin_mut(&mut self, key: PinKey) -> Option<&mut Pin> {
        self.pins.iter_mut().find(|p| p.key() == key)
    }

    pub(crate) fn pins_mut(&mut self) -> impl Iterator<Item = &mut Pin> {
        self.pins.iter_mut()
    }
}
