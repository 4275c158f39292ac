use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::context::NodeContext;
use super::pin::{Pin, PinDirection, PinKey};
use super::pin_collection::{CollectionKey, PinCollection};
use crate::error::Result;
use crate::model::DataType;

/// Behaviour of a node type.
///
/// The script owns the node and lends it to its logic through a `NodeContext` for
/// the duration of each callback.
pub trait NodeLogic: Send {
    /// Declares the node's pins. Called once, right after the node is created.
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()>;

    /// Called after storage is loaded and before connections are restored.
    fn initialize(&mut self, _ctx: &mut NodeContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Computes output values from inputs. Inputs are pulled lazily via the context.
    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()>;

    /// Node-specific persisted state.
    fn storage(&self) -> Option<serde_json::Value> {
        None
    }

    fn load_storage(&mut self, _storage: serde_json::Value) -> Result<()> {
        Ok(())
    }

    /// Called after an edit replaced the storage of a live node.
    fn storage_changed(&mut self, _ctx: &mut NodeContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called at the start of every evaluation pass.
    fn reset(&mut self) {}
}

/// Evaluation state within the current pass.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NodeState {
    #[default]
    Unevaluated,
    /// On the evaluation stack; re-entering it means a cycle.
    Evaluating,
    Evaluated,
}

/// The last error raised while evaluating a node.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NodeFailure {
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl NodeFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }
}

/// Stable, positional address of a pin: `collection` is the index of the pin
/// collection on the node, `None` for standalone pins.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PinPosition {
    pub collection: Option<usize>,
    pub index: usize,
}

/// A graph node.
pub struct Node {
    id: Uuid,
    type_id: String,
    provider_id: String,
    pub name: String,
    pub description: String,
    pub x: f64,
    pub y: f64,
    is_exit: bool,
    pins: Vec<Pin>,
    collections: Vec<PinCollection>,
    // Every pin ever created through `create_or_add_pin`, in creation order.
    input_bucket: Vec<PinKey>,
    output_bucket: Vec<PinKey>,
    // Removed pins, kept so they come back with their keys.
    parked: Vec<Pin>,
    next_key: u32,
    pub(crate) state: NodeState,
    pub(crate) failure: Option<NodeFailure>,
    pub(crate) logic: Option<Box<dyn NodeLogic>>,
}

impl Node {
    pub(crate) fn new(
        id: Uuid,
        type_id: impl Into<String>,
        provider_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id,
            type_id: type_id.into(),
            provider_id: provider_id.into(),
            name: name.into(),
            description: description.into(),
            x: 0.0,
            y: 0.0,
            is_exit: false,
            pins: Vec::new(),
            collections: Vec::new(),
            input_bucket: Vec::new(),
            output_bucket: Vec::new(),
            parked: Vec::new(),
            next_key: 0,
            state: NodeState::Unevaluated,
            failure: None,
            logic: None,
        }
    }

    pub(crate) fn as_exit(mut self) -> Self {
        self.is_exit = true;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn is_exit_node(&self) -> bool {
        self.is_exit
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn failure(&self) -> Option<&NodeFailure> {
        self.failure.as_ref()
    }

    pub fn storage(&self) -> Option<serde_json::Value> {
        self.logic.as_ref().and_then(|logic| logic.storage())
    }

    /// Standalone pins, in declaration order.
    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    pub fn collections(&self) -> &[PinCollection] {
        &self.collections
    }

    pub fn collection(&self, key: CollectionKey) -> Option<&PinCollection> {
        self.collections.iter().find(|c| c.key() == key)
    }

    /// Standalone pins followed by the pins of every collection.
    pub fn all_pins(&self) -> impl Iterator<Item = &Pin> {
        self.pins
            .iter()
            .chain(self.collections.iter().flat_map(|c| c.pins().iter()))
    }

    pub fn input_pins(&self) -> impl Iterator<Item = &Pin> {
        self.all_pins().filter(|p| p.is_input())
    }

    pub fn output_pins(&self) -> impl Iterator<Item = &Pin> {
        self.all_pins().filter(|p| !p.is_input())
    }

    pub fn pin(&self, key: PinKey) -> Option<&Pin> {
        self.pins
            .iter()
            .find(|p| p.key() == key)
            .or_else(|| self.collections.iter().find_map(|c| c.pin(key)))
    }

    pub fn pin_by_name(&self, name: &str) -> Option<&Pin> {
        self.all_pins().find(|p| p.name == name)
    }

    pub fn collection_of(&self, key: PinKey) -> Option<CollectionKey> {
        self.collections
            .iter()
            .find(|c| c.pin(key).is_some())
            .map(PinCollection::key)
    }

    pub fn position_of(&self, key: PinKey) -> Option<PinPosition> {
        if let Some(index) = self.pins.iter().position(|p| p.key() == key) {
            return Some(PinPosition { collection: None, index });
        }
        self.collections.iter().enumerate().find_map(|(ci, c)| {
            c.index_of(key).map(|index| PinPosition {
                collection: Some(ci),
                index,
            })
        })
    }

    pub fn pin_at(&self, position: PinPosition) -> Option<&Pin> {
        match position.collection {
            None => self.pins.get(position.index),
            Some(ci) => self.collections.get(ci)?.pins().get(position.index),
        }
    }

    pub(crate) fn pin_mut(&mut self, key: PinKey) -> Option<&mut Pin> {
        if let Some(index) = self.pins.iter().position(|p| p.key() == key) {
            return self.pins.get_mut(index);
        }
        self.collections.iter_mut().find_map(|c| c.pin_mut(key))
    }

    pub(crate) fn pins_mut(&mut self) -> impl Iterator<Item = &mut Pin> {
        self.pins
            .iter_mut()
            .chain(self.collections.iter_mut().flat_map(|c| c.pins_mut()))
    }

    pub(crate) fn collection_mut(&mut self, key: CollectionKey) -> Option<&mut PinCollection> {
        self.collections.iter_mut().find(|c| c.key() == key)
    }

    fn alloc_key(&mut self) -> u32 {
        let key = self.next_key;
        self.next_key += 1;
        key
    }

    pub(crate) fn add_pin(&mut self, name: impl Into<String>, direction: PinDirection, data_type: DataType) -> PinKey {
        let key = PinKey(self.alloc_key());
        self.pins.push(Pin::new(key, name, direction, data_type));
        key
    }

    /// Adds a pin, reusing the first bucket pin that is not currently on the node.
    /// A reused pin keeps its key and takes the new type and name.
    pub(crate) fn create_or_add_pin(
        &mut self,
        name: impl Into<String>,
        direction: PinDirection,
        data_type: DataType,
    ) -> PinKey {
        let name = name.into();
        let bucket = match direction {
            PinDirection::Input => &self.input_bucket,
            PinDirection::Output => &self.output_bucket,
        };
        let reusable = bucket.iter().copied().find(|key| self.pin(*key).is_none());

        match reusable {
            Some(key) => {
                let mut pin = self
                    .take_parked(key)
                    .unwrap_or_else(|| Pin::new(key, name.clone(), direction, data_type.clone()));
                if *pin.data_type() != data_type {
                    pin.set_type(data_type);
                }
                pin.name = name;
                pin.invalidate();
                self.pins.push(pin);
                key
            }
            None => {
                let key = self.add_pin(name, direction, data_type);
                match direction {
                    PinDirection::Input => self.input_bucket.push(key),
                    PinDirection::Output => self.output_bucket.push(key),
                }
                key
            }
        }
    }

    pub(crate) fn add_collection(
        &mut self,
        name: impl Into<String>,
        direction: PinDirection,
        data_type: DataType,
        min: usize,
        max: Option<usize>,
    ) -> CollectionKey {
        let key = CollectionKey(self.alloc_key());
        self.collections
            .push(PinCollection::new(key, name, direction, data_type).with_bounds(min, max));
        key
    }

    pub(crate) fn remove_collection(&mut self, key: CollectionKey) -> Option<PinCollection> {
        let index = self.collections.iter().position(|c| c.key() == key)?;
        Some(self.collections.remove(index))
    }

    /// Appends a fresh pin to a collection.
    pub(crate) fn add_collection_pin(&mut self, collection: CollectionKey) -> Option<PinKey> {
        let key = PinKey(self.alloc_key());
        let c = self.collection_mut(collection)?;
        let pin = Pin::new(key, c.next_pin_name(), c.direction(), c.data_type().clone());
        c.push(pin);
        Some(key)
    }

    /// Removes a standalone pin. The caller must have severed its connections.
    pub(crate) fn remove_pin(&mut self, key: PinKey) -> Option<usize> {
        let index = self.pins.iter().position(|p| p.key() == key)?;
        let pin = self.pins.remove(index);
        self.parked.push(pin);
        Some(index)
    }

    pub(crate) fn take_parked(&mut self, key: PinKey) -> Option<Pin> {
        let index = self.parked.iter().position(|p| p.key() == key)?;
        Some(self.parked.remove(index))
    }

    /// Resets every output to its type default and marks it evaluated.
    pub(crate) fn reset_outputs(&mut self) {
        for pin in self.pins_mut().filter(|p| !p.is_input()) {
            pin.set_default();
        }
    }

    /// Returns the node to `Unevaluated` and invalidates every pin. A node on the
    /// evaluation stack stays `Evaluating`.
    pub(crate) fn invalidate(&mut self) {
        if self.state != NodeState::Evaluating {
            self.state = NodeState::Unevaluated;
        }
        for pin in self.pins_mut() {
            pin.invalidate();
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("type_id", &self.type_id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("pins", &self.pins.len())
            .field("collections", &self.collections.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> Node {
        Node::new(Uuid::new_v4(), "test.node", "test", "Test", "")
    }

    #[test]
    fn test_keys_are_never_reused() {
        let mut node = node();
        let a = node.add_pin("A", PinDirection::Input, DataType::Int);
        node.remove_pin(a);
        let b = node.add_pin("B", PinDirection::Input, DataType::Int);
        assert_ne!(a, b);
    }

    #[test]
    fn test_bucket_reuses_removed_pins_in_creation_order() {
        let mut node = node();
        let a = node.create_or_add_pin("A", PinDirection::Output, DataType::Int);
        let b = node.create_or_add_pin("B", PinDirection::Output, DataType::Text);
        node.remove_pin(a);
        node.remove_pin(b);

        let first = node.create_or_add_pin("First", PinDirection::Output, DataType::Boolean);
        assert_eq!(first, a);
        let pin = node.pin(first).unwrap();
        assert_eq!(pin.name, "First");
        assert_eq!(pin.data_type(), &DataType::Boolean);

        let second = node.create_or_add_pin("Second", PinDirection::Output, DataType::Text);
        assert_eq!(second, b);
        let third = node.create_or_add_pin("Third", PinDirection::Output, DataType::Text);
        assert!(third != a && third != b);
    }

    #[test]
    fn test_positions() {
        let mut node = node();
        let out = node.add_pin("Out", PinDirection::Output, DataType::Numeric);
        let values = node.add_collection("Values", PinDirection::Input, DataType::Numeric, 1, None);
        node.add_collection_pin(values).unwrap();
        let second = node.add_collection_pin(values).unwrap();

        let position = node.position_of(second).unwrap();
        assert_eq!(position, PinPosition { collection: Some(0), index: 1 });
        assert_eq!(node.pin_at(position).unwrap().key(), second);
        assert_eq!(node.position_of(out), Some(PinPosition { collection: None, index: 0 }));
        assert_eq!(node.collection_of(second), Some(values));
        assert_eq!(node.all_pins().count(), 3);
    }
}
