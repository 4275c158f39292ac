//! The view of the script a node gets while one of its callbacks runs.

use std::sync::Arc;

use log::warn;
use uuid::Uuid;

use super::pin::{PinDirection, PinId, PinKey};
use super::pin_collection::CollectionKey;
use super::script::NodeScript;
use crate::data_model::DataModel;
use crate::error::{Result, ScriptError};
use crate::model::{Color, DataType, Numeric, Value};
use crate::plugin::NodeTypeStore;

pub struct NodeContext<'a> {
    script: &'a mut NodeScript,
    node_id: Uuid,
}

impl<'a> NodeContext<'a> {
    pub(crate) fn new(script: &'a mut NodeScript, node_id: Uuid) -> Self {
        Self { script, node_id }
    }

    pub fn node_id(&self) -> Uuid {
        self.node_id
    }

    fn pin_id(&self, key: PinKey) -> PinId {
        PinId::new(self.node_id, key)
    }

    pub fn store(&self) -> Arc<NodeTypeStore> {
        self.script.store()
    }

    pub fn data_model(&self) -> Option<Arc<dyn DataModel>> {
        self.script.data_model()
    }

    // --- pins ---

    pub fn create_input(&mut self, name: impl Into<String>, data_type: DataType) -> Result<PinKey> {
        let key = self
            .script
            .node_mut(self.node_id)?
            .add_pin(name, PinDirection::Input, data_type);
        self.script.pin_added(self.pin_id(key));
        Ok(key)
    }

    pub fn create_output(&mut self, name: impl Into<String>, data_type: DataType) -> Result<PinKey> {
        let key = self
            .script
            .node_mut(self.node_id)?
            .add_pin(name, PinDirection::Output, data_type);
        self.script.pin_added(self.pin_id(key));
        Ok(key)
    }

    /// Adds an output pin, reusing a previously removed one when possible so that
    /// undoing a pin rebuild finds the same keys again.
    pub fn create_or_add_output(&mut self, name: impl Into<String>, data_type: DataType) -> Result<PinKey> {
        let key = self
            .script
            .node_mut(self.node_id)?
            .create_or_add_pin(name, PinDirection::Output, data_type);
        self.script.pin_added(self.pin_id(key));
        Ok(key)
    }

    pub fn create_or_add_input(&mut self, name: impl Into<String>, data_type: DataType) -> Result<PinKey> {
        let key = self
            .script
            .node_mut(self.node_id)?
            .create_or_add_pin(name, PinDirection::Input, data_type);
        self.script.pin_added(self.pin_id(key));
        Ok(key)
    }

    /// Declares a pin collection holding `initial` pins.
    pub fn create_input_collection(
        &mut self,
        name: impl Into<String>,
        data_type: DataType,
        initial: usize,
        min: usize,
    ) -> Result<CollectionKey> {
        self.create_collection(name, PinDirection::Input, data_type, initial, min)
    }

    pub fn create_output_collection(
        &mut self,
        name: impl Into<String>,
        data_type: DataType,
        initial: usize,
        min: usize,
    ) -> Result<CollectionKey> {
        self.create_collection(name, PinDirection::Output, data_type, initial, min)
    }

    fn create_collection(
        &mut self,
        name: impl Into<String>,
        direction: PinDirection,
        data_type: DataType,
        initial: usize,
        min: usize,
    ) -> Result<CollectionKey> {
        let key = self
            .script
            .node_mut(self.node_id)?
            .add_collection(name, direction, data_type, min, None);
        self.script.collection_added(self.node_id, key);
        for _ in 0..initial.max(min) {
            self.script.add_collection_pin(self.node_id, key)?;
        }
        Ok(key)
    }

    pub fn change_collection_type(&mut self, collection: CollectionKey, data_type: DataType) -> Result<()> {
        self.script.change_collection_type(self.node_id, collection, data_type)?;
        Ok(())
    }

    pub fn remove_collection(&mut self, collection: CollectionKey) -> Result<()> {
        self.script.remove_collection(self.node_id, collection)?;
        Ok(())
    }

    pub fn collection_pins(&self, collection: CollectionKey) -> Vec<PinKey> {
        self.script
            .node(self.node_id)
            .ok()
            .and_then(|n| n.collection(collection))
            .map(|c| c.keys())
            .unwrap_or_default()
    }

    /// Removes a pin after disconnecting it.
    pub fn remove_pin(&mut self, key: PinKey) -> Result<()> {
        self.script.remove_pin(self.pin_id(key))
    }

    pub fn change_pin_type(&mut self, key: PinKey, data_type: DataType) -> Result<()> {
        self.script.change_pin_type(self.pin_id(key), data_type)?;
        Ok(())
    }

    pub fn pin_type(&self, key: PinKey) -> Option<DataType> {
        self.script.pin(self.pin_id(key)).ok().map(|p| p.data_type().clone())
    }

    pub fn is_connected(&self, key: PinKey) -> bool {
        self.script
            .pin(self.pin_id(key))
            .map(|p| p.is_connected())
            .unwrap_or(false)
    }

    // --- evaluation ---

    /// Pulls the value of an input pin, evaluating upstream nodes as needed.
    pub fn input(&mut self, key: PinKey) -> Result<Value> {
        self.script.evaluate_input(self.pin_id(key))
    }

    pub fn input_numeric(&mut self, key: PinKey) -> Result<Numeric> {
        Ok(self.input(key)?.as_numeric().unwrap_or_default())
    }

    pub fn input_bool(&mut self, key: PinKey) -> Result<bool> {
        Ok(self.input(key)?.as_bool().unwrap_or(false))
    }

    pub fn input_text(&mut self, key: PinKey) -> Result<String> {
        Ok(match self.input(key)? {
            Value::Text(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    pub fn input_color(&mut self, key: PinKey) -> Result<Color> {
        Ok(self.input(key)?.as_color().unwrap_or_default())
    }

    /// Values of every pin in an input collection, in order.
    pub fn collection_inputs(&mut self, collection: CollectionKey) -> Result<Vec<Value>> {
        self.collection_pins(collection)
            .into_iter()
            .map(|key| self.input(key))
            .collect()
    }

    /// Sets an output value. A value the pin cannot hold is replaced by the pin's
    /// default and logged.
    pub fn set_output(&mut self, key: PinKey, value: impl Into<Value>) -> Result<()> {
        match self.try_set_output(key, value) {
            Err(e @ ScriptError::InvalidAssignment { .. }) => {
                warn!("Node {}: {}", self.node_id, e);
                self.script.set_pin_default(self.pin_id(key))
            }
            other => other,
        }
    }

    /// Like `set_output` but reports a mismatched value instead of recovering.
    pub fn try_set_output(&mut self, key: PinKey, value: impl Into<Value>) -> Result<()> {
        self.script.set_pin_value(self.pin_id(key), value.into())
    }
}
