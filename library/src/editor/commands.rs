//! Undoable script edits.
//!
//! Removed nodes and pins are kept inside the command, so undo puts back the very
//! same objects with their keys and later commands in the history stay valid.

use uuid::Uuid;

use super::command::ScriptCommand;
use crate::error::Result;
use crate::model::DataType;
use crate::script::{CollectionKey, Connection, Node, NodeScript, PinId, PinKey, RemovedPin};

#[derive(Debug)]
pub struct AddNodeCommand {
    type_id: String,
    x: f64,
    y: f64,
    node_id: Option<Uuid>,
    removed: Option<Node>,
}

impl AddNodeCommand {
    pub fn new(type_id: &str, x: f64, y: f64) -> Self {
        Self {
            type_id: type_id.to_string(),
            x,
            y,
            node_id: None,
            removed: None,
        }
    }

    /// Id of the created node, once executed.
    pub fn node_id(&self) -> Option<Uuid> {
        self.node_id
    }
}

impl ScriptCommand for AddNodeCommand {
    fn execute(&mut self, script: &mut NodeScript) -> Result<()> {
        if let Some(node) = self.removed.take() {
            return script.insert_node(node);
        }
        let id = script.add_node(&self.type_id)?;
        script.set_node_position(id, self.x, self.y)?;
        self.node_id = Some(id);
        Ok(())
    }

    fn undo(&mut self, script: &mut NodeScript) -> Result<()> {
        if let Some(id) = self.node_id {
            let (node, _) = script.take_node(id)?;
            self.removed = Some(node);
        }
        Ok(())
    }

    fn name(&self) -> String {
        format!("Add node '{}'", self.type_id)
    }
}

#[derive(Debug)]
pub struct RemoveNodeCommand {
    node_id: Uuid,
    removed: Option<Node>,
    connections: Vec<Connection>,
}

impl RemoveNodeCommand {
    pub fn new(node_id: Uuid) -> Self {
        Self {
            node_id,
            removed: None,
            connections: Vec::new(),
        }
    }
}

impl ScriptCommand for RemoveNodeCommand {
    fn execute(&mut self, script: &mut NodeScript) -> Result<()> {
        let (node, connections) = script.take_node(self.node_id)?;
        self.removed = Some(node);
        self.connections = connections;
        Ok(())
    }

    fn undo(&mut self, script: &mut NodeScript) -> Result<()> {
        if let Some(node) = self.removed.take() {
            script.insert_node(node)?;
            script.reconnect(&self.connections);
        }
        Ok(())
    }

    fn name(&self) -> String {
        format!("Remove node {}", self.node_id)
    }
}

#[derive(Debug)]
pub struct ConnectPinsCommand {
    a: PinId,
    b: PinId,
    replaced: Option<PinId>,
    // The pins were connected before the command ran; undo leaves them be.
    already_connected: bool,
}

impl ConnectPinsCommand {
    pub fn new(a: PinId, b: PinId) -> Self {
        Self {
            a,
            b,
            replaced: None,
            already_connected: false,
        }
    }
}

impl ScriptCommand for ConnectPinsCommand {
    fn execute(&mut self, script: &mut NodeScript) -> Result<()> {
        self.already_connected = script.pin(self.a)?.connected_to().contains(&self.b);
        self.replaced = script.connect(self.a, self.b)?;
        Ok(())
    }

    fn undo(&mut self, script: &mut NodeScript) -> Result<()> {
        if self.already_connected {
            return Ok(());
        }
        script.disconnect(self.a, self.b)?;
        if let Some(previous) = self.replaced {
            let input = if script.pin(self.a)?.is_input() { self.a } else { self.b };
            script.connect(previous, input)?;
        }
        Ok(())
    }

    fn name(&self) -> String {
        format!("Connect {} and {}", self.a, self.b)
    }
}

#[derive(Debug)]
pub struct DisconnectPinsCommand {
    a: PinId,
    b: PinId,
    was_connected: bool,
}

impl DisconnectPinsCommand {
    pub fn new(a: PinId, b: PinId) -> Self {
        Self {
            a,
            b,
            was_connected: false,
        }
    }
}

impl ScriptCommand for DisconnectPinsCommand {
    fn execute(&mut self, script: &mut NodeScript) -> Result<()> {
        self.was_connected = script.disconnect(self.a, self.b)?;
        Ok(())
    }

    fn undo(&mut self, script: &mut NodeScript) -> Result<()> {
        if self.was_connected {
            script.connect(self.a, self.b)?;
        }
        Ok(())
    }

    fn name(&self) -> String {
        format!("Disconnect {} and {}", self.a, self.b)
    }
}

#[derive(Debug)]
pub struct AddCollectionPinCommand {
    node_id: Uuid,
    collection: CollectionKey,
    added: Option<PinKey>,
    removed: Option<RemovedPin>,
}

impl AddCollectionPinCommand {
    pub fn new(node_id: Uuid, collection: CollectionKey) -> Self {
        Self {
            node_id,
            collection,
            added: None,
            removed: None,
        }
    }

    pub fn added(&self) -> Option<PinId> {
        self.added.map(|key| PinId::new(self.node_id, key))
    }
}

impl ScriptCommand for AddCollectionPinCommand {
    fn execute(&mut self, script: &mut NodeScript) -> Result<()> {
        match self.removed.take() {
            Some(removed) => {
                script.restore_collection_pin(removed)?;
            }
            None => {
                self.added = Some(script.add_collection_pin(self.node_id, self.collection)?);
            }
        }
        Ok(())
    }

    fn undo(&mut self, script: &mut NodeScript) -> Result<()> {
        if let Some(key) = self.added {
            self.removed = Some(script.remove_collection_pin(PinId::new(self.node_id, key))?);
        }
        Ok(())
    }

    fn name(&self) -> String {
        "Add collection pin".to_string()
    }
}

#[derive(Debug)]
pub struct RemoveCollectionPinCommand {
    pin: PinId,
    removed: Option<RemovedPin>,
}

impl RemoveCollectionPinCommand {
    pub fn new(pin: PinId) -> Self {
        Self { pin, removed: None }
    }
}

impl ScriptCommand for RemoveCollectionPinCommand {
    fn execute(&mut self, script: &mut NodeScript) -> Result<()> {
        self.removed = Some(script.remove_collection_pin(self.pin)?);
        Ok(())
    }

    fn undo(&mut self, script: &mut NodeScript) -> Result<()> {
        if let Some(removed) = self.removed.take() {
            script.restore_collection_pin(removed)?;
        }
        Ok(())
    }

    fn name(&self) -> String {
        format!("Remove collection pin {}", self.pin)
    }
}

#[derive(Debug)]
pub struct ChangePinTypeCommand {
    pin: PinId,
    data_type: DataType,
    previous: Option<DataType>,
    severed: Vec<Connection>,
}

impl ChangePinTypeCommand {
    pub fn new(pin: PinId, data_type: DataType) -> Self {
        Self {
            pin,
            data_type,
            previous: None,
            severed: Vec::new(),
        }
    }
}

impl ScriptCommand for ChangePinTypeCommand {
    fn execute(&mut self, script: &mut NodeScript) -> Result<()> {
        self.previous = Some(script.pin(self.pin)?.data_type().clone());
        self.severed = script.change_pin_type(self.pin, self.data_type.clone())?;
        Ok(())
    }

    fn undo(&mut self, script: &mut NodeScript) -> Result<()> {
        if let Some(previous) = self.previous.clone() {
            script.change_pin_type(self.pin, previous)?;
            script.reconnect(&self.severed);
        }
        Ok(())
    }

    fn name(&self) -> String {
        format!("Change type of {} to {}", self.pin, self.data_type)
    }
}

/// Replaces a node's storage. Connections lost because the node rebuilt its pins
/// come back on undo.
#[derive(Debug)]
pub struct UpdateNodeStorageCommand {
    node_id: Uuid,
    storage: serde_json::Value,
    previous: Option<serde_json::Value>,
    lost: Vec<Connection>,
}

impl UpdateNodeStorageCommand {
    pub fn new(node_id: Uuid, storage: serde_json::Value) -> Self {
        Self {
            node_id,
            storage,
            previous: None,
            lost: Vec::new(),
        }
    }
}

impl ScriptCommand for UpdateNodeStorageCommand {
    fn execute(&mut self, script: &mut NodeScript) -> Result<()> {
        self.previous = script.node_storage(self.node_id)?;
        let before = script.node_connections(self.node_id);
        script.set_node_storage(self.node_id, self.storage.clone())?;
        let after = script.node_connections(self.node_id);
        self.lost = before.into_iter().filter(|c| !after.contains(c)).collect();
        Ok(())
    }

    fn undo(&mut self, script: &mut NodeScript) -> Result<()> {
        if let Some(previous) = self.previous.clone() {
            script.set_node_storage(self.node_id, previous)?;
            script.reconnect(&self.lost);
        }
        Ok(())
    }

    fn name(&self) -> String {
        format!("Update storage of node {}", self.node_id)
    }
}

#[derive(Debug)]
pub struct MoveNodeCommand {
    node_id: Uuid,
    x: f64,
    y: f64,
    previous: Option<(f64, f64)>,
}

impl MoveNodeCommand {
    pub fn new(node_id: Uuid, x: f64, y: f64) -> Self {
        Self {
            node_id,
            x,
            y,
            previous: None,
        }
    }
}

impl ScriptCommand for MoveNodeCommand {
    fn execute(&mut self, script: &mut NodeScript) -> Result<()> {
        self.previous = Some(script.set_node_position(self.node_id, self.x, self.y)?);
        Ok(())
    }

    fn undo(&mut self, script: &mut NodeScript) -> Result<()> {
        if let Some((x, y)) = self.previous {
            script.set_node_position(self.node_id, x, y)?;
        }
        Ok(())
    }

    fn name(&self) -> String {
        format!("Move node {}", self.node_id)
    }
}
