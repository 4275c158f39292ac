//! The node graph: topology edits and pull-based evaluation.

use std::any::Any;
use std::collections::{HashSet, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, warn};
use uuid::Uuid;

use super::context::NodeContext;
use super::events::ScriptEvent;
use super::node::{Node, NodeFailure, NodeLogic, NodeState};
use super::pin::{types_connectable, Pin, PinId, PinKey};
use super::pin_collection::CollectionKey;
use crate::builtin::{ExitNode, EXIT_NODE_TYPE, PLUGIN_ID};
use crate::config::EngineConfig;
use crate::data_model::DataModel;
use crate::error::{Result, ScriptError};
use crate::model::{DataType, Value};
use crate::plugin::NodeTypeStore;

/// A connection, always oriented `(output, input)`.
pub type Connection = (PinId, PinId);

/// A pin taken out of a collection, with everything needed to put it back.
#[derive(Debug, Clone)]
pub struct RemovedPin {
    pub node_id: Uuid,
    pub collection: CollectionKey,
    pub index: usize,
    pub pin: Pin,
    pub connections: Vec<Connection>,
}

pub struct NodeScript {
    pub name: String,
    pub description: String,
    nodes: Vec<Node>,
    exit_node: Option<Uuid>,
    result_type: Option<DataType>,
    store: Arc<NodeTypeStore>,
    data_model: Option<Arc<dyn DataModel>>,
    config: EngineConfig,
    events: Vec<ScriptEvent>,
    dropped_events: usize,
    // First cycle seen in the current pass, even if a node swallowed the error.
    pass_cycle: Option<(Uuid, String)>,
}

impl NodeScript {
    /// A script without an exit node; `run` evaluates every node.
    pub fn new(name: impl Into<String>, store: Arc<NodeTypeStore>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            nodes: Vec::new(),
            exit_node: None,
            result_type: None,
            store,
            data_model: None,
            config: EngineConfig::default(),
            events: Vec::new(),
            dropped_events: 0,
            pass_cycle: None,
        }
    }

    /// A script whose result is the input of an exit node of type `result_type`.
    pub fn with_exit(name: impl Into<String>, result_type: DataType, store: Arc<NodeTypeStore>) -> Result<Self> {
        let mut script = Self::new(name, store);
        let mut node = Node::new(
            Uuid::new_v4(),
            EXIT_NODE_TYPE,
            PLUGIN_ID,
            "Exit node",
            "Outputs the result of the script",
        )
        .as_exit();
        node.logic = Some(Box::new(ExitNode::new(result_type.clone())));
        let id = script.install(node, None)?;
        script.exit_node = Some(id);
        script.result_type = Some(result_type);
        Ok(script)
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    pub fn store(&self) -> Arc<NodeTypeStore> {
        self.store.clone()
    }

    pub fn data_model(&self) -> Option<Arc<dyn DataModel>> {
        self.data_model.clone()
    }

    /// Replaces the data model and re-initializes every node so pins follow the
    /// new type descriptions.
    pub fn set_data_model(&mut self, data_model: Option<Arc<dyn DataModel>>) -> Result<()> {
        self.data_model = data_model;
        let ids: Vec<Uuid> = self.nodes.iter().map(Node::id).collect();
        for id in ids {
            self.with_logic(id, |logic, ctx| logic.initialize(ctx))?;
            self.invalidate_downstream(id);
        }
        Ok(())
    }

    // --- lookup ---

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: Uuid) -> Result<&Node> {
        self.nodes
            .iter()
            .find(|n| n.id() == id)
            .ok_or(ScriptError::NodeNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: Uuid) -> Result<&mut Node> {
        self.nodes
            .iter_mut()
            .find(|n| n.id() == id)
            .ok_or(ScriptError::NodeNotFound(id))
    }

    pub fn exit_node(&self) -> Option<&Node> {
        self.exit_node.and_then(|id| self.node(id).ok())
    }

    pub fn exit_node_id(&self) -> Option<Uuid> {
        self.exit_node
    }

    pub fn result_type(&self) -> Option<&DataType> {
        self.result_type.as_ref()
    }

    pub fn pin(&self, id: PinId) -> Result<&Pin> {
        self.node(id.node_id)?
            .pin(id.key)
            .ok_or(ScriptError::PinNotFound(id))
    }

    pub(crate) fn pin_mut(&mut self, id: PinId) -> Result<&mut Pin> {
        self.node_mut(id.node_id)?
            .pin_mut(id.key)
            .ok_or(ScriptError::PinNotFound(id))
    }

    /// Finds a pin by node and pin name.
    pub fn pin_named(&self, node_id: Uuid, name: &str) -> Result<PinId> {
        let node = self.node(node_id)?;
        node.pin_by_name(name)
            .map(|p| PinId::new(node_id, p.key()))
            .ok_or_else(|| ScriptError::node(format!("node {} has no pin named '{}'", node_id, name)))
    }

    pub fn failures(&self) -> Vec<(Uuid, NodeFailure)> {
        self.nodes
            .iter()
            .filter_map(|n| n.failure().map(|f| (n.id(), f.clone())))
            .collect()
    }

    fn queue(&mut self, event: ScriptEvent) {
        if self.events.len() >= self.config.max_queued_events {
            let excess = self.events.len() + 1 - self.config.max_queued_events.max(1);
            self.events.drain(..excess);
            self.dropped_events += excess;
            debug!("Event queue full, dropped {} undrained events", excess);
        }
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<ScriptEvent> {
        std::mem::take(&mut self.events)
    }

    // --- nodes ---

    /// Creates a node of a registered type.
    pub fn add_node(&mut self, type_id: &str) -> Result<Uuid> {
        self.create_node(Uuid::new_v4(), type_id, None)
    }

    pub(crate) fn create_node(
        &mut self,
        id: Uuid,
        type_id: &str,
        storage: Option<serde_json::Value>,
    ) -> Result<Uuid> {
        let (registration, logic) = self.store.create_node(type_id)?;
        let mut node = Node::new(
            id,
            &registration.type_id,
            &registration.plugin_id,
            &registration.name,
            &registration.description,
        );
        node.logic = Some(logic);
        self.install(node, storage)
    }

    fn install(&mut self, node: Node, storage: Option<serde_json::Value>) -> Result<Uuid> {
        let id = node.id();
        if self.node(id).is_ok() {
            return Err(ScriptError::node(format!("a node with id {} already exists", id)));
        }
        let mark = self.events.len();
        let dropped = self.dropped_events;
        self.nodes.push(node);
        self.queue(ScriptEvent::NodeAdded(id));

        let result = self.with_logic(id, |logic, ctx| {
            logic.build(ctx)?;
            if let Some(storage) = storage {
                if let Err(e) = logic.load_storage(storage) {
                    warn!("Ignoring unreadable storage of node {}: {}", id, e);
                }
            }
            logic.initialize(ctx)
        });

        if let Err(e) = result {
            self.nodes.retain(|n| n.id() != id);
            // Events queued by the failed build, shifted by whatever overflowed meanwhile.
            self.events
                .truncate(mark.saturating_sub(self.dropped_events - dropped));
            return Err(e);
        }
        Ok(id)
    }

    /// Puts back a node previously returned by `take_node`, keys and all.
    pub fn insert_node(&mut self, mut node: Node) -> Result<()> {
        let id = node.id();
        if self.node(id).is_ok() {
            return Err(ScriptError::node(format!("a node with id {} already exists", id)));
        }
        node.invalidate();
        if node.is_exit_node() && self.exit_node.is_none() {
            self.exit_node = Some(id);
        }
        self.nodes.push(node);
        self.queue(ScriptEvent::NodeAdded(id));
        Ok(())
    }

    /// Removes a node, returning it together with the connections it had.
    pub fn take_node(&mut self, id: Uuid) -> Result<(Node, Vec<Connection>)> {
        let node = self.node(id)?;
        if node.is_exit_node() {
            return Err(ScriptError::node("the exit node cannot be removed"));
        }
        let keys: Vec<PinKey> = node.all_pins().map(Pin::key).collect();
        let mut severed = Vec::new();
        for key in keys {
            severed.extend(self.disconnect_all(PinId::new(id, key))?);
        }

        let index = self
            .nodes
            .iter()
            .position(|n| n.id() == id)
            .ok_or(ScriptError::NodeNotFound(id))?;
        let node = self.nodes.remove(index);
        self.queue(ScriptEvent::NodeRemoved(id));
        Ok((node, severed))
    }

    pub fn remove_node(&mut self, id: Uuid) -> Result<()> {
        self.take_node(id).map(|_| ())
    }

    /// Moves a node in the editor, returning the previous position.
    pub fn set_node_position(&mut self, id: Uuid, x: f64, y: f64) -> Result<(f64, f64)> {
        let node = self.node_mut(id)?;
        let old = (node.x, node.y);
        node.x = x;
        node.y = y;
        Ok(old)
    }

    pub fn node_storage(&self, id: Uuid) -> Result<Option<serde_json::Value>> {
        Ok(self.node(id)?.storage())
    }

    /// Replaces a node's storage and lets it rebuild whatever depends on it.
    pub fn set_node_storage(&mut self, id: Uuid, storage: serde_json::Value) -> Result<()> {
        self.with_logic(id, |logic, ctx| {
            logic.load_storage(storage)?;
            logic.storage_changed(ctx)
        })?;
        self.invalidate_downstream(id);
        self.queue(ScriptEvent::StorageChanged(id));
        Ok(())
    }

    // --- pins ---

    pub(crate) fn pin_added(&mut self, pin: PinId) {
        self.queue(ScriptEvent::PinAdded(pin));
    }

    pub(crate) fn collection_added(&mut self, node_id: Uuid, collection: CollectionKey) {
        self.queue(ScriptEvent::PinCollectionAdded { node_id, collection });
    }

    /// Removes a standalone pin after severing its connections.
    pub fn remove_pin(&mut self, pin: PinId) -> Result<()> {
        self.pin(pin)?;
        self.disconnect_all(pin)?;
        self.node_mut(pin.node_id)?
            .remove_pin(pin.key)
            .ok_or_else(|| ScriptError::node(format!("pin {} belongs to a collection", pin)))?;
        self.queue(ScriptEvent::PinRemoved(pin));
        Ok(())
    }

    pub fn add_collection_pin(&mut self, node_id: Uuid, collection: CollectionKey) -> Result<PinKey> {
        let node = self.node_mut(node_id)?;
        let c = node
            .collection(collection)
            .ok_or_else(|| ScriptError::node(format!("node {} has no pin collection {:?}", node_id, collection)))?;
        if !c.can_add() {
            return Err(ScriptError::node(format!("pin collection '{}' is full", c.name)));
        }
        let key = node
            .add_collection_pin(collection)
            .ok_or_else(|| ScriptError::node("pin collection vanished"))?;
        self.invalidate_downstream(node_id);
        self.pin_added(PinId::new(node_id, key));
        Ok(key)
    }

    /// Removes a pin from its collection. The collection never shrinks below its minimum.
    pub fn remove_collection_pin(&mut self, pin: PinId) -> Result<RemovedPin> {
        let node = self.node(pin.node_id)?;
        let collection = node.collection_of(pin.key).ok_or(ScriptError::PinNotFound(pin))?;
        if let Some(c) = node.collection(collection) {
            if !c.can_remove() {
                return Err(ScriptError::node(format!(
                    "pin collection '{}' needs at least {} pins",
                    c.name,
                    c.min()
                )));
            }
        }

        let connections = self.disconnect_all(pin)?;
        let (index, removed) = self
            .node_mut(pin.node_id)?
            .collection_mut(collection)
            .and_then(|c| c.remove(pin.key))
            .ok_or(ScriptError::PinNotFound(pin))?;
        self.invalidate_downstream(pin.node_id);
        self.queue(ScriptEvent::PinRemoved(pin));
        Ok(RemovedPin {
            node_id: pin.node_id,
            collection,
            index,
            pin: removed,
            connections,
        })
    }

    /// Reverses `remove_collection_pin`. Connections whose partner is gone are skipped.
    pub fn restore_collection_pin(&mut self, removed: RemovedPin) -> Result<PinId> {
        let RemovedPin {
            node_id,
            collection,
            index,
            pin,
            connections,
        } = removed;
        let id = PinId::new(node_id, pin.key());
        self.node_mut(node_id)?
            .collection_mut(collection)
            .ok_or_else(|| ScriptError::node(format!("node {} has no pin collection {:?}", node_id, collection)))?
            .insert(index, pin);
        self.pin_added(id);
        self.reconnect(&connections);
        Ok(id)
    }

    /// Retypes a pin in place, disconnecting partners that are no longer compatible.
    pub fn change_pin_type(&mut self, pin: PinId, data_type: DataType) -> Result<Vec<Connection>> {
        if *self.pin(pin)?.data_type() == data_type {
            return Ok(Vec::new());
        }
        let partners = self.pin(pin)?.connected_to().to_vec();
        self.pin_mut(pin)?.set_type(data_type.clone());

        let mut severed = Vec::new();
        for partner in partners {
            let partner_type = self.pin(partner)?.data_type().clone();
            if !self.pin(pin)?.is_type_compatible(&partner_type) {
                let (output, input) = self.orient(pin, partner)?;
                if self.disconnect(output, input)? {
                    severed.push((output, input));
                }
            }
        }
        self.invalidate_downstream(pin.node_id);
        self.queue(ScriptEvent::PinTypeChanged { pin, data_type });
        Ok(severed)
    }

    /// Retypes a collection and every pin in it, severing what no longer fits.
    pub fn change_collection_type(
        &mut self,
        node_id: Uuid,
        collection: CollectionKey,
        data_type: DataType,
    ) -> Result<Vec<Connection>> {
        let keys = {
            let c = self
                .node_mut(node_id)?
                .collection_mut(collection)
                .ok_or_else(|| ScriptError::node(format!("node {} has no pin collection {:?}", node_id, collection)))?;
            c.set_type(data_type.clone());
            c.keys()
        };
        let mut severed = Vec::new();
        for key in keys {
            severed.extend(self.change_pin_type(PinId::new(node_id, key), data_type.clone())?);
        }
        Ok(severed)
    }

    /// Drops a whole pin collection after severing the connections of its pins.
    pub fn remove_collection(&mut self, node_id: Uuid, collection: CollectionKey) -> Result<Vec<Connection>> {
        let keys = self
            .node(node_id)?
            .collection(collection)
            .map(|c| c.keys())
            .ok_or_else(|| ScriptError::node(format!("node {} has no pin collection {:?}", node_id, collection)))?;
        let mut severed = Vec::new();
        for key in keys {
            severed.extend(self.disconnect_all(PinId::new(node_id, key))?);
        }
        self.node_mut(node_id)?.remove_collection(collection);
        self.invalidate_downstream(node_id);
        self.queue(ScriptEvent::PinCollectionRemoved { node_id, collection });
        Ok(severed)
    }

    // --- connections ---

    fn orient(&self, a: PinId, b: PinId) -> Result<Connection> {
        let a_input = self.pin(a)?.is_input();
        let b_input = self.pin(b)?.is_input();
        match (a_input, b_input) {
            (false, true) => Ok((a, b)),
            (true, false) => Ok((b, a)),
            (true, true) => Err(ScriptError::invalid_connection("cannot connect two inputs")),
            (false, false) => Err(ScriptError::invalid_connection("cannot connect two outputs")),
        }
    }

    /// Connects an output and an input, in either order.
    ///
    /// An input has at most one upstream; the connection it replaces is returned.
    pub fn connect(&mut self, a: PinId, b: PinId) -> Result<Option<PinId>> {
        let (output, input) = self.orient(a, b)?;
        let output_type = self.pin(output)?.data_type().clone();
        let input_type = self.pin(input)?.data_type().clone();

        if !types_connectable(&output_type, &input_type) {
            return Err(ScriptError::TypeMismatch {
                expected: input_type,
                actual: output_type,
            });
        }
        for data_type in [&output_type, &input_type] {
            if !self.store.is_known_type(data_type) {
                return Err(ScriptError::invalid_connection(format!(
                    "type {} is not registered",
                    data_type
                )));
            }
        }

        let current = self.pin(input)?.connected_to().first().copied();
        if current == Some(output) {
            return Ok(None);
        }
        if let Some(previous) = current {
            self.disconnect(previous, input)?;
        }
        if self.would_create_cycle(output.node_id, input.node_id) {
            warn!("Connecting {} to {} closes a cycle", output, input);
        }

        self.pin_mut(output)?.add_connection(input);
        self.pin_mut(input)?.add_connection(output);
        self.invalidate_downstream(input.node_id);
        self.queue(ScriptEvent::PinConnected { output, input });
        debug!("Connected {} -> {}", output, input);
        Ok(current)
    }

    pub fn disconnect(&mut self, a: PinId, b: PinId) -> Result<bool> {
        let (output, input) = self.orient(a, b)?;
        let removed = self.pin_mut(output)?.remove_connection(input);
        self.pin_mut(input)?.remove_connection(output);
        if removed {
            self.invalidate_downstream(input.node_id);
            self.queue(ScriptEvent::PinDisconnected { output, input });
        }
        Ok(removed)
    }

    pub fn disconnect_all(&mut self, pin: PinId) -> Result<Vec<Connection>> {
        let is_input = self.pin(pin)?.is_input();
        let partners = self.pin_mut(pin)?.take_connections();
        let mut severed = Vec::with_capacity(partners.len());
        for partner in partners {
            if let Ok(p) = self.pin_mut(partner) {
                p.remove_connection(pin);
            }
            let (output, input) = if is_input { (partner, pin) } else { (pin, partner) };
            self.invalidate_downstream(input.node_id);
            self.queue(ScriptEvent::PinDisconnected { output, input });
            severed.push((output, input));
        }
        Ok(severed)
    }

    /// Re-establishes connections, skipping the ones that no longer apply.
    pub fn reconnect(&mut self, connections: &[Connection]) {
        for (output, input) in connections {
            if let Err(e) = self.connect(*output, *input) {
                warn!("Could not restore connection {} -> {}: {}", output, input, e);
            }
        }
    }

    /// Every connection of the script.
    pub fn connections(&self) -> Vec<Connection> {
        self.nodes
            .iter()
            .flat_map(|node| {
                node.output_pins().flat_map(move |pin| {
                    let output = PinId::new(node.id(), pin.key());
                    pin.connected_to().iter().map(move |input| (output, *input))
                })
            })
            .collect()
    }

    /// Connections touching the given node.
    pub fn node_connections(&self, node_id: Uuid) -> Vec<Connection> {
        self.connections()
            .into_iter()
            .filter(|(o, i)| o.node_id == node_id || i.node_id == node_id)
            .collect()
    }

    /// Nodes directly fed by outputs of `node_id`.
    fn downstream_of(&self, node_id: Uuid) -> Vec<Uuid> {
        self.node(node_id)
            .map(|node| {
                node.output_pins()
                    .flat_map(|p| p.connected_to().iter().map(|i| i.node_id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Would connecting an output of `from` to an input of `to` close a cycle.
    pub fn would_create_cycle(&self, from: Uuid, to: Uuid) -> bool {
        if from == to {
            return true;
        }
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([to]);
        while let Some(current) = queue.pop_front() {
            if current == from {
                return true;
            }
            if visited.insert(current) {
                queue.extend(self.downstream_of(current));
            }
        }
        false
    }

    /// Marks a node and everything downstream of it for re-evaluation.
    fn invalidate_downstream(&mut self, node_id: Uuid) {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([node_id]);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            let downstream = self.downstream_of(current);
            if let Ok(node) = self.node_mut(current) {
                node.invalidate();
            }
            queue.extend(downstream);
        }
    }

    // --- evaluation ---

    /// Lends a node's logic to `f` together with a context on this script.
    fn with_logic<R>(
        &mut self,
        node_id: Uuid,
        f: impl FnOnce(&mut dyn NodeLogic, &mut NodeContext<'_>) -> Result<R>,
    ) -> Result<R> {
        let mut logic = self
            .node_mut(node_id)?
            .logic
            .take()
            .ok_or_else(|| ScriptError::node(format!("node {} is busy", node_id)))?;
        let result = {
            let mut ctx = NodeContext::new(self, node_id);
            f(logic.as_mut(), &mut ctx)
        };
        if let Ok(node) = self.node_mut(node_id) {
            node.logic = Some(logic);
        }
        result
    }

    /// Starts a new evaluation pass: every node becomes unevaluated and every
    /// pin cache is dropped.
    pub fn begin_pass(&mut self) {
        self.pass_cycle = None;
        for node in &mut self.nodes {
            node.invalidate();
            node.state = NodeState::Unevaluated;
            if let Some(logic) = node.logic.as_mut() {
                logic.reset();
            }
        }
    }

    /// Runs one evaluation pass: the exit node, or every node if there is none.
    ///
    /// A cycle aborts the evaluation that ran into it; other targets still
    /// evaluate and the first cycle is returned.
    pub fn run(&mut self) -> Result<()> {
        self.begin_pass();
        let targets: Vec<Uuid> = match self.exit_node {
            Some(id) => vec![id],
            None => self.nodes.iter().map(Node::id).collect(),
        };

        let mut first_error = None;
        for id in targets {
            if let Err(e) = self.evaluate_node(id) {
                warn!("Evaluation of node {} aborted: {}", id, e);
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }
        match self.pass_cycle.take() {
            Some((node_id, type_id)) => Err(ScriptError::CyclicGraph { node_id, type_id }),
            None => Ok(()),
        }
    }

    /// Evaluates a node once per pass. Non-cycle failures are recorded on the node,
    /// its outputs fall back to defaults and `Ok` is returned.
    ///
    /// Everything upstream is evaluated first, inputs before consumers, so the
    /// depth of the graph never turns into depth of the call stack.
    pub fn evaluate_node(&mut self, node_id: Uuid) -> Result<()> {
        match self.node(node_id)?.state() {
            NodeState::Evaluated => return Ok(()),
            NodeState::Evaluating => return Err(self.cycle_error(node_id)),
            NodeState::Unevaluated => {}
        }
        let order = match self.evaluation_order(node_id)? {
            Ok(order) => order,
            Err(closing) => {
                let err = self.cycle_error(closing);
                if self.node(closing)?.state() == NodeState::Unevaluated {
                    self.fail_node(closing, &err)?;
                }
                return Err(err);
            }
        };
        for id in order {
            self.evaluate_single(id)?;
        }
        Ok(())
    }

    /// Unevaluated nodes feeding `target`, `target` last, each after its inputs.
    /// `Err` carries the node that closes a cycle.
    fn evaluation_order(&self, target: Uuid) -> Result<std::result::Result<Vec<Uuid>, Uuid>> {
        let mut order = Vec::new();
        let mut open = HashSet::new();
        let mut done = HashSet::new();
        let mut stack = vec![(target, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                open.remove(&id);
                done.insert(id);
                order.push(id);
                continue;
            }
            if done.contains(&id) {
                continue;
            }
            // Entries popped while their node is open were pushed by a descendant.
            if open.contains(&id) {
                return Ok(Err(id));
            }
            let node = self.node(id)?;
            match node.state() {
                NodeState::Evaluated => {
                    done.insert(id);
                    continue;
                }
                NodeState::Evaluating => return Ok(Err(id)),
                NodeState::Unevaluated => {}
            }
            open.insert(id);
            stack.push((id, true));
            let upstream = node
                .input_pins()
                .filter_map(|p| p.connected_to().first().map(|o| o.node_id))
                .collect::<Vec<_>>();
            stack.extend(upstream.into_iter().rev().map(|u| (u, false)));
        }
        Ok(Ok(order))
    }

    fn evaluate_single(&mut self, node_id: Uuid) -> Result<()> {
        if self.node(node_id)?.state() != NodeState::Unevaluated {
            return Ok(());
        }
        self.node_mut(node_id)?.state = NodeState::Evaluating;
        let result = self.with_logic(node_id, |logic, ctx| {
            panic::catch_unwind(AssertUnwindSafe(|| logic.evaluate(ctx)))
                .unwrap_or_else(|payload| Err(ScriptError::node(panic_message(payload.as_ref()))))
        });
        self.node_mut(node_id)?.state = NodeState::Evaluated;
        match result {
            Ok(()) => {
                self.node_mut(node_id)?.failure = None;
                Ok(())
            }
            Err(err) => {
                self.fail_node(node_id, &err)?;
                if err.is_cycle() { Err(err) } else { Ok(()) }
            }
        }
    }

    /// Resets a node's outputs and records the failure. A failure that repeats
    /// the previous one is neither logged nor queued again.
    fn fail_node(&mut self, node_id: Uuid, err: &ScriptError) -> Result<()> {
        let message = err.to_string();
        let log_failures = self.config.log_node_failures;
        let node = self.node_mut(node_id)?;
        node.state = NodeState::Evaluated;
        node.reset_outputs();
        if node.failure.as_ref().is_some_and(|f| f.message == message) {
            return Ok(());
        }
        node.failure = Some(NodeFailure::new(message.clone()));
        if log_failures {
            warn!("Node '{}' ({}) failed: {}", node.name, node_id, message);
        }
        self.queue(ScriptEvent::NodeFailed { node_id, message });
        Ok(())
    }

    fn cycle_error(&mut self, node_id: Uuid) -> ScriptError {
        let type_id = self
            .node(node_id)
            .map(|n| n.type_id().to_string())
            .unwrap_or_default();
        self.pass_cycle.get_or_insert((node_id, type_id.clone()));
        ScriptError::CyclicGraph { node_id, type_id }
    }

    /// Reads a pin, evaluating whatever it depends on at most once per pass.
    pub fn pin_value(&mut self, pin: PinId) -> Result<Value> {
        if self.pin(pin)?.is_input() {
            self.evaluate_input(pin)
        } else {
            self.evaluate_output(pin)
        }
    }

    /// The value reaching the exit node, `Null` for scripts without one.
    pub fn result(&mut self) -> Result<Value> {
        let Some(exit) = self.exit_node else {
            return Ok(Value::Null);
        };
        let key = self
            .node(exit)?
            .input_pins()
            .next()
            .map(Pin::key)
            .ok_or_else(|| ScriptError::not_configured("exit node has no input"))?;
        self.pin_value(PinId::new(exit, key))
    }

    pub(crate) fn evaluate_input(&mut self, id: PinId) -> Result<Value> {
        let pin = self.pin(id)?;
        if pin.is_evaluated() {
            return Ok(pin.value().clone());
        }
        let data_type = pin.data_type().clone();
        let upstream = pin.connected_to().first().copied();
        let value = match upstream {
            None => Value::default_for(&data_type),
            Some(source) => self.evaluate_output(source)?.coerce_to(&data_type),
        };

        if let Err(e) = self.set_pin_value(id, value) {
            warn!("Input {}: {}", id, e);
            self.set_pin_default(id)?;
        }
        Ok(self.pin(id)?.value().clone())
    }

    fn evaluate_output(&mut self, id: PinId) -> Result<Value> {
        if !self.pin(id)?.is_evaluated() {
            self.evaluate_node(id.node_id)?;
        }
        Ok(self.pin(id)?.value().clone())
    }

    pub(crate) fn set_pin_value(&mut self, id: PinId, value: Value) -> Result<()> {
        let emit = self.config.emit_value_events;
        let pin = self.pin_mut(id)?;
        if pin.set_value(value)? && emit {
            let value = pin.value().clone();
            self.queue(ScriptEvent::ValueChanged { pin: id, value });
        }
        Ok(())
    }

    pub(crate) fn set_pin_default(&mut self, id: PinId) -> Result<()> {
        self.pin_mut(id)?.set_default();
        Ok(())
    }

    /// Re-keys the exit node; only valid before any connection exists.
    pub(crate) fn set_exit_id(&mut self, id: Uuid) -> Result<()> {
        let current = self.exit_node.ok_or_else(|| ScriptError::not_configured("script has no exit node"))?;
        if current == id {
            return Ok(());
        }
        if self.node(id).is_ok() {
            return Err(ScriptError::node(format!("a node with id {} already exists", id)));
        }
        self.node_mut(current)?.set_id(id);
        self.exit_node = Some(id);
        Ok(())
    }

    pub(crate) fn clear_events(&mut self) {
        self.events.clear();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("node panicked: {}", detail)
}

impl std::fmt::Debug for NodeScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeScript")
            .field("name", &self.name)
            .field("nodes", &self.nodes)
            .field("exit_node", &self.exit_node)
            .finish()
    }
}
