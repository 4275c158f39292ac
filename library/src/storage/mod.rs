//! Saving and loading scripts.

pub mod entities;

pub use entities::{NodeConnectionEntity, NodeEntity, NodePinCollectionEntity, NodeScriptEntity};

use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use uuid::Uuid;

use crate::data_model::DataModel;
use crate::error::{Result, ScriptError};
use crate::model::DataType;
use crate::plugin::NodeTypeStore;
use crate::script::{Connection, Node, NodeScript, PinId};

impl NodeEntity {
    pub fn from_node(node: &Node) -> Self {
        Self {
            id: node.id(),
            type_id: node.type_id().to_string(),
            provider_id: node.provider_id().to_string(),
            name: node.name.clone(),
            description: node.description.clone(),
            x: node.x,
            y: node.y,
            is_exit_node: node.is_exit_node(),
            storage: node.storage(),
            pin_collections: node
                .collections()
                .iter()
                .enumerate()
                .map(|(id, c)| NodePinCollectionEntity {
                    id,
                    direction: c.direction(),
                    amount: c.len(),
                })
                .collect(),
        }
    }
}

impl NodeScript {
    pub fn save(&self) -> NodeScriptEntity {
        NodeScriptEntity {
            name: self.name.clone(),
            description: self.description.clone(),
            result_type: self.result_type().cloned(),
            nodes: self.nodes().iter().map(NodeEntity::from_node).collect(),
            connections: self
                .connections()
                .into_iter()
                .filter_map(|connection| self.connection_entity(connection))
                .collect(),
        }
    }

    fn connection_entity(&self, (output, input): Connection) -> Option<NodeConnectionEntity> {
        let source = self.node(output.node_id).ok()?;
        let target = self.node(input.node_id).ok()?;
        let source_position = source.position_of(output.key)?;
        let target_position = target.position_of(input.key)?;
        Some(NodeConnectionEntity {
            source_type: source.pin(output.key)?.data_type().clone(),
            source_node: output.node_id,
            source_pin_collection_id: entities::collection_id(source_position),
            source_pin_id: source_position.index,
            target_type: target.pin(input.key)?.data_type().clone(),
            target_node: input.node_id,
            target_pin_collection_id: entities::collection_id(target_position),
            target_pin_id: target_position.index,
        })
    }

    pub fn load(entity: &NodeScriptEntity, store: Arc<NodeTypeStore>) -> Result<NodeScript> {
        Self::load_with(entity, store, None)
    }

    /// Rebuilds a script. Nodes of unknown types and connections that no longer
    /// fit are skipped with a warning.
    pub fn load_with(
        entity: &NodeScriptEntity,
        store: Arc<NodeTypeStore>,
        data_model: Option<Arc<dyn DataModel>>,
    ) -> Result<NodeScript> {
        let exit_entity = entity.nodes.iter().find(|n| n.is_exit_node);
        let result_type = entity
            .result_type
            .clone()
            .or_else(|| exit_entity.map(|_| DataType::Any));

        let mut script = match result_type {
            Some(result_type) => NodeScript::with_exit(&entity.name, result_type, store)?,
            None => NodeScript::new(&entity.name, store),
        };
        script.description = entity.description.clone();
        script.set_data_model(data_model)?;

        if let Some(exit) = exit_entity {
            script.set_exit_id(exit.id)?;
            let node = script.node_mut(exit.id)?;
            node.x = exit.x;
            node.y = exit.y;
        }

        for node_entity in entity.nodes.iter().filter(|n| !n.is_exit_node) {
            if let Err(e) = script.load_node(node_entity) {
                warn!("Skipping node '{}' ({}): {}", node_entity.name, node_entity.id, e);
            }
        }

        for connection in &entity.connections {
            if let Err(e) = script.load_connection(connection) {
                warn!(
                    "Skipping connection {} -> {}: {}",
                    connection.source_node, connection.target_node, e
                );
            }
        }

        script.clear_events();
        info!("Loaded script '{}' with {} nodes", script.name, script.nodes().len());
        Ok(script)
    }

    fn load_node(&mut self, entity: &NodeEntity) -> Result<Uuid> {
        let id = self.create_node(entity.id, &entity.type_id, entity.storage.clone())?;
        let node = self.node_mut(id)?;
        node.name = entity.name.clone();
        node.description = entity.description.clone();
        node.x = entity.x;
        node.y = entity.y;

        if let Err(e) = self.resize_collections(id, &entity.pin_collections) {
            warn!("Could not restore pin collections of node {}: {}", id, e);
        }
        Ok(id)
    }

    fn resize_collections(&mut self, id: Uuid, collections: &[NodePinCollectionEntity]) -> Result<()> {
        for collection in collections {
            let Some(key) = self
                .node(id)?
                .collections()
                .get(collection.id)
                .map(|c| c.key())
            else {
                warn!("Node {} has no pin collection #{}", id, collection.id);
                continue;
            };
            loop {
                let len = self
                    .node(id)?
                    .collection(key)
                    .map_or(collection.amount, |c| c.len());
                if len < collection.amount {
                    self.add_collection_pin(id, key)?;
                } else if len > collection.amount {
                    let last = self.node(id)?.collection(key).and_then(|c| c.keys().last().copied());
                    match last {
                        Some(last) => {
                            self.remove_collection_pin(PinId::new(id, last))?;
                        }
                        None => break,
                    }
                } else {
                    break;
                }
            }
        }
        Ok(())
    }

    fn load_connection(&mut self, entity: &NodeConnectionEntity) -> Result<()> {
        let source = self.resolve_pin(
            entity.source_node,
            entity.source_pin_collection_id,
            entity.source_pin_id,
        )?;
        let target = self.resolve_pin(
            entity.target_node,
            entity.target_pin_collection_id,
            entity.target_pin_id,
        )?;
        self.connect(source, target)?;
        Ok(())
    }

    fn resolve_pin(&self, node_id: Uuid, collection_id: i32, index: usize) -> Result<PinId> {
        let node = self.node(node_id)?;
        let pin = node
            .pin_at(entities::position(collection_id, index))
            .ok_or_else(|| {
                ScriptError::invalid_connection(format!(
                    "node {} has no pin at {}/{}",
                    node_id, collection_id, index
                ))
            })?;
        Ok(PinId::new(node_id, pin.key()))
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.save())?)
    }

    pub fn import_json(json: &str, store: Arc<NodeTypeStore>) -> Result<NodeScript> {
        let entity: NodeScriptEntity = serde_json::from_str(json)?;
        NodeScript::load(&entity, store)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        fs::write(path, self.export_json()?)?;
        Ok(())
    }

    pub fn load_from_file(
        path: &Path,
        store: Arc<NodeTypeStore>,
        data_model: Option<Arc<dyn DataModel>>,
    ) -> Result<NodeScript> {
        let json = fs::read_to_string(path)?;
        let entity: NodeScriptEntity = serde_json::from_str(&json)?;
        NodeScript::load_with(&entity, store, data_model)
    }
}
