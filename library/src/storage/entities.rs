//! Persisted shape of a script.
//!
//! Pins are addressed by position: a pin collection index (`-1` for standalone
//! pins) and the index within it. Positions survive a reload because node types
//! always build their pins in the same order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::DataType;
use crate::script::{PinDirection, PinPosition};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct NodeScriptEntity {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Type of the exit node's input; `None` for scripts without an exit node.
    #[serde(default)]
    pub result_type: Option<DataType>,
    pub nodes: Vec<NodeEntity>,
    #[serde(default)]
    pub connections: Vec<NodeConnectionEntity>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NodeEntity {
    pub id: Uuid,
    pub type_id: String,
    pub provider_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub is_exit_node: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<serde_json::Value>,
    #[serde(default)]
    pub pin_collections: Vec<NodePinCollectionEntity>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NodePinCollectionEntity {
    /// Index of the collection on its node.
    pub id: usize,
    pub direction: PinDirection,
    pub amount: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NodeConnectionEntity {
    pub source_type: DataType,
    pub source_node: Uuid,
    pub source_pin_collection_id: i32,
    pub source_pin_id: usize,
    pub target_type: DataType,
    pub target_node: Uuid,
    pub target_pin_collection_id: i32,
    pub target_pin_id: usize,
}

pub(crate) fn collection_id(position: PinPosition) -> i32 {
    position.collection.map_or(-1, |c| c as i32)
}

pub(crate) fn position(collection_id: i32, index: usize) -> PinPosition {
    PinPosition {
        collection: usize::try_from(collection_id).ok(),
        index,
    }
}
