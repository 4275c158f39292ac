//! Node type and type color registrations.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::{Color, DataType};
use crate::script::NodeLogic;

/// Category of a node type, used to group the node picker.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    /// Exit and other nodes every script has
    Core,
    /// Constant values
    Static,
    /// Arithmetic on numerics
    Math,
    /// Comparisons and boolean operators
    Logic,
    /// Conversions between types
    Conversion,
    Text,
    Color,
    /// Nodes reading the host's data model
    DataModel,
    /// Plugin-defined custom category
    Custom,
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeCategory::Core => "Core",
            NodeCategory::Static => "Static",
            NodeCategory::Math => "Mathematics",
            NodeCategory::Logic => "Logic",
            NodeCategory::Conversion => "Conversion",
            NodeCategory::Text => "Text",
            NodeCategory::Color => "Color",
            NodeCategory::DataModel => "Data Model",
            NodeCategory::Custom => "Custom",
        };
        write!(f, "{}", s)
    }
}

pub type NodeFactory = Arc<dyn Fn() -> Box<dyn NodeLogic> + Send + Sync>;

/// A node type offered by a plugin.
#[derive(Clone)]
pub struct NodeTypeRegistration {
    /// Filled in by the registrar.
    pub plugin_id: String,
    /// Unique type identifier (e.g. "math.sum")
    pub type_id: String,
    pub name: String,
    pub description: String,
    pub category: NodeCategory,
    /// Main input type, lets editors suggest nodes for a dragged connection
    pub input_type: Option<DataType>,
    pub output_type: Option<DataType>,
    /// Hidden from pickers, e.g. the exit node
    pub is_default_node: bool,
    factory: NodeFactory,
}

impl NodeTypeRegistration {
    pub fn new<F>(type_id: &str, name: &str, category: NodeCategory, factory: F) -> Self
    where
        F: Fn() -> Box<dyn NodeLogic> + Send + Sync + 'static,
    {
        Self {
            plugin_id: String::new(),
            type_id: type_id.to_string(),
            name: name.to_string(),
            description: String::new(),
            category,
            input_type: None,
            output_type: None,
            is_default_node: false,
            factory: Arc::new(factory),
        }
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = desc.to_string();
        self
    }

    pub fn with_input_type(mut self, data_type: DataType) -> Self {
        self.input_type = Some(data_type);
        self
    }

    pub fn with_output_type(mut self, data_type: DataType) -> Self {
        self.output_type = Some(data_type);
        self
    }

    pub fn default_node(mut self) -> Self {
        self.is_default_node = true;
        self
    }

    pub fn create(&self) -> Box<dyn NodeLogic> {
        (self.factory)()
    }
}

impl fmt::Debug for NodeTypeRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTypeRegistration")
            .field("plugin_id", &self.plugin_id)
            .field("type_id", &self.type_id)
            .field("name", &self.name)
            .field("category", &self.category)
            .finish()
    }
}

/// The color editors draw pins and connections of a type with.
///
/// Registering a color also makes the type eligible for generated object pins.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TypeColorRegistration {
    pub data_type: DataType,
    pub color: Color,
    pub plugin_id: String,
}
