pub mod node_types;
pub mod registry;

pub use node_types::{NodeCategory, NodeFactory, NodeTypeRegistration, TypeColorRegistration};
pub use registry::{NodeTypeStore, PluginInfo};

use crate::model::{Color, DataType};

/// A bundle of node types and type colors.
pub trait NodePlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn name(&self) -> String;
    fn version(&self) -> (u32, u32, u32);
    fn register(&self, registrar: &mut PluginRegistrar);
}

/// Collects a plugin's registrations before they are committed to the store.
pub struct PluginRegistrar {
    plugin_id: String,
    node_types: Vec<NodeTypeRegistration>,
    type_colors: Vec<TypeColorRegistration>,
}

impl PluginRegistrar {
    pub(crate) fn new(plugin_id: &str) -> Self {
        Self {
            plugin_id: plugin_id.to_string(),
            node_types: Vec::new(),
            type_colors: Vec::new(),
        }
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn add_node_type(&mut self, mut registration: NodeTypeRegistration) -> &mut Self {
        registration.plugin_id = self.plugin_id.clone();
        self.node_types.push(registration);
        self
    }

    pub fn add_type_color(&mut self, data_type: DataType, color: Color) -> &mut Self {
        self.type_colors.push(TypeColorRegistration {
            data_type,
            color,
            plugin_id: self.plugin_id.clone(),
        });
        self
    }

    pub(crate) fn into_parts(self) -> (Vec<NodeTypeRegistration>, Vec<TypeColorRegistration>) {
        (self.node_types, self.type_colors)
    }
}
