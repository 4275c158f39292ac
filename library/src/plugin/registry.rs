//! The node type store shared by every script.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::RwLock;

use crate::error::{Result, ScriptError};
use crate::model::{Color, DataType};
use crate::plugin::node_types::{NodeTypeRegistration, TypeColorRegistration};
use crate::plugin::{NodePlugin, PluginRegistrar};
use crate::script::NodeLogic;

/// Metadata of a registered plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    pub id: String,
    pub name: String,
    pub version: (u32, u32, u32),
}

#[derive(Default)]
struct NodeTypeRegistry {
    plugins: Vec<PluginInfo>,
    node_types: HashMap<String, NodeTypeRegistration>,
    type_colors: Vec<TypeColorRegistration>,
}

/// Process-wide registry of node types and type colors.
///
/// Populated when plugins load, read during evaluation. A plugin's registrations
/// become visible together under one write lock.
#[derive(Default)]
pub struct NodeTypeStore {
    inner: RwLock<NodeTypeRegistry>,
}

impl NodeTypeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the built-in node types.
    pub fn with_builtin() -> Arc<Self> {
        let store = Self::new();
        store.register_plugin(&crate::builtin::BuiltinPlugin);
        Arc::new(store)
    }

    pub fn register_plugin(&self, plugin: &dyn NodePlugin) {
        let mut registrar = PluginRegistrar::new(plugin.id());
        plugin.register(&mut registrar);
        let (node_types, type_colors) = registrar.into_parts();

        let mut inner = self.inner.write();
        inner.plugins.retain(|p| p.id != plugin.id());
        inner.plugins.push(PluginInfo {
            id: plugin.id().to_string(),
            name: plugin.name(),
            version: plugin.version(),
        });
        let count = node_types.len();
        for registration in node_types {
            if let Some(previous) = inner.node_types.get(&registration.type_id) {
                warn!(
                    "Node type '{}' of plugin '{}' replaces the one from '{}'",
                    registration.type_id, registration.plugin_id, previous.plugin_id
                );
            }
            inner
                .node_types
                .insert(registration.type_id.clone(), registration);
        }
        for color in type_colors {
            inner.type_colors.retain(|c| c.data_type != color.data_type);
            inner.type_colors.push(color);
        }
        info!("Registered plugin '{}' with {} node types", plugin.id(), count);
    }

    pub fn plugins(&self) -> Vec<PluginInfo> {
        self.inner.read().plugins.clone()
    }

    pub fn find(&self, type_id: &str) -> Option<NodeTypeRegistration> {
        self.inner.read().node_types.get(type_id).cloned()
    }

    /// Every registered node type, sorted by category and name.
    pub fn node_types(&self) -> Vec<NodeTypeRegistration> {
        let mut types: Vec<NodeTypeRegistration> = self.inner.read().node_types.values().cloned().collect();
        types.sort_by(|a, b| {
            a.category
                .to_string()
                .cmp(&b.category.to_string())
                .then_with(|| a.name.cmp(&b.name))
        });
        types
    }

    /// Instantiates the logic of a node type.
    pub fn create_node(&self, type_id: &str) -> Result<(NodeTypeRegistration, Box<dyn NodeLogic>)> {
        let registration = self
            .find(type_id)
            .ok_or_else(|| ScriptError::UnknownNodeType(type_id.to_string()))?;
        debug!("Creating node of type '{}'", type_id);
        let logic = registration.create();
        Ok((registration, logic))
    }

    pub fn type_colors(&self) -> Vec<TypeColorRegistration> {
        self.inner.read().type_colors.clone()
    }

    /// Types that have a color registration.
    pub fn registered_types(&self) -> Vec<DataType> {
        self.inner
            .read()
            .type_colors
            .iter()
            .map(|c| c.data_type.clone())
            .collect()
    }

    /// The registered color of a type, or one derived from its name.
    pub fn color_for(&self, data_type: &DataType) -> TypeColorRegistration {
        if let Some(registration) = self
            .inner
            .read()
            .type_colors
            .iter()
            .find(|c| c.data_type == *data_type)
        {
            return registration.clone();
        }

        let color = if *data_type == DataType::Any {
            Color::WHITE
        } else {
            let mut hasher = DefaultHasher::new();
            data_type.name().hash(&mut hasher);
            let hash = hasher.finish();
            Color::from_hsl((hash % 360) as f32, 50.0 + (hash >> 16) as f32 % 50.0, 50.0)
        };
        TypeColorRegistration {
            data_type: data_type.clone(),
            color,
            plugin_id: String::new(),
        }
    }

    /// Can values of this type be carried by generated object pins.
    pub fn is_connectable(&self, data_type: &DataType) -> bool {
        self.inner
            .read()
            .type_colors
            .iter()
            .any(|c| c.data_type.is_assignable_from(data_type))
    }

    /// Extension kinds must be registered before pins of that type can connect.
    pub fn is_known_type(&self, data_type: &DataType) -> bool {
        match data_type {
            DataType::Extension(_) => self.is_connectable(data_type),
            _ => true,
        }
    }
}
