use thiserror::Error;
use uuid::Uuid;

use crate::model::DataType;
use crate::script::PinId;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: DataType, actual: DataType },
    #[error("Not configured: {0}")]
    NotConfigured(String),
    #[error("Cyclic graph: node {type_id} ({node_id}) was re-entered while evaluating")]
    CyclicGraph { node_id: Uuid, type_id: String },
    #[error("Invalid assignment: cannot assign a value of type {value_type} to a pin of type {pin_type}")]
    InvalidAssignment {
        value_type: DataType,
        pin_type: DataType,
    },
    #[error("Node not found: {0}")]
    NodeNotFound(Uuid),
    #[error("Pin not found: {0}")]
    PinNotFound(PinId),
    #[error("Invalid connection: {0}")]
    InvalidConnection(String),
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),
    #[error("Division by zero")]
    DivideByZero,
    #[error("Node error: {0}")]
    Node(String),
    #[error("JSON error: {0}")]
    Storage(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl ScriptError {
    pub fn node(msg: impl Into<String>) -> Self {
        ScriptError::Node(msg.into())
    }

    pub fn not_configured(msg: impl Into<String>) -> Self {
        ScriptError::NotConfigured(msg.into())
    }

    pub fn invalid_connection(msg: impl Into<String>) -> Self {
        ScriptError::InvalidConnection(msg.into())
    }

    /// Structural errors are recovered locally with a default value.
    /// Cycles abort the pass for every node on the cycle.
    pub fn is_cycle(&self) -> bool {
        matches!(self, ScriptError::CyclicGraph { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScriptError>;
