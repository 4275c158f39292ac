//! Node graphs: pins, nodes and the script that owns and evaluates them.

pub mod context;
pub mod events;
pub mod node;
pub mod object_pins;
pub mod pin;
pub mod pin_collection;
#[allow(clippy::module_inception)]
pub mod script;

pub use context::NodeContext;
pub use events::ScriptEvent;
pub use node::{Node, NodeFailure, NodeLogic, NodeState, PinPosition};
pub use object_pins::ObjectOutputPins;
pub use pin::{types_connectable, Pin, PinDirection, PinId, PinKey};
pub use pin_collection::{CollectionKey, PinCollection};
pub use script::{Connection, NodeScript, RemovedPin};
