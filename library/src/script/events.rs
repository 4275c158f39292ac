use uuid::Uuid;

use super::pin::PinId;
use super::pin_collection::CollectionKey;
use crate::model::{DataType, Value};

/// Structural and evaluation notifications, queued on the script and drained by
/// the host (editor, UI) after each edit or tick.
#[derive(Clone, Debug, PartialEq)]
pub enum ScriptEvent {
    NodeAdded(Uuid),
    NodeRemoved(Uuid),
    PinAdded(PinId),
    PinRemoved(PinId),
    PinCollectionAdded {
        node_id: Uuid,
        collection: CollectionKey,
    },
    PinCollectionRemoved {
        node_id: Uuid,
        collection: CollectionKey,
    },
    PinTypeChanged {
        pin: PinId,
        data_type: DataType,
    },
    PinConnected {
        output: PinId,
        input: PinId,
    },
    PinDisconnected {
        output: PinId,
        input: PinId,
    },
    /// Only queued when `EngineConfig::emit_value_events` is set.
    ValueChanged {
        pin: PinId,
        value: Value,
    },
    StorageChanged(Uuid),
    NodeFailed {
        node_id: Uuid,
        message: String,
    },
}
