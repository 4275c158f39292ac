//! Undoable editing of scripts.

pub mod command;
pub mod commands;
pub mod history;

pub use command::ScriptCommand;
pub use commands::{
    AddCollectionPinCommand, AddNodeCommand, ChangePinTypeCommand, ConnectPinsCommand, DisconnectPinsCommand,
    MoveNodeCommand, RemoveCollectionPinCommand, RemoveNodeCommand, UpdateNodeStorageCommand,
};
pub use history::CommandHistory;
