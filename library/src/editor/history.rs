use log::debug;

use super::command::ScriptCommand;
use crate::error::Result;
use crate::script::NodeScript;

/// Undo and redo stacks of executed commands.
pub struct CommandHistory {
    undo_stack: Vec<Box<dyn ScriptCommand>>,
    redo_stack: Vec<Box<dyn ScriptCommand>>,
    capacity: usize,
}

impl CommandHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Executes a command and records it. Clears the redo stack.
    /// A failed command is not recorded.
    pub fn execute(&mut self, mut command: Box<dyn ScriptCommand>, script: &mut NodeScript) -> Result<()> {
        command.execute(script)?;
        debug!("Executed '{}'", command.name());
        self.undo_stack.push(command);
        if self.undo_stack.len() > self.capacity {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
        Ok(())
    }

    /// Undoes the last command. Returns false when there is nothing to undo.
    pub fn undo(&mut self, script: &mut NodeScript) -> Result<bool> {
        let Some(mut command) = self.undo_stack.pop() else {
            return Ok(false);
        };
        if let Err(e) = command.undo(script) {
            self.undo_stack.push(command);
            return Err(e);
        }
        debug!("Undid '{}'", command.name());
        self.redo_stack.push(command);
        Ok(true)
    }

    /// Redoes the last undone command. Returns false when there is nothing to redo.
    pub fn redo(&mut self, script: &mut NodeScript) -> Result<bool> {
        let Some(mut command) = self.redo_stack.pop() else {
            return Ok(false);
        };
        if let Err(e) = command.redo(script) {
            self.redo_stack.push(command);
            return Err(e);
        }
        debug!("Redid '{}'", command.name());
        self.undo_stack.push(command);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_name(&self) -> Option<String> {
        self.undo_stack.last().map(|c| c.name())
    }

    pub fn redo_name(&self) -> Option<String> {
        self.redo_stack.last().map(|c| c.name())
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(100)
    }
}
