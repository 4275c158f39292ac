use crate::error::Result;
use crate::script::NodeScript;

/// An executable and reversible edit of a script.
pub trait ScriptCommand: std::fmt::Debug + Send {
    /// Executes the command, applying changes to the script.
    fn execute(&mut self, script: &mut NodeScript) -> Result<()>;

    /// Undoes the command, reverting changes made by execute.
    fn undo(&mut self, script: &mut NodeScript) -> Result<()>;

    /// Redoes the command after an undo.
    fn redo(&mut self, script: &mut NodeScript) -> Result<()> {
        self.execute(script)
    }

    /// Returns a human-readable name for the command.
    fn name(&self) -> String {
        format!("{:?}", self)
    }
}
