//! Sharing a script between the tick thread and an editing thread.
//!
//! Every call holds the lock for exactly one evaluation pass or one edit, so
//! edits never interleave with evaluation.

use std::sync::Arc;

use log::error;
use parking_lot::Mutex;

use crate::config::EngineConfig;
use crate::editor::{CommandHistory, ScriptCommand};
use crate::error::Result;
use crate::model::Value;
use crate::script::{NodeScript, ScriptEvent};

struct Session {
    script: NodeScript,
    history: CommandHistory,
}

#[derive(Clone)]
pub struct ScriptHandle {
    inner: Arc<Mutex<Session>>,
}

impl ScriptHandle {
    pub fn new(script: NodeScript) -> Self {
        let capacity = script.config().history_capacity;
        Self {
            inner: Arc::new(Mutex::new(Session {
                script,
                history: CommandHistory::new(capacity),
            })),
        }
    }

    pub fn with_config(mut script: NodeScript, config: EngineConfig) -> Self {
        script.set_config(config);
        Self::new(script)
    }

    /// Runs one evaluation pass and returns the script's result.
    ///
    /// A failed pass is logged and reported; the result then holds whatever
    /// defaults the affected nodes fell back to.
    pub fn tick(&self) -> Result<Value> {
        let mut session = self.inner.lock();
        if let Err(e) = session.script.run() {
            error!("Evaluation of script '{}' failed: {}", session.script.name, e);
            return Err(e);
        }
        session.script.result()
    }

    pub fn execute(&self, command: Box<dyn ScriptCommand>) -> Result<()> {
        let mut session = self.inner.lock();
        let Session { script, history } = &mut *session;
        history.execute(command, script)
    }

    pub fn undo(&self) -> Result<bool> {
        let mut session = self.inner.lock();
        let Session { script, history } = &mut *session;
        history.undo(script)
    }

    pub fn redo(&self) -> Result<bool> {
        let mut session = self.inner.lock();
        let Session { script, history } = &mut *session;
        history.redo(script)
    }

    /// Read access to the script under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&NodeScript) -> R) -> R {
        f(&self.inner.lock().script)
    }

    /// An edit that bypasses the history.
    pub fn edit<R>(&self, f: impl FnOnce(&mut NodeScript) -> R) -> R {
        f(&mut self.inner.lock().script)
    }

    pub fn drain_events(&self) -> Vec<ScriptEvent> {
        self.inner.lock().script.drain_events()
    }
}
