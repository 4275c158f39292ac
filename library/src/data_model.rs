//! The boundary to the host application's data: type descriptions, current
//! values and events, addressed by a dotted path such as `"cpu.load"`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::model::{TypeDescriptor, Value};

pub trait DataModel: Send + Sync {
    /// Describes the type found at `path`, `None` if the path is unknown.
    fn describe(&self, path: &str) -> Option<TypeDescriptor>;

    /// Current value at `path`.
    fn value(&self, path: &str) -> Option<Value>;

    /// The event published at `path`, if the path names an event rather than a value.
    fn event(&self, _path: &str) -> Option<DataModelEvent> {
        None
    }

    /// Known paths, for editors offering a picker.
    fn paths(&self) -> Vec<String> {
        Vec::new()
    }
}

/// State of an event source: how often it fired, when, and with what arguments.
#[derive(Clone, Debug)]
pub struct DataModelEvent {
    pub arguments_type: TypeDescriptor,
    pub trigger_count: u64,
    pub last_trigger: Option<DateTime<Utc>>,
    pub last_arguments: Value,
}

impl DataModelEvent {
    pub fn new(arguments_type: TypeDescriptor) -> Self {
        Self {
            arguments_type,
            trigger_count: 0,
            last_trigger: None,
            last_arguments: Value::Null,
        }
    }

    pub fn trigger(&mut self, arguments: Value) {
        self.trigger_count += 1;
        self.last_trigger = Some(Utc::now());
        self.last_arguments = arguments;
    }

    /// Milliseconds between the last trigger and `now`, 0 if it never fired.
    pub fn time_since_trigger(&self, now: DateTime<Utc>) -> f64 {
        self.last_trigger.map(|at| elapsed_ms(at, now)).unwrap_or(0.0)
    }
}

pub(crate) fn elapsed_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_microseconds().unwrap_or(i64::MAX) as f64 / 1000.0
}

/// A data model held in memory, updated by the host between ticks.
#[derive(Default)]
pub struct MemoryDataModel {
    entries: RwLock<HashMap<String, (TypeDescriptor, Value)>>,
    events: RwLock<HashMap<String, DataModelEvent>>,
}

impl MemoryDataModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<String>, descriptor: TypeDescriptor, value: Value) {
        self.entries.write().insert(path.into(), (descriptor, value));
    }

    /// Replaces the value at an existing path. Returns false for unknown paths.
    pub fn set_value(&self, path: &str, value: Value) -> bool {
        match self.entries.write().get_mut(path) {
            Some(entry) => {
                entry.1 = value;
                true
            }
            None => false,
        }
    }

    /// Declares an event whose arguments are described by `arguments_type`.
    pub fn insert_event(&self, path: impl Into<String>, arguments_type: TypeDescriptor) {
        self.events
            .write()
            .insert(path.into(), DataModelEvent::new(arguments_type));
    }

    /// Fires the event at `path`. Returns false for unknown events.
    pub fn trigger(&self, path: &str, arguments: Value) -> bool {
        match self.events.write().get_mut(path) {
            Some(event) => {
                event.trigger(arguments);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, path: &str) {
        self.entries.write().remove(path);
        self.events.write().remove(path);
    }
}

impl DataModel for MemoryDataModel {
    fn describe(&self, path: &str) -> Option<TypeDescriptor> {
        self.entries.read().get(path).map(|(d, _)| d.clone())
    }

    fn value(&self, path: &str) -> Option<Value> {
        self.entries.read().get(path).map(|(_, v)| v.clone())
    }

    fn event(&self, path: &str) -> Option<DataModelEvent> {
        self.events.read().get(path).cloned()
    }

    fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .entries
            .read()
            .keys()
            .chain(self.events.read().keys())
            .cloned()
            .collect();
        paths.sort();
        paths
    }
}
