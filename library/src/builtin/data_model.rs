use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data_model::elapsed_ms;
use crate::error::Result;
use crate::model::{DataType, Numeric, Value};
use crate::script::{CollectionKey, NodeContext, NodeLogic, ObjectOutputPins, PinKey};

#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
pub struct DataModelNodeStorage {
    pub path: Option<String>,
}

/// Exposes the value found at a data-model path, one output pin per field.
#[derive(Default)]
pub struct DataModelNode {
    storage: DataModelNodeStorage,
    pins: ObjectOutputPins,
}

impl DataModelNode {
    fn update_pins(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let descriptor = match (&self.storage.path, ctx.data_model()) {
            (Some(path), Some(model)) => model.describe(path),
            _ => None,
        };
        self.pins.change_type(ctx, descriptor)
    }
}

impl NodeLogic for DataModelNode {
    fn build(&mut self, _ctx: &mut NodeContext<'_>) -> Result<()> {
        Ok(())
    }

    fn initialize(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.update_pins(ctx)
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        if self.pins.current_type().is_none() {
            return Ok(());
        }
        let value = match (&self.storage.path, ctx.data_model()) {
            (Some(path), Some(model)) => model.value(path).unwrap_or_default(),
            _ => Default::default(),
        };
        self.pins.set_current_value(ctx, &value)
    }

    fn storage(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.storage).ok()
    }

    fn load_storage(&mut self, storage: serde_json::Value) -> Result<()> {
        self.storage = serde_json::from_value(storage)?;
        Ok(())
    }

    fn storage_changed(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.update_pins(ctx)
    }
}

fn pin_type_of(data_type: DataType) -> DataType {
    if data_type.is_numeric() {
        DataType::Numeric
    } else {
        data_type
    }
}

fn count(value: u64) -> Numeric {
    Numeric::Long(i64::try_from(value).unwrap_or(i64::MAX))
}

/// Reports changes of a data-model path.
///
/// A value path gets "Old value" and "New value" pins and counts every change; an
/// event path exposes the arguments of the last firing through `ObjectOutputPins`.
#[derive(Default)]
pub struct DataModelEventNode {
    storage: DataModelNodeStorage,
    time_since_trigger: Option<PinKey>,
    trigger_count: Option<PinKey>,
    arguments: ObjectOutputPins,
    // Old value, new value and the type both were created with.
    value_pins: Option<(PinKey, PinKey, DataType)>,
    last_value: Option<Value>,
    old_value: Value,
    new_value: Value,
    change_count: u64,
    last_change: Option<DateTime<Utc>>,
}

impl DataModelEventNode {
    fn reset_changes(&mut self) {
        self.last_value = None;
        self.old_value = Value::Null;
        self.new_value = Value::Null;
        self.change_count = 0;
        self.last_change = None;
    }

    fn remove_value_pins(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        if let Some((old, new, _)) = self.value_pins.take() {
            ctx.remove_pin(old)?;
            ctx.remove_pin(new)?;
        }
        Ok(())
    }

    fn update_pins(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let (Some(path), Some(model)) = (self.storage.path.clone(), ctx.data_model()) else {
            self.remove_value_pins(ctx)?;
            return self.arguments.change_type(ctx, None);
        };

        if let Some(event) = model.event(&path) {
            self.remove_value_pins(ctx)?;
            return self.arguments.change_type(ctx, Some(event.arguments_type));
        }

        self.arguments.change_type(ctx, None)?;
        let value_type = model.describe(&path).map(|d| pin_type_of(d.data_type()));
        if self.value_pins.as_ref().map(|(_, _, t)| t) == value_type.as_ref() {
            return Ok(());
        }
        self.remove_value_pins(ctx)?;
        self.reset_changes();
        if let Some(data_type) = value_type {
            let old = ctx.create_or_add_output("Old value", data_type.clone())?;
            let new = ctx.create_or_add_output("New value", data_type.clone())?;
            self.value_pins = Some((old, new, data_type));
        }
        Ok(())
    }
}

impl NodeLogic for DataModelEventNode {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.time_since_trigger = Some(ctx.create_output("Time since trigger", DataType::Numeric)?);
        self.trigger_count = Some(ctx.create_output("Trigger count", DataType::Numeric)?);
        Ok(())
    }

    fn initialize(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.update_pins(ctx)
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let (Some(time_pin), Some(count_pin)) = (self.time_since_trigger, self.trigger_count) else {
            return Ok(());
        };
        let (Some(path), Some(model)) = (self.storage.path.clone(), ctx.data_model()) else {
            return Ok(());
        };
        let now = Utc::now();

        if let Some(event) = model.event(&path) {
            ctx.set_output(time_pin, event.time_since_trigger(now))?;
            ctx.set_output(count_pin, count(event.trigger_count))?;
            if self.arguments.current_type().is_none() || event.last_arguments.is_null() {
                return Ok(());
            }
            return self.arguments.set_current_value(ctx, &event.last_arguments);
        }

        let Some((old_pin, new_pin, data_type)) = self.value_pins.clone() else {
            return Ok(());
        };
        let value = model.value(&path).unwrap_or_default().coerce_to(&data_type);
        if self.last_value.as_ref() != Some(&value) {
            self.change_count += 1;
            self.last_change = Some(now);
            self.old_value = self
                .last_value
                .replace(value.clone())
                .unwrap_or_else(|| Value::default_for(&data_type));
            self.new_value = value;
        }

        let elapsed = self.last_change.map(|at| elapsed_ms(at, now)).unwrap_or(0.0);
        ctx.set_output(time_pin, elapsed)?;
        ctx.set_output(count_pin, count(self.change_count))?;
        ctx.set_output(old_pin, self.old_value.clone())?;
        ctx.set_output(new_pin, self.new_value.clone())
    }

    fn storage(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.storage).ok()
    }

    fn load_storage(&mut self, storage: serde_json::Value) -> Result<()> {
        self.storage = serde_json::from_value(storage)?;
        Ok(())
    }

    fn storage_changed(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.reset_changes();
        self.update_pins(ctx)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DataModelEventCycleStorage {
    pub path: Option<String>,
    /// Type of the cycled values and of the output.
    pub value_type: DataType,
}

impl Default for DataModelEventCycleStorage {
    fn default() -> Self {
        Self {
            path: None,
            value_type: DataType::Any,
        }
    }
}

enum Observation {
    Triggers(u64),
    Value(Value),
}

/// Steps through its input values each time the watched event fires or the
/// watched value changes.
#[derive(Default)]
pub struct DataModelEventCycleNode {
    storage: DataModelEventCycleStorage,
    values: Option<CollectionKey>,
    output: Option<PinKey>,
    current_index: usize,
    // Baseline for detecting changes; the first observation never cycles.
    last_seen: Option<Observation>,
}

impl DataModelEventCycleNode {
    fn apply_type(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let data_type = self.storage.value_type.clone();
        if let Some(values) = self.values {
            ctx.change_collection_type(values, data_type.clone())?;
        }
        if let Some(output) = self.output {
            ctx.change_pin_type(output, data_type)?;
        }
        Ok(())
    }

    fn observe(&self, ctx: &NodeContext<'_>) -> Option<Observation> {
        let path = self.storage.path.as_deref()?;
        let model = ctx.data_model()?;
        match model.event(path) {
            Some(event) => Some(Observation::Triggers(event.trigger_count)),
            None => model.value(path).map(Observation::Value),
        }
    }
}

impl NodeLogic for DataModelEventCycleNode {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let data_type = self.storage.value_type.clone();
        self.values = Some(ctx.create_input_collection("Values", data_type.clone(), 1, 1)?);
        self.output = Some(ctx.create_output("Output", data_type)?);
        Ok(())
    }

    fn initialize(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.apply_type(ctx)
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let (Some(values), Some(output)) = (self.values, self.output) else {
            return Ok(());
        };

        let observed = self.observe(ctx);
        let steps = match (&self.last_seen, &observed) {
            (Some(Observation::Triggers(before)), Some(Observation::Triggers(now))) => now.saturating_sub(*before),
            (Some(Observation::Value(before)), Some(Observation::Value(now))) => u64::from(before != now),
            _ => 0,
        };
        if observed.is_some() {
            self.last_seen = observed;
        }

        let inputs = ctx.collection_inputs(values)?;
        if inputs.is_empty() {
            return Ok(());
        }
        let len = inputs.len() as u64;
        self.current_index = ((self.current_index as u64 % len + steps % len) % len) as usize;
        ctx.set_output(output, inputs[self.current_index].clone())
    }

    fn storage(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.storage).ok()
    }

    fn load_storage(&mut self, storage: serde_json::Value) -> Result<()> {
        self.storage = serde_json::from_value(storage)?;
        Ok(())
    }

    fn storage_changed(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.current_index = 0;
        self.last_seen = None;
        self.apply_type(ctx)
    }
}
