//! Output pins generated from a reflected type.

use super::context::NodeContext;
use super::pin::PinKey;
use crate::error::{Result, ScriptError};
use crate::model::{humanize, Accessor, DataType, TypeDescriptor, TypeShape, Value};

/// Exposes the fields of a data-model type as output pins.
///
/// Object types get one pin per eligible field, value types a single "Item" pin.
/// Number fields are widened to `Numeric` pins.
#[derive(Default)]
pub struct ObjectOutputPins {
    current_type: Option<TypeDescriptor>,
    item_pin: Option<PinKey>,
    field_pins: Vec<(Accessor, PinKey, DataType)>,
}

impl ObjectOutputPins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_type(&self) -> Option<&TypeDescriptor> {
        self.current_type.as_ref()
    }

    /// Keys of the generated pins, in creation order.
    pub fn pins(&self) -> Vec<PinKey> {
        self.item_pin
            .iter()
            .copied()
            .chain(self.field_pins.iter().map(|(_, key, _)| *key))
            .collect()
    }

    /// Rebuilds the pins for a new type. `None` leaves no pins.
    pub fn change_type(&mut self, ctx: &mut NodeContext<'_>, descriptor: Option<TypeDescriptor>) -> Result<()> {
        if self.current_type == descriptor {
            return Ok(());
        }

        for key in self.pins() {
            ctx.remove_pin(key)?;
        }
        self.item_pin = None;
        self.field_pins.clear();
        self.current_type = descriptor;

        let Some(descriptor) = self.current_type.clone() else {
            return Ok(());
        };
        match &descriptor.shape {
            TypeShape::Value(data_type) => {
                let pin_type = if data_type.is_numeric() {
                    DataType::Numeric
                } else {
                    data_type.clone()
                };
                self.item_pin = Some(ctx.create_or_add_output("Item", pin_type)?);
            }
            TypeShape::Object(fields) => {
                let store = ctx.store();
                for field in fields.iter().filter(|f| !f.ignored) {
                    let pin_type = if field.data_type.is_numeric() {
                        DataType::Numeric
                    } else if store.is_connectable(&field.data_type) {
                        field.data_type.clone()
                    } else {
                        continue;
                    };
                    let key = ctx.create_or_add_output(humanize(field.name), pin_type.clone())?;
                    self.field_pins.push((field.accessor(), key, pin_type));
                }
            }
        }
        Ok(())
    }

    /// Pushes the current value onto the generated pins. Only connected field pins
    /// are read, unconnected ones keep their previous value.
    pub fn set_current_value(&self, ctx: &mut NodeContext<'_>, value: &Value) -> Result<()> {
        let Some(current) = &self.current_type else {
            return Err(ScriptError::not_configured(
                "object output pins have no type, call change_type first",
            ));
        };
        let expected = current.data_type();
        if let Some(actual) = value.runtime_type() {
            if actual != expected {
                return Err(ScriptError::TypeMismatch { expected, actual });
            }
        }

        if let Some(key) = self.item_pin {
            ctx.set_output(key, value.clone())?;
        }

        let object = value.as_object();
        for (accessor, key, pin_type) in &self.field_pins {
            if !ctx.is_connected(*key) {
                continue;
            }
            let field_value = match object {
                Some(object) => accessor(object.as_ref()).coerce_to(pin_type),
                None => Value::default_for(pin_type),
            };
            ctx.set_output(*key, field_value)?;
        }
        Ok(())
    }
}
