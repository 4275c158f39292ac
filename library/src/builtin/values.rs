//! Constant value nodes. The value lives in the node's storage.

use serde_json::json;

use crate::error::Result;
use crate::model::{Color, DataType, Numeric, Value};
use crate::script::{NodeContext, NodeLogic, PinKey};

#[derive(Default)]
pub struct StaticNumericValueNode {
    value: Numeric,
    output: Option<PinKey>,
}

impl NodeLogic for StaticNumericValueNode {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.output = Some(ctx.create_output("Output", DataType::Numeric)?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        if let Some(output) = self.output {
            ctx.set_output(output, self.value)?;
        }
        Ok(())
    }

    fn storage(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self.value).ok()
    }

    fn load_storage(&mut self, storage: serde_json::Value) -> Result<()> {
        self.value = serde_json::from_value(storage)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticBooleanValueNode {
    value: bool,
    output: Option<PinKey>,
}

impl NodeLogic for StaticBooleanValueNode {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.output = Some(ctx.create_output("Output", DataType::Boolean)?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        if let Some(output) = self.output {
            ctx.set_output(output, self.value)?;
        }
        Ok(())
    }

    fn storage(&self) -> Option<serde_json::Value> {
        Some(json!(self.value))
    }

    fn load_storage(&mut self, storage: serde_json::Value) -> Result<()> {
        self.value = serde_json::from_value(storage)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticTextValueNode {
    value: String,
    output: Option<PinKey>,
}

impl NodeLogic for StaticTextValueNode {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.output = Some(ctx.create_output("Output", DataType::Text)?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        if let Some(output) = self.output {
            ctx.set_output(output, Value::Text(self.value.clone()))?;
        }
        Ok(())
    }

    fn storage(&self) -> Option<serde_json::Value> {
        Some(json!(self.value))
    }

    fn load_storage(&mut self, storage: serde_json::Value) -> Result<()> {
        self.value = serde_json::from_value(storage)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticColorValueNode {
    value: Color,
    output: Option<PinKey>,
}

impl NodeLogic for StaticColorValueNode {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.output = Some(ctx.create_output("Output", DataType::Color)?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        if let Some(output) = self.output {
            ctx.set_output(output, self.value)?;
        }
        Ok(())
    }

    fn storage(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self.value).ok()
    }

    fn load_storage(&mut self, storage: serde_json::Value) -> Result<()> {
        self.value = serde_json::from_value(storage)?;
        Ok(())
    }
}
