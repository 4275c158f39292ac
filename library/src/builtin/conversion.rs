use crate::error::{Result, ScriptError};
use crate::model::{DataType, Numeric, Value};
use crate::script::{NodeContext, NodeLogic, PinKey};

/// Converts any value into a numeric. Text is parsed, booleans become 0 or 1.
#[derive(Default)]
pub struct ToNumericNode {
    input: Option<PinKey>,
    output: Option<PinKey>,
}

impl ToNumericNode {
    fn convert(value: &Value) -> Numeric {
        match value {
            Value::Number(n) => *n,
            Value::Text(s) => Numeric::parse_or_default(s),
            Value::Boolean(b) => Numeric::Int(i32::from(*b)),
            _ => Numeric::default(),
        }
    }
}

impl NodeLogic for ToNumericNode {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.input = Some(ctx.create_input("Input", DataType::Any)?);
        self.output = Some(ctx.create_output("Output", DataType::Numeric)?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let (Some(input), Some(output)) = (self.input, self.output) else {
            return Err(ScriptError::not_configured("pins were not built"));
        };
        let value = ctx.input(input)?;
        ctx.set_output(output, Self::convert(&value))
    }
}

/// Formats any value as text. `Null` becomes the empty string.
#[derive(Default)]
pub struct ToTextNode {
    input: Option<PinKey>,
    output: Option<PinKey>,
}

impl NodeLogic for ToTextNode {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.input = Some(ctx.create_input("Input", DataType::Any)?);
        self.output = Some(ctx.create_output("Output", DataType::Text)?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let (Some(input), Some(output)) = (self.input, self.output) else {
            return Err(ScriptError::not_configured("pins were not built"));
        };
        let text = ctx.input_text(input)?;
        ctx.set_output(output, text)
    }
}
