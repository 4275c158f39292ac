use crate::error::Result;
use crate::model::DataType;
use crate::script::{NodeContext, NodeLogic, PinKey};

/// Receives the result of a script. Every script with a result type has exactly one.
pub struct ExitNode {
    result_type: DataType,
    input: Option<PinKey>,
}

impl ExitNode {
    pub fn new(result_type: DataType) -> Self {
        Self {
            result_type,
            input: None,
        }
    }
}

impl Default for ExitNode {
    fn default() -> Self {
        Self::new(DataType::Any)
    }
}

impl NodeLogic for ExitNode {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.input = Some(ctx.create_input("Result", self.result_type.clone())?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        if let Some(input) = self.input {
            ctx.input(input)?;
        }
        Ok(())
    }
}
