//! Arithmetic on numerics.

use crate::error::{Result, ScriptError};
use crate::model::{DataType, Numeric};
use crate::script::{CollectionKey, NodeContext, NodeLogic, PinKey};

fn numerics(ctx: &mut NodeContext<'_>, collection: Option<CollectionKey>) -> Result<Vec<Numeric>> {
    let Some(collection) = collection else {
        return Ok(Vec::new());
    };
    Ok(ctx
        .collection_inputs(collection)?
        .iter()
        .map(|v| v.as_numeric().unwrap_or_default())
        .collect())
}

/// Sums every value of a growable input collection.
#[derive(Default)]
pub struct SumNumericsNode {
    values: Option<CollectionKey>,
    output: Option<PinKey>,
}

impl NodeLogic for SumNumericsNode {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.values = Some(ctx.create_input_collection("Values", DataType::Numeric, 2, 1)?);
        self.output = Some(ctx.create_output("Sum", DataType::Numeric)?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let sum: Numeric = numerics(ctx, self.values)?.into_iter().sum();
        if let Some(output) = self.output {
            ctx.set_output(output, sum)?;
        }
        Ok(())
    }
}

/// Multiplies every value of a growable input collection.
#[derive(Default)]
pub struct MultiplyNumericsNode {
    values: Option<CollectionKey>,
    output: Option<PinKey>,
}

impl NodeLogic for MultiplyNumericsNode {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.values = Some(ctx.create_input_collection("Values", DataType::Numeric, 2, 1)?);
        self.output = Some(ctx.create_output("Product", DataType::Numeric)?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let product = numerics(ctx, self.values)?
            .into_iter()
            .reduce(|a, b| a * b)
            .unwrap_or_default();
        if let Some(output) = self.output {
            ctx.set_output(output, product)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BinaryOp {
    Subtract,
    Divide,
    Modulo,
}

/// `A op B` on two numeric inputs.
pub struct BinaryNumericNode {
    op: BinaryOp,
    a: Option<PinKey>,
    b: Option<PinKey>,
    output: Option<PinKey>,
}

impl BinaryNumericNode {
    fn new(op: BinaryOp) -> Self {
        Self {
            op,
            a: None,
            b: None,
            output: None,
        }
    }

    pub fn subtract() -> Self {
        Self::new(BinaryOp::Subtract)
    }

    pub fn divide() -> Self {
        Self::new(BinaryOp::Divide)
    }

    pub fn modulo() -> Self {
        Self::new(BinaryOp::Modulo)
    }
}

impl NodeLogic for BinaryNumericNode {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.a = Some(ctx.create_input("A", DataType::Numeric)?);
        self.b = Some(ctx.create_input("B", DataType::Numeric)?);
        self.output = Some(ctx.create_output("Result", DataType::Numeric)?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let (Some(a), Some(b), Some(output)) = (self.a, self.b, self.output) else {
            return Err(ScriptError::not_configured("pins were not built"));
        };
        let a = ctx.input_numeric(a)?;
        let b = ctx.input_numeric(b)?;
        let result = match self.op {
            BinaryOp::Subtract => a - b,
            BinaryOp::Divide => a.checked_div(b).ok_or(ScriptError::DivideByZero)?,
            BinaryOp::Modulo => {
                if b.as_f64() == 0.0 {
                    return Err(ScriptError::DivideByZero);
                }
                a % b
            }
        };
        ctx.set_output(output, result)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::Value;
    use crate::plugin::NodeTypeStore;
    use crate::script::{NodeScript, PinId};

    fn constant(script: &mut NodeScript, value: i32) -> PinId {
        let id = script.add_node("static.numeric").unwrap();
        script.set_node_storage(id, serde_json::to_value(crate::model::Numeric::Int(value)).unwrap()).unwrap();
        script.pin_named(id, "Output").unwrap()
    }

    fn script() -> NodeScript {
        NodeScript::new("math", NodeTypeStore::with_builtin())
    }

    #[test]
    fn test_sum_grows_with_its_collection() {
        let mut script = script();
        let sum = script.add_node("math.sum").unwrap();
        let values = script.node(sum).unwrap().collections()[0].key();
        script.add_collection_pin(sum, values).unwrap();
        let keys = script.node(sum).unwrap().collections()[0].keys();
        assert_eq!(keys.len(), 3);

        for (i, key) in keys.into_iter().enumerate() {
            let source = constant(&mut script, i as i32 + 1);
            script.connect(source, PinId::new(sum, key)).unwrap();
        }

        script.run().unwrap();
        let output = script.pin_named(sum, "Sum").unwrap();
        assert_eq!(script.pin_value(output).unwrap(), Value::from(6));
    }

    #[test]
    fn test_divide_by_zero_falls_back_to_default() {
        let mut script = script();
        let divide = script.add_node("math.divide").unwrap();
        let a = constant(&mut script, 4);
        script.connect(a, script.pin_named(divide, "A").unwrap()).unwrap();

        script.run().unwrap();
        let output = script.pin_named(divide, "Result").unwrap();
        assert_eq!(script.pin_value(output).unwrap(), Value::from(0));
        let failure = script.node(divide).unwrap().failure().unwrap();
        assert_eq!(failure.message, "Division by zero");
    }

    #[test]
    fn test_divide_is_floating() {
        let mut script = script();
        let divide = script.add_node("math.divide").unwrap();
        let a = constant(&mut script, 7);
        let b = constant(&mut script, 2);
        script.connect(a, script.pin_named(divide, "A").unwrap()).unwrap();
        script.connect(b, script.pin_named(divide, "B").unwrap()).unwrap();

        let output = script.pin_named(divide, "Result").unwrap();
        script.run().unwrap();
        assert_eq!(script.pin_value(output).unwrap(), Value::from(3.5f32));
    }
}
