//! Comparisons and boolean operators.

use std::cmp::Ordering;

use crate::error::{Result, ScriptError};
use crate::model::{DataType, Value};
use crate::script::{CollectionKey, NodeContext, NodeLogic, PinKey};

/// Compares two values of any type. Numbers compare by magnitude across kinds.
#[derive(Default)]
pub struct EqualsNode {
    a: Option<PinKey>,
    b: Option<PinKey>,
    output: Option<PinKey>,
}

impl NodeLogic for EqualsNode {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.a = Some(ctx.create_input("A", DataType::Any)?);
        self.b = Some(ctx.create_input("B", DataType::Any)?);
        self.output = Some(ctx.create_output("Result", DataType::Boolean)?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let (Some(a), Some(b), Some(output)) = (self.a, self.b, self.output) else {
            return Err(ScriptError::not_configured("pins were not built"));
        };
        let a = ctx.input(a)?;
        let b = ctx.input(b)?;
        ctx.set_output(output, a == b)
    }
}

/// `A > B` or `A < B` on numerics.
pub struct CompareNode {
    expected: Ordering,
    a: Option<PinKey>,
    b: Option<PinKey>,
    output: Option<PinKey>,
}

impl CompareNode {
    pub fn greater_than() -> Self {
        Self {
            expected: Ordering::Greater,
            a: None,
            b: None,
            output: None,
        }
    }

    pub fn less_than() -> Self {
        Self {
            expected: Ordering::Less,
            a: None,
            b: None,
            output: None,
        }
    }
}

impl NodeLogic for CompareNode {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.a = Some(ctx.create_input("A", DataType::Numeric)?);
        self.b = Some(ctx.create_input("B", DataType::Numeric)?);
        self.output = Some(ctx.create_output("Result", DataType::Boolean)?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let (Some(a), Some(b), Some(output)) = (self.a, self.b, self.output) else {
            return Err(ScriptError::not_configured("pins were not built"));
        };
        let a = ctx.input_numeric(a)?;
        let b = ctx.input_numeric(b)?;
        ctx.set_output(output, a.cmp(&b) == self.expected)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BooleanOp {
    And,
    Or,
}

/// AND / OR over a growable collection of booleans.
pub struct BooleanGateNode {
    op: BooleanOp,
    values: Option<CollectionKey>,
    output: Option<PinKey>,
}

impl BooleanGateNode {
    pub fn and() -> Self {
        Self {
            op: BooleanOp::And,
            values: None,
            output: None,
        }
    }

    pub fn or() -> Self {
        Self {
            op: BooleanOp::Or,
            values: None,
            output: None,
        }
    }
}

impl NodeLogic for BooleanGateNode {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.values = Some(ctx.create_input_collection("Values", DataType::Boolean, 2, 1)?);
        self.output = Some(ctx.create_output("Result", DataType::Boolean)?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let (Some(values), Some(output)) = (self.values, self.output) else {
            return Err(ScriptError::not_configured("pins were not built"));
        };
        let values = ctx.collection_inputs(values)?;
        let bools = values.iter().map(|v| matches!(v, Value::Boolean(true)));
        let result = match self.op {
            BooleanOp::And => bools.fold(true, |acc, b| acc && b),
            BooleanOp::Or => bools.fold(false, |acc, b| acc || b),
        };
        ctx.set_output(output, result)
    }
}

#[derive(Default)]
pub struct NotNode {
    input: Option<PinKey>,
    output: Option<PinKey>,
}

impl NodeLogic for NotNode {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.input = Some(ctx.create_input("Input", DataType::Boolean)?);
        self.output = Some(ctx.create_output("Output", DataType::Boolean)?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let (Some(input), Some(output)) = (self.input, self.output) else {
            return Err(ScriptError::not_configured("pins were not built"));
        };
        let value = ctx.input_bool(input)?;
        ctx.set_output(output, !value)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Numeric, Value};
    use crate::plugin::NodeTypeStore;
    use crate::script::NodeScript;

    #[test]
    fn test_equals_compares_numbers_by_magnitude() {
        let mut script = NodeScript::new("logic", NodeTypeStore::with_builtin());
        let a = script.add_node("static.numeric").unwrap();
        script.set_node_storage(a, serde_json::to_value(Numeric::Int(2)).unwrap()).unwrap();
        let b = script.add_node("static.numeric").unwrap();
        script.set_node_storage(b, serde_json::to_value(Numeric::Double(2.0)).unwrap()).unwrap();
        let equals = script.add_node("logic.equals").unwrap();

        script
            .connect(script.pin_named(a, "Output").unwrap(), script.pin_named(equals, "A").unwrap())
            .unwrap();
        script
            .connect(script.pin_named(b, "Output").unwrap(), script.pin_named(equals, "B").unwrap())
            .unwrap();

        script.run().unwrap();
        let result = script.pin_named(equals, "Result").unwrap();
        assert_eq!(script.pin_value(result).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_unconnected_gates() {
        let mut script = NodeScript::new("logic", NodeTypeStore::with_builtin());
        let and = script.add_node("logic.and").unwrap();
        let or = script.add_node("logic.or").unwrap();
        let not = script.add_node("logic.not").unwrap();
        script.run().unwrap();

        let and = script.pin_named(and, "Result").unwrap();
        let or = script.pin_named(or, "Result").unwrap();
        let not = script.pin_named(not, "Output").unwrap();
        assert_eq!(script.pin_value(and).unwrap(), Value::Boolean(false));
        assert_eq!(script.pin_value(or).unwrap(), Value::Boolean(false));
        assert_eq!(script.pin_value(not).unwrap(), Value::Boolean(true));
    }
}
