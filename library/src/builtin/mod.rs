//! Built-in node types.

pub mod conversion;
pub mod data_model;
pub mod exit;
pub mod logic;
pub mod math;
pub mod values;

pub use conversion::{ToNumericNode, ToTextNode};
pub use data_model::{
    DataModelEventCycleNode, DataModelEventCycleStorage, DataModelEventNode, DataModelNode, DataModelNodeStorage,
};
pub use exit::ExitNode;
pub use logic::{BooleanGateNode, CompareNode, EqualsNode, NotNode};
pub use math::{BinaryNumericNode, MultiplyNumericsNode, SumNumericsNode};
pub use values::{StaticBooleanValueNode, StaticColorValueNode, StaticNumericValueNode, StaticTextValueNode};

use crate::model::{Color, DataType};
use crate::plugin::{NodeCategory, NodePlugin, NodeTypeRegistration, PluginRegistrar};

pub const PLUGIN_ID: &str = "nodescript.builtin";
pub const EXIT_NODE_TYPE: &str = "core.exit";

pub struct BuiltinPlugin;

impl NodePlugin for BuiltinPlugin {
    fn id(&self) -> &'static str {
        PLUGIN_ID
    }

    fn name(&self) -> String {
        "Built-in nodes".to_string()
    }

    fn version(&self) -> (u32, u32, u32) {
        (0, 3, 0)
    }

    fn register(&self, registrar: &mut PluginRegistrar) {
        registrar
            .add_type_color(DataType::Numeric, Color::rgba(0x21, 0x96, 0xf3, 0xff))
            .add_type_color(DataType::Boolean, Color::rgba(0xf4, 0x43, 0x36, 0xff))
            .add_type_color(DataType::Text, Color::rgba(0xff, 0xc1, 0x07, 0xff))
            .add_type_color(DataType::Color, Color::rgba(0x9c, 0x27, 0xb0, 0xff));

        registrar
            .add_node_type(
                NodeTypeRegistration::new(EXIT_NODE_TYPE, "Exit node", NodeCategory::Core, || {
                    Box::new(ExitNode::default())
                })
                .with_description("Outputs the result of the script")
                .default_node(),
            )
            .add_node_type(
                NodeTypeRegistration::new("static.numeric", "Numeric-Value", NodeCategory::Static, || {
                    Box::new(StaticNumericValueNode::default())
                })
                .with_description("Outputs a configurable static numeric value")
                .with_output_type(DataType::Numeric),
            )
            .add_node_type(
                NodeTypeRegistration::new("static.boolean", "Boolean-Value", NodeCategory::Static, || {
                    Box::new(StaticBooleanValueNode::default())
                })
                .with_description("Outputs a configurable static boolean value")
                .with_output_type(DataType::Boolean),
            )
            .add_node_type(
                NodeTypeRegistration::new("static.text", "Text-Value", NodeCategory::Static, || {
                    Box::new(StaticTextValueNode::default())
                })
                .with_description("Outputs a configurable static text")
                .with_output_type(DataType::Text),
            )
            .add_node_type(
                NodeTypeRegistration::new("static.color", "Color-Value", NodeCategory::Static, || {
                    Box::new(StaticColorValueNode::default())
                })
                .with_description("Outputs a configurable static color")
                .with_output_type(DataType::Color),
            )
            .add_node_type(
                NodeTypeRegistration::new("math.sum", "Sum", NodeCategory::Math, || {
                    Box::new(SumNumericsNode::default())
                })
                .with_description("Sums the connected numeric values")
                .with_input_type(DataType::Numeric)
                .with_output_type(DataType::Numeric),
            )
            .add_node_type(
                NodeTypeRegistration::new("math.subtract", "Subtract", NodeCategory::Math, || {
                    Box::new(BinaryNumericNode::subtract())
                })
                .with_description("Subtracts B from A")
                .with_input_type(DataType::Numeric)
                .with_output_type(DataType::Numeric),
            )
            .add_node_type(
                NodeTypeRegistration::new("math.multiply", "Multiply", NodeCategory::Math, || {
                    Box::new(MultiplyNumericsNode::default())
                })
                .with_description("Multiplies the connected numeric values")
                .with_input_type(DataType::Numeric)
                .with_output_type(DataType::Numeric),
            )
            .add_node_type(
                NodeTypeRegistration::new("math.divide", "Divide", NodeCategory::Math, || {
                    Box::new(BinaryNumericNode::divide())
                })
                .with_description("Divides A by B")
                .with_input_type(DataType::Numeric)
                .with_output_type(DataType::Numeric),
            )
            .add_node_type(
                NodeTypeRegistration::new("math.modulo", "Modulo", NodeCategory::Math, || {
                    Box::new(BinaryNumericNode::modulo())
                })
                .with_description("Remainder of A divided by B")
                .with_input_type(DataType::Numeric)
                .with_output_type(DataType::Numeric),
            )
            .add_node_type(
                NodeTypeRegistration::new("logic.equals", "Equals", NodeCategory::Logic, || {
                    Box::new(EqualsNode::default())
                })
                .with_description("Checks whether A and B are equal")
                .with_input_type(DataType::Any)
                .with_output_type(DataType::Boolean),
            )
            .add_node_type(
                NodeTypeRegistration::new("logic.greater_than", "Greater than", NodeCategory::Logic, || {
                    Box::new(CompareNode::greater_than())
                })
                .with_description("Checks whether A is greater than B")
                .with_input_type(DataType::Numeric)
                .with_output_type(DataType::Boolean),
            )
            .add_node_type(
                NodeTypeRegistration::new("logic.less_than", "Less than", NodeCategory::Logic, || {
                    Box::new(CompareNode::less_than())
                })
                .with_description("Checks whether A is less than B")
                .with_input_type(DataType::Numeric)
                .with_output_type(DataType::Boolean),
            )
            .add_node_type(
                NodeTypeRegistration::new("logic.and", "And", NodeCategory::Logic, || Box::new(BooleanGateNode::and()))
                    .with_description("True when every input is true")
                    .with_input_type(DataType::Boolean)
                    .with_output_type(DataType::Boolean),
            )
            .add_node_type(
                NodeTypeRegistration::new("logic.or", "Or", NodeCategory::Logic, || Box::new(BooleanGateNode::or()))
                    .with_description("True when any input is true")
                    .with_input_type(DataType::Boolean)
                    .with_output_type(DataType::Boolean),
            )
            .add_node_type(
                NodeTypeRegistration::new("logic.not", "Not", NodeCategory::Logic, || Box::new(NotNode::default()))
                    .with_description("Inverts the input")
                    .with_input_type(DataType::Boolean)
                    .with_output_type(DataType::Boolean),
            )
            .add_node_type(
                NodeTypeRegistration::new("conversion.to_numeric", "To Numeric", NodeCategory::Conversion, || {
                    Box::new(ToNumericNode::default())
                })
                .with_description("Converts the input to a numeric")
                .with_input_type(DataType::Any)
                .with_output_type(DataType::Numeric),
            )
            .add_node_type(
                NodeTypeRegistration::new("conversion.to_text", "To Text", NodeCategory::Conversion, || {
                    Box::new(ToTextNode::default())
                })
                .with_description("Formats the input as text")
                .with_input_type(DataType::Any)
                .with_output_type(DataType::Text),
            )
            .add_node_type(
                NodeTypeRegistration::new("data_model.path", "Data Model-Value", NodeCategory::DataModel, || {
                    Box::new(DataModelNode::default())
                })
                .with_description("Outputs the value of a data model path"),
            )
            .add_node_type(
                NodeTypeRegistration::new("data_model.event", "Data Model-Event", NodeCategory::DataModel, || {
                    Box::new(DataModelEventNode::default())
                })
                .with_description("Outputs the latest values of a data model event"),
            )
            .add_node_type(
                NodeTypeRegistration::new(
                    "data_model.event_cycle",
                    "Data Model-Event Value Cycle",
                    NodeCategory::DataModel,
                    || Box::new(DataModelEventCycleNode::default()),
                )
                .with_description("Cycles through the provided values each time the selected event fires"),
            );
    }
}
