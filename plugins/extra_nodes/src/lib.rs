//! Additional node types: color gradients and seeded random numbers.

use std::any::Any;
use std::sync::Arc;

use log::debug;
use nodescript::error::{Result, ScriptError};
use nodescript::model::{Color, DataType, ExtensionValue, Numeric, Value};
use nodescript::plugin::{NodeCategory, NodePlugin, NodeTypeRegistration, PluginRegistrar};
use nodescript::script::{NodeContext, NodeLogic, PinKey};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const GRADIENT_KIND: &str = "gradient";

pub fn gradient_type() -> DataType {
    DataType::Extension(GRADIENT_KIND.to_string())
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    /// Position in `0..=1`.
    pub position: f32,
    pub color: Color,
}

/// A color gradient, stops sorted by position.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Gradient {
    stops: Vec<GradientStop>,
}

impl Gradient {
    pub fn new(mut stops: Vec<GradientStop>) -> Self {
        stops.sort_by_key(|s| OrderedFloat(s.position));
        Self { stops }
    }

    pub fn stops(&self) -> &[GradientStop] {
        &self.stops
    }

    /// The color at `position`, interpolated between the surrounding stops.
    pub fn sample(&self, position: f32) -> Color {
        let (Some(first), Some(last)) = (self.stops.first(), self.stops.last()) else {
            return Color::default();
        };
        if position <= first.position {
            return first.color;
        }
        if position >= last.position {
            return last.color;
        }
        for pair in self.stops.windows(2) {
            let (left, right) = (pair[0], pair[1]);
            if position <= right.position {
                let span = right.position - left.position;
                if span <= f32::EPSILON {
                    return right.color;
                }
                return left.color.lerp(right.color, (position - left.position) / span);
            }
        }
        last.color
    }
}

impl ExtensionValue for Gradient {
    fn kind(&self) -> &str {
        GRADIENT_KIND
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_dyn(&self, other: &dyn ExtensionValue) -> bool {
        other.as_any().downcast_ref::<Gradient>() == Some(self)
    }

    fn display(&self) -> String {
        format!("Gradient ({} stops)", self.stops.len())
    }
}

/// Outputs a gradient configured in the node's storage.
#[derive(Default)]
pub struct StaticGradientNode {
    gradient: Arc<Gradient>,
    output: Option<PinKey>,
}

impl NodeLogic for StaticGradientNode {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.output = Some(ctx.create_output("Gradient", gradient_type())?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        if let Some(output) = self.output {
            ctx.set_output(output, Value::Extension(self.gradient.clone()))?;
        }
        Ok(())
    }

    fn storage(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self.gradient.as_ref()).ok()
    }

    fn load_storage(&mut self, storage: serde_json::Value) -> Result<()> {
        let gradient: Gradient = serde_json::from_value(storage)?;
        self.gradient = Arc::new(Gradient::new(gradient.stops));
        Ok(())
    }
}

/// Samples a gradient at a position.
#[derive(Default)]
pub struct GradientSampleNode {
    gradient: Option<PinKey>,
    position: Option<PinKey>,
    output: Option<PinKey>,
}

impl NodeLogic for GradientSampleNode {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.gradient = Some(ctx.create_input("Gradient", gradient_type())?);
        self.position = Some(ctx.create_input("Position", DataType::Numeric)?);
        self.output = Some(ctx.create_output("Color", DataType::Color)?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let (Some(gradient), Some(position), Some(output)) = (self.gradient, self.position, self.output) else {
            return Err(ScriptError::not_configured("pins were not built"));
        };
        let gradient = ctx.input(gradient)?;
        let position = ctx.input_numeric(position)?.to_f32();
        let color = gradient
            .as_extension::<Gradient>()
            .map(|g| g.sample(position))
            .unwrap_or_default();
        ctx.set_output(output, color)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct RandomNumericStorage {
    pub seed: u64,
}

/// A new random number between `Min` and `Max` every pass, reproducible by seed.
pub struct RandomNumericNode {
    storage: RandomNumericStorage,
    rng: StdRng,
    min: Option<PinKey>,
    max: Option<PinKey>,
    output: Option<PinKey>,
}

impl Default for RandomNumericNode {
    fn default() -> Self {
        Self {
            storage: RandomNumericStorage { seed: 0 },
            rng: StdRng::seed_from_u64(0),
            min: None,
            max: None,
            output: None,
        }
    }
}

impl NodeLogic for RandomNumericNode {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.min = Some(ctx.create_input("Min", DataType::Numeric)?);
        self.max = Some(ctx.create_input("Max", DataType::Numeric)?);
        self.output = Some(ctx.create_output("Value", DataType::Numeric)?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let (Some(min), Some(max), Some(output)) = (self.min, self.max, self.output) else {
            return Err(ScriptError::not_configured("pins were not built"));
        };
        let min = ctx.input_numeric(min)?.as_f64();
        let max = ctx.input_numeric(max)?.as_f64();
        if !(max - min).is_finite() {
            return Err(ScriptError::node(format!("cannot pick a random number between {} and {}", min, max)));
        }
        let value = if max > min {
            self.rng.gen_range(min..max)
        } else {
            min
        };
        ctx.set_output(output, Numeric::Double(value))
    }

    fn storage(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self.storage).ok()
    }

    fn load_storage(&mut self, storage: serde_json::Value) -> Result<()> {
        self.storage = serde_json::from_value(storage)?;
        self.rng = StdRng::seed_from_u64(self.storage.seed);
        debug!("Random node reseeded with {}", self.storage.seed);
        Ok(())
    }
}

pub struct ExtraNodesPlugin;

impl NodePlugin for ExtraNodesPlugin {
    fn id(&self) -> &'static str {
        "extra_nodes"
    }

    fn name(&self) -> String {
        "Extra nodes".to_string()
    }

    fn version(&self) -> (u32, u32, u32) {
        (0, 1, 0)
    }

    fn register(&self, registrar: &mut PluginRegistrar) {
        registrar
            .add_type_color(gradient_type(), Color::rgba(0x4c, 0xaf, 0x50, 0xff))
            .add_node_type(
                NodeTypeRegistration::new("gradient.static", "Gradient-Value", NodeCategory::Color, || {
                    Box::new(StaticGradientNode::default())
                })
                .with_description("Outputs a configurable color gradient")
                .with_output_type(gradient_type()),
            )
            .add_node_type(
                NodeTypeRegistration::new("gradient.sample", "Sample gradient", NodeCategory::Color, || {
                    Box::new(GradientSampleNode::default())
                })
                .with_description("Picks the color of a gradient at a position")
                .with_input_type(gradient_type())
                .with_output_type(DataType::Color),
            )
            .add_node_type(
                NodeTypeRegistration::new("math.random", "Random", NodeCategory::Math, || {
                    Box::new(RandomNumericNode::default())
                })
                .with_description("Outputs a random number between Min and Max")
                .with_output_type(DataType::Numeric),
            );
    }
}
