use std::any::Any;
use std::env;
use std::fs;
use std::sync::Arc;

use nodescript::error::Result;
use nodescript::model::{Color, ExtensionValue};
use nodescript::plugin::{NodeCategory, NodePlugin, NodeTypeRegistration, PluginRegistrar};
use nodescript::script::{NodeContext, NodeLogic, PinKey, ScriptEvent};
use nodescript::{DataType, EngineConfig, NodeScript, NodeTypeStore, ScriptError, Value};

#[derive(Debug, PartialEq)]
struct Waveform(Vec<f32>);

impl ExtensionValue for Waveform {
    fn kind(&self) -> &str {
        "waveform"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_dyn(&self, other: &dyn ExtensionValue) -> bool {
        other.as_any().downcast_ref::<Waveform>() == Some(self)
    }
}

fn waveform() -> DataType {
    DataType::Extension("waveform".to_string())
}

#[derive(Default)]
struct WaveformSource {
    output: Option<PinKey>,
}

impl NodeLogic for WaveformSource {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.output = Some(ctx.create_output("Waveform", waveform())?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        if let Some(output) = self.output {
            ctx.set_output(output, Value::Extension(Arc::new(Waveform(vec![0.0, 1.0, 0.0]))))?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct WaveformPeak {
    input: Option<PinKey>,
    output: Option<PinKey>,
}

impl NodeLogic for WaveformPeak {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.input = Some(ctx.create_input("Waveform", waveform())?);
        self.output = Some(ctx.create_output("Peak", DataType::Numeric)?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let (Some(input), Some(output)) = (self.input, self.output) else {
            return Ok(());
        };
        let value = ctx.input(input)?;
        let peak = value
            .as_extension::<Waveform>()
            .map(|w| w.0.iter().copied().fold(0.0f32, f32::max))
            .unwrap_or_default();
        ctx.set_output(output, peak)
    }
}

struct WaveformPlugin {
    with_color: bool,
}

impl NodePlugin for WaveformPlugin {
    fn id(&self) -> &'static str {
        "test.waveform"
    }

    fn name(&self) -> String {
        "Waveforms".to_string()
    }

    fn version(&self) -> (u32, u32, u32) {
        (0, 2, 0)
    }

    fn register(&self, registrar: &mut PluginRegistrar) {
        if self.with_color {
            registrar.add_type_color(waveform(), Color::rgba(10, 20, 30, 255));
        }
        registrar
            .add_node_type(
                NodeTypeRegistration::new("waveform.source", "Waveform", NodeCategory::Custom, || {
                    Box::new(WaveformSource::default())
                })
                .with_output_type(waveform()),
            )
            .add_node_type(
                NodeTypeRegistration::new("waveform.peak", "Peak", NodeCategory::Custom, || {
                    Box::new(WaveformPeak::default())
                })
                .with_input_type(waveform())
                .with_output_type(DataType::Numeric),
            );
    }
}

fn waveform_script(with_color: bool) -> (NodeScript, Result<Option<nodescript::PinId>>) {
    let store = NodeTypeStore::with_builtin();
    store.register_plugin(&WaveformPlugin { with_color });
    let mut script = NodeScript::new("waveform", store);
    let source = script.add_node("waveform.source").unwrap();
    let peak = script.add_node("waveform.peak").unwrap();
    let output = script.pin_named(source, "Waveform").unwrap();
    let input = script.pin_named(peak, "Waveform").unwrap();
    let connected = script.connect(output, input);
    (script, connected)
}

#[test]
fn test_registered_extension_values_flow() {
    let (mut script, connected) = waveform_script(true);
    assert!(connected.is_ok());

    script.run().unwrap();
    let peak = script.nodes().iter().find(|n| (*n).type_id() == "waveform.peak").unwrap().id();
    let output = script.pin_named(peak, "Peak").unwrap();
    assert_eq!(script.pin_value(output).unwrap(), Value::from(1.0f32));
}

#[test]
fn test_unregistered_extension_types_do_not_connect() {
    let (script, connected) = waveform_script(false);
    assert!(matches!(connected, Err(ScriptError::InvalidConnection(_))));
    assert!(script.connections().is_empty());
}

#[test]
fn test_registry_lookup_and_colors() {
    let store = NodeTypeStore::with_builtin();
    store.register_plugin(&WaveformPlugin { with_color: true });

    let plugins = store.plugins();
    assert!(plugins.iter().any(|p| p.id == "test.waveform" && p.version == (0, 2, 0)));
    let peak = store.find("waveform.peak").unwrap();
    assert_eq!(peak.plugin_id, "test.waveform");
    assert_eq!(peak.category, NodeCategory::Custom);
    assert!(store.create_node("waveform.missing").is_err());

    assert_eq!(store.color_for(&waveform()).color, Color::rgba(10, 20, 30, 255));
    assert_eq!(store.color_for(&DataType::Any).color, Color::WHITE);
    // Unregistered types get a stable derived color.
    let derived = store.color_for(&DataType::Object("Sensor".into()));
    assert_eq!(derived.color, store.color_for(&DataType::Object("Sensor".into())).color);
    assert!(derived.plugin_id.is_empty());
}

#[test]
fn test_config_file_bounds_the_event_queue() {
    let path = env::temp_dir().join(format!("nodescript-{}.toml", uuid::Uuid::new_v4()));
    fs::write(&path, "max_queued_events = 3\nlog_node_failures = false\n").unwrap();
    let config = EngineConfig::load(&path);
    fs::remove_file(&path).unwrap();
    assert_eq!(config.max_queued_events, 3);
    assert!(!config.log_node_failures);
    assert_eq!(config.history_capacity, EngineConfig::default().history_capacity);

    let mut script = NodeScript::new("bounded", NodeTypeStore::with_builtin()).with_config(config);
    let mut last = None;
    for _ in 0..5 {
        last = Some(script.add_node("logic.not").unwrap());
    }
    // Only the newest events survive: the last node and its two pins.
    let events = script.drain_events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], ScriptEvent::NodeAdded(last.unwrap()));

    assert_eq!(EngineConfig::load(&env::temp_dir().join("nodescript-missing.toml")), EngineConfig::default());
}
