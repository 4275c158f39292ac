use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nodescript::model::{FieldInfo, Reflectable, TypeDescriptor};
use nodescript::script::{PinDirection, PinId};
use nodescript::{DataModel, DataType, MemoryDataModel, NodeScript, NodeTypeStore, Value};
use serde_json::json;

static FIELD_READS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
struct Machine {
    rpm: i32,
    temperature: f64,
    label: String,
    running: bool,
    load: f32,
    #[allow(dead_code)]
    handle: u64,
}

fn counted<F>(name: &'static str, data_type: DataType, read: F) -> FieldInfo
where
    F: Fn(&Machine) -> Value + Send + Sync + 'static,
{
    FieldInfo::new(name, data_type, move |m: &Machine| {
        FIELD_READS.fetch_add(1, Ordering::SeqCst);
        read(m)
    })
}

impl Reflectable for Machine {
    fn type_name(&self) -> &'static str {
        "Machine"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::object(
            "Machine",
            vec![
                counted("rpm", DataType::Int, |m| Value::from(m.rpm)),
                counted("temperature", DataType::Double, |m| Value::from(m.temperature)),
                counted("label", DataType::Text, |m| Value::from(m.label.as_str())),
                counted("running", DataType::Boolean, |m| Value::from(m.running)),
                counted("load", DataType::Float, |m| Value::from(m.load)),
                counted("handle", DataType::Long, |_| Value::Null).ignored(),
            ],
        )
    }
}

fn machine(rpm: i32) -> Value {
    Value::Object(Arc::new(Machine {
        rpm,
        temperature: 61.5,
        label: "Pump A".to_string(),
        running: true,
        load: 0.25,
        handle: 0,
    }))
}

#[test]
fn test_only_connected_fields_are_read() {
    let model = Arc::new(MemoryDataModel::new());
    model.insert("plant.pump", TypeDescriptor::of::<Machine>(), machine(1200));

    let mut script = NodeScript::new("pump", NodeTypeStore::with_builtin());
    script.set_data_model(Some(model.clone() as Arc<dyn DataModel>)).unwrap();
    let source = script.add_node("data_model.path").unwrap();
    script.set_node_storage(source, json!({ "path": "plant.pump" })).unwrap();

    let names: Vec<String> = script
        .node(source)
        .unwrap()
        .output_pins()
        .map(|p| p.name.clone())
        .collect();
    assert_eq!(names, vec!["Rpm", "Temperature", "Label", "Running", "Load"]);
    let rpm = script.pin_named(source, "Rpm").unwrap();
    assert_eq!(script.pin(rpm).unwrap().data_type(), &DataType::Numeric);
    assert_eq!(script.pin(rpm).unwrap().direction(), PinDirection::Output);

    let rpm_text = script.add_node("conversion.to_text").unwrap();
    let label_text = script.add_node("conversion.to_text").unwrap();
    script.connect(rpm, script.pin_named(rpm_text, "Input").unwrap()).unwrap();
    script
        .connect(
            script.pin_named(source, "Label").unwrap(),
            script.pin_named(label_text, "Input").unwrap(),
        )
        .unwrap();

    FIELD_READS.store(0, Ordering::SeqCst);
    script.run().unwrap();
    assert_eq!(FIELD_READS.load(Ordering::SeqCst), 2);

    let rpm_out = script.pin_named(rpm_text, "Output").unwrap();
    let label_out = script.pin_named(label_text, "Output").unwrap();
    assert_eq!(script.pin_value(rpm_out).unwrap(), Value::from("1200"));
    assert_eq!(script.pin_value(label_out).unwrap(), Value::from("Pump A"));

    // Unconnected pins keep their defaults.
    let load = script.pin_named(source, "Load").unwrap();
    assert_eq!(script.pin_value(load).unwrap(), Value::from(0));

    model.set_value("plant.pump", machine(900));
    script.run().unwrap();
    assert_eq!(script.pin_value(rpm_out).unwrap(), Value::from("900"));
    assert_eq!(FIELD_READS.load(Ordering::SeqCst), 4);
}

#[test]
fn test_value_types_get_a_single_item_pin() {
    let model = Arc::new(MemoryDataModel::new());
    model.insert("fan.speed", TypeDescriptor::value(DataType::Float), Value::from(0.75f32));

    let mut script = NodeScript::new("fan", NodeTypeStore::with_builtin());
    script.set_data_model(Some(model as Arc<dyn DataModel>)).unwrap();
    let source = script.add_node("data_model.path").unwrap();
    script.set_node_storage(source, json!({ "path": "fan.speed" })).unwrap();

    let item = script.pin_named(source, "Item").unwrap();
    assert_eq!(script.pin(item).unwrap().data_type(), &DataType::Numeric);
    script.run().unwrap();
    assert_eq!(script.pin_value(item).unwrap(), Value::from(0.75f32));
}

#[test]
fn test_retargeting_keeps_pin_keys_of_reused_slots() {
    let model = Arc::new(MemoryDataModel::new());
    model.insert("fan.speed", TypeDescriptor::value(DataType::Int), Value::from(3));
    model.insert("fan.name", TypeDescriptor::value(DataType::Text), Value::from("intake"));

    let mut script = NodeScript::new("retarget", NodeTypeStore::with_builtin());
    script.set_data_model(Some(model as Arc<dyn DataModel>)).unwrap();
    let source = script.add_node("data_model.path").unwrap();
    script.set_node_storage(source, json!({ "path": "fan.speed" })).unwrap();
    let numeric_item = script.pin_named(source, "Item").unwrap();

    let to_text = script.add_node("conversion.to_text").unwrap();
    let input = script.pin_named(to_text, "Input").unwrap();
    script.connect(numeric_item, input).unwrap();

    script.set_node_storage(source, json!({ "path": "fan.name" })).unwrap();
    let text_item = script.pin_named(source, "Item").unwrap();
    assert_eq!(text_item, numeric_item);
    assert_eq!(script.pin(text_item).unwrap().data_type(), &DataType::Text);

    script.set_node_storage(source, json!({ "path": null })).unwrap();
    assert_eq!(script.node(source).unwrap().output_pins().count(), 0);
    assert!(script.connections().is_empty());
}

#[test]
fn test_value_of_the_wrong_type_fails_the_node() {
    let model = Arc::new(MemoryDataModel::new());
    model.insert("fan.speed", TypeDescriptor::value(DataType::Int), Value::from("fast"));

    let mut script = NodeScript::new("mismatch", NodeTypeStore::with_builtin());
    script.set_data_model(Some(model as Arc<dyn DataModel>)).unwrap();
    let source = script.add_node("data_model.path").unwrap();
    script.set_node_storage(source, json!({ "path": "fan.speed" })).unwrap();

    script.run().unwrap();
    let failure = script.node(source).unwrap().failure().unwrap();
    assert!(failure.message.starts_with("Type mismatch"));
}

fn event_script(model: Arc<MemoryDataModel>, path: &str) -> (NodeScript, uuid::Uuid) {
    let mut script = NodeScript::new("events", NodeTypeStore::with_builtin());
    script.set_data_model(Some(model as Arc<dyn DataModel>)).unwrap();
    let node = script.add_node("data_model.event").unwrap();
    script.set_node_storage(node, json!({ "path": path })).unwrap();
    (script, node)
}

fn output(script: &mut NodeScript, node: uuid::Uuid, name: &str) -> Value {
    let pin = script.pin_named(node, name).unwrap();
    script.pin_value(pin).unwrap()
}

#[test]
fn test_event_node_counts_value_changes() {
    let model = Arc::new(MemoryDataModel::new());
    model.insert("fan.speed", TypeDescriptor::value(DataType::Int), Value::from(3));
    let (mut script, node) = event_script(model.clone(), "fan.speed");

    let names: Vec<String> = script
        .node(node)
        .unwrap()
        .output_pins()
        .map(|p| p.name.clone())
        .collect();
    assert_eq!(names, vec!["Time since trigger", "Trigger count", "Old value", "New value"]);

    script.run().unwrap();
    assert_eq!(output(&mut script, node, "Trigger count"), Value::from(1));
    assert_eq!(output(&mut script, node, "Old value"), Value::from(0));
    assert_eq!(output(&mut script, node, "New value"), Value::from(3));
    assert_eq!(output(&mut script, node, "Time since trigger"), Value::from(0.0));

    // Unchanged values do not trigger.
    script.run().unwrap();
    assert_eq!(output(&mut script, node, "Trigger count"), Value::from(1));

    model.set_value("fan.speed", Value::from(5));
    script.run().unwrap();
    assert_eq!(output(&mut script, node, "Trigger count"), Value::from(2));
    assert_eq!(output(&mut script, node, "Old value"), Value::from(3));
    assert_eq!(output(&mut script, node, "New value"), Value::from(5));
}

#[test]
fn test_event_node_exposes_event_arguments() {
    let model = Arc::new(MemoryDataModel::new());
    model.insert_event("game.kill", TypeDescriptor::value(DataType::Text));
    let (mut script, node) = event_script(model.clone(), "game.kill");
    assert!(script.pin_named(node, "Old value").is_err());
    let item = script.pin_named(node, "Item").unwrap();

    script.run().unwrap();
    assert_eq!(output(&mut script, node, "Trigger count"), Value::from(0));
    assert!(script.node(node).unwrap().failure().is_none());

    model.trigger("game.kill", Value::from("headshot"));
    model.trigger("game.kill", Value::from("knife"));
    script.run().unwrap();
    assert_eq!(output(&mut script, node, "Trigger count"), Value::from(2));
    assert_eq!(script.pin_value(item).unwrap(), Value::from("knife"));

    // Switching to a value path swaps the argument pins for old/new value pins.
    model.insert("fan.speed", TypeDescriptor::value(DataType::Int), Value::from(1));
    script.set_node_storage(node, json!({ "path": "fan.speed" })).unwrap();
    assert!(script.pin_named(node, "Item").is_err());
    assert!(script.pin_named(node, "New value").is_ok());
}

fn cycle_script(model: Arc<MemoryDataModel>, path: &str) -> (NodeScript, PinId) {
    let mut script = NodeScript::new("cycle", NodeTypeStore::with_builtin());
    script.set_data_model(Some(model as Arc<dyn DataModel>)).unwrap();
    let cycle = script.add_node("data_model.event_cycle").unwrap();
    script
        .set_node_storage(cycle, json!({ "path": path, "value_type": { "type": "text" } }))
        .unwrap();
    let collection = script.node(cycle).unwrap().collections()[0].key();
    script.add_collection_pin(cycle, collection).unwrap();
    script.add_collection_pin(cycle, collection).unwrap();

    let values = script.node(cycle).unwrap().collections()[0].keys();
    for (key, text) in values.into_iter().zip(["red", "green", "blue"]) {
        let source = script.add_node("static.text").unwrap();
        script.set_node_storage(source, json!(text)).unwrap();
        script
            .connect(script.pin_named(source, "Output").unwrap(), PinId::new(cycle, key))
            .unwrap();
    }
    let output = script.pin_named(cycle, "Output").unwrap();
    assert_eq!(script.pin(output).unwrap().data_type(), &DataType::Text);
    (script, output)
}

fn tick(script: &mut NodeScript, output: PinId) -> Value {
    script.run().unwrap();
    script.pin_value(output).unwrap()
}

#[test]
fn test_cycle_node_advances_on_value_changes() {
    let model = Arc::new(MemoryDataModel::new());
    model.insert("scene.mode", TypeDescriptor::value(DataType::Int), Value::from(0));
    let (mut script, output) = cycle_script(model.clone(), "scene.mode");

    assert_eq!(tick(&mut script, output), Value::from("red"));
    assert_eq!(tick(&mut script, output), Value::from("red"));
    model.set_value("scene.mode", Value::from(1));
    assert_eq!(tick(&mut script, output), Value::from("green"));
    model.set_value("scene.mode", Value::from(2));
    assert_eq!(tick(&mut script, output), Value::from("blue"));
    model.set_value("scene.mode", Value::from(0));
    assert_eq!(tick(&mut script, output), Value::from("red"));
}

#[test]
fn test_cycle_node_advances_once_per_trigger() {
    let model = Arc::new(MemoryDataModel::new());
    model.insert_event("music.beat", TypeDescriptor::value(DataType::Numeric));
    let (mut script, output) = cycle_script(model.clone(), "music.beat");

    assert_eq!(tick(&mut script, output), Value::from("red"));
    model.trigger("music.beat", Value::from(1));
    model.trigger("music.beat", Value::from(2));
    assert_eq!(tick(&mut script, output), Value::from("blue"));
    model.trigger("music.beat", Value::from(3));
    assert_eq!(tick(&mut script, output), Value::from("red"));
}
