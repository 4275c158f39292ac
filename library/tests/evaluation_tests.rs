use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nodescript::error::Result;
use nodescript::plugin::{NodeCategory, NodePlugin, NodeTypeRegistration, PluginRegistrar};
use nodescript::script::{NodeContext, NodeLogic, PinId, PinKey, ScriptEvent};
use nodescript::{DataType, NodeScript, NodeTypeStore, Numeric, ScriptError, ScriptHandle, Value};

/// Outputs the integer 7 and counts how often it was evaluated.
struct CountingNode {
    evaluations: Arc<AtomicUsize>,
    output: Option<PinKey>,
}

impl NodeLogic for CountingNode {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.output = Some(ctx.create_output("Value", DataType::Int)?);
        Ok(())
    }

    fn evaluate(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        if let Some(output) = self.output {
            ctx.set_output(output, 7)?;
        }
        Ok(())
    }
}

/// Panics on evaluation, like a plugin with a bug would.
#[derive(Default)]
struct PanickingNode {
    output: Option<PinKey>,
}

impl NodeLogic for PanickingNode {
    fn build(&mut self, ctx: &mut NodeContext<'_>) -> Result<()> {
        self.output = Some(ctx.create_output("Value", DataType::Numeric)?);
        Ok(())
    }

    fn evaluate(&mut self, _ctx: &mut NodeContext<'_>) -> Result<()> {
        panic!("index out of bounds");
    }
}

struct CountingPlugin {
    evaluations: Arc<AtomicUsize>,
}

impl NodePlugin for CountingPlugin {
    fn id(&self) -> &'static str {
        "test.counting"
    }

    fn name(&self) -> String {
        "Counting".to_string()
    }

    fn version(&self) -> (u32, u32, u32) {
        (1, 0, 0)
    }

    fn register(&self, registrar: &mut PluginRegistrar) {
        let evaluations = self.evaluations.clone();
        registrar
            .add_node_type(NodeTypeRegistration::new(
                "test.counting",
                "Counting",
                NodeCategory::Custom,
                move || {
                    Box::new(CountingNode {
                        evaluations: evaluations.clone(),
                        output: None,
                    })
                },
            ))
            .add_node_type(NodeTypeRegistration::new(
                "test.panicking",
                "Panicking",
                NodeCategory::Custom,
                || Box::new(PanickingNode::default()),
            ));
    }
}

fn counting_script() -> (NodeScript, Arc<AtomicUsize>) {
    let evaluations = Arc::new(AtomicUsize::new(0));
    let store = NodeTypeStore::with_builtin();
    store.register_plugin(&CountingPlugin {
        evaluations: evaluations.clone(),
    });
    (NodeScript::new("counting", store), evaluations)
}

fn first_collection_pin(script: &NodeScript, node_id: uuid::Uuid) -> PinId {
    let key = script.node(node_id).unwrap().collections()[0].keys()[0];
    PinId::new(node_id, key)
}

#[test]
fn test_node_evaluates_once_per_pass() {
    let (mut script, evaluations) = counting_script();
    let source = script.add_node("test.counting").unwrap();
    let value = script.pin_named(source, "Value").unwrap();
    let left = script.add_node("math.sum").unwrap();
    let right = script.add_node("math.multiply").unwrap();
    script.connect(value, first_collection_pin(&script, left)).unwrap();
    script.connect(value, first_collection_pin(&script, right)).unwrap();

    script.run().unwrap();
    for _ in 0..3 {
        assert_eq!(script.pin_value(value).unwrap(), Value::from(7));
    }
    assert_eq!(evaluations.load(Ordering::SeqCst), 1);

    script.run().unwrap();
    assert_eq!(evaluations.load(Ordering::SeqCst), 2);
}

#[test]
fn test_unconnected_inputs_read_their_default() {
    let (mut script, _) = counting_script();
    let compare = script.add_node("logic.greater_than").unwrap();
    let text = script.add_node("conversion.to_text").unwrap();

    let a = script.pin_named(compare, "A").unwrap();
    assert_eq!(script.pin_value(a).unwrap(), Value::Number(Numeric::Int(0)));
    let input = script.pin_named(text, "Input").unwrap();
    assert!(script.pin_value(input).unwrap().is_null());

    script.run().unwrap();
    let output = script.pin_named(text, "Output").unwrap();
    assert_eq!(script.pin_value(output).unwrap(), Value::from(""));
}

#[test]
fn test_integer_outputs_widen_into_numeric_inputs() {
    let (mut script, _) = counting_script();
    let source = script.add_node("test.counting").unwrap();
    let sum = script.add_node("math.sum").unwrap();
    let target = first_collection_pin(&script, sum);
    script
        .connect(script.pin_named(source, "Value").unwrap(), target)
        .unwrap();

    script.run().unwrap();
    let value = script.pin_value(target).unwrap();
    assert_eq!(value.runtime_type(), Some(DataType::Int));
    assert_eq!(value, Value::Number(Numeric::Int(7)));
    // Numeric equality is by magnitude.
    assert_eq!(value, Value::from(7.0));
}

#[test]
fn test_self_loop_is_reported_as_cycle() {
    let (mut script, _) = counting_script();
    let sum = script.add_node("math.sum").unwrap();
    let output = script.pin_named(sum, "Sum").unwrap();
    script.connect(output, first_collection_pin(&script, sum)).unwrap();

    let err = script.run().unwrap_err();
    assert!(matches!(err, ScriptError::CyclicGraph { node_id, .. } if node_id == sum));
}

#[test]
fn test_transitive_cycle_is_reported() {
    let (mut script, _) = counting_script();
    let a = script.add_node("math.sum").unwrap();
    let b = script.add_node("math.sum").unwrap();
    script
        .connect(script.pin_named(a, "Sum").unwrap(), first_collection_pin(&script, b))
        .unwrap();
    assert!(script.would_create_cycle(b, a));
    script
        .connect(script.pin_named(b, "Sum").unwrap(), first_collection_pin(&script, a))
        .unwrap();

    assert!(script.run().unwrap_err().is_cycle());
    // A second pass starts clean and finds the same cycle.
    assert!(script.run().unwrap_err().is_cycle());
}

#[test]
fn test_cycle_upstream_of_exit_fails_the_tick() {
    let store = NodeTypeStore::with_builtin();
    let mut script = NodeScript::with_exit("cyclic", DataType::Numeric, store).unwrap();
    let sum = script.add_node("math.sum").unwrap();
    let output = script.pin_named(sum, "Sum").unwrap();
    script.connect(output, first_collection_pin(&script, sum)).unwrap();
    let exit = script.exit_node_id().unwrap();
    script.connect(output, script.pin_named(exit, "Result").unwrap()).unwrap();

    assert!(script.run().unwrap_err().is_cycle());
}

#[test]
fn test_failed_node_falls_back_to_defaults_and_recovers() {
    let (mut script, _) = counting_script();
    let divide = script.add_node("math.divide").unwrap();
    let source = script.add_node("test.counting").unwrap();
    let a = script.pin_named(divide, "A").unwrap();
    let b = script.pin_named(divide, "B").unwrap();
    script.connect(script.pin_named(source, "Value").unwrap(), a).unwrap();

    script.run().unwrap();
    let result = script.pin_named(divide, "Result").unwrap();
    assert_eq!(script.pin_value(result).unwrap(), Value::from(0));
    assert_eq!(script.failures().len(), 1);

    script.connect(script.pin_named(source, "Value").unwrap(), b).unwrap();
    script.run().unwrap();
    assert_eq!(script.pin_value(result).unwrap(), Value::from(1));
    assert!(script.failures().is_empty());
}

#[test]
fn test_exit_node_result() {
    let store = NodeTypeStore::with_builtin();
    let mut script = NodeScript::with_exit("result", DataType::Boolean, store).unwrap();
    assert_eq!(script.result().unwrap(), Value::from(false));

    let not = script.add_node("logic.not").unwrap();
    let exit = script.exit_node_id().unwrap();
    script
        .connect(script.pin_named(not, "Output").unwrap(), script.pin_named(exit, "Result").unwrap())
        .unwrap();
    script.run().unwrap();
    assert_eq!(script.result().unwrap(), Value::from(true));
    assert!(script.remove_node(exit).is_err());
}

#[test]
fn test_mismatched_types_do_not_connect() {
    let (mut script, _) = counting_script();
    let text = script.add_node("static.text").unwrap();
    let sum = script.add_node("math.sum").unwrap();
    let err = script
        .connect(script.pin_named(text, "Output").unwrap(), first_collection_pin(&script, sum))
        .unwrap_err();
    assert!(matches!(
        err,
        ScriptError::TypeMismatch { expected: DataType::Numeric, actual: DataType::Text }
    ));
    assert!(script.connections().is_empty());
}

fn not_chain(script: &mut NodeScript, length: usize) -> Vec<uuid::Uuid> {
    let mut chain: Vec<uuid::Uuid> = Vec::with_capacity(length);
    for _ in 0..length {
        let not = script.add_node("logic.not").unwrap();
        if let Some(previous) = chain.last() {
            let output = script.pin_named(*previous, "Output").unwrap();
            script.connect(output, script.pin_named(not, "Input").unwrap()).unwrap();
        }
        chain.push(not);
    }
    chain
}

#[test]
fn test_deep_acyclic_chain_evaluates() {
    let (mut script, _) = counting_script();
    let chain = not_chain(&mut script, 2000);
    let last = *chain.last().unwrap();

    script.begin_pass();
    script.evaluate_node(last).unwrap();
    let output = script.pin_named(last, "Output").unwrap();
    // An even number of inversions of `false`.
    assert_eq!(script.pin_value(output).unwrap(), Value::from(false));
    script.run().unwrap();
}

#[test]
fn test_long_cycle_is_reported_without_exhausting_the_stack() {
    let (mut script, _) = counting_script();
    let chain = not_chain(&mut script, 1000);
    let first = chain[0];
    let last = *chain.last().unwrap();
    script
        .connect(script.pin_named(last, "Output").unwrap(), script.pin_named(first, "Input").unwrap())
        .unwrap();

    assert!(script.run().unwrap_err().is_cycle());
}

#[test]
fn test_repeated_failure_is_queued_once() {
    let store = NodeTypeStore::with_builtin();
    let mut script = NodeScript::with_exit("failing", DataType::Numeric, store).unwrap();
    let divide = script.add_node("math.divide").unwrap();
    let exit = script.exit_node_id().unwrap();
    script
        .connect(script.pin_named(divide, "Result").unwrap(), script.pin_named(exit, "Result").unwrap())
        .unwrap();
    let handle = ScriptHandle::new(script);
    handle.drain_events();

    for _ in 0..1000 {
        assert_eq!(handle.tick().unwrap(), Value::from(0));
    }
    let events = handle.drain_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ScriptEvent::NodeFailed { node_id, .. } if *node_id == divide));

    // Recovering and failing again is a new failure.
    let b = handle.read(|s| s.pin_named(divide, "B").unwrap());
    handle.edit(|s| {
        let one = s.add_node("static.numeric").unwrap();
        s.set_node_storage(one, serde_json::to_value(Numeric::Int(1)).unwrap()).unwrap();
        s.connect(s.pin_named(one, "Output").unwrap(), b).unwrap();
    });
    handle.tick().unwrap();
    assert!(handle.read(|s| s.failures().is_empty()));
    handle.edit(|s| s.disconnect_all(b).unwrap());
    handle.tick().unwrap();
    let failed = handle
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, ScriptEvent::NodeFailed { .. }))
        .count();
    assert_eq!(failed, 1);
}

#[test]
fn test_panicking_node_is_contained() {
    let (mut script, _) = counting_script();
    let panicking = script.add_node("test.panicking").unwrap();
    let to_text = script.add_node("conversion.to_text").unwrap();
    script
        .connect(script.pin_named(panicking, "Value").unwrap(), script.pin_named(to_text, "Input").unwrap())
        .unwrap();

    script.run().unwrap();
    let failure = script.node(panicking).unwrap().failure().unwrap();
    assert!(failure.message.contains("index out of bounds"));
    let output = script.pin_named(to_text, "Output").unwrap();
    assert_eq!(script.pin_value(output).unwrap(), Value::from("0"));
    // The node keeps its logic and fails the same way on the next pass.
    script.run().unwrap();
    assert!(script.node(panicking).unwrap().failure().is_some());
}
