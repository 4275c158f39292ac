pub mod builtin;
pub mod config;
pub mod data_model;
pub mod editor;
pub mod error;
pub mod host;
pub mod model;
pub mod plugin;
pub mod script;
pub mod storage;

pub use config::EngineConfig;
pub use data_model::{DataModel, DataModelEvent, MemoryDataModel};
pub use error::{Result, ScriptError};
pub use host::ScriptHandle;
pub use model::{Color, DataType, Numeric, Value};
pub use plugin::{NodePlugin, NodeTypeStore};
pub use script::{NodeScript, PinId};

use std::path::Path;

use log::{debug, info};

/// Entry point of `nodescript-cli`: `<script.json> [ticks] [--config <file>]`.
pub fn run(args: Vec<String>) -> Result<()> {
    let mut positional = Vec::new();
    let mut config_path = None;
    let mut iter = args.into_iter().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            config_path = iter.next();
        } else {
            positional.push(arg);
        }
    }

    let Some(script_path) = positional.first() else {
        return Err(ScriptError::not_configured(
            "usage: nodescript-cli <script.json> [ticks] [--config <file>]",
        ));
    };
    let ticks = positional
        .get(1)
        .and_then(|t| t.parse::<usize>().ok())
        .unwrap_or(1);
    let config = config_path
        .map(|p| EngineConfig::load(Path::new(&p)))
        .unwrap_or_default();

    let store = NodeTypeStore::with_builtin();
    let script = NodeScript::load_from_file(Path::new(script_path), store, None)?;
    info!("Running '{}' for {} ticks", script.name, ticks);
    let handle = ScriptHandle::with_config(script, config);

    for tick in 0..ticks {
        let result = handle.tick()?;
        println!("tick {}: {}", tick, result);
        for (node_id, failure) in handle.read(|s| s.failures()) {
            println!("  node {} failed at {}: {}", node_id, failure.occurred_at, failure.message);
        }
        for event in handle.drain_events() {
            debug!("{:?}", event);
        }
    }
    Ok(())
}
