use std::fs;
use std::path::Path;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Engine settings, read from a TOML file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Undrained events kept before the oldest are dropped.
    pub max_queued_events: usize,
    /// Commands kept on the undo stack.
    pub history_capacity: usize,
    /// Queue a `ValueChanged` event whenever a pin value changes.
    pub emit_value_events: bool,
    pub log_node_failures: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_queued_events: 10_000,
            history_capacity: 100,
            emit_value_events: false,
            log_node_failures: true,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Reads the config at `path`. A missing or broken file yields the defaults.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(toml_str) => match Self::from_toml_str(&toml_str) {
                    Ok(config) => return config,
                    Err(e) => {
                        warn!("Failed to parse config file, using defaults: {}", e);
                    }
                },
                Err(e) => {
                    warn!("Failed to read config file, using defaults: {}", e);
                }
            }
        }
        Self::default()
    }

    pub fn save(&self, path: &Path) {
        match toml::to_string_pretty(self) {
            Ok(toml_str) => {
                if let Err(e) = fs::write(path, toml_str) {
                    error!("Failed to write config file: {}", e);
                } else {
                    info!("Engine config saved to {}", path.display());
                }
            }
            Err(e) => {
                error!("Failed to serialize config: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = EngineConfig::from_toml_str("max_queued_events = 8\n").unwrap();
        assert_eq!(config.max_queued_events, 8);
        assert_eq!(config.history_capacity, 100);
        assert!(config.log_node_failures);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        assert!(EngineConfig::from_toml_str("max_queued_events = \"many\"").is_err());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = EngineConfig::load(Path::new("/nonexistent/nodescript.toml"));
        assert_eq!(config, EngineConfig::default());
    }
}
