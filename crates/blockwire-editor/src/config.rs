//! Editor configuration.
//!
//! Two layers:
//!
//! - [`EditorSettings`]: plain data, loaded from TOML: initial tool, log
//!   level, per-tool settings.
//! - [`EditorConfig`]: the runtime bundle handed to the pipeline: tool
//!   registry, seed document, collaboration hooks and the echo gate. Every
//!   hook is optional; a missing hook is a no-op.
//!
//! ```toml
//! initial_block = "paragraph"
//! log_level = "warn"
//!
//! [tools.header]
//! config = { levels = [1, 2, 3] }
//! default_data = { text = "", level = 2 }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use blockwire_types::OutputData;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{EnumString, IntoStaticStr};
use thiserror::Error;

use crate::bridge::CollabBridge;
use crate::gate::EchoGate;
use crate::registry::{DEFAULT_TOOL, ToolRegistry};

/// Errors loading configuration or seed data.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid document: {0}")]
    Json(#[from] serde_json::Error),
}

/// How chatty the editor is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum LogLevel {
    Verbose,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Equivalent `tracing` filter directive.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Verbose => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Per-tool settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Settings every block of this tool starts with.
    pub config: Value,
    /// Data used when a block is composed without any.
    pub default_data: Value,
}

/// Serializable editor settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Tool used to seed an empty store.
    pub initial_block: String,
    pub log_level: LogLevel,
    pub tools: BTreeMap<String, ToolSettings>,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            initial_block: DEFAULT_TOOL.to_string(),
            log_level: LogLevel::default(),
            tools: BTreeMap::new(),
        }
    }
}

impl EditorSettings {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read(path.as_ref())?)
    }
}

/// Read a seed document from a JSON file.
pub fn load_data(path: impl AsRef<Path>) -> Result<OutputData, ConfigError> {
    Ok(OutputData::from_json(&read(path.as_ref())?)?)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Runtime configuration consumed by [`MutationPipeline::new`](crate::MutationPipeline::new).
pub struct EditorConfig {
    /// Tool used when the store would otherwise start empty.
    pub initial_block: String,
    pub tools: ToolRegistry,
    /// Seed document.
    pub data: OutputData,
    pub bridge: CollabBridge,
    /// Echo gate for remote mutations. `None` never swallows.
    pub gate: Option<Arc<dyn EchoGate>>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            initial_block: DEFAULT_TOOL.to_string(),
            tools: ToolRegistry::with_defaults(),
            data: OutputData::default(),
            bridge: CollabBridge::default(),
            gate: None,
        }
    }
}

impl EditorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from loaded settings (registry from `tools`, no hooks).
    pub fn from_settings(settings: &EditorSettings) -> Self {
        Self {
            initial_block: settings.initial_block.clone(),
            tools: ToolRegistry::from_settings(&settings.tools),
            ..Self::default()
        }
    }

    pub fn with_data(mut self, data: OutputData) -> Self {
        self.data = data;
        self
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_bridge(mut self, bridge: CollabBridge) -> Self {
        self.bridge = bridge;
        self
    }

    pub fn with_gate(mut self, gate: impl EchoGate + 'static) -> Self {
        self.gate = Some(Arc::new(gate));
        self
    }
}

impl std::fmt::Debug for EditorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorConfig")
            .field("initial_block", &self.initial_block)
            .field("tools", &self.tools)
            .field("blocks", &self.data.blocks.len())
            .field("gate", &self.gate.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_settings_defaults() {
        let settings = EditorSettings::from_toml_str("").unwrap();
        assert_eq!(settings.initial_block, "paragraph");
        assert_eq!(settings.log_level, LogLevel::Info);
        assert!(settings.tools.is_empty());
    }

    #[test]
    fn test_settings_from_toml() {
        let settings = EditorSettings::from_toml_str(
            r#"
            initial_block = "header"
            log_level = "warn"

            [tools.header]
            config = { levels = [1, 2, 3] }
            default_data = { text = "", level = 2 }
            "#,
        )
        .unwrap();
        assert_eq!(settings.initial_block, "header");
        assert_eq!(settings.log_level.as_filter(), "warn");
        let header = &settings.tools["header"];
        assert_eq!(header.config, json!({"levels": [1, 2, 3]}));
        assert_eq!(header.default_data, json!({"text": "", "level": 2}));

        let config = EditorConfig::from_settings(&settings);
        assert!(config.tools.contains("header"));
        assert!(config.tools.contains("paragraph"));
    }

    #[test]
    fn test_bad_log_level_is_parse_error() {
        let err = EditorSettings::from_toml_str(r#"log_level = "loud""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_files() {
        let mut settings_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(settings_file, "initial_block = \"paragraph\"").unwrap();
        let settings = EditorSettings::load(settings_file.path()).unwrap();
        assert_eq!(settings.initial_block, "paragraph");

        let mut data_file = tempfile::NamedTempFile::new().unwrap();
        write!(data_file, r#"{{"blocks": [{{"type": "paragraph", "data": {{"text": "a"}}}}]}}"#).unwrap();
        let data = load_data(data_file.path()).unwrap();
        assert_eq!(data.blocks.len(), 1);
    }

    #[test]
    fn test_missing_file() {
        let err = EditorSettings::load("/nonexistent/blockwire.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
