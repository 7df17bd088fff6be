//! Tool registry: tool name to block payload factory.
//!
//! Blocks are composed by looking their tool name up once, at compose time.
//! The factory turns caller-supplied data/settings into the payload pair the
//! block is stored with (filling defaults, merging tool config). The editor
//! never re-resolves a tool for an existing block.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::ToolSettings;
use crate::error::{Result, StoreError};

/// Tool used when nothing else is configured.
pub const DEFAULT_TOOL: &str = "paragraph";

/// Data/settings pair produced by a tool factory.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolPayload {
    pub data: Value,
    pub settings: Value,
}

/// Something that can produce a block's payload for one tool.
///
/// Closures `Fn(Value, Value) -> Result<ToolPayload, String>` implement this.
pub trait ToolFactory: Send + Sync {
    /// Build the payload for a new block. `Err` carries a human reason and
    /// surfaces as [`StoreError::ToolRejected`].
    fn compose(&self, data: Value, settings: Value) -> std::result::Result<ToolPayload, String>;
}

impl<F> ToolFactory for F
where
    F: Fn(Value, Value) -> std::result::Result<ToolPayload, String> + Send + Sync,
{
    fn compose(&self, data: Value, settings: Value) -> std::result::Result<ToolPayload, String> {
        self(data, settings)
    }
}

/// Factory driven by [`ToolSettings`] from the editor config.
///
/// - null data becomes the configured `default_data`
/// - data must otherwise be a JSON object
/// - settings are the tool `config` with caller keys layered on top
#[derive(Clone, Debug, Default)]
pub struct ConfiguredTool {
    settings: ToolSettings,
}

impl ConfiguredTool {
    pub fn new(settings: ToolSettings) -> Self {
        Self { settings }
    }

    /// Built-in paragraph tool: `{"text": ""}` when no data is given.
    pub fn paragraph() -> Self {
        Self::new(ToolSettings {
            config: Value::Null,
            default_data: serde_json::json!({ "text": "" }),
        })
    }
}

impl ToolFactory for ConfiguredTool {
    fn compose(&self, data: Value, settings: Value) -> std::result::Result<ToolPayload, String> {
        let data = match data {
            Value::Null => self.settings.default_data.clone(),
            Value::Object(_) => data,
            other => return Err(format!("data must be an object, got {}", json_type(&other))),
        };
        let settings = overlay(&self.settings.config, settings)?;
        Ok(ToolPayload { data, settings })
    }
}

/// Layer `top` over `base`. Objects merge key by key; null on either side
/// yields the other side.
fn overlay(base: &Value, top: Value) -> std::result::Result<Value, String> {
    match (base, top) {
        (base, Value::Null) => Ok(base.clone()),
        (Value::Null, top) => Ok(top),
        (Value::Object(base), Value::Object(top)) => {
            let mut merged: Map<String, Value> = base.clone();
            merged.extend(top);
            Ok(Value::Object(merged))
        }
        (_, top) => Err(format!("settings must be an object, got {}", json_type(&top))),
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Mapping from tool name to factory.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolFactory>>,
}

impl ToolRegistry {
    /// Empty registry; every compose fails with `UnknownTool`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in paragraph tool.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DEFAULT_TOOL, ConfiguredTool::paragraph());
        registry
    }

    /// Defaults plus one [`ConfiguredTool`] per configured entry. A configured
    /// `paragraph` replaces the built-in one.
    pub fn from_settings(tools: &BTreeMap<String, ToolSettings>) -> Self {
        let mut registry = Self::with_defaults();
        for (name, settings) in tools {
            registry.register(name.clone(), ConfiguredTool::new(settings.clone()));
        }
        registry
    }

    /// Register (or replace) a tool.
    pub fn register(&mut self, name: impl Into<String>, factory: impl ToolFactory + 'static) {
        self.tools.insert(name.into(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve `tool` and build a payload.
    pub fn compose(&self, tool: &str, data: Value, settings: Value) -> Result<ToolPayload> {
        let factory = self
            .tools
            .get(tool)
            .ok_or_else(|| StoreError::UnknownTool(tool.to_string()))?;
        factory
            .compose(data, settings)
            .map_err(|reason| StoreError::ToolRejected {
                tool: tool.to_string(),
                reason,
            })
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry").field("tools", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.compose("paragraph", Value::Null, Value::Null).unwrap_err();
        assert_eq!(err, StoreError::UnknownTool("paragraph".into()));
    }

    #[test]
    fn test_paragraph_default_data() {
        let registry = ToolRegistry::with_defaults();
        let payload = registry.compose("paragraph", Value::Null, Value::Null).unwrap();
        assert_eq!(payload.data, json!({"text": ""}));
        assert_eq!(payload.settings, Value::Null);
    }

    #[test]
    fn test_configured_settings_overlay() {
        let mut tools = BTreeMap::new();
        tools.insert(
            "header".to_string(),
            ToolSettings {
                config: json!({"levels": [1, 2, 3], "default_level": 2}),
                default_data: json!({"text": "", "level": 2}),
            },
        );
        let registry = ToolRegistry::from_settings(&tools);
        assert_eq!(registry.names(), vec!["header", "paragraph"]);

        let payload = registry
            .compose("header", json!({"text": "Title", "level": 1}), json!({"default_level": 1}))
            .unwrap();
        assert_eq!(payload.data, json!({"text": "Title", "level": 1}));
        assert_eq!(payload.settings, json!({"levels": [1, 2, 3], "default_level": 1}));
    }

    #[test]
    fn test_non_object_data_rejected() {
        let registry = ToolRegistry::with_defaults();
        let err = registry.compose("paragraph", json!("raw"), Value::Null).unwrap_err();
        assert!(matches!(err, StoreError::ToolRejected { ref tool, .. } if tool == "paragraph"));
    }

    #[test]
    fn test_closure_factory() {
        let mut registry = ToolRegistry::new();
        registry.register(
            "delimiter",
            |_data: Value, _settings: Value| -> std::result::Result<ToolPayload, String> {
                Ok(ToolPayload { data: json!({}), settings: Value::Null })
            },
        );
        let payload = registry.compose("delimiter", json!({"ignored": true}), Value::Null).unwrap();
        assert_eq!(payload.data, json!({}));
    }
}
