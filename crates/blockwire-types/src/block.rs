//! Block and document snapshot types.
//!
//! A [`Block`] is the atomic unit of document content: a stable id, the name
//! of the tool that owns it, and two opaque JSON payloads (tool data and tool
//! settings). The editor never looks inside either payload.
//!
//! [`OutputData`] is the ordered-block document format used to seed a store
//! and to snapshot it back out. On the wire the tool name is called `type`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::BlockId;

/// A block in the store.
///
/// The id is fixed at construction; there is no setter. Tool name and
/// payloads change through replace/update mutations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    id: BlockId,
    /// Tool name, key into the tool registry.
    #[serde(rename = "type")]
    pub tool: String,
    /// Tool-specific data payload.
    pub data: Value,
    /// Tool-specific settings payload.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub settings: Value,
}

impl Block {
    pub fn new(id: BlockId, tool: impl Into<String>, data: Value, settings: Value) -> Self {
        Self {
            id,
            tool: tool.into(),
            data,
            settings,
        }
    }

    /// Stable identifier.
    pub fn id(&self) -> BlockId {
        self.id
    }
}

/// One entry of [`OutputData`]. The id is optional on input; blocks seeded
/// without one get a fresh id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BlockId>,
    #[serde(rename = "type")]
    pub tool: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub settings: Value,
}

impl From<&Block> for OutputBlock {
    fn from(block: &Block) -> Self {
        Self {
            id: Some(block.id()),
            tool: block.tool.clone(),
            data: block.data.clone(),
            settings: block.settings.clone(),
        }
    }
}

/// Ordered document: the `data` option on input, a store snapshot on output.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputData {
    /// Unix milliseconds when the snapshot was taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
    #[serde(default)]
    pub blocks: Vec<OutputBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl OutputData {
    /// Parse from JSON text.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Pretty JSON, for dumps.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Snapshot a sequence of blocks, stamped with the current time.
    pub fn from_blocks<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> Self {
        Self {
            time: Some(crate::now_millis()),
            blocks: blocks.into_iter().map(OutputBlock::from).collect(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_serializes_tool_as_type() {
        let block = Block::new(BlockId::new(), "paragraph", json!({"text": "hi"}), Value::Null);
        let v = serde_json::to_value(&block).unwrap();
        assert_eq!(v["type"], "paragraph");
        assert_eq!(v["data"]["text"], "hi");
        assert!(v.get("settings").is_none());
    }

    #[test]
    fn test_output_data_accepts_blocks_without_ids() {
        let data = OutputData::from_json(
            r#"{"time": 1, "blocks": [{"type": "header", "data": {"text": "T", "level": 2}}]}"#,
        )
        .unwrap();
        assert_eq!(data.blocks.len(), 1);
        assert_eq!(data.blocks[0].id, None);
        assert_eq!(data.blocks[0].tool, "header");
        assert_eq!(data.blocks[0].settings, Value::Null);
    }

    #[test]
    fn test_from_blocks_keeps_order_and_ids() {
        let a = Block::new(BlockId::new(), "paragraph", json!({"text": "a"}), Value::Null);
        let b = Block::new(BlockId::new(), "list", json!({"items": []}), json!({"style": "ordered"}));
        let out = OutputData::from_blocks([&a, &b]);
        assert!(out.time.is_some());
        assert_eq!(out.blocks[0].id, Some(a.id()));
        assert_eq!(out.blocks[1].id, Some(b.id()));
        assert_eq!(out.blocks[1].settings, json!({"style": "ordered"}));
    }

    #[test]
    fn test_empty_document() {
        let data = OutputData::from_json("{}").unwrap();
        assert!(data.is_empty());
    }
}
