//! Block payloads and the saved document shape.
//!
//! The persisted form of a document is deliberately minimal:
//!
//! ```json
//! { "blocks": [ { "toolName": "paragraph", "data": { "text": "hi" } } ] }
//! ```
//!
//! Block order is document order. Keys are not persisted.

use serde::{Deserialize, Serialize};

/// Tool-defined block payload. Meaning is up to the tool that owns the block.
pub type BlockData = serde_json::Map<String, serde_json::Value>;

/// Tool settings passed to a tool instance at construction.
pub type ToolConfig = serde_json::Map<String, serde_json::Value>;

/// One block as it appears in a saved document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedBlock {
    /// Name of the tool that owns the payload.
    pub tool_name: String,
    /// Tool payload returned by the tool's `save`.
    #[serde(default)]
    pub data: BlockData,
}

impl SavedBlock {
    pub fn new(tool_name: impl Into<String>, data: BlockData) -> Self {
        Self {
            tool_name: tool_name.into(),
            data,
        }
    }
}

/// A saved document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputData {
    /// Blocks in document order.
    #[serde(default)]
    pub blocks: Vec<SavedBlock>,
    /// Save time as Unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
    /// Version of the editor that produced the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl OutputData {
    pub fn new(blocks: Vec<SavedBlock>) -> Self {
        Self {
            blocks,
            time: None,
            version: None,
        }
    }

    /// Stamp the document with the current time and a version string.
    pub fn stamped(mut self, version: impl Into<String>) -> Self {
        self.time = Some(crate::now_millis());
        self.version = Some(version.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Build a [`BlockData`] from a JSON object literal. Non-objects yield an empty payload.
pub fn data_from_json(value: serde_json::Value) -> BlockData {
    match value {
        serde_json::Value::Object(map) => map,
        _ => BlockData::new(),
    }
}
