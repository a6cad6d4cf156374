//! Error types for block collection and conversion operations.

use thiserror::Error;

use folio_types::BlockKey;

/// Errors surfaced by the block manager, the converter, and the blocks API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockError {
    /// Tool is not registered, or is not a block-level tool.
    #[error("unknown block tool: {0}")]
    UnknownTool(String),

    /// Index does not address a block in the collection.
    #[error("block index {index} out of range for collection of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Key is not present in the collection (never inserted, or already removed).
    #[error("block not found: {0:?}")]
    KeyNotFound(BlockKey),

    /// One of the tools does not declare both import and export.
    #[error("cannot convert {from} to {to}: both tools must declare import and export")]
    ConversionUnsupported { from: String, to: String },

    /// Tool instance has no callable method with this name.
    #[error("can not get {method} of block {tool} {key}")]
    UnknownMethod {
        method: String,
        tool: String,
        key: BlockKey,
    },

    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl BlockError {
    pub fn index_out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }

    pub fn conversion_unsupported(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::ConversionUnsupported {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Result type for block operations.
pub type Result<T> = std::result::Result<T, BlockError>;
