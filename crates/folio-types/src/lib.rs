//! Shared identity and document types for folio.
//!
//! A pure leaf crate: block keys and the saved-document shape that the
//! editor crate and its callers exchange.
//!
//! | Type            | Purpose                                      |
//! |-----------------|----------------------------------------------|
//! | [`BlockKey`]    | Session-stable block identity                |
//! | [`BlockData`]   | Opaque tool payload                          |
//! | [`ToolConfig`]  | Tool settings passed at construction         |
//! | [`SavedBlock`]  | `{toolName, data}` entry of a saved document |
//! | [`OutputData`]  | Saved document (`{blocks: [...]}`)           |

pub mod data;
pub mod ids;

pub use data::{BlockData, OutputData, SavedBlock, ToolConfig, data_from_json};
pub use ids::BlockKey;

/// Current time as Unix milliseconds.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
