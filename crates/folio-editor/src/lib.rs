//! Block-based document model for folio.
//!
//! A document is an ordered collection of blocks. Each block is owned by a
//! tool that defines its payload and renders its surface; the editor never
//! looks inside a payload.
//!
//! # Layers
//!
//! - **Block manager**: the ordered collection, addressable by index and by
//!   key, with a current-block pointer.
//! - **Converter**: turns a block into a block of another tool through
//!   export → sanitize → import → replace.
//! - **Blocks API**: the outward surface, with the document-level policies
//!   (never zero blocks, caret after delete).
//!
//! # Concurrency
//!
//! Mutation is single-logical-threaded. The manager sits behind
//! [`SharedBlockManager`]; every structural change completes inside one lock
//! scope, and no lock is held across an `.await`. Work that suspends (tool
//! saves, sanitizing, rendering, paste) re-resolves blocks by key when it
//! resumes, and fails with [`BlockError::KeyNotFound`] if its block is gone.

pub mod api;
mod block;
pub mod block_manager;
pub mod caret;
pub mod config;
pub mod conversion;
pub mod editor;
mod error;
pub mod paste;
pub mod renderer;
pub mod sanitizer;
pub mod tools;

pub use api::BlocksApi;
pub use block::{Block, BlockInfo};
pub use block_manager::{
    BlockManager, CurrentBlockListener, PendingChanges, SharedBlockManager, mutate,
    shared_block_manager,
};
pub use caret::{Caret, NoopCaret};
pub use config::{EditorConfig, ToolSettings};
pub use conversion::{Converter, LeafDirection};
pub use editor::Editor;
pub use error::{BlockError, Result};
pub use paste::{PasteProcessor, TextPaste};
pub use renderer::{BlockRenderer, Renderer};
pub use sanitizer::{BasicSanitizer, Sanitizer};
pub use tools::{
    BlockTool, ConversionConfig, ExportRule, ImportRule, SanitizeRules, Surface, SurfaceHandle,
    ToolClass, ToolFactory, ToolRegistry, Toolbox, Tools,
};

pub use folio_types::{BlockData, BlockKey, OutputData, SavedBlock, ToolConfig};
