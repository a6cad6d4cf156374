//! The block entity.

use std::fmt;
use std::sync::Arc;

use folio_types::{BlockData, BlockKey, SavedBlock, ToolConfig};

use crate::error::Result;
use crate::tools::{BlockTool, SurfaceHandle, ToolRegistry};

/// A single content unit owned by a tool.
///
/// Blocks are only built by the block manager, as part of an insert or
/// replace. The surface is created with the block and released by the
/// manager when the block leaves the collection.
pub struct Block {
    key: BlockKey,
    tool_name: String,
    data: BlockData,
    config: ToolConfig,
    tool: Arc<dyn BlockTool>,
    surface: SurfaceHandle,
    stretched: bool,
}

impl Block {
    /// Construct a block of `tool_name` with a fresh key.
    pub(crate) fn construct(
        registry: &dyn ToolRegistry,
        tool_name: &str,
        data: BlockData,
        config: ToolConfig,
    ) -> Result<Self> {
        let tool = registry.create_instance(tool_name, data.clone(), config.clone())?;
        let surface = tool.render_surface();
        Ok(Self {
            key: BlockKey::new(),
            tool_name: tool_name.to_string(),
            data,
            config,
            tool,
            surface,
            stretched: false,
        })
    }

    pub fn key(&self) -> BlockKey {
        self.key
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Payload the block was constructed with. Use [`Block::save`] for live content.
    pub fn data(&self) -> &BlockData {
        &self.data
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    pub fn tool(&self) -> &Arc<dyn BlockTool> {
        &self.tool
    }

    pub fn surface(&self) -> &SurfaceHandle {
        &self.surface
    }

    pub fn stretched(&self) -> bool {
        self.stretched
    }

    pub fn set_stretched(&mut self, stretched: bool) {
        self.stretched = stretched;
        self.surface.set_stretched(stretched);
    }

    /// Ask the tool for the current payload.
    pub async fn save(&self) -> SavedBlock {
        SavedBlock::new(self.tool_name.clone(), self.tool.save().await)
    }

    /// External view of the block.
    pub fn info(&self) -> BlockInfo {
        BlockInfo {
            key: self.key,
            surface: self.surface.clone(),
        }
    }

    /// Release the surface. Consumes the block so it cannot be released twice.
    pub(crate) fn destroy(self) {
        tracing::trace!("releasing surface of block {}", self.key.short());
        self.surface.release();
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("key", &self.key)
            .field("tool_name", &self.tool_name)
            .field("stretched", &self.stretched)
            .finish_non_exhaustive()
    }
}

/// What external callers see of a block: its key and its surface.
#[derive(Clone, Debug)]
pub struct BlockInfo {
    pub key: BlockKey,
    pub surface: SurfaceHandle,
}
