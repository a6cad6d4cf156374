//! Bulk reconstruction of a document from saved blocks.

use async_trait::async_trait;

use folio_types::{SavedBlock, ToolConfig};

use crate::block_manager::{SharedBlockManager, mutate};
use crate::error::{BlockError, Result};

/// Rebuilds blocks from their saved form.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, blocks: Vec<SavedBlock>) -> Result<()>;
}

/// Appends saved blocks to the shared manager.
///
/// Entries naming an unknown tool are skipped. A render that inserts nothing
/// seeds one default block.
#[derive(Debug, Clone)]
pub struct BlockRenderer {
    manager: SharedBlockManager,
}

impl BlockRenderer {
    pub fn new(manager: SharedBlockManager) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Renderer for BlockRenderer {
    async fn render(&self, blocks: Vec<SavedBlock>) -> Result<()> {
        let inserted = mutate(&self.manager, |manager| -> Result<usize> {
            let mut inserted = 0usize;
            for saved in blocks {
                let end = Some(manager.len());
                match manager.insert(&saved.tool_name, saved.data, ToolConfig::new(), end, false) {
                    Ok(_) => inserted += 1,
                    Err(BlockError::UnknownTool(name)) => {
                        tracing::warn!("skipping block of unknown tool {:?}", name);
                    }
                    Err(e) => return Err(e),
                }
            }
            if inserted == 0 {
                manager.insert_default(true)?;
            }
            Ok(inserted)
        })?;
        tracing::debug!("rendered {} blocks", inserted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::block_manager::{BlockManager, shared_block_manager};
    use crate::tools::Tools;
    use folio_types::data_from_json;
    use serde_json::json;

    fn shared() -> SharedBlockManager {
        shared_block_manager(BlockManager::new(Arc::new(Tools::with_builtin()), "paragraph"))
    }

    #[tokio::test]
    async fn test_render_appends_in_order() {
        let manager = shared();
        let renderer = BlockRenderer::new(manager.clone());
        renderer
            .render(vec![
                SavedBlock::new("header", data_from_json(json!({"text": "T", "level": 1}))),
                SavedBlock::new("paragraph", data_from_json(json!({"text": "body"}))),
            ])
            .await
            .unwrap();

        let m = manager.lock();
        let tools: Vec<&str> = m.blocks().map(|b| b.tool_name()).collect();
        assert_eq!(tools, vec!["header", "paragraph"]);
        assert_eq!(m.current_index(), Some(0));
    }

    #[tokio::test]
    async fn test_render_skips_unknown_tools() {
        let manager = shared();
        let renderer = BlockRenderer::new(manager.clone());
        renderer
            .render(vec![
                SavedBlock::new("image", Default::default()),
                SavedBlock::new("quote", data_from_json(json!({"text": "q"}))),
            ])
            .await
            .unwrap();

        let m = manager.lock();
        assert_eq!(m.len(), 1);
        assert_eq!(m.get_block_by_index(0).unwrap().tool_name(), "quote");
    }

    #[tokio::test]
    async fn test_render_nothing_seeds_default() {
        let manager = shared();
        BlockRenderer::new(manager.clone()).render(Vec::new()).await.unwrap();

        let m = manager.lock();
        assert_eq!(m.len(), 1);
        assert_eq!(m.current_block().unwrap().tool_name(), "paragraph");
    }
}
