//! Blocks API: pass-through over the block manager plus document-level policy.
//!
//! Two policies live here rather than in the manager:
//!
//! - A document never has zero blocks. `delete` reseeds with one default
//!   block when it removes the last one.
//! - After `delete`, the caret goes to block 0 if that is the current block,
//!   otherwise to the block before the current one.

use std::sync::Arc;

use serde_json::Value;

use folio_types::{BlockData, BlockKey, OutputData, SavedBlock, ToolConfig};

use crate::block::BlockInfo;
use crate::block_manager::{SharedBlockManager, mutate};
use crate::caret::Caret;
use crate::error::{BlockError, Result};
use crate::paste::PasteProcessor;
use crate::renderer::Renderer;
use crate::tools::SurfaceHandle;

/// Version stamped into saved documents.
pub const EDITOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct BlocksApi {
    manager: SharedBlockManager,
    renderer: Arc<dyn Renderer>,
    paste: Arc<dyn PasteProcessor>,
    caret: Arc<dyn Caret>,
}

impl BlocksApi {
    pub fn new(
        manager: SharedBlockManager,
        renderer: Arc<dyn Renderer>,
        paste: Arc<dyn PasteProcessor>,
        caret: Arc<dyn Caret>,
    ) -> Self {
        Self {
            manager,
            renderer,
            paste,
            caret,
        }
    }

    /// Remove every block and seed one default block.
    pub fn clear(&self) -> Result<()> {
        mutate(&self.manager, |m| m.clear(true))
    }

    /// Replace the document with `data`.
    pub async fn render(&self, data: OutputData) -> Result<()> {
        mutate(&self.manager, |m| m.clear(false))?;
        self.renderer.render(data.blocks).await
    }

    /// Replace the document with blocks built from pasted markup.
    pub async fn render_from_html(&self, html: &str) -> Result<()> {
        mutate(&self.manager, |m| m.clear(false))?;
        self.paste.process_text(html.to_string(), true).await?;

        mutate(&self.manager, |m| -> Result<()> {
            if m.is_empty() {
                m.insert_default(true)?;
            }
            Ok(())
        })
    }

    /// Remove a block (the current one when `index` is `None`).
    pub fn delete(&self, index: Option<usize>) -> Result<()> {
        let current = mutate(&self.manager, |m| -> Result<Option<usize>> {
            m.remove_block(index)?;
            if m.is_empty() {
                m.insert_default(true)?;
            }
            Ok(m.current_index())
        })?;

        if current == Some(0) {
            self.caret.set_to_block(0);
        } else {
            self.caret.navigate_previous();
        }
        Ok(())
    }

    pub fn swap(&self, from: usize, to: usize) -> Result<()> {
        self.manager.lock().swap(from, to)
    }

    /// The surface of the block at `index`.
    pub fn get_block_by_index(&self, index: usize) -> Result<SurfaceHandle> {
        let manager = self.manager.lock();
        Ok(manager.get_block_by_index(index)?.surface().clone())
    }

    pub fn get_current_block_index(&self) -> Option<usize> {
        self.manager.lock().current_index()
    }

    pub fn get_blocks_count(&self) -> usize {
        self.manager.lock().len()
    }

    /// Set the stretched flag. A missing index is ignored.
    pub fn stretch_block(&self, index: usize, status: bool) {
        let mut manager = self.manager.lock();
        match manager.get_block_by_index_mut(index) {
            Ok(block) => block.set_stretched(status),
            Err(e) => tracing::debug!("stretch_block ignored: {}", e),
        }
    }

    /// Insert a block. `tool` defaults to the default tool.
    pub fn insert(
        &self,
        tool: Option<&str>,
        data: BlockData,
        config: ToolConfig,
        index: Option<usize>,
        focus: bool,
    ) -> Result<BlockKey> {
        mutate(&self.manager, |m| -> Result<BlockKey> {
            let tool = match tool {
                Some(t) => t.to_string(),
                None => m.default_tool().to_string(),
            };
            Ok(m.insert(&tool, data, config, index, focus)?.key())
        })
    }

    pub fn insert_adjacent_by_key(
        &self,
        tool: &str,
        data: BlockData,
        config: ToolConfig,
        key: Option<&BlockKey>,
        after: bool,
    ) -> Result<BlockKey> {
        mutate(&self.manager, |m| -> Result<BlockKey> {
            Ok(m.insert_adjacent_by_key(tool, data, config, key, after)?.key())
        })
    }

    /// Replace a block. Returns the replacement's key.
    pub fn replace_by_key(
        &self,
        key: &BlockKey,
        tool: &str,
        data: BlockData,
        config: ToolConfig,
    ) -> Result<BlockKey> {
        mutate(&self.manager, |m| -> Result<BlockKey> {
            Ok(m.replace_by_key(key, tool, data, config)?.key())
        })
    }

    /// Call a tool method on the block with `key`.
    pub fn call_method_by_key(
        &self,
        key: &BlockKey,
        method: &str,
        args: &[Value],
    ) -> Result<Value> {
        let (tool_name, tool) = {
            let manager = self.manager.lock();
            let block = manager.get_block_by_key(key)?;
            (block.tool_name().to_string(), block.tool().clone())
        };

        tool.call_method(method, args)
            .ok_or_else(|| BlockError::UnknownMethod {
                method: method.to_string(),
                tool: tool_name,
                key: *key,
            })
    }

    pub fn get_index_by_key(&self, key: &BlockKey) -> Result<usize> {
        self.manager.lock().get_index_by_key(key)
    }

    /// Register the current-block listener. Replaces any previous listener.
    ///
    /// The listener runs after the mutation that triggered it has released
    /// the manager, so it may call back into this API.
    pub fn on_current_block_change(
        &self,
        listener: impl Fn(&BlockInfo) + Send + Sync + 'static,
    ) {
        self.manager.lock().on_current_block_change(listener);
    }

    /// Save every block in document order.
    pub async fn save(&self) -> OutputData {
        let tools: Vec<_> = self
            .manager
            .lock()
            .blocks()
            .map(|b| (b.tool_name().to_string(), b.tool().clone()))
            .collect();

        let mut blocks = Vec::with_capacity(tools.len());
        for (name, tool) in tools {
            blocks.push(SavedBlock::new(name, tool.save().await));
        }
        OutputData::new(blocks).stamped(EDITOR_VERSION)
    }

    /// Insert a default block after the current one and focus it.
    #[deprecated(note = "use `insert` instead")]
    pub fn insert_new_block(&self) -> Result<BlockKey> {
        tracing::warn!("insert_new_block is deprecated, use insert instead");
        self.insert(None, BlockData::new(), ToolConfig::new(), None, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    use crate::block_manager::{BlockManager, shared_block_manager};
    use crate::paste::TextPaste;
    use crate::renderer::BlockRenderer;
    use crate::sanitizer::BasicSanitizer;
    use crate::tools::Tools;
    use folio_types::data_from_json;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingCaret {
        moves: Mutex<Vec<String>>,
    }

    impl Caret for RecordingCaret {
        fn set_to_block(&self, index: usize) {
            self.moves.lock().push(format!("set:{index}"));
        }

        fn navigate_previous(&self) {
            self.moves.lock().push("previous".to_string());
        }
    }

    fn api() -> (BlocksApi, Arc<RecordingCaret>) {
        let manager =
            shared_block_manager(BlockManager::new(Arc::new(Tools::with_builtin()), "paragraph"));
        let caret = Arc::new(RecordingCaret::default());
        let api = BlocksApi::new(
            manager.clone(),
            Arc::new(BlockRenderer::new(manager.clone())),
            Arc::new(TextPaste::new(manager, Arc::new(BasicSanitizer))),
            caret.clone(),
        );
        (api, caret)
    }

    fn text(s: &str) -> BlockData {
        data_from_json(json!({ "text": s }))
    }

    #[test]
    fn test_delete_only_block_reseeds() {
        let (api, caret) = api();
        api.insert(Some("header"), text("T"), ToolConfig::new(), None, true)
            .unwrap();

        api.delete(None).unwrap();

        assert_eq!(api.get_blocks_count(), 1);
        assert_eq!(api.get_current_block_index(), Some(0));
        assert_eq!(*caret.moves.lock(), vec!["set:0"]);
    }

    #[test]
    fn test_delete_navigates_previous() {
        let (api, caret) = api();
        for s in ["a", "b", "c"] {
            api.insert(None, text(s), ToolConfig::new(), None, true).unwrap();
        }

        api.delete(Some(2)).unwrap();

        assert_eq!(api.get_current_block_index(), Some(1));
        assert_eq!(*caret.moves.lock(), vec!["previous"]);
    }

    #[test]
    fn test_get_block_by_index_returns_surface() {
        let (api, _) = api();
        api.insert(None, text("a"), ToolConfig::new(), None, true).unwrap();
        assert!(api.get_block_by_index(0).is_ok());
        assert_eq!(
            api.get_block_by_index(1).unwrap_err(),
            BlockError::index_out_of_range(1, 1)
        );
    }

    #[test]
    fn test_stretch_block_missing_is_noop() {
        let (api, _) = api();
        api.stretch_block(7, true);
        assert_eq!(api.get_blocks_count(), 0);
    }

    #[test]
    fn test_call_method_by_key() {
        let (api, _) = api();
        let key = api.insert(None, text("hi"), ToolConfig::new(), None, true).unwrap();

        assert_eq!(api.call_method_by_key(&key, "getText", &[]).unwrap(), json!("hi"));
        let err = api.call_method_by_key(&key, "explode", &[]).unwrap_err();
        assert_eq!(
            err,
            BlockError::UnknownMethod {
                method: "explode".into(),
                tool: "paragraph".into(),
                key,
            }
        );
    }

    #[tokio::test]
    async fn test_save_in_document_order() {
        let (api, _) = api();
        api.insert(Some("header"), text("T"), ToolConfig::new(), None, true).unwrap();
        api.insert(None, text("body"), ToolConfig::new(), None, true).unwrap();

        let doc = api.save().await;

        assert_eq!(doc.version.as_deref(), Some(EDITOR_VERSION));
        let tools: Vec<_> = doc.blocks.iter().map(|b| b.tool_name.as_str()).collect();
        assert_eq!(tools, vec!["header", "paragraph"]);
        assert_eq!(doc.blocks[1].data.get("text"), Some(&json!("body")));
    }

    #[tokio::test]
    async fn test_render_replaces_document() {
        let (api, _) = api();
        api.insert(None, text("old"), ToolConfig::new(), None, true).unwrap();

        let doc: OutputData = serde_json::from_value(json!({
            "blocks": [{"toolName": "quote", "data": {"text": "q"}}]
        }))
        .unwrap();
        api.render(doc).await.unwrap();

        let saved = api.save().await;
        assert_eq!(saved.blocks.len(), 1);
        assert_eq!(saved.blocks[0].tool_name, "quote");
    }

    #[tokio::test]
    async fn test_render_from_html() {
        let (api, _) = api();
        api.insert(None, text("old"), ToolConfig::new(), None, true).unwrap();

        api.render_from_html("one\ntwo").await.unwrap();
        assert_eq!(api.get_blocks_count(), 2);

        api.render_from_html("").await.unwrap();
        assert_eq!(api.get_blocks_count(), 1);
    }

    #[test]
    fn test_listener_can_query_api() {
        let (api, _) = api();
        let seen: Arc<Mutex<Vec<(Option<usize>, usize)>>> = Arc::default();
        let (sink, inner) = (seen.clone(), api.clone());
        api.on_current_block_change(move |info| {
            let index = inner.get_index_by_key(&info.key).unwrap();
            sink.lock().push((inner.get_current_block_index(), index));
            assert_eq!(inner.get_blocks_count(), index + 1);
        });

        api.insert(None, text("a"), ToolConfig::new(), None, true).unwrap();
        api.insert(None, text("b"), ToolConfig::new(), None, true).unwrap();

        assert_eq!(*seen.lock(), vec![(Some(0), 0), (Some(1), 1)]);
    }

    #[test]
    #[allow(deprecated)]
    fn test_insert_new_block() {
        let (api, _) = api();
        let key = api.insert_new_block().unwrap();
        assert_eq!(api.get_index_by_key(&key).unwrap(), 0);
        assert_eq!(api.get_current_block_index(), Some(0));
    }
}
