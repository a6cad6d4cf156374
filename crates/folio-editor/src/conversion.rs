//! Block conversion: export → sanitize → import → replace.
//!
//! [`Converter::convert`] turns a block into a block of another tool. The
//! source is resolved once at entry; the tool save and the sanitizer may
//! suspend, and the manager lock is never held across them. The final
//! [`BlockManager::replace_by_key`](crate::block_manager::BlockManager::replace_by_key)
//! resolves the key again, so a block removed in the meantime surfaces as
//! [`BlockError::KeyNotFound`] and nothing is mutated.
//!
//! The converter also carries the open/focused state of the conversion
//! toolbar. That state is UI affordance only and never touches the document.

use std::sync::Arc;

use parking_lot::Mutex;
use strum::{Display, EnumString};

use folio_types::{BlockKey, ToolConfig};

use crate::block::{Block, BlockInfo};
use crate::block_manager::{SharedBlockManager, mutate};
use crate::caret::Caret;
use crate::error::{BlockError, Result};
use crate::sanitizer::Sanitizer;
use crate::tools::ToolRegistry;

/// Direction for moving the toolbar focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum LeafDirection {
    Left,
    Right,
}

#[derive(Debug, Default)]
struct Affordance {
    opened: bool,
    focused: Option<usize>,
}

/// Converts blocks between tools.
pub struct Converter {
    manager: SharedBlockManager,
    registry: Arc<dyn ToolRegistry>,
    sanitizer: Arc<dyn Sanitizer>,
    caret: Arc<dyn Caret>,
    affordance: Mutex<Affordance>,
}

impl Converter {
    pub fn new(
        manager: SharedBlockManager,
        registry: Arc<dyn ToolRegistry>,
        sanitizer: Arc<dyn Sanitizer>,
        caret: Arc<dyn Caret>,
    ) -> Self {
        Self {
            manager,
            registry,
            sanitizer,
            caret,
            affordance: Mutex::new(Affordance::default()),
        }
    }

    // =========================================================================
    // Toolbar affordance
    // =========================================================================

    /// Tools offered as conversion targets, sorted by name.
    ///
    /// Block tools with a toolbox icon and a conversion config.
    pub fn candidates(&self) -> Vec<String> {
        self.registry
            .tool_names()
            .into_iter()
            .filter(|name| {
                self.registry.is_block_tool(name)
                    && self
                        .registry
                        .tool_class(name)
                        .is_some_and(|c| c.has_toolbox_icon() && c.is_convertible())
            })
            .collect()
    }

    pub fn is_opened(&self) -> bool {
        self.affordance.lock().opened
    }

    pub fn open(&self) {
        self.affordance.lock().opened = true;
    }

    /// Close the toolbar and drop the focused candidate.
    pub fn close(&self) {
        let mut state = self.affordance.lock();
        state.opened = false;
        state.focused = None;
    }

    /// Move the focus one candidate left or right, wrapping around.
    pub fn leaf(&self, direction: LeafDirection) -> Option<String> {
        let candidates = self.candidates();
        let n = candidates.len();
        if n == 0 {
            return None;
        }

        let mut state = self.affordance.lock();
        let next = match (state.focused.map(|i| i % n), direction) {
            (None, LeafDirection::Right) => 0,
            (None, LeafDirection::Left) => n - 1,
            (Some(i), LeafDirection::Right) => (i + 1) % n,
            (Some(i), LeafDirection::Left) => (i + n - 1) % n,
        };
        state.focused = Some(next);
        candidates.into_iter().nth(next)
    }

    pub fn focused_tool(&self) -> Option<String> {
        let focused = self.affordance.lock().focused?;
        self.candidates().into_iter().nth(focused)
    }

    pub fn drop_focused(&self) {
        self.affordance.lock().focused = None;
    }

    /// Sync the toolbar with the current block.
    ///
    /// Opens when there is a current block and closes otherwise. Returns the
    /// current block's tool when it is one of the candidates.
    pub fn handle_showing(&self) -> Option<String> {
        let current_tool = self
            .manager
            .lock()
            .current_block()
            .map(|b| b.tool_name().to_string());

        let Some(tool) = current_tool else {
            self.close();
            return None;
        };
        self.open();
        self.candidates().into_iter().find(|c| *c == tool)
    }

    // =========================================================================
    // Conversion
    // =========================================================================

    /// Convert the block with `source_key` into a `target_tool` block.
    pub async fn convert(&self, source_key: &BlockKey, target_tool: &str) -> Result<BlockInfo> {
        let (source_tool_name, source_tool) = {
            let manager = self.manager.lock();
            let block = manager.get_block_by_key(source_key)?;
            (block.tool_name().to_string(), block.tool().clone())
        };

        if !self.registry.is_block_tool(target_tool) {
            return Err(BlockError::UnknownTool(target_tool.to_string()));
        }
        let target = self
            .registry
            .tool_class(target_tool)
            .ok_or_else(|| BlockError::UnknownTool(target_tool.to_string()))?;
        let source_convertible = self
            .registry
            .tool_class(&source_tool_name)
            .is_some_and(|c| c.is_convertible());
        let conversion = match &target.conversion {
            Some(conv) if source_convertible => conv.clone(),
            _ => return Err(BlockError::conversion_unsupported(source_tool_name, target_tool)),
        };
        let rules = target.sanitize.clone();

        tracing::debug!(
            "converting {} block {} to {}",
            source_tool_name,
            source_key.short(),
            target_tool
        );

        let saved = source_tool.save().await;
        let exported = conversion.export(&saved);
        let cleaned = self.sanitizer.clean(exported, &rules).await;
        let payload = conversion.import(cleaned);

        mutate(&self.manager, |m| {
            m.replace_by_key(source_key, target_tool, payload, ToolConfig::new())
                .map(|block| block.info())
        })
        .inspect_err(|e| {
            tracing::debug!("conversion of {} abandoned: {}", source_key.short(), e);
        })
    }

    /// Convert the current block, close the toolbar, and put the caret in the new block.
    pub async fn replace_with_block(&self, target_tool: &str) -> Result<BlockInfo> {
        let key = {
            let manager = self.manager.lock();
            manager
                .current_block()
                .map(Block::key)
                .ok_or(BlockError::index_out_of_range(0, manager.len()))?
        };

        let info = self.convert(&key, target_tool).await?;
        self.close();

        let index = self.manager.lock().get_index_by_key(&info.key)?;
        self.caret.set_to_block(index);
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    use crate::block_manager::{BlockManager, shared_block_manager};
    use crate::caret::NoopCaret;
    use crate::sanitizer::BasicSanitizer;
    use crate::tools::Tools;
    use folio_types::data_from_json;
    use serde_json::json;

    fn setup() -> (SharedBlockManager, Converter) {
        let registry: Arc<dyn ToolRegistry> = Arc::new(Tools::with_builtin());
        let manager = shared_block_manager(BlockManager::new(registry.clone(), "paragraph"));
        let converter = Converter::new(
            manager.clone(),
            registry,
            Arc::new(BasicSanitizer),
            Arc::new(NoopCaret),
        );
        (manager, converter)
    }

    fn insert(manager: &SharedBlockManager, tool: &str, data: serde_json::Value) -> BlockKey {
        manager
            .lock()
            .insert(tool, data_from_json(data), ToolConfig::new(), None, true)
            .unwrap()
            .key()
    }

    async fn saved(manager: &SharedBlockManager, key: &BlockKey) -> folio_types::SavedBlock {
        let tool = manager.lock().get_block_by_key(key).unwrap().tool().clone();
        let name = manager.lock().get_block_by_key(key).unwrap().tool_name().to_string();
        folio_types::SavedBlock::new(name, tool.save().await)
    }

    #[test]
    fn test_leaf_direction_from_str() {
        assert_eq!(LeafDirection::from_str("left").unwrap(), LeafDirection::Left);
        assert_eq!(LeafDirection::Right.to_string(), "right");
    }

    #[test]
    fn test_candidates_need_icon_and_conversion() {
        let (_, converter) = setup();
        assert_eq!(converter.candidates(), vec!["header", "paragraph", "quote"]);
    }

    #[test]
    fn test_leaf_wraps_around() {
        let (_, converter) = setup();
        assert_eq!(converter.leaf(LeafDirection::Left).as_deref(), Some("quote"));
        assert_eq!(converter.leaf(LeafDirection::Right).as_deref(), Some("header"));
        assert_eq!(converter.leaf(LeafDirection::Right).as_deref(), Some("paragraph"));
        assert_eq!(converter.focused_tool().as_deref(), Some("paragraph"));

        converter.drop_focused();
        assert_eq!(converter.focused_tool(), None);
        assert_eq!(converter.leaf(LeafDirection::Right).as_deref(), Some("header"));
    }

    #[test]
    fn test_handle_showing() {
        let (manager, converter) = setup();
        assert_eq!(converter.handle_showing(), None);
        assert!(!converter.is_opened());

        insert(&manager, "header", json!({"text": "T"}));
        assert_eq!(converter.handle_showing().as_deref(), Some("header"));
        assert!(converter.is_opened());

        converter.leaf(LeafDirection::Right);
        converter.close();
        assert!(!converter.is_opened());
        assert_eq!(converter.focused_tool(), None);
    }

    #[tokio::test]
    async fn test_convert_paragraph_to_header() {
        let (manager, converter) = setup();
        let key = insert(&manager, "paragraph", json!({"text": "Hi <script>x</script>"}));

        let info = converter.convert(&key, "header").await.unwrap();

        assert_ne!(info.key, key);
        assert!(manager.lock().get_index_by_key(&key).is_err());
        let block = saved(&manager, &info.key).await;
        assert_eq!(block.tool_name, "header");
        assert_eq!(block.data.get("text"), Some(&json!("Hi x")));
        assert_eq!(block.data.get("level"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_convert_round_trip() {
        let (manager, converter) = setup();
        let key = insert(&manager, "quote", json!({"text": "q", "caption": "c"}));

        let header = converter.convert(&key, "header").await.unwrap();
        let back = converter.convert(&header.key, "quote").await.unwrap();

        let m = manager.lock();
        assert_eq!(m.len(), 1);
        assert_eq!(m.get_index_by_key(&back.key).unwrap(), 0);
        assert!(m.is_consistent());
    }

    #[tokio::test]
    async fn test_convert_to_same_tool_runs_pipeline() {
        let (manager, converter) = setup();
        let key = insert(&manager, "paragraph", json!({"text": "same"}));

        let info = converter.convert(&key, "paragraph").await.unwrap();

        assert_ne!(info.key, key);
        assert_eq!(saved(&manager, &info.key).await.data.get("text"), Some(&json!("same")));
    }

    #[tokio::test]
    async fn test_convert_empty_export() {
        let (manager, converter) = setup();
        let key = insert(&manager, "paragraph", json!({}));
        let info = converter.convert(&key, "quote").await.unwrap();
        assert_eq!(saved(&manager, &info.key).await.data.get("text"), Some(&json!("")));
    }

    #[tokio::test]
    async fn test_convert_unsupported() {
        let (manager, converter) = setup();
        let para = insert(&manager, "paragraph", json!({"text": "a"}));
        let delim = insert(&manager, "delimiter", json!({}));
        let before = manager.lock().keys();

        assert_eq!(
            converter.convert(&para, "delimiter").await.unwrap_err(),
            BlockError::conversion_unsupported("paragraph", "delimiter")
        );
        assert_eq!(
            converter.convert(&delim, "paragraph").await.unwrap_err(),
            BlockError::conversion_unsupported("delimiter", "paragraph")
        );
        assert_eq!(
            converter.convert(&para, "image").await.unwrap_err(),
            BlockError::UnknownTool("image".into())
        );
        assert_eq!(manager.lock().keys(), before);
    }

    #[tokio::test]
    async fn test_convert_missing_source() {
        let (_, converter) = setup();
        let ghost = BlockKey::new();
        assert_eq!(
            converter.convert(&ghost, "header").await.unwrap_err(),
            BlockError::KeyNotFound(ghost)
        );
    }

    #[tokio::test]
    async fn test_replace_with_block_uses_current() {
        let (manager, converter) = setup();
        insert(&manager, "paragraph", json!({"text": "a"}));
        insert(&manager, "paragraph", json!({"text": "b"}));
        converter.open();

        let info = converter.replace_with_block("header").await.unwrap();

        assert!(!converter.is_opened());
        let m = manager.lock();
        assert_eq!(m.get_index_by_key(&info.key).unwrap(), 1);
        assert_eq!(m.current_block().unwrap().tool_name(), "header");
    }

    #[tokio::test]
    async fn test_replace_with_block_on_empty() {
        let (_, converter) = setup();
        assert_eq!(
            converter.replace_with_block("header").await.unwrap_err(),
            BlockError::index_out_of_range(0, 0)
        );
    }
}
