//! Editor assembly.

use std::sync::Arc;

use crate::api::BlocksApi;
use crate::block_manager::{BlockManager, SharedBlockManager, shared_block_manager};
use crate::caret::{Caret, NoopCaret};
use crate::config::EditorConfig;
use crate::conversion::Converter;
use crate::error::{BlockError, Result};
use crate::paste::TextPaste;
use crate::renderer::BlockRenderer;
use crate::sanitizer::{BasicSanitizer, Sanitizer};
use crate::tools::{ToolRegistry, Tools};

/// One document with its tools and collaborators.
pub struct Editor {
    config: EditorConfig,
    registry: Arc<dyn ToolRegistry>,
    manager: SharedBlockManager,
    blocks: BlocksApi,
    converter: Converter,
}

impl Editor {
    /// Build an editor with the default sanitizer and caret.
    ///
    /// `config` is applied to `tools` before they are shared. Fails with
    /// [`BlockError::UnknownTool`] if the default block tool is not a block tool.
    pub fn new(config: EditorConfig, tools: Tools) -> Result<Self> {
        Self::with_collaborators(config, tools, Arc::new(BasicSanitizer), Arc::new(NoopCaret))
    }

    pub fn with_collaborators(
        config: EditorConfig,
        mut tools: Tools,
        sanitizer: Arc<dyn Sanitizer>,
        caret: Arc<dyn Caret>,
    ) -> Result<Self> {
        tools.apply_config(&config);
        if !tools.is_block_tool(&config.default_block) {
            return Err(BlockError::UnknownTool(config.default_block.clone()));
        }
        let registry: Arc<dyn ToolRegistry> = Arc::new(tools);

        let manager = shared_block_manager(BlockManager::new(
            registry.clone(),
            config.default_block.clone(),
        ));
        let blocks = BlocksApi::new(
            manager.clone(),
            Arc::new(BlockRenderer::new(manager.clone())),
            Arc::new(TextPaste::new(manager.clone(), sanitizer.clone())),
            caret.clone(),
        );
        let converter = Converter::new(manager.clone(), registry.clone(), sanitizer, caret);

        tracing::info!(
            "editor ready: default block {:?}, {} tools",
            config.default_block,
            registry.tool_names().len()
        );
        Ok(Self {
            config,
            registry,
            manager,
            blocks,
            converter,
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<dyn ToolRegistry> {
        &self.registry
    }

    /// Shared block manager, for collaborators wired in from outside.
    pub fn manager(&self) -> &SharedBlockManager {
        &self.manager
    }

    pub fn blocks(&self) -> &BlocksApi {
        &self.blocks
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unknown_default_block() {
        let config = EditorConfig::default().with_default_block("image");
        let err = Editor::new(config, Tools::with_builtin()).err();
        assert_eq!(err, Some(BlockError::UnknownTool("image".into())));
    }

    #[test]
    fn test_config_reaches_tool_classes() {
        let config = EditorConfig::from_toml_str(
            r#"
            [tools.header.config]
            defaultLevel = 4
            "#,
        )
        .unwrap();
        let editor = Editor::new(config, Tools::with_builtin()).unwrap();
        let class = editor.registry().tool_class("header").unwrap();
        assert_eq!(class.config.get("defaultLevel"), Some(&serde_json::json!(4)));
    }
}
