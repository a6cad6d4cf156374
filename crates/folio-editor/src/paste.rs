//! Paste handling: pasted text becomes default-tool blocks.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use folio_types::{BlockData, ToolConfig};

use crate::block::Block;
use crate::block_manager::{SharedBlockManager, mutate};
use crate::error::Result;
use crate::sanitizer::Sanitizer;
use crate::tools::SanitizeRules;

/// Turns pasted markup into blocks.
#[async_trait]
pub trait PasteProcessor: Send + Sync {
    async fn process_text(&self, html: String, replace_current: bool) -> Result<()>;
}

/// One default-tool block per non-empty line.
///
/// Lines are sanitized with the default tool's rules and imported through its
/// conversion config, falling back to `{"text": line}`. Blocks go after the
/// current block. With `replace_current`, the first line replaces the current
/// block instead.
#[derive(Clone)]
pub struct TextPaste {
    manager: SharedBlockManager,
    sanitizer: Arc<dyn Sanitizer>,
}

impl TextPaste {
    pub fn new(manager: SharedBlockManager, sanitizer: Arc<dyn Sanitizer>) -> Self {
        Self { manager, sanitizer }
    }
}

fn split_lines(html: &str) -> Vec<String> {
    html.replace("<br>", "\n")
        .replace("<br/>", "\n")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

#[async_trait]
impl PasteProcessor for TextPaste {
    async fn process_text(&self, html: String, replace_current: bool) -> Result<()> {
        let lines = split_lines(&html);
        if lines.is_empty() {
            return Ok(());
        }

        let (tool, rules, conversion) = {
            let manager = self.manager.lock();
            let tool = manager.default_tool().to_string();
            let class = manager.registry().tool_class(&tool);
            let rules = class.map(|c| c.sanitize.clone()).unwrap_or_else(SanitizeRules::new);
            let conversion = class.and_then(|c| c.conversion.clone());
            (tool, rules, conversion)
        };

        let mut payloads = Vec::with_capacity(lines.len());
        for line in lines {
            let cleaned = self.sanitizer.clean(line, &rules).await;
            let data = match &conversion {
                Some(conv) => conv.import(cleaned),
                None => {
                    let mut data = BlockData::new();
                    data.insert("text".into(), Value::String(cleaned));
                    data
                }
            };
            payloads.push(data);
        }

        let count = mutate(&self.manager, |manager| -> Result<usize> {
            let mut payloads = payloads.into_iter();
            if replace_current {
                if let Some(key) = manager.current_block().map(Block::key) {
                    if let Some(first) = payloads.next() {
                        manager.replace_by_key(&key, &tool, first, ToolConfig::new())?;
                    }
                }
            }
            let mut count = 0usize;
            for data in payloads {
                manager.insert(&tool, data, ToolConfig::new(), None, true)?;
                count += 1;
            }
            Ok(count)
        })?;
        tracing::debug!("pasted {} {} blocks (replace_current={})", count, tool, replace_current);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_manager::{BlockManager, shared_block_manager};
    use crate::sanitizer::BasicSanitizer;
    use crate::tools::Tools;
    use serde_json::json;

    fn setup() -> (SharedBlockManager, TextPaste) {
        let manager =
            shared_block_manager(BlockManager::new(Arc::new(Tools::with_builtin()), "paragraph"));
        let paste = TextPaste::new(manager.clone(), Arc::new(BasicSanitizer));
        (manager, paste)
    }

    async fn texts(manager: &SharedBlockManager) -> Vec<String> {
        let tools: Vec<_> = manager.lock().blocks().map(|b| b.tool().clone()).collect();
        let mut out = Vec::new();
        for tool in tools {
            let data = tool.save().await;
            out.push(data.get("text").and_then(|v| v.as_str()).unwrap_or_default().to_string());
        }
        out
    }

    #[test]
    fn test_split_lines() {
        assert_eq!(split_lines("a\n\n  b <br>c"), vec!["a", "b", "c"]);
        assert!(split_lines("  \n").is_empty());
    }

    #[tokio::test]
    async fn test_paste_after_current() {
        let (manager, paste) = setup();
        manager.lock().insert_default(true).unwrap();

        paste.process_text("one\n<script>two</script>".into(), false).await.unwrap();

        assert_eq!(texts(&manager).await, vec!["", "one", "two"]);
        assert_eq!(manager.lock().current_index(), Some(2));
    }

    #[tokio::test]
    async fn test_paste_replacing_current() {
        let (manager, paste) = setup();
        let old = manager.lock().insert_default(true).unwrap().key();

        paste.process_text("<b>first</b>\nsecond".into(), true).await.unwrap();

        let m = manager.lock();
        assert_eq!(m.len(), 2);
        assert!(m.get_index_by_key(&old).is_err());
        drop(m);
        assert_eq!(texts(&manager).await, vec!["<b>first</b>", "second"]);
    }

    #[tokio::test]
    async fn test_paste_empty_is_noop() {
        let (manager, paste) = setup();
        paste.process_text("\n \n".into(), true).await.unwrap();
        assert!(manager.lock().is_empty());
    }

    #[tokio::test]
    async fn test_paste_without_conversion_uses_text_field() {
        let manager =
            shared_block_manager(BlockManager::new(Arc::new(Tools::with_builtin()), "delimiter"));
        let paste = TextPaste::new(manager.clone(), Arc::new(BasicSanitizer));
        paste.process_text("x".into(), false).await.unwrap();

        let tool = manager.lock().get_block_by_index(0).unwrap().tool().clone();
        assert_eq!(tool.save().await.get("text"), Some(&json!("x")));
    }
}
