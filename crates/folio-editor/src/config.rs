//! Editor configuration.
//!
//! Loaded from TOML:
//!
//! ```toml
//! default_block = "paragraph"
//!
//! [tools.header.config]
//! defaultLevel = 3
//!
//! [tools.paragraph.sanitize]
//! u = true
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use folio_types::ToolConfig;

use crate::error::{BlockError, Result};
use crate::tools::SanitizeRules;

const DEFAULT_BLOCK: &str = "paragraph";

fn default_block() -> String {
    DEFAULT_BLOCK.to_string()
}

/// Per-tool overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Merged over the tool's default config.
    #[serde(default)]
    pub config: ToolConfig,
    /// Merged over the tool's sanitize rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sanitize: Option<SanitizeRules>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Tool used for reseeding, paste, and `insert` without a tool name.
    #[serde(default = "default_block")]
    pub default_block: String,
    #[serde(default)]
    pub tools: HashMap<String, ToolSettings>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_block: default_block(),
            tools: HashMap::new(),
        }
    }
}

impl EditorConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| BlockError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| BlockError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("loaded editor config from {}", path.display());
        Ok(config)
    }

    pub fn with_default_block(mut self, tool: impl Into<String>) -> Self {
        self.default_block = tool.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::from_toml_str("").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.default_block, "paragraph");
    }

    #[test]
    fn test_parse_tool_settings() {
        let config = EditorConfig::from_toml_str(
            r#"
            default_block = "quote"

            [tools.header.config]
            defaultLevel = 3

            [tools.quote.sanitize]
            b = false
            "#,
        )
        .unwrap();

        assert_eq!(config.default_block, "quote");
        assert_eq!(config.tools["header"].config.get("defaultLevel"), Some(&json!(3)));
        assert!(config.tools["header"].sanitize.is_none());
        let rules = config.tools["quote"].sanitize.as_ref().unwrap();
        assert!(!rules.allows("b"));
    }

    #[test]
    fn test_parse_error() {
        let err = EditorConfig::from_toml_str("default_block = [").unwrap_err();
        assert!(matches!(err, BlockError::Config(_)));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_block = \"header\"").unwrap();

        let config = EditorConfig::load(file.path()).await.unwrap();
        assert_eq!(config.default_block, "header");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EditorConfig::load(dir.path().join("absent.toml")).await.unwrap_err();
        assert!(matches!(err, BlockError::Config(msg) if msg.contains("absent.toml")));
    }

    #[test]
    fn test_with_default_block() {
        let config = EditorConfig::default().with_default_block("header");
        assert_eq!(config.default_block, "header");
    }
}
