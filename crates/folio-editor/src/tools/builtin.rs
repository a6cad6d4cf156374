//! Built-in block tools and a headless surface.
//!
//! | Tool        | Payload                 | Conversion                        |
//! |-------------|-------------------------|-----------------------------------|
//! | `paragraph` | `text`                  | field `text` both ways            |
//! | `header`    | `text`, `level`         | field `text`, level from `defaultLevel` |
//! | `quote`     | `text`, `caption`       | export `text`, import with empty caption |
//! | `delimiter` | (none)                  | not convertible                   |

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Value, json};

use folio_types::{BlockData, ToolConfig, data_from_json};

use super::{
    BlockTool, ConversionConfig, ExportRule, ImportRule, SanitizeRules, Surface, SurfaceHandle,
    ToolClass, Tools,
};

pub const PARAGRAPH: &str = "paragraph";
pub const HEADER: &str = "header";
pub const QUOTE: &str = "quote";
pub const DELIMITER: &str = "delimiter";

const DEFAULT_HEADER_LEVEL: u64 = 2;

/// Surface with no rendering backend. Records what happened to it.
#[derive(Debug, Default)]
pub struct MemorySurface {
    stretched: AtomicBool,
    releases: AtomicUsize,
}

impl MemorySurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_stretched(&self) -> bool {
        self.stretched.load(Ordering::SeqCst)
    }

    pub fn is_released(&self) -> bool {
        self.release_count() > 0
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl Surface for MemorySurface {
    fn set_stretched(&self, stretched: bool) {
        self.stretched.store(stretched, Ordering::SeqCst);
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Text-bearing tool instance shared by the built-in tools.
pub struct TextTool {
    data: RwLock<BlockData>,
    surface: Arc<MemorySurface>,
}

impl TextTool {
    /// Fill missing payload fields from `defaults`.
    pub fn new(mut data: BlockData, defaults: BlockData) -> Arc<Self> {
        for (k, v) in defaults {
            data.entry(k).or_insert(v);
        }
        Arc::new(Self {
            data: RwLock::new(data),
            surface: MemorySurface::new(),
        })
    }

    pub fn surface(&self) -> Arc<MemorySurface> {
        self.surface.clone()
    }

    fn text(&self) -> String {
        self.data
            .read()
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }
}

#[async_trait]
impl BlockTool for TextTool {
    async fn save(&self) -> BlockData {
        self.data.read().clone()
    }

    fn render_surface(&self) -> SurfaceHandle {
        self.surface.clone()
    }

    fn call_method(&self, method: &str, args: &[Value]) -> Option<Value> {
        match method {
            "getText" => Some(Value::String(self.text())),
            "setText" => {
                let text = args.first().and_then(|v| v.as_str()).unwrap_or_default();
                self.data
                    .write()
                    .insert("text".to_string(), Value::String(text.to_string()));
                Some(Value::Null)
            }
            "isEmpty" => Some(Value::Bool(self.text().trim().is_empty())),
            _ => None,
        }
    }
}

fn inline_markup() -> SanitizeRules {
    SanitizeRules::new().allow("b").allow("i").allow("a").allow("br")
}

fn header_level(config: &ToolConfig) -> u64 {
    config
        .get("defaultLevel")
        .and_then(|v| v.as_u64())
        .unwrap_or(DEFAULT_HEADER_LEVEL)
}

/// Register `paragraph`, `header`, `quote` and `delimiter`.
pub fn register_builtin(tools: &mut Tools) {
    tools.register(
        ToolClass::new(PARAGRAPH)
            .with_toolbox("¶", "Text")
            .with_conversion(ConversionConfig::field("text"))
            .with_sanitize(inline_markup()),
        Arc::new(|data: BlockData, _config: ToolConfig| -> Arc<dyn BlockTool> {
            TextTool::new(data, data_from_json(json!({"text": ""})))
        }),
    );

    let mut header_config = ToolConfig::new();
    header_config.insert("defaultLevel".into(), json!(DEFAULT_HEADER_LEVEL));
    tools.register(
        ToolClass::new(HEADER)
            .with_toolbox("H", "Heading")
            .with_conversion(ConversionConfig::field("text"))
            .with_config(header_config),
        Arc::new(|data: BlockData, config: ToolConfig| -> Arc<dyn BlockTool> {
            let level = header_level(&config);
            TextTool::new(data, data_from_json(json!({"text": "", "level": level})))
        }),
    );

    tools.register(
        ToolClass::new(QUOTE)
            .with_toolbox("“", "Quote")
            .with_conversion(ConversionConfig::new(
                ExportRule::function(|data| {
                    let text = data.get("text").and_then(|v| v.as_str()).unwrap_or_default();
                    match data.get("caption").and_then(|v| v.as_str()) {
                        Some(caption) if !caption.is_empty() => format!("{text}<br>{caption}"),
                        _ => text.to_string(),
                    }
                }),
                ImportRule::function(|text| data_from_json(json!({"text": text, "caption": ""}))),
            ))
            .with_sanitize(SanitizeRules::new().allow("b").allow("i").allow("br")),
        Arc::new(|data: BlockData, _config: ToolConfig| -> Arc<dyn BlockTool> {
            TextTool::new(data, data_from_json(json!({"text": "", "caption": ""})))
        }),
    );

    tools.register(
        ToolClass::new(DELIMITER).with_toolbox("***", "Delimiter"),
        Arc::new(|data: BlockData, _config: ToolConfig| -> Arc<dyn BlockTool> {
            TextTool::new(data, BlockData::new())
        }),
    );
}
