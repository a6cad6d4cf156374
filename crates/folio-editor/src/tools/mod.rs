//! Tool contracts and the tool registry.
//!
//! A tool owns the content semantics of the blocks it creates. The editor
//! never looks inside a block's payload; it talks to tools through:
//!
//! - [`BlockTool`]: a live tool instance bound to one block (save, surface, methods)
//! - [`ToolFactory`]: constructs instances from data + config
//! - [`ToolClass`]: static declaration (inline?, toolbox, conversion, sanitize rules, defaults)
//! - [`ToolRegistry`]: the read view the block manager and converter consume
//!
//! Conversion declarations come in two shapes (a field name or a function)
//! and are normalized into callables by [`ConversionConfig`] at
//! registration time, so nothing downstream branches on the shape.

pub mod builtin;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use folio_types::{BlockData, ToolConfig};

use crate::config::EditorConfig;
use crate::error::{BlockError, Result};

// ============================================================================
// Surface
// ============================================================================

/// Rendered representation of a block.
///
/// Owned by exactly one block. The block manager calls [`Surface::release`]
/// once, when the block leaves the collection.
pub trait Surface: Send + Sync + fmt::Debug {
    /// Reflect the block's stretched display flag.
    fn set_stretched(&self, stretched: bool) {
        let _ = stretched;
    }

    /// Tear down the rendered representation.
    fn release(&self);
}

/// Shared handle to a block's surface, handed out to external callers.
pub type SurfaceHandle = Arc<dyn Surface>;

// ============================================================================
// Tool instances
// ============================================================================

/// A tool instance bound to a single block.
#[async_trait]
pub trait BlockTool: Send + Sync {
    /// Extract the block's current payload. May be deferred.
    async fn save(&self) -> BlockData;

    /// The surface for this block. Called once, at block construction.
    fn render_surface(&self) -> SurfaceHandle;

    /// Invoke a named tool method. `None` means the tool has no such method.
    fn call_method(&self, method: &str, args: &[serde_json::Value]) -> Option<serde_json::Value> {
        let _ = (method, args);
        None
    }
}

/// Constructs tool instances.
pub trait ToolFactory: Send + Sync {
    fn create(&self, data: BlockData, config: ToolConfig) -> Arc<dyn BlockTool>;
}

impl<F> ToolFactory for F
where
    F: Fn(BlockData, ToolConfig) -> Arc<dyn BlockTool> + Send + Sync,
{
    fn create(&self, data: BlockData, config: ToolConfig) -> Arc<dyn BlockTool> {
        self(data, config)
    }
}

// ============================================================================
// Conversion
// ============================================================================

/// Normalized export transform: payload → plain text.
pub type ExportFn = Arc<dyn Fn(&BlockData) -> String + Send + Sync>;

/// Normalized import transform: plain text → payload.
pub type ImportFn = Arc<dyn Fn(String) -> BlockData + Send + Sync>;

/// How a tool declares its export.
pub enum ExportRule {
    /// Use the named payload field verbatim.
    Field(String),
    /// Compute the text from the payload.
    Function(ExportFn),
}

impl ExportRule {
    pub fn function(f: impl Fn(&BlockData) -> String + Send + Sync + 'static) -> Self {
        Self::Function(Arc::new(f))
    }
}

impl From<&str> for ExportRule {
    fn from(field: &str) -> Self {
        Self::Field(field.to_string())
    }
}

/// How a tool declares its import.
pub enum ImportRule {
    /// Store the text under the named payload field.
    Field(String),
    /// Build the payload from the text.
    Function(ImportFn),
}

impl ImportRule {
    pub fn function(f: impl Fn(String) -> BlockData + Send + Sync + 'static) -> Self {
        Self::Function(Arc::new(f))
    }
}

impl From<&str> for ImportRule {
    fn from(field: &str) -> Self {
        Self::Field(field.to_string())
    }
}

/// A tool's conversion support: one export and one import callable.
#[derive(Clone)]
pub struct ConversionConfig {
    export: ExportFn,
    import: ImportFn,
}

impl ConversionConfig {
    pub fn new(export: impl Into<ExportRule>, import: impl Into<ImportRule>) -> Self {
        let export = match export.into() {
            ExportRule::Function(f) => f,
            ExportRule::Field(field) => {
                Arc::new(move |data: &BlockData| export_field(data, &field))
            }
        };
        let import = match import.into() {
            ImportRule::Function(f) => f,
            ImportRule::Field(field) => Arc::new(move |text: String| {
                let mut data = BlockData::new();
                data.insert(field.clone(), serde_json::Value::String(text));
                data
            }),
        };
        Self { export, import }
    }

    /// Export and import through the same payload field.
    pub fn field(name: &str) -> Self {
        Self::new(name, name)
    }

    pub fn export(&self, data: &BlockData) -> String {
        (self.export)(data)
    }

    pub fn import(&self, text: String) -> BlockData {
        (self.import)(text)
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig").finish_non_exhaustive()
    }
}

/// Strings verbatim, missing fields as "", anything else as JSON text.
fn export_field(data: &BlockData, field: &str) -> String {
    match data.get(field) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

// ============================================================================
// Tool Class
// ============================================================================

/// Allowed markup per tag name, applied by the sanitizer.
///
/// Tag names are case-insensitive and stored lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, bool>", into = "BTreeMap<String, bool>")]
pub struct SanitizeRules(BTreeMap<String, bool>);

impl From<BTreeMap<String, bool>> for SanitizeRules {
    fn from(map: BTreeMap<String, bool>) -> Self {
        Self(
            map.into_iter()
                .map(|(tag, allowed)| (tag.to_ascii_lowercase(), allowed))
                .collect(),
        )
    }
}

impl From<SanitizeRules> for BTreeMap<String, bool> {
    fn from(rules: SanitizeRules) -> Self {
        rules.0
    }
}

impl SanitizeRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow a tag.
    pub fn allow(mut self, tag: &str) -> Self {
        self.0.insert(tag.to_ascii_lowercase(), true);
        self
    }

    /// Check whether a tag survives sanitization.
    pub fn allows(&self, tag: &str) -> bool {
        self.0.get(&tag.to_ascii_lowercase()).copied().unwrap_or(false)
    }

    /// Overlay another rule set; its entries win.
    pub fn merge(&mut self, other: &SanitizeRules) {
        for (tag, allowed) in &other.0 {
            self.0.insert(tag.to_ascii_lowercase(), *allowed);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Toolbox entry for a tool: how it shows up in pickers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Toolbox {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Static declaration of a tool.
#[derive(Debug, Clone)]
pub struct ToolClass {
    /// Tool name (unique identifier).
    pub name: String,
    /// Inline tools format text inside blocks and never own a block.
    pub inline: bool,
    /// Toolbox entry, if the tool is offered to users.
    pub toolbox: Option<Toolbox>,
    /// Conversion support.
    pub conversion: Option<ConversionConfig>,
    /// Markup kept when text is converted into this tool.
    pub sanitize: SanitizeRules,
    /// Default settings passed to every instance.
    pub config: ToolConfig,
}

impl ToolClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inline: false,
            toolbox: None,
            conversion: None,
            sanitize: SanitizeRules::default(),
            config: ToolConfig::new(),
        }
    }

    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    pub fn with_toolbox(mut self, icon: impl Into<String>, title: impl Into<String>) -> Self {
        self.toolbox = Some(Toolbox {
            icon: Some(icon.into()),
            title: Some(title.into()),
        });
        self
    }

    pub fn with_conversion(mut self, conversion: ConversionConfig) -> Self {
        self.conversion = Some(conversion);
        self
    }

    pub fn with_sanitize(mut self, rules: SanitizeRules) -> Self {
        self.sanitize = rules;
        self
    }

    pub fn with_config(mut self, config: ToolConfig) -> Self {
        self.config = config;
        self
    }

    /// Whether the tool declares both an import and an export.
    pub fn is_convertible(&self) -> bool {
        self.conversion.is_some()
    }

    /// Whether the tool has a toolbox entry with an icon.
    pub fn has_toolbox_icon(&self) -> bool {
        self.toolbox.as_ref().is_some_and(|t| t.icon.is_some())
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Read view of the tools available to the editor.
pub trait ToolRegistry: Send + Sync {
    /// Registered, not inline, and constructible.
    fn is_block_tool(&self, name: &str) -> bool;

    /// Static declaration of a tool.
    fn tool_class(&self, name: &str) -> Option<&ToolClass>;

    /// Construct an instance. Fails with [`BlockError::UnknownTool`] for
    /// anything that is not a block tool.
    fn create_instance(
        &self,
        name: &str,
        data: BlockData,
        config: ToolConfig,
    ) -> Result<Arc<dyn BlockTool>>;

    /// Names of all registered tools.
    fn tool_names(&self) -> Vec<String>;
}

/// Registry of tool classes and their factories.
#[derive(Default)]
pub struct Tools {
    classes: HashMap<String, ToolClass>,
    factories: HashMap<String, Arc<dyn ToolFactory>>,
}

impl fmt::Debug for Tools {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tools")
            .field("classes", &self.classes.keys().collect::<Vec<_>>())
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Tools {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in tools.
    pub fn with_builtin() -> Self {
        let mut tools = Self::new();
        builtin::register_builtin(&mut tools);
        tools
    }

    /// Register a tool class with its factory.
    pub fn register(&mut self, class: ToolClass, factory: Arc<dyn ToolFactory>) {
        let name = class.name.clone();
        self.classes.insert(name.clone(), class);
        self.factories.insert(name, factory);
    }

    /// Register a class without a factory (inline tools, or declarations only).
    pub fn register_class(&mut self, class: ToolClass) {
        self.classes.insert(class.name.clone(), class);
    }

    /// Get a tool's class.
    pub fn get(&self, name: &str) -> Option<&ToolClass> {
        self.classes.get(name)
    }

    /// Overlay per-tool settings from the editor config onto registered classes.
    pub fn apply_config(&mut self, config: &EditorConfig) {
        for (name, settings) in &config.tools {
            let Some(class) = self.classes.get_mut(name) else {
                tracing::warn!("config names unregistered tool {:?}, ignoring", name);
                continue;
            };
            for (k, v) in &settings.config {
                class.config.insert(k.clone(), v.clone());
            }
            if let Some(rules) = &settings.sanitize {
                class.sanitize.merge(rules);
            }
        }
    }
}

impl ToolRegistry for Tools {
    fn is_block_tool(&self, name: &str) -> bool {
        self.classes.get(name).is_some_and(|c| !c.inline) && self.factories.contains_key(name)
    }

    fn tool_class(&self, name: &str) -> Option<&ToolClass> {
        self.classes.get(name)
    }

    fn create_instance(
        &self,
        name: &str,
        data: BlockData,
        config: ToolConfig,
    ) -> Result<Arc<dyn BlockTool>> {
        if !self.is_block_tool(name) {
            return Err(BlockError::UnknownTool(name.to_string()));
        }
        let (Some(class), Some(factory)) = (self.classes.get(name), self.factories.get(name)) else {
            return Err(BlockError::UnknownTool(name.to_string()));
        };

        let mut merged = class.config.clone();
        merged.extend(config);
        Ok(factory.create(data, merged))
    }

    fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.classes.keys().cloned().collect();
        names.sort();
        names
    }
}
