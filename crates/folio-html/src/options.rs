use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use folio_core::{Block, BlockType, ContentState, Entity, KeyGenerator, StyleSet};

use crate::css;

/// How parsed block configs become content blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// Containers are dissolved into a flat block list.
    #[default]
    Flat,
    /// Every block config is kept, linked by parent/children/sibling keys.
    Tree,
}

#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub mode: ParseMode,
    /// Key generator for the parsed document; random keys when unset.
    pub keys: Option<Arc<dyn KeyGenerator>>,
}

impl ParseOptions {
    pub fn tree() -> Self {
        Self {
            mode: ParseMode::Tree,
            ..Self::default()
        }
    }

    pub fn with_keys(mut self, keys: Arc<dyn KeyGenerator>) -> Self {
        self.keys = Some(keys);
        self
    }
}

/// Element, attributes and inline CSS returned by the serializer callbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderConfig {
    /// Element name; callers fall back to `span` when unset.
    pub element: Option<String>,
    pub attributes: Vec<(String, String)>,
    /// CSS declarations; camelCase names are written kebab-case.
    pub style: Vec<(String, String)>,
}

impl RenderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(name: impl Into<String>) -> Self {
        Self {
            element: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_pair(&mut self.attributes, name.into(), value.into());
        self
    }

    pub fn with_style(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_pair(&mut self.style, name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.element.is_none() && self.attributes.is_empty() && self.style.is_empty()
    }

    /// ` name="value"` pairs with normalized names and the style folded in.
    pub fn attribute_string(&self) -> String {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for (name, value) in &self.attributes {
            set_pair(
                &mut pairs,
                css::normalize_attribute_name(name).to_string(),
                value.clone(),
            );
        }
        if !self.style.is_empty() {
            set_pair(&mut pairs, "style".to_string(), css::style_to_css(&self.style));
        }
        attribute_string(&pairs)
    }
}

/// Sets `name` in place when present, appends otherwise.
pub(crate) fn set_pair(pairs: &mut Vec<(String, String)>, name: String, value: String) {
    match pairs.iter_mut().find(|(existing, _)| *existing == name) {
        Some(pair) => pair.1 = value,
        None => pairs.push((name, value)),
    }
}

pub(crate) fn attribute_string(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(name, value)| {
            format!(
                " {name}=\"{}\"",
                html_escape::encode_double_quoted_attribute(value)
            )
        })
        .collect()
}

/// Wraps a styled text fragment when it recognizes composite styles.
pub type InlineStyleFn = Arc<dyn Fn(&StyleSet) -> Option<RenderConfig> + Send + Sync>;
/// Takes over rendering of an entity's element.
pub type EntityStyleFn = Arc<dyn Fn(&Entity) -> Option<RenderConfig> + Send + Sync>;
/// Attributes and style for a block's start tag.
pub type BlockStyleFn = Arc<dyn Fn(&Block) -> Option<RenderConfig> + Send + Sync>;
/// Full markup for a block; `None` falls through to the default rendering.
pub type BlockRenderer = Arc<dyn Fn(&Block, &ContentState) -> Option<String> + Send + Sync>;

/// Serializer configuration. Every callback is optional; without one the
/// built-in rendering is used.
#[derive(Clone)]
pub struct SerializeOptions {
    /// Tag for `unstyled` blocks. An empty string writes their content bare.
    pub default_block_tag: String,
    /// Extra inline styles, merged with the defaults. New names are applied
    /// after the built-in ones, in the order given.
    pub inline_styles: Vec<(String, RenderConfig)>,
    pub inline_style_fn: Option<InlineStyleFn>,
    pub entity_style_fn: Option<EntityStyleFn>,
    pub block_style_fn: Option<BlockStyleFn>,
    pub block_renderers: HashMap<BlockType, BlockRenderer>,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            default_block_tag: "p".to_string(),
            inline_styles: Vec::new(),
            inline_style_fn: None,
            entity_style_fn: None,
            block_style_fn: None,
            block_renderers: HashMap::new(),
        }
    }
}

impl fmt::Debug for SerializeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializeOptions")
            .field("default_block_tag", &self.default_block_tag)
            .field("inline_styles", &self.inline_styles)
            .field("inline_style_fn", &self.inline_style_fn.is_some())
            .field("entity_style_fn", &self.entity_style_fn.is_some())
            .field("block_style_fn", &self.block_style_fn.is_some())
            .field("block_renderers", &self.block_renderers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_block_tag(mut self, tag: impl Into<String>) -> Self {
        self.default_block_tag = tag.into();
        self
    }

    pub fn with_inline_style(mut self, name: impl Into<String>, config: RenderConfig) -> Self {
        self.inline_styles.push((name.into(), config));
        self
    }

    pub fn with_inline_style_fn(
        mut self,
        f: impl Fn(&StyleSet) -> Option<RenderConfig> + Send + Sync + 'static,
    ) -> Self {
        self.inline_style_fn = Some(Arc::new(f));
        self
    }

    pub fn with_entity_style_fn(
        mut self,
        f: impl Fn(&Entity) -> Option<RenderConfig> + Send + Sync + 'static,
    ) -> Self {
        self.entity_style_fn = Some(Arc::new(f));
        self
    }

    pub fn with_block_style_fn(
        mut self,
        f: impl Fn(&Block) -> Option<RenderConfig> + Send + Sync + 'static,
    ) -> Self {
        self.block_style_fn = Some(Arc::new(f));
        self
    }

    pub fn with_block_renderer(
        mut self,
        block_type: BlockType,
        f: impl Fn(&Block, &ContentState) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.block_renderers.insert(block_type, Arc::new(f));
        self
    }
}
