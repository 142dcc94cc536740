//! [`ContentState`] to HTML.

use folio_core::{
    BOLD, Block, BlockType, CODE, ContentState, Entity, EntityKey, EntityType, HIGHLIGHT, ITALIC,
    STRIKETHROUGH, StyleSet, UNDERLINE,
};
use serde_json::Value;

use crate::options::{RenderConfig, SerializeOptions, attribute_string, set_pair};

const BREAK: &str = "<br>";

/// Inline styles in nesting order, innermost first: `<em><strong>x</strong></em>`.
const DEFAULT_STYLES: [(&str, &str); 6] = [
    (BOLD, "strong"),
    (ITALIC, "em"),
    (UNDERLINE, "u"),
    (STRIKETHROUGH, "del"),
    (CODE, "code"),
    (HIGHLIGHT, "mark"),
];

/// Entity data keys and the attributes they become.
const LINK_ATTRIBUTES: &[(&str, &str)] = &[
    ("url", "href"),
    ("href", "href"),
    ("rel", "rel"),
    ("target", "target"),
    ("title", "title"),
    ("className", "class"),
    ("type", "type"),
];
const MEDIA_ATTRIBUTES: &[(&str, &str)] = &[
    ("src", "src"),
    ("width", "width"),
    ("height", "height"),
    ("alt", "alt"),
    ("className", "class"),
];

/// Serializes `content` with the default options.
pub fn serialize(content: &ContentState) -> String {
    serialize_with(content, &SerializeOptions::default())
}

pub fn serialize_with(content: &ContentState, options: &SerializeOptions) -> String {
    MarkupGenerator::new(content, options).generate()
}

/// Encodes a JSON value the way table attributes carry it.
pub fn encode_json_attribute(value: Option<&Value>) -> String {
    let json = value.map_or_else(|| "[]".to_string(), Value::to_string);
    urlencoding::encode(&json).into_owned()
}

struct MarkupGenerator<'a> {
    content: &'a ContentState,
    options: &'a SerializeOptions,
    blocks: Vec<&'a Block>,
    inline_styles: Vec<(String, RenderConfig)>,
    current: usize,
    wrapper: Option<&'static str>,
    output: String,
}

impl<'a> MarkupGenerator<'a> {
    fn new(content: &'a ContentState, options: &'a SerializeOptions) -> Self {
        Self {
            content,
            options,
            blocks: content.blocks().collect(),
            inline_styles: combine_inline_styles(&options.inline_styles),
            current: 0,
            wrapper: None,
            output: String::new(),
        }
    }

    fn generate(mut self) -> String {
        while self.current < self.blocks.len() {
            self.process_block();
        }
        self.close_wrapper();
        self.output.trim().to_string()
    }

    fn process_block(&mut self) {
        let block = self.blocks[self.current];
        let wrapper = wrapper_tag(block.block_type);
        if self.wrapper != wrapper {
            self.close_wrapper();
            if let Some(wrapper) = wrapper {
                self.open_wrapper(wrapper);
            }
        }

        let options = self.options;
        if let Some(renderer) = options.block_renderers.get(&block.block_type) {
            if let Some(markup) = renderer(block, self.content) {
                self.output.push_str(&markup);
                self.current += 1;
                return;
            }
        }

        let tag = self.block_tag(block.block_type);
        if let Some(tag) = tag {
            let attributes = self.block_attributes(block);
            self.output.push_str(&format!("<{tag}{attributes}>"));
        }
        let content = self.render_block_content(block);
        self.output.push_str(&content);

        // A deeper list item right after this one renders inside it.
        match self.blocks.get(self.current + 1).copied() {
            Some(next)
                if block.block_type.is_list_item()
                    && next.block_type.is_list_item()
                    && next.depth == block.depth + 1 =>
            {
                let outer = self.wrapper.take();
                self.current += 1;
                self.process_blocks_at_depth(next.depth);
                self.wrapper = outer;
            }
            _ => self.current += 1,
        }

        if let Some(tag) = tag {
            self.output.push_str(&format!("</{tag}>"));
        }
    }

    fn process_blocks_at_depth(&mut self, depth: usize) {
        while self
            .blocks
            .get(self.current)
            .is_some_and(|block| block.depth == depth)
        {
            self.process_block();
        }
        self.close_wrapper();
    }

    fn open_wrapper(&mut self, tag: &'static str) {
        self.wrapper = Some(tag);
        self.output.push_str(&format!("<{tag}>"));
    }

    fn close_wrapper(&mut self) {
        if let Some(tag) = self.wrapper.take() {
            self.output.push_str(&format!("</{tag}>"));
        }
    }

    fn block_tag(&self, block_type: BlockType) -> Option<&'a str> {
        let tag = match block_type {
            BlockType::HeaderOne => "h1",
            BlockType::HeaderTwo => "h2",
            BlockType::HeaderThree => "h3",
            BlockType::HeaderFour => "h4",
            BlockType::HeaderFive => "h5",
            BlockType::HeaderSix => "h6",
            BlockType::UnorderedListItem | BlockType::OrderedListItem => "li",
            BlockType::Blockquote => "blockquote",
            BlockType::CodeBlock => "code",
            BlockType::Atomic => "figure",
            BlockType::Table => "table",
            BlockType::LinkCard => "link-card",
            BlockType::Divider => "divider",
            BlockType::Unstyled => {
                let options: &'a SerializeOptions = self.options;
                let tag = options.default_block_tag.as_str();
                return (!tag.is_empty()).then_some(tag);
            }
        };
        Some(tag)
    }

    fn block_attributes(&self, block: &Block) -> String {
        let config = self
            .options
            .block_style_fn
            .as_ref()
            .and_then(|block_style| block_style(block));
        match config {
            Some(config) => config.attribute_string(),
            None if block.block_type.is_custom() => custom_block_config(block).attribute_string(),
            None => String::new(),
        }
    }

    fn render_block_content(&self, block: &Block) -> String {
        if block.block_type.is_custom() {
            return String::new();
        }
        if block.text.is_empty() {
            // Keeps the element from collapsing.
            return BREAK.to_string();
        }

        let text = preserve_whitespace(&block.text);
        let code_block = block.block_type == BlockType::CodeBlock;
        let mut output = String::new();
        for (start, end) in block.runs_by(0, block.len(), |meta| meta.entity) {
            let mut content = String::new();
            for (run_start, run_end) in block.runs_by(start, end, |meta| meta.style.clone()) {
                let piece: String = text
                    .get(run_start..run_end)
                    .map(|chars| chars.iter().collect())
                    .unwrap_or_default();
                let style = block.style_at(run_start);
                content.push_str(&self.render_styled(&piece, &style, code_block));
            }
            output.push_str(&self.render_entity(block.entity_at(start), content));
        }
        output
    }

    fn render_styled(&self, text: &str, style: &StyleSet, code_block: bool) -> String {
        let mut content = encode_content(text, code_block);
        for (name, config) in &self.inline_styles {
            if code_block && name == CODE {
                continue;
            }
            if style.contains(name) {
                content = wrap(config, &content);
            }
        }

        match self
            .options
            .inline_style_fn
            .as_ref()
            .and_then(|inline_style| inline_style(style))
        {
            Some(config) => wrap(&config, &content),
            None => content,
        }
    }

    fn render_entity(&self, key: Option<EntityKey>, content: String) -> String {
        let Some(key) = key else {
            return content;
        };
        let Some(entity) = self.content.entity(key) else {
            tracing::warn!(entity = %key, "block references a missing entity");
            return content;
        };

        if let Some(config) = self
            .options
            .entity_style_fn
            .as_ref()
            .and_then(|entity_style| entity_style(entity))
        {
            let element = config.element.as_deref().unwrap_or("span");
            let attributes = config.attribute_string();
            return match element {
                "img" => format!("<img{attributes}/>"),
                "video" => format!("<video{attributes}></video>"),
                _ => format!("<{element}{attributes}>{content}</{element}>"),
            };
        }

        match entity.entity_type {
            EntityType::Link => {
                let attributes = entity_attributes(entity, LINK_ATTRIBUTES);
                format!("<a{}>{content}</a>", attribute_string(&attributes))
            }
            EntityType::Image => {
                let attributes = entity_attributes(entity, MEDIA_ATTRIBUTES);
                format!("<img{}/>", attribute_string(&attributes))
            }
            EntityType::Video => {
                let attributes = entity_attributes(entity, MEDIA_ATTRIBUTES);
                format!("<video{}></video>", attribute_string(&attributes))
            }
        }
    }
}

fn wrapper_tag(block_type: BlockType) -> Option<&'static str> {
    match block_type {
        BlockType::UnorderedListItem => Some("ul"),
        BlockType::OrderedListItem => Some("ol"),
        BlockType::CodeBlock => Some("pre"),
        _ => None,
    }
}

/// Default inline styles with `custom` merged in. Entries for known styles
/// override their fields; new styles are appended to the order.
fn combine_inline_styles(custom: &[(String, RenderConfig)]) -> Vec<(String, RenderConfig)> {
    let mut styles: Vec<(String, RenderConfig)> = DEFAULT_STYLES
        .iter()
        .map(|(name, element)| (name.to_string(), RenderConfig::element(*element)))
        .collect();
    for (name, config) in custom {
        match styles.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, existing)) => {
                if config.element.is_some() {
                    existing.element = config.element.clone();
                }
                for (attribute, value) in &config.attributes {
                    set_pair(&mut existing.attributes, attribute.clone(), value.clone());
                }
                for (property, value) in &config.style {
                    set_pair(&mut existing.style, property.clone(), value.clone());
                }
            }
            None => styles.push((name.clone(), config.clone())),
        }
    }
    styles
}

fn wrap(config: &RenderConfig, content: &str) -> String {
    let element = config.element.as_deref().unwrap_or("span");
    format!(
        "<{element}{}>{content}</{element}>",
        config.attribute_string()
    )
}

/// Attributes written for table, link-card and divider blocks when no
/// block style callback supplies them.
fn custom_block_config(block: &Block) -> RenderConfig {
    let mut config = RenderConfig::new();
    match block.block_type {
        BlockType::Table => {
            config = config.with_attribute("type", BlockType::Table.as_str());
            if let Some(id) = block.data_str("id") {
                config = config.with_attribute("id", id);
            }
            config = config
                .with_attribute(
                    "dataSource",
                    encode_json_attribute(block.data.get("dataSource")),
                )
                .with_attribute("columns", encode_json_attribute(block.data.get("columns")));
        }
        BlockType::LinkCard => {
            for key in ["url", "title", "id"] {
                if let Some(value) = block.data_str(key) {
                    config = config.with_attribute(key, value);
                }
            }
        }
        BlockType::Divider => {
            config = config.with_attribute("type", BlockType::Divider.as_str());
        }
        _ => {}
    }
    config
}

/// Data values as attribute text; `null` is left out.
fn attribute_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn is_data_attribute(name: &str) -> bool {
    name.strip_prefix("data-").is_some_and(|rest| {
        !rest.is_empty()
            && rest
                .chars()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
    })
}

fn entity_attributes(entity: &Entity, names: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut attributes = Vec::new();
    for (key, attribute) in names {
        if let Some(value) = entity.data.get(*key).and_then(attribute_value) {
            set_pair(&mut attributes, attribute.to_string(), value);
        }
    }
    for (key, value) in &entity.data {
        if is_data_attribute(key) {
            if let Some(value) = attribute_value(value) {
                set_pair(&mut attributes, key.clone(), value);
            }
        }
    }
    attributes
}

/// Spaces at either edge or after another space become non-breaking so
/// they survive HTML whitespace collapsing.
fn preserve_whitespace(text: &str) -> Vec<char> {
    let chars: Vec<char> = text.chars().collect();
    let last = chars.len().saturating_sub(1);
    chars
        .iter()
        .enumerate()
        .map(|(ix, ch)| {
            let collapsible = ix == 0 || ix == last || chars[ix - 1] == ' ';
            if *ch == ' ' && collapsible { '\u{a0}' } else { *ch }
        })
        .collect()
}

fn encode_content(text: &str, code_block: bool) -> String {
    let encoded = html_escape::encode_text(text).replace('\u{a0}', "&nbsp;");
    if code_block {
        encoded
    } else {
        encoded.replace('\n', BREAK)
    }
}
