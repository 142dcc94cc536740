//! HTML to [`ContentState`].
//!
//! The DOM is walked once into a tree of block configs; the configs are then
//! projected either into a flat block list or into blocks linked by
//! parent/child/sibling keys (see [`ParseMode`]).

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::mem;
use std::sync::Arc;

use folio_core::{
    BOLD, Block, BlockData, BlockKey, BlockType, CODE, COLOR_PREFIX, CharacterMetadata,
    ContentState, EntityData, EntityKey, EntityMap, EntityType, FONT_SIZE_PREFIX, HIGHLIGHT,
    ITALIC, KeyGenerator, Mutability, RandomKeys, STRIKETHROUGH, StyleSet, TableColumn, TableData,
    TableRow, UNDERLINE,
};
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{Attribute, ParseOpts, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use serde_json::Value;

use crate::css;
use crate::options::{ParseMode, ParseOptions};

const SKIPPED_TAGS: &[&str] = &["head", "noscript", "script", "style", "template", "title"];

const BOLD_WEIGHTS: &[&str] = &["bold", "bolder", "500", "600", "700", "800", "900"];
const NOT_BOLD_WEIGHTS: &[&str] = &["light", "lighter", "normal", "100", "200", "300", "400"];

/// Class written on list items by other editors, e.g. `...depth2`.
const DEPTH_CLASS_PREFIX: &str = "public/DraftStyleDefault/depth";
const MAX_CLASS_DEPTH: usize = 4;

/// Elements nested deeper than this contribute their text only.
const MAX_NESTING: usize = 128;

/// Parses `html` into a flat document with random block keys.
pub fn parse(html: &str) -> ContentState {
    parse_with(html, &ParseOptions::default())
}

/// Parses `html`. Never fails: unknown markup is treated as transparent and
/// input without any content yields a single empty paragraph.
pub fn parse_with(html: &str, options: &ParseOptions) -> ContentState {
    let keys = options
        .keys
        .clone()
        .unwrap_or_else(|| Arc::new(RandomKeys::new()));

    let html = html.trim().replace('\r', "");
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            scripting_enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };
    let dom = parse_document(RcDom::default(), opts).one(html);

    let mut builder = Builder::new(keys.clone());
    let mut configs = builder.walk(&[dom.document.clone()], &StyleSet::new());
    builder.flush_pending(&mut configs);

    let mut blocks = Vec::new();
    match options.mode {
        ParseMode::Flat => flatten(configs, None, &mut blocks),
        ParseMode::Tree => link_tree(configs, None, &mut blocks),
    }
    tracing::trace!(blocks = blocks.len(), entities = builder.entities.len(), "parsed html");

    ContentState::from_blocks_with_keys(blocks, builder.entities, keys)
}

/// A block under construction, with the blocks nested inside its element.
#[derive(Debug)]
struct BlockConfig {
    key: BlockKey,
    block_type: BlockType,
    /// Type given by the element itself; differs from `block_type` when
    /// media turned the block atomic.
    tag_type: BlockType,
    text: String,
    characters: Vec<CharacterMetadata>,
    data: BlockData,
    depth: usize,
    children: Vec<BlockConfig>,
}

impl BlockConfig {
    fn into_block(self) -> Block {
        let block_type = if self.block_type == BlockType::Atomic && !holds_single_entity(&self) {
            BlockType::Unstyled
        } else {
            self.block_type
        };
        Block::new(self.key, block_type, "")
            .with_text(self.text)
            .with_characters(self.characters)
            .with_data(self.data)
            .with_depth(self.depth)
    }
}

fn holds_single_entity(config: &BlockConfig) -> bool {
    matches!(config.characters.as_slice(), [meta] if meta.entity.is_some())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wrapper {
    Unordered,
    Ordered,
    Pre,
}

impl Wrapper {
    fn is_list(self) -> bool {
        matches!(self, Wrapper::Unordered | Wrapper::Ordered)
    }
}

struct Builder {
    text: String,
    characters: Vec<CharacterMetadata>,
    /// Set once media was appended to the pending text.
    atomic: bool,
    depth: usize,
    /// Elements open on the walk.
    nesting: usize,
    entity: Option<EntityKey>,
    wrapper: Option<Wrapper>,
    entities: EntityMap,
    keys: Arc<dyn KeyGenerator>,
}

impl Builder {
    fn new(keys: Arc<dyn KeyGenerator>) -> Self {
        Self {
            text: String::new(),
            characters: Vec::new(),
            atomic: false,
            depth: 0,
            nesting: 0,
            entity: None,
            wrapper: None,
            entities: EntityMap::new(),
            keys,
        }
    }

    fn walk(&mut self, nodes: &[Handle], style: &StyleSet) -> Vec<BlockConfig> {
        let mut configs = Vec::new();
        for node in nodes {
            match &node.data {
                NodeData::Document => {
                    let children = self.walk(&node.children.borrow(), style);
                    configs.extend(children);
                }
                NodeData::Text { contents } => {
                    self.add_text(&contents.borrow(), style, &mut configs);
                }
                NodeData::Element { .. } if self.nesting >= MAX_NESTING => {
                    self.add_flattened(node, style, &mut configs);
                }
                NodeData::Element { name, attrs, .. } => {
                    let tag = name.local.as_ref();
                    self.nesting += 1;
                    self.add_element(node, tag, &attrs.borrow(), style, &mut configs);
                    self.nesting -= 1;
                }
                _ => {}
            }
        }
        configs
    }

    /// Appends the text of a too-deeply nested subtree with the inherited
    /// style, walking it without recursion.
    fn add_flattened(&mut self, node: &Handle, style: &StyleSet, configs: &mut Vec<BlockConfig>) {
        tracing::debug!(limit = MAX_NESTING, "flattening deeply nested markup");
        let mut stack = vec![node.clone()];
        while let Some(node) = stack.pop() {
            match &node.data {
                NodeData::Text { contents } => self.add_text(&contents.borrow(), style, configs),
                NodeData::Element { name, .. } if SKIPPED_TAGS.contains(&name.local.as_ref()) => {}
                _ => stack.extend(node.children.borrow().iter().rev().cloned()),
            }
        }
    }

    fn add_element(
        &mut self,
        node: &Handle,
        tag: &str,
        attrs: &[Attribute],
        style: &StyleSet,
        configs: &mut Vec<BlockConfig>,
    ) {
        if SKIPPED_TAGS.contains(&tag) {
            tracing::debug!(tag, "skipping subtree");
            return;
        }

        match tag {
            "html" | "body" => {
                self.flush_pending(configs);
                let children = self.walk(&node.children.borrow(), style);
                configs.extend(children);
                return;
            }
            "ul" | "ol" => {
                self.add_list(node, tag, style, configs);
                return;
            }
            "br" => {
                if self.atomic {
                    self.flush_pending(configs);
                }
                self.append("\n", style);
                return;
            }
            _ => {}
        }

        if let Some(tag_type) = block_tag_type(tag, self.wrapper) {
            self.add_block(node, tag, tag_type, attrs, style, configs);
            return;
        }

        match tag {
            "img" | "video" => {
                if attr(attrs, "src").is_some_and(|src| !src.is_empty()) {
                    let kind = if tag == "img" {
                        EntityType::Image
                    } else {
                        EntityType::Video
                    };
                    self.add_media(kind, attrs, style, configs);
                    return;
                }
            }
            "a" => {
                if let Some(href) = attr(attrs, "href").filter(|href| !href.is_empty()) {
                    self.add_anchor(node, href, attrs, style, configs);
                    return;
                }
            }
            _ => {}
        }

        let style = inline_style(tag, attrs, style);
        let children = self.walk(&node.children.borrow(), &style);
        configs.extend(children);
    }

    fn add_list(
        &mut self,
        node: &Handle,
        tag: &str,
        style: &StyleSet,
        configs: &mut Vec<BlockConfig>,
    ) {
        self.flush_pending(configs);

        let (depth, wrapper) = (self.depth, self.wrapper);
        if wrapper.is_some_and(Wrapper::is_list) {
            self.depth += 1;
        }
        self.wrapper = Some(if tag == "ol" {
            Wrapper::Ordered
        } else {
            Wrapper::Unordered
        });
        let children = self.walk(&node.children.borrow(), style);
        configs.extend(children);

        self.depth = depth;
        self.wrapper = wrapper;
    }

    fn add_block(
        &mut self,
        node: &Handle,
        tag: &str,
        tag_type: BlockType,
        attrs: &[Attribute],
        style: &StyleSet,
        configs: &mut Vec<BlockConfig>,
    ) {
        self.flush_pending(configs);

        let (depth, wrapper) = (self.depth, self.wrapper);
        if tag == "pre" {
            self.wrapper = Some(Wrapper::Pre);
        }
        let block_type = attr(attrs, "type")
            .and_then(|value| value.parse::<BlockType>().ok())
            .unwrap_or(tag_type);
        if block_type.is_list_item() {
            self.depth = list_item_depth(attrs).unwrap_or(self.depth);
        }

        let key = self.keys.next_key();
        if block_type.is_custom() {
            let data = self.custom_block_data(node, block_type, attrs);
            configs.push(BlockConfig {
                key,
                block_type,
                tag_type: block_type,
                text: String::new(),
                characters: Vec::new(),
                data,
                depth: self.depth,
                children: Vec::new(),
            });
        } else {
            let children = self.walk(&node.children.borrow(), style);
            self.trim_pending();
            let mut data = BlockData::new();
            if let Some(align) = attr(attrs, "style")
                .as_deref()
                .and_then(|style| css::style_property(style, "text-align"))
            {
                data.insert("textAlign".to_string(), Value::from(align));
            }
            let mut config = self.take_pending(key, block_type, data);
            config.children = children;
            configs.push(config);
        }

        self.depth = depth;
        self.wrapper = wrapper;
    }

    fn custom_block_data(
        &self,
        node: &Handle,
        block_type: BlockType,
        attrs: &[Attribute],
    ) -> BlockData {
        let mut data = BlockData::new();
        match block_type {
            BlockType::Table => match attr(attrs, "datasource") {
                Some(source) => {
                    data.insert("dataSource".to_string(), decode_json_attribute(&source));
                    let columns = attr(attrs, "columns")
                        .map(|columns| decode_json_attribute(&columns))
                        .unwrap_or_else(|| Value::Array(Vec::new()));
                    data.insert("columns".to_string(), columns);
                }
                None => self.table_from_cells(node).write_into(&mut data),
            },
            BlockType::LinkCard => {
                copy_attributes(attrs, &[("url", "url"), ("title", "title")], &mut data);
            }
            BlockType::Divider => {
                data.insert("type".to_string(), Value::from(BlockType::Divider.as_str()));
            }
            _ => {}
        }
        copy_attributes(attrs, &[("id", "id")], &mut data);
        data
    }

    /// Reads a plain `<table>` without a `dataSource` attribute from its cells.
    /// A leading row made only of `th` cells supplies the column titles.
    fn table_from_cells(&self, node: &Handle) -> TableData {
        let mut rows = Vec::new();
        collect_rows(node, &mut rows);

        let header = rows
            .first()
            .is_some_and(|row| !row.is_empty() && row.iter().all(|(is_header, _)| *is_header));
        let titles = if header { rows.remove(0) } else { Vec::new() };
        let column_count = rows
            .iter()
            .map(Vec::len)
            .chain([titles.len()])
            .max()
            .unwrap_or(0);

        let columns: Vec<TableColumn> = (0..column_count)
            .map(|ix| {
                let mut column = TableColumn::new(self.keys.next_key().as_str());
                if let Some((_, title)) = titles.get(ix) {
                    column.title = title.clone();
                }
                column
            })
            .collect();
        let data_source = rows
            .into_iter()
            .map(|cells| TableRow {
                id: self.keys.next_key().as_str().to_string(),
                cells: columns
                    .iter()
                    .enumerate()
                    .map(|(ix, column)| {
                        let text = cells.get(ix).map(|(_, text)| text.as_str()).unwrap_or("");
                        (column.data_index.clone(), Value::from(text))
                    })
                    .collect(),
            })
            .collect();

        TableData {
            columns,
            data_source,
        }
    }

    fn add_text(&mut self, raw: &str, style: &StyleSet, configs: &mut Vec<BlockConfig>) {
        let raw: String = raw
            .chars()
            .filter(|ch| !matches!(ch, '\r' | '\u{200b}'))
            .collect();
        if raw.is_empty() {
            return;
        }
        // Non-breaking spaces were written on purpose and are not collapsed.
        let collapsible = raw.chars().all(|ch| ch.is_whitespace() && ch != '\u{a0}');
        let mut text = raw.replace('\u{a0}', " ");

        if self.wrapper != Some(Wrapper::Pre) {
            if collapsible {
                text = " ".to_string();
            } else {
                // A line feed right after a tag is invisible in HTML.
                let text_without_lead = text.strip_prefix('\n').unwrap_or(&text);
                text = text_without_lead.replace('\n', " ");
            }
        }

        if self.atomic {
            self.flush_pending(configs);
        }
        self.append(&text, style);
    }

    fn add_media(
        &mut self,
        kind: EntityType,
        attrs: &[Attribute],
        style: &StyleSet,
        configs: &mut Vec<BlockConfig>,
    ) {
        self.flush_pending(configs);

        let mut data = EntityData::new();
        copy_attributes(
            attrs,
            &[
                ("src", "src"),
                ("alt", "alt"),
                ("width", "width"),
                ("height", "height"),
                ("class", "className"),
            ],
            &mut data,
        );
        if kind == EntityType::Image {
            let mut image_style = serde_json::Map::new();
            if let Some(align) = attr(attrs, "style")
                .as_deref()
                .and_then(|style| css::style_property(style, "text-align"))
            {
                image_style.insert("textAlign".to_string(), Value::from(align));
            }
            if let Some(width) = data.get("width") {
                image_style.insert("width".to_string(), width.clone());
            }
            data.insert("style".to_string(), Value::Object(image_style));
        }

        let entity = self.entities.create(kind, Mutability::Immutable, data);
        self.text.push(' ');
        self.characters
            .push(CharacterMetadata::new(style.clone(), Some(entity)));
        self.atomic = true;
    }

    fn add_anchor(
        &mut self,
        node: &Handle,
        href: String,
        attrs: &[Attribute],
        style: &StyleSet,
        configs: &mut Vec<BlockConfig>,
    ) {
        let mut data = EntityData::from([("url".to_string(), Value::from(href))]);
        copy_attributes(
            attrs,
            &[
                ("href", "href"),
                ("rel", "rel"),
                ("target", "target"),
                ("title", "title"),
                ("class", "className"),
            ],
            &mut data,
        );
        let entity = self.entities.create(EntityType::Link, Mutability::Mutable, data);

        let outer = self.entity.replace(entity);
        let children = self.walk(&node.children.borrow(), style);
        configs.extend(children);
        self.entity = outer;
    }

    fn append(&mut self, text: &str, style: &StyleSet) {
        self.text.push_str(text);
        let meta = CharacterMetadata::new(style.clone(), self.entity);
        self.characters
            .extend(std::iter::repeat_n(meta, text.chars().count()));
    }

    /// Trims surrounding whitespace from the pending text, keeping
    /// whitespace that belongs to an entity.
    fn trim_pending(&mut self) {
        let chars: Vec<char> = self.text.chars().collect();
        let len = chars.len();
        let mut begin = chars.iter().take_while(|ch| ch.is_whitespace()).count();
        let mut end = len - chars.iter().rev().take_while(|ch| ch.is_whitespace()).count();

        if let Some(first) = self.characters.iter().position(|meta| meta.entity.is_some()) {
            begin = begin.min(first);
        }
        if let Some(last) = self.characters.iter().rposition(|meta| meta.entity.is_some()) {
            end = end.max(last + 1);
        }

        if begin >= end {
            self.text.clear();
            self.characters.clear();
            self.atomic = false;
        } else if begin > 0 || end < len {
            self.text = chars[begin..end].iter().collect();
            self.characters = self.characters[begin..end.min(self.characters.len())].to_vec();
        }
    }

    /// Turns any pending text into a block of its own.
    fn flush_pending(&mut self, configs: &mut Vec<BlockConfig>) {
        self.trim_pending();
        if !self.text.is_empty() {
            let key = self.keys.next_key();
            configs.push(self.take_pending(key, BlockType::Unstyled, BlockData::new()));
        }
    }

    fn take_pending(&mut self, key: BlockKey, tag_type: BlockType, data: BlockData) -> BlockConfig {
        let block_type = if mem::take(&mut self.atomic) {
            BlockType::Atomic
        } else {
            tag_type
        };
        BlockConfig {
            key,
            block_type,
            tag_type,
            text: mem::take(&mut self.text),
            characters: mem::take(&mut self.characters),
            data,
            depth: self.depth,
            children: Vec::new(),
        }
    }
}

fn block_tag_type(tag: &str, wrapper: Option<Wrapper>) -> Option<BlockType> {
    let block_type = match tag {
        "p" | "div" | "section" | "article" => BlockType::Unstyled,
        "h1" => BlockType::HeaderOne,
        "h2" => BlockType::HeaderTwo,
        "h3" => BlockType::HeaderThree,
        "h4" => BlockType::HeaderFour,
        "h5" => BlockType::HeaderFive,
        "h6" => BlockType::HeaderSix,
        "li" if wrapper == Some(Wrapper::Ordered) => BlockType::OrderedListItem,
        "li" => BlockType::UnorderedListItem,
        "blockquote" => BlockType::Blockquote,
        "pre" => BlockType::CodeBlock,
        "code" if wrapper == Some(Wrapper::Pre) => BlockType::CodeBlock,
        "figure" => BlockType::Atomic,
        "table" => BlockType::Table,
        "link-card" => BlockType::LinkCard,
        "divider" | "hr" => BlockType::Divider,
        _ => return None,
    };
    Some(block_type)
}

fn tag_style(tag: &str) -> Option<&'static str> {
    match tag {
        "b" | "strong" => Some(BOLD),
        "i" | "em" => Some(ITALIC),
        "u" => Some(UNDERLINE),
        "s" | "strike" | "del" => Some(STRIKETHROUGH),
        "mark" => Some(HIGHLIGHT),
        "code" => Some(CODE),
        _ => None,
    }
}

/// Styles for the subtree of an inline element. Inline CSS is applied after
/// the tag's own style, so `font-weight: normal` on a `<b>` removes BOLD.
fn inline_style(tag: &str, attrs: &[Attribute], inherited: &StyleSet) -> StyleSet {
    let mut style = inherited.clone();
    if let Some(tag_style) = tag_style(tag) {
        style.insert(tag_style);
    }

    let Some(css_text) = attr(attrs, "style") else {
        return style;
    };
    for (property, value) in css::declarations(&css_text) {
        let value = value.to_ascii_lowercase();
        match property.to_ascii_lowercase().as_str() {
            "font-weight" => {
                if BOLD_WEIGHTS.contains(&value.as_str()) {
                    style.insert(BOLD);
                } else if NOT_BOLD_WEIGHTS.contains(&value.as_str()) {
                    style.remove(BOLD);
                }
            }
            "font-style" => match value.as_str() {
                "italic" => {
                    style.insert(ITALIC);
                }
                "normal" => {
                    style.remove(ITALIC);
                }
                _ => {}
            },
            "text-decoration" | "text-decoration-line" => {
                for token in value.split_whitespace() {
                    match token {
                        "underline" => {
                            style.insert(UNDERLINE);
                        }
                        "line-through" => {
                            style.insert(STRIKETHROUGH);
                        }
                        "none" => {
                            style.remove(UNDERLINE);
                            style.remove(STRIKETHROUGH);
                        }
                        _ => {}
                    }
                }
            }
            "font-family" if value.contains("monospace") => {
                style.insert(CODE);
            }
            _ => {}
        }
    }

    if matches!(tag, "span" | "code") {
        if let Some(size) = css::style_property(&css_text, "font-size").and_then(css::leading_number)
        {
            style.replace_prefixed(FONT_SIZE_PREFIX, size);
        }
        if let Some(color) = css::style_property(&css_text, "color") {
            style.replace_prefixed(COLOR_PREFIX, color);
        }
    }
    style
}

fn list_item_depth(attrs: &[Attribute]) -> Option<usize> {
    let class = attr(attrs, "class")?;
    class
        .split_whitespace()
        .filter_map(|name| name.strip_prefix(DEPTH_CLASS_PREFIX))
        .filter_map(|depth| depth.parse::<usize>().ok())
        .find(|depth| *depth <= MAX_CLASS_DEPTH)
}

/// Attribute lookup. The tokenizer lowercases names, so `dataSource` is
/// found as `datasource`.
fn attr(attrs: &[Attribute], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|attr| attr.name.local.as_ref().eq_ignore_ascii_case(name))
        .map(|attr| attr.value.to_string())
}

/// Copies non-empty `(attribute, key)` pairs into `data`.
fn copy_attributes(
    attrs: &[Attribute],
    names: &[(&str, &str)],
    data: &mut BTreeMap<String, Value>,
) {
    for (attribute, key) in names {
        if let Some(value) = attr(attrs, attribute).filter(|value| !value.is_empty()) {
            data.insert(key.to_string(), Value::from(value));
        }
    }
}

/// Table attributes carry URL-encoded JSON; raw JSON is accepted as well.
fn decode_json_attribute(raw: &str) -> Value {
    let decoded = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));
    serde_json::from_str(&decoded)
        .or_else(|_| serde_json::from_str(raw))
        .unwrap_or_else(|err| {
            tracing::debug!(%err, "malformed table attribute");
            Value::Array(Vec::new())
        })
}

fn collect_rows(table: &Handle, rows: &mut Vec<Vec<(bool, String)>>) {
    let mut stack: Vec<Handle> = table.children.borrow().iter().rev().cloned().collect();
    while let Some(node) = stack.pop() {
        let NodeData::Element { name, .. } = &node.data else {
            continue;
        };
        if name.local.as_ref() != "tr" {
            stack.extend(node.children.borrow().iter().rev().cloned());
            continue;
        }
        let cells = node
            .children
            .borrow()
            .iter()
            .filter_map(|cell| match &cell.data {
                NodeData::Element { name, .. } if matches!(name.local.as_ref(), "td" | "th") => {
                    let text = text_content(cell);
                    Some((name.local.as_ref() == "th", text.trim().to_string()))
                }
                _ => None,
            })
            .collect();
        rows.push(cells);
    }
}

fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    let mut stack: Vec<Handle> = node.children.borrow().iter().rev().cloned().collect();
    while let Some(node) = stack.pop() {
        match &node.data {
            NodeData::Text { contents } => text.push_str(&contents.borrow()),
            _ => stack.extend(node.children.borrow().iter().rev().cloned()),
        }
    }
    text
}

/// Type, depth and data a list item, quote, heading or code block passes
/// to plain paragraphs nested inside it.
#[derive(Debug, Clone)]
struct Lent {
    block_type: BlockType,
    depth: usize,
    data: BlockData,
}

fn lends_type(block_type: BlockType) -> bool {
    block_type.is_list_item()
        || block_type.is_heading()
        || matches!(block_type, BlockType::Blockquote | BlockType::CodeBlock)
}

/// Flat projection: containers are replaced by their children, followed by
/// the container's own trailing text when it has any.
fn flatten(configs: Vec<BlockConfig>, lent: Option<&Lent>, out: &mut Vec<Block>) {
    for mut config in configs {
        let mut container_type = config.tag_type;
        if let Some(lent) = lent {
            if config.tag_type == BlockType::Unstyled {
                container_type = lent.block_type;
            }
            if config.block_type == BlockType::Unstyled {
                config.block_type = lent.block_type;
                config.depth = lent.depth;
                if config.data.is_empty() {
                    config.data = lent.data.clone();
                }
            }
        }

        let children = mem::take(&mut config.children);
        if children.is_empty() {
            out.push(config.into_block());
            continue;
        }

        let inner = if lends_type(container_type) {
            Some(Lent {
                block_type: container_type,
                depth: config.depth,
                data: config.data.clone(),
            })
        } else {
            lent.cloned()
        };
        flatten(children, inner.as_ref(), out);
        if !config.text.is_empty() {
            out.push(config.into_block());
        }
    }
}

/// Tree projection: every config becomes a block, in document order.
fn link_tree(configs: Vec<BlockConfig>, parent: Option<&BlockKey>, out: &mut Vec<Block>) {
    let keys: Vec<BlockKey> = configs.iter().map(|config| config.key.clone()).collect();
    for (ix, mut config) in configs.into_iter().enumerate() {
        let children = mem::take(&mut config.children);
        let mut block = config.into_block();
        block.parent = parent.cloned();
        block.prev_sibling = ix.checked_sub(1).and_then(|prev| keys.get(prev)).cloned();
        block.next_sibling = keys.get(ix + 1).cloned();
        block.children = children.iter().map(|child| child.key.clone()).collect();
        let key = block.key.clone();
        out.push(block);
        link_tree(children, Some(&key), out);
    }
}
