use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::character::{CharacterMetadata, StyleSet, uniform_characters};
use crate::entity::EntityKey;

pub type BlockData = BTreeMap<String, Value>;

/// Stable identifier of a block. Keys survive edits until the block is removed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockKey(String);

impl BlockKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    #[default]
    Unstyled,
    HeaderOne,
    HeaderTwo,
    HeaderThree,
    HeaderFour,
    HeaderFive,
    HeaderSix,
    UnorderedListItem,
    OrderedListItem,
    Blockquote,
    CodeBlock,
    Atomic,
    Divider,
    Table,
    LinkCard,
}

impl BlockType {
    pub const ALL: [BlockType; 15] = [
        BlockType::Unstyled,
        BlockType::HeaderOne,
        BlockType::HeaderTwo,
        BlockType::HeaderThree,
        BlockType::HeaderFour,
        BlockType::HeaderFive,
        BlockType::HeaderSix,
        BlockType::UnorderedListItem,
        BlockType::OrderedListItem,
        BlockType::Blockquote,
        BlockType::CodeBlock,
        BlockType::Atomic,
        BlockType::Divider,
        BlockType::Table,
        BlockType::LinkCard,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::Unstyled => "unstyled",
            BlockType::HeaderOne => "header-one",
            BlockType::HeaderTwo => "header-two",
            BlockType::HeaderThree => "header-three",
            BlockType::HeaderFour => "header-four",
            BlockType::HeaderFive => "header-five",
            BlockType::HeaderSix => "header-six",
            BlockType::UnorderedListItem => "unordered-list-item",
            BlockType::OrderedListItem => "ordered-list-item",
            BlockType::Blockquote => "blockquote",
            BlockType::CodeBlock => "code-block",
            BlockType::Atomic => "atomic",
            BlockType::Divider => "divider",
            BlockType::Table => "table",
            BlockType::LinkCard => "link-card",
        }
    }

    pub fn is_list_item(self) -> bool {
        matches!(
            self,
            BlockType::UnorderedListItem | BlockType::OrderedListItem
        )
    }

    pub fn is_heading(self) -> bool {
        matches!(
            self,
            BlockType::HeaderOne
                | BlockType::HeaderTwo
                | BlockType::HeaderThree
                | BlockType::HeaderFour
                | BlockType::HeaderFive
                | BlockType::HeaderSix
        )
    }

    /// Table, link-card and divider blocks keep their payload in `data`.
    pub fn is_custom(self) -> bool {
        matches!(
            self,
            BlockType::Divider | BlockType::Table | BlockType::LinkCard
        )
    }

    /// Blocks without editable text.
    pub fn is_void(self) -> bool {
        self == BlockType::Atomic || self.is_custom()
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| format!("Unknown block type: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub key: BlockKey,
    #[serde(rename = "type", default)]
    pub block_type: BlockType,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "characterList", default)]
    pub characters: Vec<CharacterMetadata>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BlockData,
    #[serde(default)]
    pub depth: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<BlockKey>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BlockKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_sibling: Option<BlockKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_sibling: Option<BlockKey>,
}

impl Block {
    pub fn new(key: BlockKey, block_type: BlockType, text: impl Into<String>) -> Self {
        let text = text.into();
        let characters = uniform_characters(text.chars().count(), &CharacterMetadata::default());
        Self {
            key,
            block_type,
            text,
            characters,
            data: BlockData::new(),
            depth: 0,
            parent: None,
            children: Vec::new(),
            prev_sibling: None,
            next_sibling: None,
        }
    }

    pub fn empty(key: BlockKey) -> Self {
        Self::new(key, BlockType::Unstyled, "")
    }

    pub fn with_data(mut self, data: BlockData) -> Self {
        self.data = data;
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Replaces the text without touching the character list.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_characters(mut self, characters: Vec<CharacterMetadata>) -> Self {
        self.characters = characters;
        self
    }

    /// Applies `style` to the characters in `start..end`.
    pub fn styled(mut self, start: usize, end: usize, style: &str) -> Self {
        let end = end.min(self.characters.len());
        for meta in self.characters.iter_mut().take(end).skip(start) {
            meta.apply_style(style);
        }
        self
    }

    /// Binds the characters in `start..end` to `entity`.
    pub fn with_entity(mut self, start: usize, end: usize, entity: EntityKey) -> Self {
        let end = end.min(self.characters.len());
        for meta in self.characters.iter_mut().take(end).skip(start) {
            meta.entity = Some(entity);
        }
        self
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn entity_at(&self, offset: usize) -> Option<EntityKey> {
        self.characters.get(offset).and_then(|meta| meta.entity)
    }

    pub fn style_at(&self, offset: usize) -> StyleSet {
        self.characters
            .get(offset)
            .map(|meta| meta.style.clone())
            .unwrap_or_default()
    }

    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Text of the characters in `start..end`.
    pub fn slice_text(&self, start: usize, end: usize) -> String {
        self.text
            .chars()
            .skip(start)
            .take(end.saturating_sub(start))
            .collect()
    }

    /// The `(start, end)` character range covered by the entity at `offset`.
    pub fn entity_range_at(&self, offset: usize) -> Option<(usize, usize)> {
        let entity = self.entity_at(offset)?;
        let mut start = offset;
        while start > 0 && self.entity_at(start - 1) == Some(entity) {
            start -= 1;
        }
        let mut end = offset + 1;
        while self.entity_at(end) == Some(entity) {
            end += 1;
        }
        Some((start, end))
    }

    /// Contiguous runs of characters sharing the same metadata, as
    /// `(start, end)` character ranges.
    pub fn runs_by<K, F>(&self, start: usize, end: usize, mut key: F) -> Vec<(usize, usize)>
    where
        K: PartialEq,
        F: FnMut(&CharacterMetadata) -> K,
    {
        let end = end.min(self.characters.len());
        let mut runs = Vec::new();
        let mut run_start = start;
        let mut current: Option<K> = None;
        for ix in start..end {
            let k = key(&self.characters[ix]);
            match &current {
                Some(prev) if *prev == k => {}
                Some(_) => {
                    runs.push((run_start, ix));
                    run_start = ix;
                    current = Some(k);
                }
                None => current = Some(k),
            }
        }
        if start < end {
            runs.push((run_start, end));
        }
        runs
    }
}

/// Splits `text` at character offset `at`.
pub(crate) fn split_text(text: &str, at: usize) -> (String, String) {
    let byte = text
        .char_indices()
        .nth(at)
        .map(|(ix, _)| ix)
        .unwrap_or(text.len());
    (text[..byte].to_string(), text[byte..].to_string())
}
