use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::block::{Block, BlockKey, BlockType};
use crate::character::CharacterMetadata;
use crate::entity::{Entity, EntityData, EntityKey, EntityMap, EntityType, Mutability};
use crate::error::InvariantError;
use crate::keys::{KeyGenerator, RandomKeys};
use crate::selection::SelectionState;

/// One revision of a document: the ordered blocks plus the entities they
/// reference. Revisions share unchanged blocks and entity storage.
#[derive(Debug, Clone)]
pub struct ContentState {
    blocks: Vec<Arc<Block>>,
    entity_map: EntityMap,
    keys: Arc<dyn KeyGenerator>,
    selection_before: SelectionState,
    selection_after: SelectionState,
}

/// Plain serializable form of a [`ContentState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContent {
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub entity_map: EntityMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub entity: EntityKey,
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ContentState {
    pub fn new() -> Self {
        Self::with_keys(Arc::new(RandomKeys::new()))
    }

    /// A document holding a single empty paragraph.
    pub fn with_keys(keys: Arc<dyn KeyGenerator>) -> Self {
        Self::from_blocks_with_keys(Vec::new(), EntityMap::new(), keys)
    }

    /// Wraps existing blocks; new keys are random and avoid the existing ones.
    pub fn from_blocks(blocks: Vec<Block>, entity_map: EntityMap) -> Self {
        let keys = RandomKeys::excluding(blocks.iter().map(|block| &block.key));
        Self::from_blocks_with_keys(blocks, entity_map, Arc::new(keys))
    }

    /// An empty block list yields a document with one empty paragraph.
    pub fn from_blocks_with_keys(
        mut blocks: Vec<Block>,
        entity_map: EntityMap,
        keys: Arc<dyn KeyGenerator>,
    ) -> Self {
        if blocks.is_empty() {
            blocks.push(Block::empty(keys.next_key()));
        }
        let selection = SelectionState::collapsed(blocks[0].key.clone(), 0);
        Self {
            blocks: blocks.into_iter().map(Arc::new).collect(),
            entity_map,
            keys,
            selection_before: selection.clone(),
            selection_after: selection,
        }
    }

    /// One unstyled block per line of `text`.
    pub fn from_text(text: &str, keys: Arc<dyn KeyGenerator>) -> Self {
        let blocks = text
            .split('\n')
            .map(|line| Block::new(keys.next_key(), BlockType::Unstyled, line))
            .collect();
        Self::from_blocks_with_keys(blocks, EntityMap::new(), keys)
    }

    /// Rebuilds a document from its serialized form. Blocks stored without a
    /// character list get unstyled characters; anything else that breaks an
    /// invariant is rejected.
    pub fn from_raw(raw: RawContent) -> Result<Self, InvariantError> {
        let blocks = raw
            .blocks
            .into_iter()
            .map(|mut block| {
                if block.characters.is_empty() {
                    block.characters = vec![CharacterMetadata::default(); block.char_len()];
                }
                block
            })
            .collect();
        let content = Self::from_blocks(blocks, raw.entity_map);
        content.validate()?;
        Ok(content)
    }

    pub fn to_raw(&self) -> RawContent {
        RawContent {
            blocks: self.blocks().cloned().collect(),
            entity_map: self.entity_map.clone(),
        }
    }

    pub fn blocks(&self) -> impl DoubleEndedIterator<Item = &Block> + ExactSizeIterator {
        self.blocks.iter().map(|block| block.as_ref())
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block_at(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index).map(|block| block.as_ref())
    }

    pub fn index_of(&self, key: &BlockKey) -> Option<usize> {
        self.blocks.iter().position(|block| &block.key == key)
    }

    pub fn block_for_key(&self, key: &BlockKey) -> Option<&Block> {
        self.index_of(key).and_then(|ix| self.block_at(ix))
    }

    pub fn first_block(&self) -> Option<&Block> {
        self.blocks.first().map(|block| block.as_ref())
    }

    pub fn last_block(&self) -> Option<&Block> {
        self.blocks.last().map(|block| block.as_ref())
    }

    pub fn block_before(&self, key: &BlockKey) -> Option<&Block> {
        let ix = self.index_of(key)?;
        ix.checked_sub(1).and_then(|prev| self.block_at(prev))
    }

    pub fn block_after(&self, key: &BlockKey) -> Option<&Block> {
        let ix = self.index_of(key)?;
        self.block_at(ix + 1)
    }

    /// Children of a block in tree-shaped content, in order.
    pub fn children_of(&self, key: &BlockKey) -> Vec<&Block> {
        self.block_for_key(key)
            .map(|block| {
                block
                    .children
                    .iter()
                    .filter_map(|child| self.block_for_key(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn entity_map(&self) -> &EntityMap {
        &self.entity_map
    }

    pub fn entity(&self, key: EntityKey) -> Option<&Entity> {
        self.entity_map.get(key)
    }

    /// Allocates a new entity in this revision's entity map.
    pub fn create_entity(
        &mut self,
        entity_type: EntityType,
        mutability: Mutability,
        data: EntityData,
    ) -> EntityKey {
        self.entity_map.create(entity_type, mutability, data)
    }

    pub fn key_generator(&self) -> Arc<dyn KeyGenerator> {
        Arc::clone(&self.keys)
    }

    pub fn generate_key(&self) -> BlockKey {
        self.keys.next_key()
    }

    pub fn selection_before(&self) -> &SelectionState {
        &self.selection_before
    }

    pub fn selection_after(&self) -> &SelectionState {
        &self.selection_after
    }

    pub fn with_selection_before(mut self, selection: SelectionState) -> Self {
        self.selection_before = selection;
        self
    }

    pub fn with_selection_after(mut self, selection: SelectionState) -> Self {
        self.selection_after = selection;
        self
    }

    /// Clamps offsets to their blocks, replaces keys that no longer exist and
    /// recomputes `is_backward` from document order.
    pub fn normalize_selection(&self, selection: &SelectionState) -> SelectionState {
        let fallback = || {
            let first = self.first_block().map(|block| block.key.clone());
            (first.unwrap_or_else(|| BlockKey::new("")), 0)
        };
        let resolve = |key: &BlockKey, offset: usize| {
            self.block_for_key(key)
                .map(|block| (key.clone(), offset.min(block.len())))
        };

        let anchor = resolve(&selection.anchor_key, selection.anchor_offset);
        let focus = resolve(&selection.focus_key, selection.focus_offset);
        let (anchor, focus) = match (anchor, focus) {
            (Some(anchor), Some(focus)) => (anchor, focus),
            (Some(anchor), None) => (anchor.clone(), anchor),
            (None, Some(focus)) => (focus.clone(), focus),
            (None, None) => (fallback(), fallback()),
        };

        let anchor_ix = self.index_of(&anchor.0).unwrap_or(0);
        let focus_ix = self.index_of(&focus.0).unwrap_or(0);
        let is_backward = anchor_ix > focus_ix || (anchor_ix == focus_ix && anchor.1 > focus.1);

        SelectionState {
            anchor_key: anchor.0,
            anchor_offset: anchor.1,
            focus_key: focus.0,
            focus_offset: focus.1,
            is_backward,
            has_focus: selection.has_focus,
        }
    }

    /// Selected `(block index, start, end)` character ranges in document order.
    pub fn selected_ranges(&self, selection: &SelectionState) -> Vec<(usize, usize, usize)> {
        let selection = self.normalize_selection(selection);
        let (Some(start_ix), Some(end_ix)) = (
            self.index_of(selection.start_key()),
            self.index_of(selection.end_key()),
        ) else {
            return Vec::new();
        };
        (start_ix..=end_ix)
            .filter_map(|ix| {
                let block = self.block_at(ix)?;
                let start = if ix == start_ix { selection.start_offset() } else { 0 };
                let end = if ix == end_ix { selection.end_offset() } else { block.len() };
                Some((ix, start, end))
            })
            .collect()
    }

    /// Block texts joined with `\n`.
    pub fn plain_text(&self) -> String {
        self.blocks()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of characters, not counting line breaks.
    pub fn text_length(&self) -> usize {
        self.blocks()
            .map(|block| block.text.chars().filter(|ch| *ch != '\n').count())
            .sum()
    }

    pub fn has_text(&self) -> bool {
        self.blocks().any(|block| !block.text.trim().is_empty())
    }

    /// Images referenced by atomic blocks, in document order.
    pub fn images(&self) -> Vec<ImageRef> {
        self.blocks()
            .filter(|block| block.block_type == BlockType::Atomic)
            .filter_map(|block| {
                let key = block.entity_at(0)?;
                let entity = self.entity(key)?;
                if entity.entity_type != EntityType::Image {
                    return None;
                }
                Some(ImageRef {
                    entity: key,
                    src: entity.data_str("src").unwrap_or_default().to_string(),
                    name: entity.data_str("name").map(str::to_string),
                })
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), InvariantError> {
        if self.blocks.is_empty() {
            return Err(InvariantError::Empty);
        }
        let mut seen = HashSet::new();
        for block in self.blocks() {
            if !seen.insert(&block.key) {
                return Err(InvariantError::DuplicateKey(block.key.clone()));
            }
            let text = block.char_len();
            if text != block.characters.len() {
                return Err(InvariantError::LengthMismatch {
                    key: block.key.clone(),
                    text,
                    characters: block.characters.len(),
                });
            }
            let missing = block
                .characters
                .iter()
                .filter_map(|meta| meta.entity)
                .find(|entity| !self.entity_map.contains(*entity));
            if let Some(entity) = missing {
                return Err(InvariantError::MissingEntity {
                    key: block.key.clone(),
                    entity,
                });
            }
            if block.block_type == BlockType::Atomic
                && (block.characters.len() != 1 || block.entity_at(0).is_none())
            {
                return Err(InvariantError::MalformedAtomic(block.key.clone()));
            }
        }
        Ok(())
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Arc<Block>> {
        &mut self.blocks
    }

    pub(crate) fn entity_map_mut(&mut self) -> &mut EntityMap {
        &mut self.entity_map
    }

    /// Mutable access to the block at `index`, copying it if shared.
    pub(crate) fn block_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks.get_mut(index).map(Arc::make_mut)
    }
}

impl Default for ContentState {
    fn default() -> Self {
        Self::new()
    }
}

/// Documents compare by blocks and entities; key generators and the
/// selections recorded with the edit are ignored.
impl PartialEq for ContentState {
    fn eq(&self, other: &Self) -> bool {
        self.entity_map == other.entity_map
            && self.blocks.len() == other.blocks.len()
            && self
                .blocks
                .iter()
                .zip(&other.blocks)
                .all(|(a, b)| Arc::ptr_eq(a, b) || a == b)
    }
}

impl Serialize for ContentState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_raw().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ContentState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawContent::deserialize(deserializer)?;
        ContentState::from_raw(raw).map_err(serde::de::Error::custom)
    }
}
