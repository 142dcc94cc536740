//! Pure edit operations. Each one takes a content state plus a selection and
//! returns a new content state carrying the selection before and after the
//! edit; the input is never changed.

use std::sync::Arc;

use crate::block::{Block, BlockData, BlockKey, BlockType, split_text};
use crate::character::{CharacterMetadata, StyleSet};
use crate::content::ContentState;
use crate::entity::{EntityData, EntityKey};
use crate::error::EditError;
use crate::selection::SelectionState;

fn index_for(content: &ContentState, key: &BlockKey) -> Result<usize, EditError> {
    content
        .index_of(key)
        .ok_or_else(|| EditError::UnknownBlock(key.clone()))
}

fn ensure_entity(content: &ContentState, entity: Option<EntityKey>) -> Result<(), EditError> {
    match entity {
        Some(key) if !content.entity_map().contains(key) => Err(EditError::UnknownEntity(key)),
        _ => Ok(()),
    }
}

fn finish(next: ContentState, before: SelectionState, after: SelectionState) -> ContentState {
    next.with_selection_before(before).with_selection_after(after)
}

/// Removes a non-collapsed selection first; returns the working copy and the
/// collapsed caret to continue from.
fn collapse(
    content: &ContentState,
    selection: &SelectionState,
) -> Result<(ContentState, SelectionState), EditError> {
    if selection.is_collapsed() {
        Ok((content.clone(), selection.clone()))
    } else {
        let next = remove_range(content, selection)?;
        let caret = next.selection_after().clone();
        Ok((next, caret))
    }
}

pub fn insert_text(
    content: &ContentState,
    selection: &SelectionState,
    text: &str,
    style: &StyleSet,
    entity: Option<EntityKey>,
) -> Result<ContentState, EditError> {
    ensure_entity(content, entity)?;
    let before = content.normalize_selection(selection);
    let (mut next, caret) = collapse(content, &before)?;
    let ix = index_for(&next, &caret.anchor_key)?;
    if next
        .block_at(ix)
        .is_some_and(|block| block.block_type.is_void())
    {
        return Err(EditError::ReadOnlyBlock(caret.anchor_key.clone()));
    }

    let offset = caret.anchor_offset;
    let count = text.chars().count();
    let meta = CharacterMetadata::new(style.clone(), entity);
    let block = next
        .block_mut(ix)
        .ok_or_else(|| EditError::UnknownBlock(caret.anchor_key.clone()))?;
    let (head, tail) = split_text(&block.text, offset);
    block.text = format!("{head}{text}{tail}");
    block
        .characters
        .splice(offset..offset, std::iter::repeat_n(meta, count));

    let after = SelectionState::collapsed(caret.anchor_key.clone(), offset + count);
    Ok(finish(next, before, after))
}

/// What survives of a boundary block when a range is removed.
enum Edge {
    Removed,
    Intact(Block),
    Cut(Block),
}

fn head_edge(block: &Block, start: usize) -> Edge {
    if block.block_type.is_void() {
        return if start == 0 {
            Edge::Removed
        } else {
            Edge::Intact(block.clone())
        };
    }
    let mut head = block.clone();
    head.text = split_text(&block.text, start).0;
    head.characters.truncate(start);
    Edge::Cut(head)
}

fn tail_edge(block: &Block, end: usize) -> Edge {
    if block.block_type.is_void() {
        return if end >= block.len() {
            Edge::Removed
        } else {
            Edge::Intact(block.clone())
        };
    }
    let mut tail = block.clone();
    tail.text = split_text(&block.text, end).1;
    tail.characters = block.characters[end.min(block.len())..].to_vec();
    Edge::Cut(tail)
}

/// Deletes the selected text. When the range spans blocks, the text after
/// the range is merged into the first block, which keeps its key and type.
pub fn remove_range(
    content: &ContentState,
    selection: &SelectionState,
) -> Result<ContentState, EditError> {
    let before = content.normalize_selection(selection);
    if before.is_collapsed() {
        return Ok(finish(content.clone(), before.clone(), before));
    }

    let start_ix = index_for(content, before.start_key())?;
    let end_ix = index_for(content, before.end_key())?;
    let (Some(first), Some(last)) = (content.block_at(start_ix), content.block_at(end_ix)) else {
        return Err(EditError::UnknownBlock(before.start_key().clone()));
    };
    let start = before.start_offset();

    let (replacement, after) = match (head_edge(first, start), tail_edge(last, before.end_offset()))
    {
        (Edge::Cut(mut head), Edge::Cut(tail)) => {
            head.text.push_str(&tail.text);
            head.characters.extend(tail.characters);
            let after = SelectionState::collapsed(head.key.clone(), start);
            (vec![head], after)
        }
        (Edge::Cut(head), Edge::Removed) => {
            let after = SelectionState::collapsed(head.key.clone(), start);
            (vec![head], after)
        }
        (Edge::Cut(head), Edge::Intact(tail)) => {
            let after = SelectionState::collapsed(head.key.clone(), start);
            (vec![head, tail], after)
        }
        (Edge::Removed, Edge::Cut(tail)) | (Edge::Removed, Edge::Intact(tail)) => {
            let after = SelectionState::collapsed(tail.key.clone(), 0);
            (vec![tail], after)
        }
        (Edge::Removed, Edge::Removed) => {
            let empty = Block::empty(first.key.clone());
            let after = SelectionState::collapsed(empty.key.clone(), 0);
            (vec![empty], after)
        }
        (Edge::Intact(head), Edge::Removed) => {
            let after = SelectionState::collapsed(head.key.clone(), head.len());
            (vec![head], after)
        }
        (Edge::Intact(head), Edge::Cut(tail)) | (Edge::Intact(head), Edge::Intact(tail)) => {
            let after = SelectionState::collapsed(tail.key.clone(), 0);
            (vec![head, tail], after)
        }
    };

    let mut next = content.clone();
    next.blocks_mut()
        .splice(start_ix..=end_ix, replacement.into_iter().map(Arc::new));
    Ok(finish(next, before, after))
}

/// Splits the block at the caret. The lower half gets a fresh key, empty
/// data and `type_override` when given.
pub fn split_block(
    content: &ContentState,
    selection: &SelectionState,
    type_override: Option<BlockType>,
) -> Result<ContentState, EditError> {
    let before = content.normalize_selection(selection);
    let (mut next, caret) = collapse(content, &before)?;
    let ix = index_for(&next, &caret.anchor_key)?;
    let key = next.generate_key();
    let Some(block) = next.block_mut(ix) else {
        return Err(EditError::UnknownBlock(caret.anchor_key.clone()));
    };

    let lower = if block.block_type.is_void() {
        Block::empty(key)
    } else {
        let offset = caret.anchor_offset.min(block.len());
        let (head, tail) = split_text(&block.text, offset);
        let lower_characters = block.characters.split_off(offset);
        block.text = head;
        Block::new(key, type_override.unwrap_or(block.block_type), "")
            .with_depth(block.depth)
            .with_characters(lower_characters)
            .with_text(tail)
    };

    let after = SelectionState::collapsed(lower.key.clone(), 0);
    next.blocks_mut().insert(ix + 1, Arc::new(lower));
    Ok(finish(next, before, after))
}

fn update_selected_blocks(
    content: &ContentState,
    selection: &SelectionState,
    mut update: impl FnMut(&mut Block),
) -> ContentState {
    let before = content.normalize_selection(selection);
    let mut next = content.clone();
    for (ix, _, _) in content.selected_ranges(&before) {
        if let Some(block) = next.block_mut(ix) {
            update(block);
        }
    }
    finish(next, before.clone(), before)
}

/// Changes the type of every text block in the selection. List depth is
/// reset when the new type is not a list item.
pub fn set_block_type(
    content: &ContentState,
    selection: &SelectionState,
    block_type: BlockType,
) -> Result<ContentState, EditError> {
    if block_type.is_void() {
        return Err(EditError::InvalidBlockType(block_type));
    }
    Ok(update_selected_blocks(content, selection, |block| {
        if block.block_type.is_void() {
            return;
        }
        block.block_type = block_type;
        if !block_type.is_list_item() {
            block.depth = 0;
        }
    }))
}

pub fn set_block_data(
    content: &ContentState,
    selection: &SelectionState,
    data: BlockData,
) -> ContentState {
    update_selected_blocks(content, selection, |block| block.data = data.clone())
}

pub fn merge_block_data(
    content: &ContentState,
    selection: &SelectionState,
    data: BlockData,
) -> ContentState {
    update_selected_blocks(content, selection, |block| {
        block
            .data
            .extend(data.iter().map(|(k, v)| (k.clone(), v.clone())))
    })
}

/// Changes list depth by `delta`, keeping it within `0..=max_depth`.
pub fn adjust_block_depth(
    content: &ContentState,
    selection: &SelectionState,
    delta: isize,
    max_depth: usize,
) -> ContentState {
    update_selected_blocks(content, selection, |block| {
        if block.block_type.is_list_item() {
            block.depth = block.depth.saturating_add_signed(delta).min(max_depth);
        }
    })
}

fn update_selected_characters(
    content: &ContentState,
    selection: &SelectionState,
    mut update: impl FnMut(&mut CharacterMetadata),
) -> ContentState {
    let before = content.normalize_selection(selection);
    let mut next = content.clone();
    for (ix, start, end) in content.selected_ranges(&before) {
        let Some(block) = next.block_mut(ix) else {
            continue;
        };
        if block.block_type.is_void() {
            continue;
        }
        let end = end.min(block.characters.len());
        for meta in block.characters.iter_mut().take(end).skip(start) {
            update(meta);
        }
    }
    finish(next, before.clone(), before)
}

fn selected_characters<'a>(
    content: &'a ContentState,
    selection: &SelectionState,
) -> impl Iterator<Item = &'a CharacterMetadata> {
    content
        .selected_ranges(selection)
        .into_iter()
        .filter_map(|(ix, start, end)| {
            let block = content.block_at(ix)?;
            (!block.block_type.is_void()).then_some((block, start, end))
        })
        .flat_map(|(block, start, end)| {
            let end = end.min(block.characters.len());
            block.characters[start.min(end)..end].iter()
        })
}

pub fn apply_inline_style(
    content: &ContentState,
    selection: &SelectionState,
    style: &str,
) -> ContentState {
    update_selected_characters(content, selection, |meta| meta.apply_style(style))
}

pub fn remove_inline_style(
    content: &ContentState,
    selection: &SelectionState,
    style: &str,
) -> ContentState {
    update_selected_characters(content, selection, |meta| meta.remove_style(style))
}

/// Drops every inline style in the selection; entities stay.
pub fn clear_inline_styles(content: &ContentState, selection: &SelectionState) -> ContentState {
    update_selected_characters(content, selection, |meta| meta.style = StyleSet::new())
}

/// Removes `style` when every selected character has it, otherwise adds it
/// to all of them. A collapsed selection leaves the content unchanged.
pub fn toggle_inline_style(
    content: &ContentState,
    selection: &SelectionState,
    style: &str,
) -> ContentState {
    let mut chars = selected_characters(content, selection).peekable();
    if chars.peek().is_none() {
        let selection = content.normalize_selection(selection);
        return finish(content.clone(), selection.clone(), selection);
    }
    if chars.all(|meta| meta.has_style(style)) {
        remove_inline_style(content, selection, style)
    } else {
        apply_inline_style(content, selection, style)
    }
}

/// Binds the selected characters to `entity`, or unbinds them with `None`.
pub fn apply_entity(
    content: &ContentState,
    selection: &SelectionState,
    entity: Option<EntityKey>,
) -> Result<ContentState, EditError> {
    ensure_entity(content, entity)?;
    Ok(update_selected_characters(content, selection, |meta| {
        meta.entity = entity
    }))
}

/// Inserts a block without editable text at the caret.
///
/// An empty text block is converted in place; otherwise the caret block is
/// split around the new block. A text block is kept after the inserted block
/// so the caret has somewhere to go, and the selection moves there.
pub fn insert_void_block(
    content: &ContentState,
    selection: &SelectionState,
    block: Block,
) -> Result<ContentState, EditError> {
    let before = content.normalize_selection(selection);
    let (mut next, caret) = collapse(content, &before)?;
    let ix = index_for(&next, &caret.anchor_key)?;
    let Some(current) = next.block_at(ix).cloned() else {
        return Err(EditError::UnknownBlock(caret.anchor_key.clone()));
    };

    let mut inserted = block;
    let offset = caret.anchor_offset;
    let replacement = if current.block_type.is_void() {
        vec![current, inserted.clone()]
    } else if current.is_empty() {
        inserted.key = current.key.clone();
        vec![inserted.clone()]
    } else if offset == 0 {
        vec![inserted.clone(), current]
    } else if offset >= current.len() {
        vec![current, inserted.clone()]
    } else {
        let mut upper = current.clone();
        let lower_characters = upper.characters.split_off(offset);
        let (head, tail) = split_text(&current.text, offset);
        upper.text = head;
        let lower = Block::new(next.generate_key(), current.block_type, "")
            .with_depth(current.depth)
            .with_characters(lower_characters)
            .with_text(tail);
        vec![upper, inserted.clone(), lower]
    };
    next.blocks_mut()
        .splice(ix..=ix, replacement.into_iter().map(Arc::new));

    let position = index_for(&next, &inserted.key)?;
    let needs_line = next
        .block_at(position + 1)
        .is_none_or(|following| following.block_type.is_void());
    if needs_line {
        let line = Block::empty(next.generate_key());
        next.blocks_mut().insert(position + 1, Arc::new(line));
    }
    let after_key = next
        .block_at(position + 1)
        .map(|following| following.key.clone())
        .unwrap_or(inserted.key);
    Ok(finish(next, before, SelectionState::collapsed(after_key, 0)))
}

/// Inserts an atomic block whose single `placeholder` character is bound to `entity`.
pub fn insert_atomic_block(
    content: &ContentState,
    selection: &SelectionState,
    entity: EntityKey,
    placeholder: char,
) -> Result<ContentState, EditError> {
    ensure_entity(content, Some(entity))?;
    let block = Block::new(
        content.generate_key(),
        BlockType::Atomic,
        placeholder.to_string(),
    )
    .with_entity(0, 1, entity);
    insert_void_block(content, selection, block)
}

/// Removes a block. Removing a missing block returns the content unchanged;
/// removing the only block leaves one empty paragraph.
pub fn remove_block(content: &ContentState, key: &BlockKey) -> ContentState {
    let Some(ix) = content.index_of(key) else {
        return content.clone();
    };
    let before = content.selection_after().clone();
    let mut next = content.clone();
    if next.block_count() == 1 {
        let empty = Block::empty(next.generate_key());
        let after = SelectionState::collapsed(empty.key.clone(), 0);
        next.blocks_mut()[0] = Arc::new(empty);
        return finish(next, before, after);
    }

    let removed = next.blocks_mut().remove(ix);
    detach(&mut next, &removed);
    let after = match ix.checked_sub(1).and_then(|prev| next.block_at(prev)) {
        Some(prev) => SelectionState::collapsed(prev.key.clone(), prev.len()),
        None => {
            let first = next.block_at(0).map(|block| block.key.clone());
            SelectionState::collapsed(first.unwrap_or_else(|| key.clone()), 0)
        }
    };
    finish(next, before, after)
}

/// Drops tree references to a removed block.
fn detach(content: &mut ContentState, removed: &Block) {
    let count = content.block_count();
    for ix in 0..count {
        let touches = content.block_at(ix).is_some_and(|block| {
            block.children.contains(&removed.key)
                || block.prev_sibling.as_ref() == Some(&removed.key)
                || block.next_sibling.as_ref() == Some(&removed.key)
        });
        if !touches {
            continue;
        }
        if let Some(block) = content.block_mut(ix) {
            block.children.retain(|child| child != &removed.key);
            if block.prev_sibling.as_ref() == Some(&removed.key) {
                block.prev_sibling = removed.prev_sibling.clone();
            }
            if block.next_sibling.as_ref() == Some(&removed.key) {
                block.next_sibling = removed.next_sibling.clone();
            }
        }
    }
}

/// Removes a table, link-card, divider or atomic block.
pub fn remove_custom_block(
    content: &ContentState,
    key: &BlockKey,
) -> Result<ContentState, EditError> {
    match content.block_for_key(key) {
        None => Ok(content.clone()),
        Some(block) if block.block_type.is_void() => Ok(remove_block(content, key)),
        Some(_) => Err(EditError::NotCustomBlock(key.clone())),
    }
}

/// Merges `data` into an entity. The returned revision owns its own copy of
/// the entity map, so earlier revisions keep the previous data.
pub fn merge_entity_data(
    content: &ContentState,
    entity: EntityKey,
    data: EntityData,
) -> Result<ContentState, EditError> {
    let mut next = content.clone();
    next.entity_map_mut().merge_data(entity, data)?;
    let selection = content.selection_after().clone();
    Ok(finish(next, selection.clone(), selection))
}

pub fn replace_entity_data(
    content: &ContentState,
    entity: EntityKey,
    data: EntityData,
) -> Result<ContentState, EditError> {
    let mut next = content.clone();
    next.entity_map_mut().replace_data(entity, data)?;
    let selection = content.selection_after().clone();
    Ok(finish(next, selection.clone(), selection))
}

/// Replaces one block's data, addressed by key.
pub fn replace_block_data(
    content: &ContentState,
    key: &BlockKey,
    data: BlockData,
) -> Result<ContentState, EditError> {
    let ix = index_for(content, key)?;
    let mut next = content.clone();
    if let Some(block) = next.block_mut(ix) {
        block.data = data;
    }
    let selection = content.selection_after().clone();
    Ok(finish(next, selection.clone(), selection))
}
