use std::sync::Arc;

use folio_core::modifier;
use folio_core::{
    BOLD, Block, BlockKey, BlockType, CharacterMetadata, ContentState, EditorState, EntityMap,
    ITALIC, SelectionState, SequentialKeys, StyleSet, UNDERLINE,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn single_block(block: Block) -> ContentState {
    ContentState::from_blocks_with_keys(
        vec![block],
        EntityMap::new(),
        Arc::new(SequentialKeys::new()),
    )
}

fn styles(content: &ContentState) -> Vec<StyleSet> {
    content
        .blocks()
        .flat_map(|block| block.characters.iter().map(|meta| meta.style.clone()))
        .collect()
}

#[test]
fn partially_bold_selection_becomes_fully_bold() {
    let key = BlockKey::new("a");
    let content = single_block(Block::new(key.clone(), BlockType::Unstyled, "Hello world").styled(6, 8, BOLD));
    let selection = SelectionState::within(key.clone(), 4, 11);

    let once = modifier::toggle_inline_style(&content, &selection, BOLD);
    let block = once.block_for_key(&key).unwrap();
    assert!(block.characters[4..].iter().all(|meta| meta.has_style(BOLD)));
    assert!(block.characters[..4].iter().all(|meta| !meta.has_style(BOLD)));

    let twice = modifier::toggle_inline_style(&once, &selection, BOLD);
    assert!(twice.blocks().all(|block| block.characters.iter().all(|meta| !meta.has_style(BOLD))));
}

#[test]
fn toggling_across_blocks_uses_every_selected_character() {
    let content = ContentState::from_blocks_with_keys(
        vec![
            Block::new(BlockKey::new("a"), BlockType::Unstyled, "one").styled(0, 3, ITALIC),
            Block::new(BlockKey::new("b"), BlockType::Unstyled, "two"),
        ],
        EntityMap::new(),
        Arc::new(SequentialKeys::new()),
    );
    let selection = SelectionState::new(BlockKey::new("a"), 1, BlockKey::new("b"), 2);
    let next = modifier::toggle_inline_style(&content, &selection, ITALIC);

    let italic: Vec<bool> = next
        .blocks()
        .flat_map(|block| block.characters.iter().map(|meta| meta.has_style(ITALIC)))
        .collect();
    assert_eq!(italic, vec![true, true, true, true, true, false]);
}

#[test]
fn collapsed_toggle_styles_the_next_typed_text() {
    let key = BlockKey::new("a");
    let mut editor = EditorState::new(single_block(Block::new(key.clone(), BlockType::Unstyled, "ab")));
    editor.set_selection(SelectionState::collapsed(key.clone(), 2));

    editor.toggle_inline_style(UNDERLINE);
    assert!(!editor.can_undo());
    assert_eq!(editor.current_inline_style(), StyleSet::from_styles([UNDERLINE]));

    editor.insert_text("cd").unwrap();
    let block = editor.content().block_for_key(&key).unwrap();
    assert_eq!(block.text, "abcd");
    let underlined: Vec<bool> = block.characters.iter().map(|meta| meta.has_style(UNDERLINE)).collect();
    assert_eq!(underlined, vec![false, false, true, true]);
}

#[test]
fn moving_the_caret_drops_the_pending_style() {
    let key = BlockKey::new("a");
    let mut editor = EditorState::new(single_block(Block::new(key.clone(), BlockType::Unstyled, "ab")));
    editor.set_selection(SelectionState::collapsed(key.clone(), 1));
    editor.toggle_inline_style(BOLD);
    assert!(editor.inline_style_override().is_some());

    editor.set_selection(SelectionState::collapsed(key, 2));
    assert!(editor.inline_style_override().is_none());
    assert!(editor.current_inline_style().is_empty());
}

#[test]
fn color_replaces_the_previous_color() {
    let mut meta = CharacterMetadata::default();
    meta.apply_style("color-#ff0000");
    meta.apply_style(BOLD);
    meta.apply_style("color-#00ff00");
    assert_eq!(meta.style, StyleSet::from_styles([BOLD, "color-#00ff00"]));
}

fn toggle_case() -> impl Strategy<Value = (String, Vec<bool>, usize, usize, bool)> {
    "[a-z ]{1,24}".prop_flat_map(|text| {
        let len = text.chars().count();
        (
            Just(text),
            proptest::collection::vec(any::<bool>(), len),
            0..=len,
            0..=len,
            any::<bool>(),
        )
    })
}

proptest! {
    #[test]
    fn toggling_twice_restores_uniform_selections(
        (text, italic, a, b, bold) in toggle_case()
    ) {
        let (start, end) = (a.min(b), a.max(b));
        let key = BlockKey::new("a");
        let mut block = Block::new(key.clone(), BlockType::Unstyled, text.as_str());
        for (ix, flag) in italic.iter().enumerate() {
            if *flag {
                block.characters[ix].apply_style(ITALIC);
            }
            // Bold outside the selection is arbitrary; inside it is uniform.
            if (ix >= start && ix < end && bold) || (!(ix >= start && ix < end) && *flag) {
                block.characters[ix].apply_style(BOLD);
            }
        }
        let content = single_block(block);
        let selection = SelectionState::within(key, start, end);

        let once = modifier::toggle_inline_style(&content, &selection, BOLD);
        let twice = modifier::toggle_inline_style(&once, &selection, BOLD);
        prop_assert_eq!(styles(&twice), styles(&content));
        prop_assert_eq!(twice.plain_text(), text);
    }
}
