use std::sync::Arc;

use folio_core::{
    BOLD, BlockKey, BlockType, Command, CommandAction, CommandError, ContentState, DocumentValue,
    EditorState, EntityType, SelectionState, SequentialKeys,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn editor(text: &str) -> EditorState {
    EditorState::new(ContentState::from_text(text, Arc::new(SequentialKeys::new())))
}

fn select(editor: &mut EditorState, key: &str, start: usize, end: usize) {
    editor.set_selection(SelectionState::within(BlockKey::new(key), start, end));
}

#[test]
fn unknown_commands_are_rejected() {
    let mut editor = editor("x");
    let err = editor.run_command("marks.sparkle", None).unwrap_err();
    assert_eq!(err, CommandError::new("Unknown command: marks.sparkle"));
}

#[test]
fn hidden_commands_are_not_listed() {
    let editor = editor("x");
    let ids = editor.commands().ids();
    assert!(ids.contains(&"marks.toggle_bold"));
    assert!(ids.contains(&"table.insert"));
    assert!(!ids.contains(&"table.set_cell"));
    assert!(editor.commands().command("table.set_cell").is_some());
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted);
}

#[test]
fn built_in_commands_describe_their_action() {
    let editor = editor("x");
    let action = |id: &str| editor.commands().command(id).unwrap().action.clone();
    assert!(matches!(action("marks.toggle_bold"), CommandAction::ToggleStyle(BOLD)));
    assert!(matches!(action("block.outdent"), CommandAction::AdjustDepth(-1)));
    assert!(matches!(
        action("marks.set_color"),
        CommandAction::SetStyleValue { prefix: "color-", arg: "color" }
    ));
}

#[test]
fn custom_commands_can_be_registered_once() {
    let mut editor = editor("x");
    let shout = Command::custom("doc.shout", "Shout", |editor, _args| {
        editor.insert_text("!")?;
        Ok(())
    });
    editor.register_command(shout.clone()).unwrap();
    let err = editor.register_command(shout).unwrap_err();
    assert_eq!(err.message(), "Duplicate command id: doc.shout");

    editor.set_selection(SelectionState::collapsed(BlockKey::new("k1"), 1));
    editor.run_command("doc.shout", None).unwrap();
    assert_eq!(editor.content().plain_text(), "x!");
}

#[test]
fn mark_commands_style_the_selection() {
    let mut editor = editor("styled text");
    select(&mut editor, "k1", 0, 6);
    editor.run_command("marks.toggle_bold", None).unwrap();
    editor
        .run_command("marks.set_color", Some(json!({ "color": "#ff0000" })))
        .unwrap();
    editor
        .run_command("marks.set_font_size", Some(json!({ "size": 18 })))
        .unwrap();

    let block = editor.content().block_at(0).unwrap();
    let style = block.style_at(0);
    assert!(style.contains(BOLD));
    assert_eq!(style.prefixed_value("color-"), Some("#ff0000"));
    assert_eq!(style.prefixed_value("fontsize-"), Some("18"));
    assert!(block.style_at(6).is_empty());

    editor.run_command("marks.clear", None).unwrap();
    assert!(editor.content().block_at(0).unwrap().style_at(0).is_empty());
    assert_eq!(editor.undo_stack().len(), 4);
}

#[test]
fn missing_arguments_are_reported() {
    let mut editor = editor("x");
    let err = editor.run_command("marks.set_color", None).unwrap_err();
    assert_eq!(err.message(), "Missing args.color");
    let err = editor
        .run_command("block.set_align", Some(json!({ "align": "sideways" })))
        .unwrap_err();
    assert_eq!(err.message(), "Unsupported alignment: sideways");
    assert!(!editor.can_undo());
}

#[test]
fn block_type_can_be_toggled_off() {
    let mut editor = editor("Title");
    select(&mut editor, "k1", 0, 0);
    let args = json!({ "type": "header-one", "toggle": true });
    editor.run_command("block.set_type", Some(args.clone())).unwrap();
    assert_eq!(editor.current_block_type(), Some(BlockType::HeaderOne));
    editor.run_command("block.set_type", Some(args)).unwrap();
    assert_eq!(editor.current_block_type(), Some(BlockType::Unstyled));

    let err = editor
        .run_command("block.set_type", Some(json!({ "type": "banner" })))
        .unwrap_err();
    assert!(err.message().contains("banner"));
}

#[test]
fn tab_indents_list_items_only() {
    let mut editor = editor("item");
    select(&mut editor, "k1", 0, 0);
    assert!(!editor.handle_tab(false));

    editor
        .run_command("block.set_type", Some(json!({ "type": "unordered-list-item" })))
        .unwrap();
    assert!(editor.handle_tab(false));
    assert!(editor.handle_tab(false));
    assert_eq!(editor.content().block_at(0).unwrap().depth, 2);
    assert!(editor.handle_tab(true));
    assert_eq!(editor.content().block_at(0).unwrap().depth, 1);
}

#[test]
fn alignment_is_stored_in_block_data() {
    let mut editor = editor("centered");
    editor
        .run_command("block.set_align", Some(json!({ "align": "center" })))
        .unwrap();
    assert_eq!(editor.content().block_at(0).unwrap().data_str("textAlign"), Some("center"));
}

#[test]
fn invalid_links_leave_the_document_untouched() {
    let mut editor = editor("read more");
    select(&mut editor, "k1", 5, 9);
    let before = editor.content().clone();

    let err = editor
        .run_command("link.insert", Some(json!({ "url": "not a url", "title": "more" })))
        .unwrap_err();
    assert_eq!(err.message(), "invalid link url: \"not a url\"");
    let err = editor
        .run_command("link.insert", Some(json!({ "url": "https://example.com", "title": " " })))
        .unwrap_err();
    assert_eq!(err.message(), "link title must not be empty");

    assert_eq!(editor.content(), &before);
    assert!(editor.content().entity_map().is_empty());
}

#[test]
fn link_insert_replaces_the_selection() {
    let mut editor = editor("read more");
    select(&mut editor, "k1", 5, 9);
    editor
        .run_command(
            "link.insert",
            Some(json!({ "url": "https://example.com/docs", "title": "the docs" })),
        )
        .unwrap();

    let content = editor.content();
    let block = content.block_at(0).unwrap();
    assert_eq!(block.text, "read the docs");
    let entity = block.entity_at(5).unwrap();
    assert_eq!(block.entity_range_at(5), Some((5, 13)));
    let link = content.entity(entity).unwrap();
    assert_eq!(link.entity_type, EntityType::Link);
    assert_eq!(link.data_str("url"), Some("https://example.com/docs"));
    assert_eq!(link.data_str("target"), Some("_blank"));
}

#[test]
fn link_insert_at_a_caret_inside_a_link_replaces_it() {
    let mut editor = editor("see docs");
    select(&mut editor, "k1", 4, 8);
    editor.add_link("https://old.example.com", "docs").unwrap();
    editor.set_selection(SelectionState::collapsed(BlockKey::new("k1"), 6));
    let entity = editor.add_link("https://new.example.com", "manual").unwrap();

    let block = editor.content().block_at(0).unwrap();
    assert_eq!(block.text, "see manual");
    assert_eq!(block.entity_range_at(4), Some((4, 10)));
    assert_eq!(block.entity_at(4), Some(entity));
}

#[test]
fn media_and_custom_blocks_insert_after_the_caret() {
    let mut editor = editor("intro");
    editor.set_selection(SelectionState::collapsed(BlockKey::new("k1"), 5));
    editor
        .run_command(
            "image.insert",
            Some(json!({ "fileUrl": "https://cdn.example.com/a.png", "fileName": "a.png" })),
        )
        .unwrap();
    editor.run_command("divider.insert", None).unwrap();
    editor
        .run_command(
            "link_card.insert",
            Some(json!({ "url": "https://example.com", "title": "Example", "id": "card-1" })),
        )
        .unwrap();

    let types: Vec<BlockType> = editor.content().blocks().map(|block| block.block_type).collect();
    assert_eq!(
        types,
        vec![
            BlockType::Unstyled,
            BlockType::Atomic,
            BlockType::Divider,
            BlockType::LinkCard,
            BlockType::Unstyled,
        ]
    );
    let card = editor.content().block_at(3).unwrap();
    assert_eq!(card.data_str("id"), Some("card-1"));
    assert_eq!(card.data_str("title"), Some("Example"));
    let image = &editor.content().images()[0];
    assert_eq!(image.name.as_deref(), Some("a.png"));
    assert!(editor.content().validate().is_ok());
}

#[test]
fn video_is_not_inserted_over_an_atomic_block() {
    let mut editor = editor("");
    let first = editor.add_video("https://cdn.example.com/a.mp4").unwrap();
    assert!(first.is_some());
    let atomic = editor.content().block_at(0).unwrap().key.clone();
    editor.set_selection(SelectionState::collapsed(atomic, 0));
    assert_eq!(editor.add_video("https://cdn.example.com/b.mp4").unwrap(), None);
    assert_eq!(editor.undo_stack().len(), 1);
}

#[test]
fn history_commands_walk_the_stack() {
    let mut editor = editor("a");
    editor.set_selection(SelectionState::collapsed(BlockKey::new("k1"), 1));
    editor.insert_text("b").unwrap();
    editor.run_command("history.undo", None).unwrap();
    assert_eq!(editor.content().plain_text(), "a");
    editor.run_command("history.redo", None).unwrap();
    assert_eq!(editor.content().plain_text(), "ab");
    // Nothing left to redo; still not an error.
    editor.run_command("history.redo", None).unwrap();
}

#[test]
fn documents_survive_the_json_envelope() {
    let mut editor = editor("hello");
    select(&mut editor, "k1", 0, 5);
    editor.toggle_inline_style(BOLD);
    editor.set_selection(SelectionState::collapsed(BlockKey::new("k1"), 5));
    editor.add_image(&folio_core::UploadedFile::new("a.png", "a.png")).unwrap();

    let value = DocumentValue::from_content(editor.content());
    let json = value.to_json_pretty().unwrap();
    let parsed = DocumentValue::from_json_str(&json).unwrap();
    assert_eq!(parsed.schema, "folio");
    assert_eq!(parsed.version, 1);
    let restored = parsed.into_content().unwrap();
    assert_eq!(&restored, editor.content());
    assert!(restored.validate().is_ok());
}
