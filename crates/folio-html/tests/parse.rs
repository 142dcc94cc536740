use std::sync::Arc;

use folio_core::{
    BOLD, BlockType, CODE, ContentState, EntityType, ITALIC, Mutability, STRIKETHROUGH,
    SequentialKeys, StyleSet, TableData, UNDERLINE,
};
use folio_html::{ParseOptions, encode_json_attribute, parse, parse_with};
use pretty_assertions::assert_eq;
use serde_json::json;

fn blocks(content: &ContentState) -> Vec<(BlockType, String, usize)> {
    content
        .blocks()
        .map(|block| (block.block_type, block.text.clone(), block.depth))
        .collect()
}

fn styles(content: &ContentState, index: usize) -> Vec<StyleSet> {
    content
        .block_at(index)
        .unwrap()
        .characters
        .iter()
        .map(|meta| meta.style.clone())
        .collect()
}

#[test]
fn paragraph_with_bold_word() {
    let content = parse("<p>Hello <strong>world</strong></p>");

    assert_eq!(
        blocks(&content),
        vec![(BlockType::Unstyled, "Hello world".to_string(), 0)]
    );
    let styles = styles(&content, 0);
    assert!(styles[..6].iter().all(StyleSet::is_empty));
    assert!(styles[6..].iter().all(|style| style.contains(BOLD) && style.len() == 1));
}

#[test]
fn list_items_follow_their_wrapper() {
    let content = parse("<ul><li>A</li><li>B</li></ul><ol><li>C</li></ol>");

    assert_eq!(
        blocks(&content),
        vec![
            (BlockType::UnorderedListItem, "A".to_string(), 0),
            (BlockType::UnorderedListItem, "B".to_string(), 0),
            (BlockType::OrderedListItem, "C".to_string(), 0),
        ]
    );
}

#[test]
fn nested_lists_increase_depth() {
    let content = parse(
        "<ul><li>A<ul><li>B<ol><li>C</li></ol></li></ul></li><li>D</li></ul>",
    );

    assert_eq!(
        blocks(&content),
        vec![
            (BlockType::UnorderedListItem, "A".to_string(), 0),
            (BlockType::UnorderedListItem, "B".to_string(), 1),
            (BlockType::OrderedListItem, "C".to_string(), 2),
            (BlockType::UnorderedListItem, "D".to_string(), 0),
        ]
    );
}

#[test]
fn pasted_depth_classes_are_kept() {
    let content = parse(
        r#"<ul><li class="item public/DraftStyleDefault/depth2">deep</li></ul>"#,
    );
    assert_eq!(
        blocks(&content),
        vec![(BlockType::UnorderedListItem, "deep".to_string(), 2)]
    );
}

#[test]
fn containers_lend_their_type_to_paragraphs() {
    let content = parse(
        "<ul><li><p>item</p></li></ul><blockquote><p>one</p><p>two</p></blockquote>",
    );

    assert_eq!(
        blocks(&content),
        vec![
            (BlockType::UnorderedListItem, "item".to_string(), 0),
            (BlockType::Blockquote, "one".to_string(), 0),
            (BlockType::Blockquote, "two".to_string(), 0),
        ]
    );
}

#[test]
fn container_text_keeps_document_order() {
    let content = parse("<div>intro<p>para</p>tail</div>");

    let texts: Vec<String> = content.blocks().map(|block| block.text.clone()).collect();
    assert_eq!(texts, ["intro", "para", "tail"]);
    assert!(content.blocks().all(|block| block.block_type == BlockType::Unstyled));
}

#[test]
fn headings_and_custom_type_attribute() {
    let content = parse(r#"<h1>One</h1><h4>Four</h4><div type="header-two">Two</div>"#);

    assert_eq!(
        blocks(&content),
        vec![
            (BlockType::HeaderOne, "One".to_string(), 0),
            (BlockType::HeaderFour, "Four".to_string(), 0),
            (BlockType::HeaderTwo, "Two".to_string(), 0),
        ]
    );
}

#[test]
fn inline_css_adds_and_removes_styles() {
    let content = parse(concat!(
        r#"<p><span style="font-weight: bold">a</span>"#,
        r#"<strong style="font-weight: normal">b</strong>"#,
        r#"<span style="text-decoration: underline line-through">c</span>"#,
        r#"<span style="font-family: Menlo, monospace">d</span>"#,
        r#"<em style="font-style: normal">e</em></p>"#,
    ));

    assert_eq!(
        styles(&content, 0),
        vec![
            StyleSet::from_styles([BOLD]),
            StyleSet::new(),
            StyleSet::from_styles([UNDERLINE, STRIKETHROUGH]),
            StyleSet::from_styles([CODE]),
            StyleSet::new(),
        ]
    );
}

#[test]
fn span_color_and_font_size_become_composite_styles() {
    let content = parse(r#"<p><i><span style="color: #ff0000; font-size: 18px">x</span></i></p>"#);

    assert_eq!(
        styles(&content, 0),
        vec![StyleSet::from_styles([ITALIC, "color-#ff0000", "fontsize-18"])]
    );
}

#[test]
fn anchors_create_link_entities() {
    let content = parse(
        r#"<p>see <a href="https://example.com" target="_blank" class="ext">docs</a> now</p>"#,
    );

    let block = content.block_at(0).unwrap();
    assert_eq!(block.text, "see docs now");
    let key = block.entity_at(4).unwrap();
    assert_eq!(block.entity_range_at(4), Some((4, 8)));
    assert_eq!(block.entity_at(3), None);

    let entity = content.entity(key).unwrap();
    assert_eq!(entity.entity_type, EntityType::Link);
    assert_eq!(entity.mutability, Mutability::Mutable);
    assert_eq!(entity.data_str("url"), Some("https://example.com"));
    assert_eq!(entity.data_str("href"), Some("https://example.com"));
    assert_eq!(entity.data_str("target"), Some("_blank"));
    assert_eq!(entity.data_str("className"), Some("ext"));
}

#[test]
fn anchors_without_href_are_plain_text() {
    let content = parse("<p><a name=\"top\">plain</a></p>");

    assert_eq!(content.block_at(0).unwrap().entity_at(0), None);
    assert!(content.entity_map().is_empty());
}

#[test]
fn entity_whitespace_survives_trimming() {
    let content = parse(r#"<p><a href="https://a.dev">link </a></p>"#);

    let block = content.block_at(0).unwrap();
    assert_eq!(block.text, "link ");
    assert!(block.entity_at(4).is_some());
}

#[test]
fn images_split_the_surrounding_text() {
    let content = parse(
        r#"<p>before<img src="a.png" width="120" style="text-align: center">after</p>"#,
    );

    assert_eq!(
        blocks(&content),
        vec![
            (BlockType::Unstyled, "before".to_string(), 0),
            (BlockType::Atomic, " ".to_string(), 0),
            (BlockType::Unstyled, "after".to_string(), 0),
        ]
    );
    let key = content.block_at(1).unwrap().entity_at(0).unwrap();
    let entity = content.entity(key).unwrap();
    assert_eq!(entity.entity_type, EntityType::Image);
    assert_eq!(entity.mutability, Mutability::Immutable);
    assert_eq!(entity.data["src"], json!("a.png"));
    assert_eq!(
        entity.data["style"],
        json!({ "textAlign": "center", "width": "120" })
    );
    assert!(content.validate().is_ok());
}

#[test]
fn video_in_figure_is_atomic() {
    let content = parse(r#"<figure><video src="v.mp4" width="auto"></video></figure>"#);

    let block = content.block_at(0).unwrap();
    assert_eq!(content.block_count(), 1);
    assert_eq!(block.block_type, BlockType::Atomic);
    let entity = content.entity(block.entity_at(0).unwrap()).unwrap();
    assert_eq!(entity.entity_type, EntityType::Video);
    assert_eq!(entity.data_str("src"), Some("v.mp4"));
    assert!(!entity.data.contains_key("style"));
}

#[test]
fn media_without_src_is_ignored() {
    let content = parse(r#"<p>x<img alt="broken">y</p><figure>caption only</figure>"#);

    assert_eq!(
        blocks(&content),
        vec![
            (BlockType::Unstyled, "xy".to_string(), 0),
            (BlockType::Unstyled, "caption only".to_string(), 0),
        ]
    );
    assert!(content.entity_map().is_empty());
}

#[test]
fn whitespace_is_normalized_outside_pre() {
    let content = parse("<p>line one\nline two</p><p>a&nbsp;&nbsp;b&#8203;</p><p>soft<br>break</p>");

    let texts: Vec<String> = content.blocks().map(|block| block.text.clone()).collect();
    assert_eq!(texts, ["line one line two", "a  b", "soft\nbreak"]);
}

#[test]
fn code_blocks_keep_their_whitespace() {
    let content = parse("<pre><code>fn main() {\n    run();\n}</code><code>second</code></pre>");

    assert_eq!(
        blocks(&content),
        vec![
            (BlockType::CodeBlock, "fn main() {\n    run();\n}".to_string(), 0),
            (BlockType::CodeBlock, "second".to_string(), 0),
        ]
    );
    assert!(styles(&content, 0).iter().all(StyleSet::is_empty));
}

#[test]
fn script_like_subtrees_are_skipped() {
    let content = parse(
        "<p>x</p><script>alert(1)</script><style>p { color: red }</style><template><p>t</p></template><p>y</p>",
    );

    let texts: Vec<String> = content.blocks().map(|block| block.text.clone()).collect();
    assert_eq!(texts, ["x", "y"]);
}

#[test]
fn text_align_becomes_block_data() {
    let content = parse(r#"<p style="text-align: center">c</p>"#);

    assert_eq!(content.block_at(0).unwrap().data_str("textAlign"), Some("center"));
}

#[test]
fn table_attributes_are_decoded() {
    let source = json!([{ "id": "r1", "c1": "x" }]);
    let columns = json!([{ "key": "c1", "dataIndex": "c1", "title": "Name", "width": 120 }]);
    let html = format!(
        r#"<table type="table" id="t1" dataSource="{}" columns="{}"></table>"#,
        encode_json_attribute(Some(&source)),
        encode_json_attribute(Some(&columns)),
    );

    let content = parse(&html);
    let block = content.block_at(0).unwrap();
    assert_eq!(block.block_type, BlockType::Table);
    assert_eq!(block.data["dataSource"], source);
    assert_eq!(block.data["columns"], columns);
    assert_eq!(block.data_str("id"), Some("t1"));

    let table = TableData::from_block(block).unwrap();
    assert_eq!(table.columns[0].title, "Name");
    assert_eq!(table.cell(0, "c1"), Some("x"));
}

#[test]
fn raw_and_malformed_table_json() {
    let content = parse(concat!(
        r#"<table datasource='[{"id":"r","a":"1"}]' columns='[]'></table>"#,
        r#"<table datasource="not json"></table>"#,
    ));

    assert_eq!(content.block_count(), 2);
    assert_eq!(
        content.block_at(0).unwrap().data["dataSource"],
        json!([{ "id": "r", "a": "1" }])
    );
    let broken = content.block_at(1).unwrap();
    assert_eq!(broken.data["dataSource"], json!([]));
    assert_eq!(broken.data["columns"], json!([]));
}

#[test]
fn plain_tables_are_read_from_cells() {
    let content = parse(
        "<table><tr><th>Name</th><th>Age</th></tr><tr><td>Ann</td><td> 31 </td></tr></table>",
    );

    let table = TableData::from_block(content.block_at(0).unwrap()).unwrap();
    let titles: Vec<&str> = table.columns.iter().map(|column| column.title.as_str()).collect();
    assert_eq!(titles, ["Name", "Age"]);
    assert_eq!(table.row_count(), 1);
    assert_eq!(table.cell(0, &table.columns[0].key), Some("Ann"));
    assert_eq!(table.cell(0, &table.columns[1].key), Some("31"));
}

#[test]
fn link_cards_and_dividers() {
    let content = parse(
        r#"<link-card url="https://x.dev" title="X" id="lc1"></link-card><hr><divider type="divider"></divider>"#,
    );

    assert_eq!(
        content.blocks().map(|block| block.block_type).collect::<Vec<_>>(),
        [BlockType::LinkCard, BlockType::Divider, BlockType::Divider]
    );
    let card = content.block_at(0).unwrap();
    assert_eq!(card.data_str("url"), Some("https://x.dev"));
    assert_eq!(card.data_str("title"), Some("X"));
    assert_eq!(card.data_str("id"), Some("lc1"));
    assert_eq!(content.block_at(1).unwrap().data_str("type"), Some("divider"));
}

#[test]
fn empty_input_yields_one_empty_paragraph() {
    for html in ["", "   ", "<p></p>", "<script>x</script>"] {
        let content = parse(html);
        assert_eq!(
            blocks(&content),
            vec![(BlockType::Unstyled, String::new(), 0)],
            "input {html:?}"
        );
    }
}

#[test]
fn loose_text_becomes_a_paragraph() {
    let content = parse("hello <b>world</b>");

    assert_eq!(
        blocks(&content),
        vec![(BlockType::Unstyled, "hello world".to_string(), 0)]
    );
}

#[test]
fn tree_mode_links_containers_and_children() {
    let options = ParseOptions::tree().with_keys(Arc::new(SequentialKeys::new()));
    let content = parse_with("<blockquote><p>a</p><p>b</p></blockquote>", &options);

    let quote = content.block_at(0).unwrap();
    let first = content.block_at(1).unwrap();
    let second = content.block_at(2).unwrap();
    assert_eq!(content.block_count(), 3);
    assert_eq!(quote.block_type, BlockType::Blockquote);
    assert_eq!(quote.children, vec![first.key.clone(), second.key.clone()]);
    assert_eq!(first.parent.as_ref(), Some(&quote.key));
    assert_eq!(first.block_type, BlockType::Unstyled);
    assert_eq!(first.next_sibling.as_ref(), Some(&second.key));
    assert_eq!(second.prev_sibling.as_ref(), Some(&first.key));
    assert_eq!(second.next_sibling, None);
}

#[test]
fn deeply_nested_inline_markup_is_flattened() {
    let html = format!("{}x{}", "<span>".repeat(5_000), "</span>".repeat(5_000));
    let content = parse(&html);

    assert_eq!(
        blocks(&content),
        vec![(BlockType::Unstyled, "x".to_string(), 0)]
    );
}

#[test]
fn deeply_nested_blocks_keep_their_text() {
    let html = format!(
        "{}<b>deep</b> text<script>no</script>{}<p>after</p>",
        "<div>".repeat(5_000),
        "</div>".repeat(5_000)
    );
    let content = parse(&html);

    let texts: Vec<String> = content.blocks().map(|block| block.text.clone()).collect();
    assert_eq!(texts, ["deep text", "after"]);
    assert!(styles(&content, 0).iter().all(StyleSet::is_empty));
    assert!(content.validate().is_ok());
}

#[test]
fn deeply_nested_table_cells_are_read() {
    let html = format!(
        "<table><tr><td>{}cell{}</td></tr></table>",
        "<span>".repeat(5_000),
        "</span>".repeat(5_000)
    );
    let content = parse(&html);

    let table = TableData::from_block(content.block_at(0).unwrap()).unwrap();
    assert_eq!(table.cell(0, &table.columns[0].key), Some("cell"));
}
