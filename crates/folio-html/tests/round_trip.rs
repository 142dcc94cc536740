use std::sync::Arc;

use folio_core::{
    BOLD, Block, BlockData, BlockKey, BlockType, CharacterMetadata, ContentState, EntityData,
    EntityMap, EntityType, ITALIC, Mutability, STRIKETHROUGH, SequentialKeys, StyleSet,
    TableData, UNDERLINE,
};
use folio_html::{parse, serialize};
use proptest::prelude::*;
use serde_json::json;

const TEXT_TYPES: [BlockType; 11] = [
    BlockType::Unstyled,
    BlockType::HeaderOne,
    BlockType::HeaderTwo,
    BlockType::HeaderThree,
    BlockType::HeaderFour,
    BlockType::HeaderFive,
    BlockType::HeaderSix,
    BlockType::Blockquote,
    BlockType::CodeBlock,
    BlockType::UnorderedListItem,
    BlockType::OrderedListItem,
];

const STYLE_BITS: [&str; 4] = [BOLD, ITALIC, UNDERLINE, STRIKETHROUGH];

#[derive(Debug, Clone)]
enum BlockSpec {
    Text {
        block_type: BlockType,
        depth: usize,
        text: String,
        styles: Vec<u8>,
        link: Option<(usize, usize)>,
    },
    Media(EntityType),
    Table {
        rows: usize,
        cols: usize,
        cells: Vec<String>,
        id: String,
    },
    LinkCard {
        url: String,
        title: String,
        id: String,
    },
    Divider,
}

fn text_block() -> impl Strategy<Value = BlockSpec> {
    (
        prop::sample::select(TEXT_TYPES.to_vec()),
        0usize..3,
        "[a-z<>&]([a-z<>& ]{0,10}[a-z<>&])?",
    )
        .prop_flat_map(|(block_type, depth, text)| {
            let len = text.chars().count();
            (
                Just(block_type),
                Just(depth),
                Just(text),
                proptest::collection::vec(0u8..16, len),
                proptest::option::of((0..len, 1..=len)),
            )
        })
        .prop_map(|(block_type, depth, text, styles, link)| BlockSpec::Text {
            block_type,
            depth,
            text,
            styles,
            link,
        })
}

fn custom_block() -> impl Strategy<Value = BlockSpec> {
    let table = (1usize..4, 1usize..4, "[a-z0-9]{1,6}")
        .prop_flat_map(|(rows, cols, id)| {
            (
                Just(rows),
                Just(cols),
                proptest::collection::vec("[a-zA-Z0-9 <>&\"'%]{0,8}", rows * cols),
                Just(id),
            )
        })
        .prop_map(|(rows, cols, cells, id)| BlockSpec::Table {
            rows,
            cols,
            cells,
            id,
        });
    let link_card = (
        "https://[a-z]{1,8}\\.dev/[a-z0-9?=&]{0,6}",
        "[a-zA-Z<>&\"' ]{1,12}",
        "[a-z0-9]{1,6}",
    )
        .prop_map(|(url, title, id)| BlockSpec::LinkCard { url, title, id });
    prop_oneof![table, link_card, Just(BlockSpec::Divider)]
}

fn document() -> impl Strategy<Value = Vec<BlockSpec>> {
    proptest::collection::vec(
        prop_oneof![
            6 => text_block(),
            1 => prop_oneof![Just(EntityType::Image), Just(EntityType::Video)]
                .prop_map(BlockSpec::Media),
            1 => custom_block(),
        ],
        1..6,
    )
}

fn style_set(bits: u8) -> StyleSet {
    STYLE_BITS
        .iter()
        .enumerate()
        .filter(|(ix, _)| bits & (1 << ix) != 0)
        .map(|(_, style)| *style)
        .collect()
}

/// List items never skip a level; other blocks sit at depth 0.
fn build(specs: &[BlockSpec]) -> ContentState {
    let mut entities = EntityMap::new();
    let mut blocks = Vec::new();
    let mut list_depth: Option<usize> = None;

    for (ix, spec) in specs.iter().enumerate() {
        let key = BlockKey::new(format!("b{ix}"));
        match spec {
            BlockSpec::Text {
                block_type,
                depth,
                text,
                styles,
                link,
            } => {
                let depth = if block_type.is_list_item() {
                    (*depth).min(list_depth.map_or(0, |prev| prev + 1))
                } else {
                    0
                };
                let characters = styles
                    .iter()
                    .map(|bits| CharacterMetadata::styled(style_set(*bits)))
                    .collect();
                let mut block = Block::new(key, *block_type, text.clone())
                    .with_characters(characters)
                    .with_depth(depth);
                if let Some((start, len)) = link {
                    let end = (start + len).min(text.chars().count());
                    let data = EntityData::from([(
                        "url".to_string(),
                        json!(format!("https://example.com/{ix}")),
                    )]);
                    let entity = entities.create(EntityType::Link, Mutability::Mutable, data);
                    block = block.with_entity(*start, end, entity);
                }
                list_depth = block_type.is_list_item().then_some(depth);
                blocks.push(block);
            }
            BlockSpec::Media(kind) => {
                let data =
                    EntityData::from([("src".to_string(), json!(format!("media-{ix}.bin")))]);
                let entity = entities.create(*kind, Mutability::Immutable, data);
                blocks.push(Block::new(key, BlockType::Atomic, " ").with_entity(0, 1, entity));
                list_depth = None;
            }
            BlockSpec::Table {
                rows,
                cols,
                cells,
                id,
            } => {
                let column_keys = SequentialKeys::with_prefix(format!("t{ix}c"));
                let mut table = TableData::new(*rows, *cols, &column_keys);
                for (row_ix, row) in table.data_source.iter_mut().enumerate() {
                    for (col_ix, column) in table.columns.iter().enumerate() {
                        let text = &cells[row_ix * cols + col_ix];
                        row.cells.insert(column.data_index.clone(), json!(text));
                    }
                }
                let mut data = BlockData::from([("id".to_string(), json!(id))]);
                table.write_into(&mut data);
                blocks.push(Block::new(key, BlockType::Table, "").with_data(data));
                list_depth = None;
            }
            BlockSpec::LinkCard { url, title, id } => {
                let data = BlockData::from([
                    ("url".to_string(), json!(url)),
                    ("title".to_string(), json!(title)),
                    ("id".to_string(), json!(id)),
                ]);
                blocks.push(Block::new(key, BlockType::LinkCard, "").with_data(data));
                list_depth = None;
            }
            BlockSpec::Divider => {
                let data = BlockData::from([("type".to_string(), json!("divider"))]);
                blocks.push(Block::new(key, BlockType::Divider, "").with_data(data));
                list_depth = None;
            }
        }
    }

    ContentState::from_blocks_with_keys(blocks, entities, Arc::new(SequentialKeys::new()))
}

type Shape = (
    BlockType,
    String,
    usize,
    BlockData,
    Vec<StyleSet>,
    Vec<Option<EntityType>>,
    Vec<bool>,
);

/// Everything a round trip must keep, block data included: keys and entity
/// ids may change.
fn shape(content: &ContentState) -> Vec<Shape> {
    content
        .blocks()
        .map(|block| {
            let entity_types = block
                .characters
                .iter()
                .map(|meta| {
                    meta.entity
                        .and_then(|key| content.entity(key))
                        .map(|entity| entity.entity_type)
                })
                .collect();
            let continues_entity = block
                .characters
                .windows(2)
                .map(|pair| pair[0].entity.is_some() && pair[0].entity == pair[1].entity)
                .collect();
            (
                block.block_type,
                block.text.clone(),
                block.depth,
                block.data.clone(),
                block.characters.iter().map(|meta| meta.style.clone()).collect(),
                entity_types,
                continues_entity,
            )
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn parse_inverts_serialize(specs in document()) {
        let content = build(&specs);
        let html = serialize(&content);
        let parsed = parse(&html);

        prop_assert!(parsed.validate().is_ok(), "invalid parse of {}", html);
        prop_assert_eq!(shape(&parsed), shape(&content), "html: {}", html);
    }

    #[test]
    fn serialization_is_a_fixed_point(specs in document()) {
        let html = serialize(&build(&specs));
        prop_assert_eq!(serialize(&parse(&html)), html);
    }
}
