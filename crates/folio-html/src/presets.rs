//! Serializer configuration used by the editor when it saves a document.

use folio_core::{
    Block, BlockType, COLOR_PREFIX, Entity, EntityType, FONT_SIZE_PREFIX, StyleSet,
};
use serde_json::Value;

use crate::options::{RenderConfig, SerializeOptions};
use crate::serialize::encode_json_attribute;

/// `div` blocks, composite color/size spans, sized media and custom-block
/// attributes.
pub fn editor_options() -> SerializeOptions {
    SerializeOptions::new()
        .with_default_block_tag("div")
        .with_inline_style_fn(composite_style)
        .with_entity_style_fn(media_element)
        .with_block_style_fn(block_style)
}

fn composite_style(style: &StyleSet) -> Option<RenderConfig> {
    let mut config = RenderConfig::element("span");
    if let Some(color) = style.prefixed_value(COLOR_PREFIX) {
        config = config.with_style("color", color);
    }
    if let Some(size) = style.prefixed_value(FONT_SIZE_PREFIX) {
        config = config.with_style("fontSize", format!("{size}px"));
    }
    (!config.style.is_empty()).then_some(config)
}

fn media_element(entity: &Entity) -> Option<RenderConfig> {
    match entity.entity_type {
        EntityType::Image => {
            let src = entity.data_str("src").unwrap_or_default();
            let width = entity
                .data
                .get("width")
                .and_then(css_value)
                .unwrap_or_else(|| "auto".to_string());
            let mut config = RenderConfig::element("img")
                .with_attribute("src", src)
                .with_attribute("width", width.clone());
            match entity.data_str("alignment") {
                Some(alignment) => config = config.with_style("textAlign", alignment),
                None => {
                    if let Some(Value::Object(style)) = entity.data.get("style") {
                        for (property, value) in style {
                            if let Some(value) = css_value(value) {
                                config = config.with_style(property.clone(), value);
                            }
                        }
                    }
                    config = config.with_style("width", width);
                }
            }
            Some(config)
        }
        EntityType::Video => Some(
            RenderConfig::element("video")
                .with_attribute("src", entity.data_str("src").unwrap_or_default())
                .with_attribute("width", "auto"),
        ),
        EntityType::Link => None,
    }
}

fn block_style(block: &Block) -> Option<RenderConfig> {
    match block.block_type {
        BlockType::LinkCard | BlockType::Divider => {
            let mut config = RenderConfig::new();
            for key in ["url", "title"] {
                if let Some(value) = block.data_str(key) {
                    config = config.with_attribute(key, value);
                }
            }
            config = config.with_attribute("type", block.block_type.as_str());
            if let Some(id) = block.data_str("id") {
                config = config.with_attribute("id", id);
            }
            Some(config)
        }
        BlockType::Table => Some(
            RenderConfig::new()
                .with_attribute(
                    "dataSource",
                    encode_json_attribute(block.data.get("dataSource")),
                )
                .with_attribute("columns", encode_json_attribute(block.data.get("columns")))
                .with_attribute("type", BlockType::Table.as_str()),
        ),
        _ => block
            .data_str("textAlign")
            .map(|align| RenderConfig::new().with_style("textAlign", align)),
    }
}

fn css_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
