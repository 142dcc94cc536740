use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::entity::EntityKey;

pub const BOLD: &str = "BOLD";
pub const ITALIC: &str = "ITALIC";
pub const UNDERLINE: &str = "UNDERLINE";
pub const STRIKETHROUGH: &str = "STRIKETHROUGH";
pub const CODE: &str = "CODE";
pub const HIGHLIGHT: &str = "HIGHLIGHT";

/// Prefix of composite color styles, e.g. `color-#ff0000`.
pub const COLOR_PREFIX: &str = "color-";
/// Prefix of composite font size styles, e.g. `fontsize-18`.
pub const FONT_SIZE_PREFIX: &str = "fontsize-";

/// The unordered set of inline style tags applied to one character.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleSet(BTreeSet<String>);

impl StyleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_styles<I, S>(styles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(styles.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, style: &str) -> bool {
        self.0.contains(style)
    }

    pub fn insert(&mut self, style: impl Into<String>) -> bool {
        self.0.insert(style.into())
    }

    pub fn remove(&mut self, style: &str) -> bool {
        self.0.remove(style)
    }

    pub fn with(mut self, style: impl Into<String>) -> Self {
        self.insert(style);
        self
    }

    pub fn without(mut self, style: &str) -> Self {
        self.remove(style);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Value part of the style carrying `prefix`, e.g. `#ff0000` for `color-`.
    pub fn prefixed_value(&self, prefix: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find_map(|style| style.strip_prefix(prefix))
            .filter(|value| !value.is_empty())
    }

    /// Composite styles are exclusive per prefix: a new color replaces the old one.
    pub fn replace_prefixed(&mut self, prefix: &str, value: &str) {
        self.0.retain(|style| !style.starts_with(prefix));
        self.0.insert(format!("{prefix}{value}"));
    }
}

impl<S: Into<String>> FromIterator<S> for StyleSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::from_styles(iter)
    }
}

/// Per-character style and entity reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterMetadata {
    #[serde(default, skip_serializing_if = "StyleSet::is_empty")]
    pub style: StyleSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<EntityKey>,
}

impl CharacterMetadata {
    pub fn new(style: StyleSet, entity: Option<EntityKey>) -> Self {
        Self { style, entity }
    }

    pub fn styled(style: StyleSet) -> Self {
        Self {
            style,
            entity: None,
        }
    }

    pub fn has_style(&self, style: &str) -> bool {
        self.style.contains(style)
    }

    pub fn apply_style(&mut self, style: &str) {
        if let Some(color) = style.strip_prefix(COLOR_PREFIX) {
            self.style.replace_prefixed(COLOR_PREFIX, color);
        } else if let Some(size) = style.strip_prefix(FONT_SIZE_PREFIX) {
            self.style.replace_prefixed(FONT_SIZE_PREFIX, size);
        } else {
            self.style.insert(style);
        }
    }

    pub fn remove_style(&mut self, style: &str) {
        self.style.remove(style);
    }
}

/// Builds a uniform character list for `len` characters.
pub fn uniform_characters(len: usize, meta: &CharacterMetadata) -> Vec<CharacterMetadata> {
    vec![meta.clone(); len]
}
