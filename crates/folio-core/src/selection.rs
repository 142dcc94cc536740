use serde::{Deserialize, Serialize};

use crate::block::BlockKey;

/// Anchor/focus pair addressing character offsets inside blocks.
///
/// `is_backward` is true when the focus precedes the anchor in document order.
/// Use [`crate::ContentState::normalize_selection`] to clamp offsets and
/// compute the direction against a concrete document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    pub anchor_key: BlockKey,
    pub anchor_offset: usize,
    pub focus_key: BlockKey,
    pub focus_offset: usize,
    #[serde(default)]
    pub is_backward: bool,
    #[serde(default)]
    pub has_focus: bool,
}

impl SelectionState {
    pub fn new(
        anchor_key: BlockKey,
        anchor_offset: usize,
        focus_key: BlockKey,
        focus_offset: usize,
    ) -> Self {
        Self {
            anchor_key,
            anchor_offset,
            focus_key,
            focus_offset,
            is_backward: false,
            has_focus: true,
        }
    }

    pub fn collapsed(key: BlockKey, offset: usize) -> Self {
        Self::new(key.clone(), offset, key, offset)
    }

    /// Forward selection of `start..end` inside one block.
    pub fn within(key: BlockKey, start: usize, end: usize) -> Self {
        Self::new(key.clone(), start, key, end)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor_key == self.focus_key && self.anchor_offset == self.focus_offset
    }

    pub fn start_key(&self) -> &BlockKey {
        if self.is_backward {
            &self.focus_key
        } else {
            &self.anchor_key
        }
    }

    pub fn start_offset(&self) -> usize {
        if self.is_backward {
            self.focus_offset
        } else {
            self.anchor_offset
        }
    }

    pub fn end_key(&self) -> &BlockKey {
        if self.is_backward {
            &self.anchor_key
        } else {
            &self.focus_key
        }
    }

    pub fn end_offset(&self) -> usize {
        if self.is_backward {
            self.anchor_offset
        } else {
            self.focus_offset
        }
    }

    pub fn has_edge_within(&self, key: &BlockKey) -> bool {
        &self.anchor_key == key || &self.focus_key == key
    }

    pub fn collapse_to_start(&self) -> Self {
        Self::collapsed(self.start_key().clone(), self.start_offset())
    }

    pub fn collapse_to_end(&self) -> Self {
        Self::collapsed(self.end_key().clone(), self.end_offset())
    }
}
