//! Cursor and selection within a single block.
//!
//! ## Learning: Anchor and Focus
//!
//! A selection remembers where it started (`anchor`) and where the
//! caret is (`focus`). Dragging backwards gives `focus < anchor`; the
//! normalized view is available through `start()` and `end()`. When the
//! two are equal the selection is just a caret.

use serde::{Deserialize, Serialize};

use crate::block::BlockKey;

/// A caret or range inside one block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub block_key: BlockKey,
    pub anchor_offset: usize,
    pub focus_offset: usize,
    /// Whether the editing surface currently has input focus
    pub has_focus: bool,
}

impl Selection {
    /// Creates an unfocused caret.
    pub fn caret(block_key: BlockKey, offset: usize) -> Self {
        Self {
            block_key,
            anchor_offset: offset,
            focus_offset: offset,
            has_focus: false,
        }
    }

    /// Creates an unfocused range.
    pub fn range(block_key: BlockKey, anchor_offset: usize, focus_offset: usize) -> Self {
        Self {
            block_key,
            anchor_offset,
            focus_offset,
            has_focus: false,
        }
    }

    /// Same selection with the focus flag set.
    pub fn with_focus(mut self, has_focus: bool) -> Self {
        self.has_focus = has_focus;
        self
    }

    /// Returns true for a caret.
    pub fn is_collapsed(&self) -> bool {
        self.anchor_offset == self.focus_offset
    }

    pub fn start(&self) -> usize {
        self.anchor_offset.min(self.focus_offset)
    }

    pub fn end(&self) -> usize {
        self.anchor_offset.max(self.focus_offset)
    }

    /// Same selection with both offsets clamped to `0..=len`.
    pub fn clamped(&self, len: usize) -> Self {
        Self {
            block_key: self.block_key.clone(),
            anchor_offset: self.anchor_offset.min(len),
            focus_offset: self.focus_offset.min(len),
            has_focus: self.has_focus,
        }
    }
}

/// Which way a removal reaches from a caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Towards the start of the block (backspace)
    #[default]
    Backward,
    /// Towards the end of the block (delete)
    Forward,
}
