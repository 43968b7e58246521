//! Snapshots: the complete editor state at one point in time.
//!
//! A snapshot bundles the document, the selection, the pending style
//! override and a label for the change that produced it. Every method that
//! "changes" a snapshot returns a new one with a higher version.

use serde::{Deserialize, Serialize};

use crate::block::{Block, StyleSet};
use crate::document::Document;
use crate::selection::Selection;
use crate::ModelResult;

/// Label of the operation that produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeType {
    /// Created at startup, empty or restored
    Load,
    InsertCharacters,
    RemoveRange,
    BackspaceCharacter,
    DeleteCharacter,
    SplitBlock,
    ChangeBlockType,
    ChangeInlineStyle,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Load => "load",
            ChangeType::InsertCharacters => "insert-characters",
            ChangeType::RemoveRange => "remove-range",
            ChangeType::BackspaceCharacter => "backspace-character",
            ChangeType::DeleteCharacter => "delete-character",
            ChangeType::SplitBlock => "split-block",
            ChangeType::ChangeBlockType => "change-block-type",
            ChangeType::ChangeInlineStyle => "change-inline-style",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable editor state.
///
/// Invariant: `selection.block_key` names a block of `document` and both
/// offsets lie within that block's text.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    version: u64,
    document: Document,
    selection: Selection,
    /// Styles for the next typed character; `None` means "derive from text"
    style_override: Option<StyleSet>,
    last_change: ChangeType,
}

impl Snapshot {
    /// Creates a version-0 snapshot. The selection's offsets are clamped.
    pub fn new(document: Document, selection: Selection) -> ModelResult<Self> {
        let selection = checked(&document, selection)?;
        Ok(Self {
            version: 0,
            document,
            selection,
            style_override: None,
            last_change: ChangeType::Load,
        })
    }

    /// Wraps a document with an unfocused caret at the start of its first block.
    pub fn from_document(document: Document) -> Self {
        let selection = Selection::caret(document.first_block().key().clone(), 0);
        Self {
            version: 0,
            document,
            selection,
            style_override: None,
            last_change: ChangeType::Load,
        }
    }

    /// A snapshot of a fresh single-block document.
    pub fn empty() -> Self {
        Self::from_document(Document::new())
    }

    // ==================== Getters ====================

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn style_override(&self) -> Option<&StyleSet> {
        self.style_override.as_ref()
    }

    pub fn last_change(&self) -> ChangeType {
        self.last_change
    }

    /// The block holding the selection.
    pub fn selected_block(&self) -> ModelResult<&Block> {
        self.document.block(&self.selection.block_key)
    }

    /// Styles the next typed character would get.
    ///
    /// The override wins if present. Otherwise a caret takes the style of
    /// the character before it, then the block's first character, then the
    /// last character of the nearest non-empty block above. A range takes
    /// the style at its start.
    pub fn current_inline_style(&self) -> StyleSet {
        if let Some(style) = &self.style_override {
            return style.clone();
        }

        let Ok(block) = self.selected_block() else {
            return StyleSet::new();
        };
        let start = self.selection.start();

        if !self.selection.is_collapsed() {
            return block.style_at(start);
        }
        if start > 0 {
            return block.style_at(start - 1);
        }
        if !block.is_empty() {
            return block.style_at(0);
        }

        self.document
            .blocks_before(&self.selection.block_key)
            .ok()
            .and_then(|mut above| above.find(|block| !block.is_empty()))
            .map(|block| block.style_at(block.len() - 1))
            .unwrap_or_default()
    }

    // ==================== Transitions ====================

    /// Commits a new document and selection, like an editor "push".
    ///
    /// The style override is dropped: it only ever applies to the very
    /// next insertion.
    pub fn push(
        &self,
        document: Document,
        selection: Selection,
        change: ChangeType,
    ) -> ModelResult<Snapshot> {
        let selection = checked(&document, selection)?;
        Ok(Snapshot {
            version: self.version + 1,
            document,
            selection,
            style_override: None,
            last_change: change,
        })
    }

    /// Moves the selection. Drops the style override.
    pub fn with_selection(&self, selection: Selection) -> ModelResult<Snapshot> {
        let selection = checked(&self.document, selection)?;
        Ok(Snapshot {
            version: self.version + 1,
            document: self.document.clone(),
            selection,
            style_override: None,
            last_change: self.last_change,
        })
    }

    /// Replaces the style override.
    pub fn with_style_override(&self, style_override: Option<StyleSet>) -> Snapshot {
        Snapshot {
            version: self.version + 1,
            style_override,
            ..self.clone()
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

fn checked(document: &Document, selection: Selection) -> ModelResult<Selection> {
    let block = document.block(&selection.block_key)?;
    Ok(selection.clamped(block.len()))
}
