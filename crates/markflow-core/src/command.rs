//! Editing commands.
//!
//! ## Learning: Pure Functions over Immutable State
//!
//! Every command borrows its input and returns a brand new value:
//!
//! ```text
//! fn command(&Snapshot, args) -> CoreResult<Snapshot>
//! ```
//!
//! Nothing here can leave a half-applied edit behind. Either the `?`
//! operator bails out before anything is built, or the caller receives a
//! complete replacement. The input snapshot is never touched, which is
//! what makes it safe for a renderer to keep reading it.
//!
//! Offsets past the end of a block are clamped. Unknown block keys are
//! caller bugs and come back as `ModelError::UnknownBlock`.

use markflow_model::{
    BlockType, ChangeType, CharMeta, Direction, Document, InlineStyle, Selection, Snapshot,
};

use crate::CoreResult;

/// A document together with the selection that follows an edit.
#[derive(Debug, Clone, PartialEq)]
pub struct Edit {
    pub document: Document,
    pub selection: Selection,
}

impl Edit {
    fn unchanged(document: &Document, selection: Selection) -> Self {
        Self {
            document: document.clone(),
            selection,
        }
    }
}

/// Removes the selected text and its metadata.
///
/// Removes `start..end` after clamping both offsets to the block, so a
/// caret removes nothing. `direction` is the way the removal was
/// requested; the span itself never grows. The caret ends at the start of
/// the removed span.
///
/// Immutable and segmented entities cut by the removal are detached from
/// the characters that survive on either side.
pub fn remove_range(
    document: &Document,
    selection: &Selection,
    direction: Direction,
) -> CoreResult<Edit> {
    let block = document.block(&selection.block_key)?;
    let clamped = selection.clamped(block.len());
    let (start, end) = (clamped.start(), clamped.end());

    let after = Selection::caret(block.key().clone(), start).with_focus(selection.has_focus);
    if start == end {
        return Ok(Edit::unchanged(document, after));
    }

    let mut trimmed = block.clone();
    for range in block.entity_ranges() {
        let cut_through = (range.start < start && start < range.end)
            || (range.start < end && end < range.end);
        let detaches = document
            .entity(range.entity)
            .is_some_and(|entity| entity.mutability.detaches_on_cut());
        if cut_through && detaches {
            trimmed = trimmed.clear_entity(range.start..range.end);
        }
    }

    let updated = trimmed.remove(start..end);
    tracing::trace!(block = %block.key(), start, end, ?direction, "removed range");

    Ok(Edit {
        document: document.replace_block(updated)?,
        selection: after,
    })
}

/// Splits the selected block at the caret.
///
/// A range is removed first. The head keeps the original key and type;
/// the tail gets a fresh key and `new_block_type`. The caret moves to the
/// start of the tail.
pub fn split_block(
    document: &Document,
    selection: &Selection,
    new_block_type: BlockType,
) -> CoreResult<Edit> {
    let base = if selection.is_collapsed() {
        Edit::unchanged(document, selection.clone())
    } else {
        remove_range(document, selection, Direction::Forward)?
    };

    let block = base.document.block(&base.selection.block_key)?;
    let offset = base.selection.clamped(block.len()).start();
    let key = base.document.fresh_key();
    let (head, tail) = block.split_at(offset, key.clone(), new_block_type);

    Ok(Edit {
        document: base.document.replace_with_pair(head, tail)?,
        selection: Selection::caret(key, 0).with_focus(selection.has_focus),
    })
}

/// Sets the selected block to `block_type`, or back to unstyled if it
/// already has that type.
pub fn toggle_block_type(snapshot: &Snapshot, block_type: BlockType) -> CoreResult<Snapshot> {
    let block = snapshot.selected_block()?;
    let target = if block.block_type() == block_type {
        BlockType::Unstyled
    } else {
        block_type
    };

    let document = snapshot.document().replace_block(block.with_type(target))?;
    Ok(snapshot.push(
        document,
        snapshot.selection().clone(),
        ChangeType::ChangeBlockType,
    )?)
}

/// Toggles an inline style.
///
/// For a caret only the pending override changes, so the style applies to
/// the next typed character. For a range the style is removed if every
/// selected character already has it, and applied to all of them otherwise.
pub fn toggle_inline_style(snapshot: &Snapshot, style: InlineStyle) -> CoreResult<Snapshot> {
    let selection = snapshot.selection();

    if selection.is_collapsed() {
        let mut pending = snapshot.current_inline_style();
        if !pending.remove(&style) {
            pending.insert(style);
        }
        return Ok(snapshot.with_style_override(Some(pending)));
    }

    let block = snapshot.selected_block()?;
    let range = selection.start()..selection.end();
    let enabled = !block.has_style_throughout(range.clone(), style);
    let document = snapshot
        .document()
        .replace_block(block.set_style(range, style, enabled))?;

    Ok(snapshot.push(document, selection.clone(), ChangeType::ChangeInlineStyle)?)
}

/// Inserts `text` at the selection, replacing any selected range.
///
/// New characters carry the snapshot's current inline style and no entity.
pub fn insert_text(snapshot: &Snapshot, text: &str) -> CoreResult<Snapshot> {
    let selection = snapshot.selection();
    let meta = CharMeta::styled(snapshot.current_inline_style());

    let base = if selection.is_collapsed() {
        Edit::unchanged(snapshot.document(), selection.clone())
    } else {
        remove_range(snapshot.document(), selection, Direction::Forward)?
    };

    let block = base.document.block(&base.selection.block_key)?;
    let offset = base.selection.start();
    let updated = block.insert(offset, text, &meta);
    let caret = Selection::caret(block.key().clone(), offset + text.chars().count())
        .with_focus(selection.has_focus);

    Ok(snapshot.push(
        base.document.replace_block(updated)?,
        caret,
        ChangeType::InsertCharacters,
    )?)
}

/// Removes a character or range as a keyboard deletion would.
///
/// A range is removed as is. A caret first widens to the character before
/// it (`Backward`) or after it (`Forward`); at the block edge nothing is
/// removed.
pub fn delete(snapshot: &Snapshot, direction: Direction) -> CoreResult<Snapshot> {
    let selection = snapshot.selection();
    let (target, change) = if selection.is_collapsed() {
        let len = snapshot.selected_block()?.len();
        let caret = selection.start().min(len);
        let (anchor, focus, change) = match direction {
            Direction::Backward => (caret.saturating_sub(1), caret, ChangeType::BackspaceCharacter),
            Direction::Forward => (caret, (caret + 1).min(len), ChangeType::DeleteCharacter),
        };
        let widened = Selection::range(selection.block_key.clone(), anchor, focus)
            .with_focus(selection.has_focus);
        (widened, change)
    } else {
        (selection.clone(), ChangeType::RemoveRange)
    };

    let edit = remove_range(snapshot.document(), &target, direction)?;
    Ok(snapshot.push(edit.document, edit.selection, change)?)
}
