//! Main editor orchestration.
//!
//! ## Learning: The Facade Pattern
//!
//! `Editor` is the only thing a rendering surface talks to. It owns the
//! current snapshot, runs keystrokes past the trigger engine, applies
//! commands, and settles every change before publishing it.
//!
//! ## Learning: `Arc` Snapshots
//!
//! The current state is an `Arc<Snapshot>`. `snapshot()` hands out a clone
//! of the pointer, so a renderer can keep drawing an old state while the
//! editor moves on. Nothing is ever mutated in place; `commit` swaps the
//! pointer.

use std::sync::Arc;

use markflow_model::{
    BlockType, ChangeType, Direction, Document, InlineStyle, Selection, Snapshot, StyleSet,
};

use crate::command;
use crate::config::Config;
use crate::event::{EditorEvent, EventBus};
use crate::persistence::{Persistence, Storage};
use crate::trigger::{Outcome, TriggerEngine};
use crate::CoreResult;

/// What happened to a keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputResult {
    /// Intercepted: a shortcut or line break
    Handled,
    /// Inserted as text
    NotHandled,
}

/// Owner of the current snapshot.
///
/// ## Thread Safety
///
/// `Editor` is owned by a single thread and processes one change to
/// completion before the next. Other threads see it only through
/// `Arc<Snapshot>` values and the event bus.
pub struct Editor {
    /// Current state
    current: Arc<Snapshot>,

    /// Shortcut table
    triggers: TriggerEngine,

    /// Event bus for notifications
    event_bus: EventBus,
}

impl Editor {
    /// Creates an editor on an empty document.
    pub fn new() -> Self {
        Self::with_snapshot(Snapshot::empty())
    }

    /// Creates an editor starting from `snapshot`.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            current: Arc::new(snapshot),
            triggers: TriggerEngine::new(),
            event_bus: EventBus::new(),
        }
    }

    /// Creates an editor with custom configuration.
    pub fn with_config(config: &Config) -> Self {
        Self {
            triggers: config.editor.trigger_engine(),
            ..Self::new()
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current)
    }

    /// Returns the current document.
    pub fn document(&self) -> &Document {
        self.current.document()
    }

    // ==================== Input ====================

    /// Processes one typed character.
    ///
    /// Shortcuts and line breaks are intercepted; anything else is inserted
    /// with the current inline style.
    pub fn handle_before_input(&mut self, ch: char) -> CoreResult<InputResult> {
        let outcome = self
            .triggers
            .before_input(&self.current, ch)
            .inspect_err(|e| tracing::warn!("Input refused: {}", e))?;

        match outcome {
            Outcome::Formatted(next) => {
                // The pending style has to survive until the next keystroke
                self.commit(next);
                Ok(InputResult::Handled)
            }
            Outcome::Split(next) => {
                self.on_change(next)?;
                Ok(InputResult::Handled)
            }
            Outcome::NotHandled => {
                let mut buf = [0u8; 4];
                let next = command::insert_text(&self.current, ch.encode_utf8(&mut buf))
                    .inspect_err(|e| tracing::warn!("Input refused: {}", e))?;
                self.on_change(next)?;
                Ok(InputResult::NotHandled)
            }
        }
    }

    /// Types every character of `text` in order.
    pub fn type_text(&mut self, text: &str) -> CoreResult<()> {
        for ch in text.chars() {
            self.handle_before_input(ch)?;
        }
        Ok(())
    }

    /// Deletes the selection, or the character before the caret.
    pub fn backspace(&mut self) -> CoreResult<()> {
        self.delete(Direction::Backward)
    }

    /// Deletes the selection, or the character after the caret.
    pub fn delete_forward(&mut self) -> CoreResult<()> {
        self.delete(Direction::Forward)
    }

    fn delete(&mut self, direction: Direction) -> CoreResult<()> {
        let next = command::delete(&self.current, direction)
            .inspect_err(|e| tracing::warn!("Delete refused: {}", e))?;
        self.on_change(next)
    }

    /// Moves the selection.
    pub fn select(&mut self, selection: Selection) -> CoreResult<()> {
        let next = self
            .current
            .with_selection(selection)
            .inspect_err(|e| tracing::warn!("Selection refused: {}", e))?;
        self.on_change(next)
    }

    /// Moves the selection without carrying the pending style over.
    ///
    /// The next character takes its style from the text around the new
    /// caret rather than from where the caret was. A focused caret on an
    /// empty line is still reset.
    pub fn place_caret(&mut self, selection: Selection) -> CoreResult<()> {
        let next = self
            .current
            .with_selection(selection)
            .inspect_err(|e| tracing::warn!("Selection refused: {}", e))?;
        if next.selection().has_focus && next.selected_block()?.is_empty() {
            return self.on_change(next);
        }
        self.commit(next);
        Ok(())
    }

    /// Gives or takes focus without moving the selection.
    pub fn focus(&mut self, has_focus: bool) -> CoreResult<()> {
        let selection = self.current.selection().clone().with_focus(has_focus);
        self.select(selection)
    }

    // ==================== Commands ====================

    /// Toggles the block type of the selected block.
    pub fn toggle_block_type(&mut self, block_type: BlockType) -> CoreResult<()> {
        let next = command::toggle_block_type(&self.current, block_type)?;
        self.commit(next);
        Ok(())
    }

    /// Toggles an inline style on the selection or the pending style.
    pub fn toggle_inline_style(&mut self, style: InlineStyle) -> CoreResult<()> {
        let next = command::toggle_inline_style(&self.current, style)?;
        self.commit(next);
        Ok(())
    }

    // ==================== Change Coordination ====================

    /// Settles a proposed snapshot and makes it current.
    ///
    /// A focused caret on an empty line resets that line: plain block type,
    /// caret at the start, and no styles for what is typed next. Any other
    /// change keeps the style that was current before it.
    pub fn on_change(&mut self, next: Snapshot) -> CoreResult<()> {
        let settled = self
            .settle(next)
            .inspect_err(|e| tracing::warn!("Change refused: {}", e))?;
        self.commit(settled);
        Ok(())
    }

    fn settle(&self, next: Snapshot) -> CoreResult<Snapshot> {
        let focused = next.selection().has_focus;
        if !(focused && next.selected_block()?.is_empty()) {
            let style = self.current.current_inline_style();
            return Ok(next.with_style_override(Some(style)));
        }

        let key = next.selection().block_key.clone();
        tracing::debug!(block = %key, "resetting empty line");

        let caret = Selection::caret(key, 0).with_focus(true);
        let placed = next.with_selection(caret)?;
        let block = placed.selected_block()?.with_type(BlockType::Unstyled);
        let document = placed.document().replace_block(block)?;
        let reset = placed.push(document, placed.selection().clone(), ChangeType::ChangeBlockType)?;

        Ok(reset.with_style_override(Some(StyleSet::new())))
    }

    // ==================== Persistence ====================

    /// Replaces the document, placing an unfocused caret at its start.
    pub fn load_document(&mut self, document: Document) -> CoreResult<()> {
        let caret = Selection::caret(document.first_block().key().clone(), 0);
        let next = self.current.push(document, caret, ChangeType::Load)?;
        self.commit(next);
        Ok(())
    }

    /// Restores the saved document.
    pub fn restore<S: Storage>(&mut self, persistence: &Persistence<S>) -> CoreResult<()> {
        let document = persistence.load()?;
        self.load_document(document)?;
        self.emit(EditorEvent::DocumentLoaded);
        Ok(())
    }

    /// Saves the current document.
    pub fn save<S: Storage>(&self, persistence: &mut Persistence<S>) -> CoreResult<()> {
        persistence.save(self.current.document())?;
        self.emit(EditorEvent::DocumentSaved);
        Ok(())
    }

    // ==================== Events ====================

    /// Subscribes to editor events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EditorEvent> {
        self.event_bus.subscribe()
    }

    fn emit(&self, event: EditorEvent) {
        self.event_bus.emit(event);
    }

    fn commit(&mut self, next: Snapshot) {
        let version = next.version();
        let change = next.last_change();
        tracing::debug!(version, %change, "commit");

        self.current = Arc::new(next);
        self.emit(EditorEvent::SnapshotChanged { version, change });
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStorage;
    use markflow_model::{Block, BlockKey, StyleRange};
    use std::collections::BTreeMap;

    fn focused() -> Editor {
        let mut editor = Editor::new();
        editor.focus(true).unwrap();
        editor
    }

    fn texts(editor: &Editor) -> Vec<String> {
        editor.document().blocks().map(|b| b.text().to_string()).collect()
    }

    fn style(styles: &[InlineStyle]) -> StyleSet {
        styles.iter().copied().collect()
    }

    #[test]
    fn test_plain_typing() {
        let mut editor = focused();
        assert_eq!(editor.handle_before_input('h').unwrap(), InputResult::NotHandled);
        editor.type_text("ello").unwrap();
        assert_eq!(texts(&editor), vec!["hello"]);
        assert_eq!(editor.snapshot().selection().start(), 5);
        assert_eq!(editor.snapshot().last_change(), ChangeType::InsertCharacters);
    }

    #[test]
    fn test_hash_space_then_title() {
        let mut editor = focused();
        editor.handle_before_input('#').unwrap();
        assert_eq!(editor.handle_before_input(' ').unwrap(), InputResult::Handled);

        let block = editor.document().first_block().clone();
        assert_eq!(block.text(), "");
        assert_eq!(block.block_type(), BlockType::HeaderOne);

        editor.type_text("Title").unwrap();
        let block = editor.document().first_block();
        assert_eq!(block.text(), "Title");
        assert_eq!(block.block_type(), BlockType::HeaderOne);
    }

    #[test]
    fn test_star_space_types_bold() {
        let mut editor = focused();
        editor.type_text("* ").unwrap();
        assert_eq!(editor.snapshot().style_override(), Some(&style(&[InlineStyle::Bold])));

        editor.type_text("ab").unwrap();
        let block = editor.document().first_block();
        assert_eq!(block.text(), "ab");
        assert_eq!(block.style_at(0), style(&[InlineStyle::Bold]));
        assert_eq!(block.style_at(1), style(&[InlineStyle::Bold]));
    }

    #[test]
    fn test_double_and_triple_star() {
        let mut editor = focused();
        editor.type_text("** x").unwrap();
        assert_eq!(editor.document().first_block().style_at(0), style(&[InlineStyle::Red]));

        let mut editor = focused();
        editor.type_text("*** x").unwrap();
        assert_eq!(
            editor.document().first_block().style_at(0),
            style(&[InlineStyle::Underline])
        );
    }

    #[test]
    fn test_marker_inside_text_is_literal() {
        let mut editor = focused();
        editor.type_text("a# b").unwrap();
        assert_eq!(texts(&editor), vec!["a# b"]);
        assert_eq!(editor.document().first_block().block_type(), BlockType::Unstyled);
    }

    #[test]
    fn test_enter_resets_new_line() {
        let mut editor = focused();
        editor.type_text("* bold").unwrap();
        assert_eq!(editor.handle_before_input('\n').unwrap(), InputResult::Handled);

        let snapshot = editor.snapshot();
        assert_eq!(snapshot.document().block_count(), 2);
        assert_eq!(snapshot.style_override(), Some(&StyleSet::new()));
        assert_eq!(snapshot.selected_block().unwrap().block_type(), BlockType::Unstyled);
        assert_eq!(snapshot.last_change(), ChangeType::ChangeBlockType);

        editor.type_text("plain").unwrap();
        assert_eq!(texts(&editor), vec!["bold", "plain"]);
        let second: Vec<_> = editor.document().blocks().collect();
        assert!(second[1].style_at(0).is_empty());
    }

    #[test]
    fn test_star_shortcut_after_bold_line() {
        let mut editor = focused();
        editor.type_text("* bold\n* x").unwrap();
        assert_eq!(texts(&editor), vec!["bold", "x"]);

        let blocks: Vec<_> = editor.document().blocks().collect();
        assert_eq!(blocks[1].style_at(0), style(&[InlineStyle::Bold]));
    }

    #[test]
    fn test_header_enter_gives_unstyled_line() {
        let mut editor = focused();
        editor.type_text("# Title\nbody").unwrap();
        let types: Vec<_> = editor.document().blocks().map(|b| b.block_type()).collect();
        assert_eq!(types, vec![BlockType::HeaderOne, BlockType::Unstyled]);
        assert_eq!(texts(&editor), vec!["Title", "body"]);
    }

    #[test]
    fn test_clearing_header_resets_type() {
        let mut editor = focused();
        editor.type_text("# T").unwrap();
        editor.backspace().unwrap();
        let block = editor.document().first_block();
        assert!(block.is_empty());
        assert_eq!(block.block_type(), BlockType::Unstyled);
    }

    #[test]
    fn test_unfocused_empty_line_untouched() {
        let mut editor = Editor::new();
        editor.toggle_block_type(BlockType::HeaderOne).unwrap();
        editor.select(editor.snapshot().selection().clone()).unwrap();
        assert_eq!(editor.document().first_block().block_type(), BlockType::HeaderOne);
    }

    #[test]
    fn test_backspace_and_delete_forward() {
        let mut editor = focused();
        editor.type_text("abc").unwrap();
        editor.backspace().unwrap();
        assert_eq!(texts(&editor), vec!["ab"]);

        let key = editor.snapshot().selection().block_key.clone();
        editor.select(Selection::caret(key, 0).with_focus(true)).unwrap();
        editor.delete_forward().unwrap();
        assert_eq!(texts(&editor), vec!["b"]);
        assert_eq!(editor.snapshot().last_change(), ChangeType::DeleteCharacter);
    }

    #[test]
    fn test_place_caret_inherits_from_new_position() {
        let bold = Block::with_ranges(
            BlockKey::new("a"),
            BlockType::Unstyled,
            "Title",
            &[StyleRange::new(InlineStyle::Bold, 0, 5)],
            &[],
        )
        .unwrap();
        let plain = Block::new(BlockKey::new("b"), BlockType::Unstyled, "body");
        let document = Document::from_blocks(vec![bold, plain], BTreeMap::new()).unwrap();

        let mut editor = Editor::new();
        editor.load_document(document).unwrap();
        editor
            .place_caret(Selection::caret(BlockKey::new("b"), 4).with_focus(true))
            .unwrap();
        assert_eq!(editor.snapshot().style_override(), None);

        editor.type_text("!").unwrap();
        let blocks: Vec<_> = editor.document().blocks().collect();
        assert_eq!(blocks[1].text(), "body!");
        assert!(blocks[1].style_at(4).is_empty());
    }

    #[test]
    fn test_place_caret_on_empty_line_resets() {
        let mut editor = Editor::new();
        editor.toggle_block_type(BlockType::HeaderOne).unwrap();
        let key = editor.snapshot().selection().block_key.clone();
        editor.place_caret(Selection::caret(key, 0).with_focus(true)).unwrap();

        assert_eq!(editor.document().first_block().block_type(), BlockType::Unstyled);
        assert_eq!(editor.snapshot().style_override(), Some(&StyleSet::new()));
    }

    #[test]
    fn test_toggle_inline_style_on_range() {
        let mut editor = focused();
        editor.type_text("hello").unwrap();
        let key = editor.snapshot().selection().block_key.clone();
        editor.select(Selection::range(key, 0, 5).with_focus(true)).unwrap();
        editor.toggle_inline_style(InlineStyle::Bold).unwrap();

        let block = editor.document().first_block();
        assert!(block.has_style_throughout(0..5, InlineStyle::Bold));
        assert_eq!(editor.snapshot().last_change(), ChangeType::ChangeInlineStyle);
    }

    #[test]
    fn test_unknown_block_keeps_snapshot() {
        let mut editor = focused();
        editor.type_text("keep").unwrap();
        let before = editor.snapshot();

        let result = editor.select(Selection::caret(BlockKey::new("missing"), 0));
        assert!(result.is_err());
        assert!(Arc::ptr_eq(&before, &editor.snapshot()));
    }

    #[test]
    fn test_versions_increase() {
        let mut editor = focused();
        let mut last = editor.snapshot().version();
        for ch in "# a\nb".chars() {
            editor.handle_before_input(ch).unwrap();
            let version = editor.snapshot().version();
            assert!(version > last);
            last = version;
        }
    }

    #[test]
    fn test_old_snapshots_unchanged() {
        let mut editor = focused();
        editor.type_text("one").unwrap();
        let old = editor.snapshot();
        editor.type_text("\ntwo").unwrap();
        assert_eq!(old.document().plain_text(), "one");
        assert_eq!(editor.document().plain_text(), "one\ntwo");
    }

    #[test]
    fn test_markdown_shortcuts_disabled() {
        let mut config = Config::default();
        config.editor.markdown_shortcuts = false;
        let mut editor = Editor::with_config(&config);
        editor.focus(true).unwrap();
        editor.type_text("# x\ny").unwrap();
        assert_eq!(texts(&editor), vec!["# x", "y"]);
    }

    #[test]
    fn test_save_and_restore() {
        let mut persistence = Persistence::new(MemoryStorage::new());
        let mut editor = focused();
        editor.type_text("# Notes\n* todo").unwrap();
        editor.save(&mut persistence).unwrap();

        let mut restored = Editor::new();
        restored.restore(&persistence).unwrap();
        assert_eq!(restored.document(), editor.document());
        assert_eq!(restored.snapshot().last_change(), ChangeType::Load);
        assert!(!restored.snapshot().selection().has_focus);
    }

    #[test]
    fn test_load_document_keeps_entities() {
        let block = Block::new(BlockKey::new("x"), BlockType::Unstyled, "text");
        let document = Document::from_blocks(vec![block], BTreeMap::new()).unwrap();
        let mut editor = Editor::new();
        editor.load_document(document.clone()).unwrap();
        assert_eq!(editor.document(), &document);
        assert_eq!(editor.snapshot().selection().block_key, BlockKey::new("x"));
    }

    #[tokio::test]
    async fn test_events() {
        let mut editor = focused();
        let mut rx = editor.subscribe();

        editor.handle_before_input('a').unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            EditorEvent::SnapshotChanged {
                version: editor.snapshot().version(),
                change: ChangeType::InsertCharacters,
            }
        );

        let mut persistence = Persistence::new(MemoryStorage::new());
        editor.save(&mut persistence).unwrap();
        assert_eq!(rx.recv().await.unwrap(), EditorEvent::DocumentSaved);
    }
}
