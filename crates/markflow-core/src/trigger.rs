//! Markdown-style shortcuts.
//!
//! Typing `#`, `*`, `**` or `***` on an otherwise empty line and then a
//! space turns the marker into formatting instead of text. A line break is
//! always turned into a block split.
//!
//! ## Learning: Data-Driven Dispatch
//!
//! The shortcuts are a table, not a chain of `if` statements. Adding one
//! means adding a row. The engine sorts the rows longest-prefix-first when
//! it is built, so `***` is always tried before `*` no matter how the table
//! is written.

use std::cmp::Reverse;

use markflow_model::{BlockType, ChangeType, Direction, InlineStyle, Selection, Snapshot};

use crate::command;
use crate::CoreResult;

/// What a shortcut does once its marker is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    BlockType(BlockType),
    InlineStyle(InlineStyle),
}

/// One shortcut: a marker that must be the whole text before the caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub prefix: &'static str,
    pub transform: Transform,
}

impl Trigger {
    /// Caret offset at which the marker is complete.
    pub fn caret_offset(&self) -> usize {
        self.prefix.chars().count()
    }

    /// Returns true if `text` is exactly the marker and the caret sits
    /// right after it.
    pub fn matches(&self, text: &str, caret: usize) -> bool {
        text == self.prefix && caret == self.caret_offset()
    }
}

/// Built-in shortcuts.
pub const TRIGGERS: [Trigger; 4] = [
    Trigger {
        prefix: "#",
        transform: Transform::BlockType(BlockType::HeaderOne),
    },
    Trigger {
        prefix: "*",
        transform: Transform::InlineStyle(InlineStyle::Bold),
    },
    Trigger {
        prefix: "**",
        transform: Transform::InlineStyle(InlineStyle::Red),
    },
    Trigger {
        prefix: "***",
        transform: Transform::InlineStyle(InlineStyle::Underline),
    },
];

/// Result of offering a keystroke to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Not a shortcut; the character should be inserted normally.
    NotHandled,
    /// A marker was converted into formatting. The resulting state must
    /// reach the next keystroke untouched, or the pending style is lost.
    Formatted(Snapshot),
    /// A line break split the block.
    Split(Snapshot),
}

/// Detects shortcuts before a character is inserted.
#[derive(Debug, Clone)]
pub struct TriggerEngine {
    rules: Vec<Trigger>,
}

impl TriggerEngine {
    /// Creates an engine with the built-in shortcuts.
    pub fn new() -> Self {
        Self::with_rules(TRIGGERS.to_vec())
    }

    /// Creates an engine that only handles line breaks.
    pub fn line_breaks_only() -> Self {
        Self::with_rules(Vec::new())
    }

    /// Creates an engine from an arbitrary table.
    pub fn with_rules(mut rules: Vec<Trigger>) -> Self {
        rules.sort_by_key(|rule| Reverse(rule.caret_offset()));
        Self { rules }
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[Trigger] {
        &self.rules
    }

    /// Offers `ch` to the engine, before it reaches the document.
    pub fn before_input(&self, snapshot: &Snapshot, ch: char) -> CoreResult<Outcome> {
        match ch {
            ' ' => {
                let block = snapshot.selected_block()?;
                let caret = snapshot.selection().start();
                let Some(rule) = self.rules.iter().find(|rule| rule.matches(block.text(), caret))
                else {
                    return Ok(Outcome::NotHandled);
                };

                tracing::debug!(prefix = rule.prefix, transform = ?rule.transform, "shortcut matched");
                self.apply(snapshot, rule).map(Outcome::Formatted)
            }
            '\n' => {
                let edit = command::split_block(
                    snapshot.document(),
                    snapshot.selection(),
                    BlockType::Unstyled,
                )?;
                let split = snapshot.push(edit.document, edit.selection, ChangeType::SplitBlock)?;
                Ok(Outcome::Split(split))
            }
            _ => Ok(Outcome::NotHandled),
        }
    }

    /// Deletes the marker, then applies the rule's transformation.
    fn apply(&self, snapshot: &Snapshot, rule: &Trigger) -> CoreResult<Snapshot> {
        let selection = snapshot.selection();
        let marker = Selection::range(
            selection.block_key.clone(),
            0,
            selection.start() + rule.caret_offset(),
        )
        .with_focus(selection.has_focus);

        let edit = command::remove_range(snapshot.document(), &marker, Direction::Backward)?;
        // The removal commits as a fresh edit, which drops any pending style.
        let cleared = snapshot
            .push(edit.document, edit.selection, ChangeType::RemoveRange)?
            .with_style_override(snapshot.style_override().cloned());

        match rule.transform {
            Transform::BlockType(block_type) => command::toggle_block_type(&cleared, block_type),
            Transform::InlineStyle(style) => command::toggle_inline_style(&cleared, style),
        }
    }
}

impl Default for TriggerEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use markflow_model::{Block, BlockKey, Document, StyleRange, StyleSet};
    use std::collections::BTreeMap;

    fn typed(text: &str) -> Snapshot {
        let key = BlockKey::new("a");
        let block = Block::new(key.clone(), BlockType::Unstyled, text);
        let document = Document::from_blocks(vec![block], BTreeMap::new()).unwrap();
        let caret = text.chars().count();
        Snapshot::new(document, Selection::caret(key, caret).with_focus(true)).unwrap()
    }

    fn formatted(outcome: Outcome) -> Snapshot {
        match outcome {
            Outcome::Formatted(snapshot) => snapshot,
            other => panic!("expected a formatted outcome, got {other:?}"),
        }
    }

    #[test]
    fn test_rules_longest_first() {
        let engine = TriggerEngine::new();
        let lengths: Vec<_> = engine.rules().iter().map(Trigger::caret_offset).collect();
        assert_eq!(lengths, vec![3, 2, 1, 1]);
        assert_eq!(engine.rules()[0].prefix, "***");
    }

    #[test]
    fn test_hash_space_makes_header() {
        let result = formatted(TriggerEngine::new().before_input(&typed("#"), ' ').unwrap());
        let block = result.selected_block().unwrap();
        assert_eq!(block.text(), "");
        assert_eq!(block.block_type(), BlockType::HeaderOne);
        assert_eq!(result.last_change(), ChangeType::ChangeBlockType);
        assert!(result.selection().has_focus);
    }

    #[test]
    fn test_star_markers() {
        let cases = [
            ("*", InlineStyle::Bold),
            ("**", InlineStyle::Red),
            ("***", InlineStyle::Underline),
        ];
        for (marker, style) in cases {
            let result = formatted(TriggerEngine::new().before_input(&typed(marker), ' ').unwrap());
            assert_eq!(result.selected_block().unwrap().text(), "", "marker {marker}");
            assert_eq!(result.style_override(), Some(&StyleSet::from([style])), "marker {marker}");
            assert_eq!(result.selection().start(), 0);
        }
    }

    #[test]
    fn test_star_marker_keeps_pending_empty_style() {
        let above = Block::with_ranges(
            BlockKey::new("a"),
            BlockType::Unstyled,
            "bold",
            &[StyleRange::new(InlineStyle::Bold, 0, 4)],
            &[],
        )
        .unwrap();
        let line = Block::new(BlockKey::new("b"), BlockType::Unstyled, "*");
        let document = Document::from_blocks(vec![above, line], BTreeMap::new()).unwrap();
        let snapshot = Snapshot::new(document, Selection::caret(BlockKey::new("b"), 1).with_focus(true))
            .unwrap()
            .with_style_override(Some(StyleSet::new()));

        let result = formatted(TriggerEngine::new().before_input(&snapshot, ' ').unwrap());
        assert_eq!(result.selected_block().unwrap().text(), "");
        assert_eq!(result.style_override(), Some(&StyleSet::from([InlineStyle::Bold])));
    }

    #[test]
    fn test_marker_must_be_whole_text() {
        let engine = TriggerEngine::new();
        for text in ["a#", "# ", "x*", "****", "#a"] {
            assert_eq!(engine.before_input(&typed(text), ' ').unwrap(), Outcome::NotHandled, "{text}");
        }
    }

    #[test]
    fn test_caret_must_follow_marker() {
        let engine = TriggerEngine::new();
        let early = typed("**")
            .with_selection(Selection::caret(BlockKey::new("a"), 1).with_focus(true))
            .unwrap();
        assert_eq!(engine.before_input(&early, ' ').unwrap(), Outcome::NotHandled);
    }

    #[test]
    fn test_other_characters_declined() {
        let engine = TriggerEngine::new();
        assert_eq!(engine.before_input(&typed("#"), 'a').unwrap(), Outcome::NotHandled);
        assert_eq!(engine.before_input(&typed("*"), '*').unwrap(), Outcome::NotHandled);
    }

    #[test]
    fn test_line_break_splits() {
        let start = typed("hi");
        let result = match TriggerEngine::new().before_input(&start, '\n').unwrap() {
            Outcome::Split(snapshot) => snapshot,
            other => panic!("expected a split, got {other:?}"),
        };

        let blocks: Vec<_> = result.document().blocks().collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text(), "hi");
        assert_eq!(blocks[0].key(), &BlockKey::new("a"));
        assert_eq!(blocks[1].text(), "");
        assert_eq!(blocks[1].block_type(), BlockType::Unstyled);
        assert_eq!(result.selection().block_key, *blocks[1].key());
        assert_eq!(result.selection().start(), 0);
        assert_eq!(result.last_change(), ChangeType::SplitBlock);
    }

    #[test]
    fn test_header_line_break_gives_unstyled_line() {
        let header = formatted(TriggerEngine::new().before_input(&typed("#"), ' ').unwrap());
        let titled = command::insert_text(&header, "Title").unwrap();
        let Outcome::Split(result) = TriggerEngine::new().before_input(&titled, '\n').unwrap() else {
            panic!("expected a split");
        };
        let types: Vec<_> = result.document().blocks().map(|b| b.block_type()).collect();
        assert_eq!(types, vec![BlockType::HeaderOne, BlockType::Unstyled]);
    }

    #[test]
    fn test_line_breaks_only_engine() {
        let engine = TriggerEngine::line_breaks_only();
        assert_eq!(engine.before_input(&typed("#"), ' ').unwrap(), Outcome::NotHandled);
        assert!(matches!(engine.before_input(&typed("#"), '\n').unwrap(), Outcome::Split(_)));
    }
}
