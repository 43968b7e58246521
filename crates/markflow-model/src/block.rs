//! Blocks: the paragraph-sized units a document is made of.
//!
//! ## Learning: Choosing a Representation
//!
//! Styles are *described* as ranges (`BOLD` from 2 to 5), but stored here
//! as one `CharMeta` per character. Splitting, removing and inserting then
//! become plain `Vec` operations, and two ranges of the same style can never
//! overlap because a character either has the style or it doesn't. The range
//! view is rebuilt on demand by `inline_style_ranges()`.
//!
//! All offsets are counted in `char`s, never bytes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Range;
use uuid::Uuid;

use crate::entity::EntityKey;
use crate::{ModelError, ModelResult};

/// Opaque, document-unique identifier of a block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockKey(String);

impl BlockKey {
    /// Wraps an existing key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Draws a random key. Callers that need uniqueness within a
    /// document should go through `Document::fresh_key`.
    pub fn generate() -> Self {
        let mut key = Uuid::new_v4().simple().to_string();
        key.truncate(8);
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structural type of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    /// Plain paragraph
    #[default]
    Unstyled,
    /// Top-level heading
    HeaderOne,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Unstyled => "unstyled",
            BlockType::HeaderOne => "header-one",
        }
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inline character styles.
///
/// Declaration order is the order styles are layered when rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InlineStyle {
    Bold,
    Underline,
    /// Accent color
    Red,
}

impl InlineStyle {
    /// Every style, in layering order.
    pub const ALL: [InlineStyle; 3] = [InlineStyle::Bold, InlineStyle::Underline, InlineStyle::Red];

    pub fn as_str(&self) -> &'static str {
        match self {
            InlineStyle::Bold => "BOLD",
            InlineStyle::Underline => "UNDERLINE",
            InlineStyle::Red => "RED",
        }
    }
}

impl std::fmt::Display for InlineStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of inline styles.
pub type StyleSet = BTreeSet<InlineStyle>;

/// Per-character metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharMeta {
    pub style: StyleSet,
    pub entity: Option<EntityKey>,
}

impl CharMeta {
    /// Metadata carrying only the given styles.
    pub fn styled(style: StyleSet) -> Self {
        Self { style, entity: None }
    }
}

/// A style applied to `start..end` of a block's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleRange {
    pub style: InlineStyle,
    pub start: usize,
    pub end: usize,
}

impl StyleRange {
    pub fn new(style: InlineStyle, start: usize, end: usize) -> Self {
        Self { style, start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// An entity attached to `start..end` of a block's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityRange {
    pub entity: EntityKey,
    pub start: usize,
    pub end: usize,
}

impl EntityRange {
    pub fn new(entity: EntityKey, start: usize, end: usize) -> Self {
        Self { entity, start, end }
    }
}

/// One paragraph-like unit of a document.
///
/// Invariant: `chars.len()` equals the number of `char`s in `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    key: BlockKey,
    block_type: BlockType,
    text: String,
    chars: Vec<CharMeta>,
}

impl Block {
    /// Creates a block with unstyled text.
    pub fn new(key: BlockKey, block_type: BlockType, text: impl Into<String>) -> Self {
        let text = text.into();
        let chars = vec![CharMeta::default(); text.chars().count()];
        Self {
            key,
            block_type,
            text,
            chars,
        }
    }

    /// Creates an empty unstyled block.
    pub fn empty(key: BlockKey) -> Self {
        Self::new(key, BlockType::Unstyled, "")
    }

    /// Creates a block from its range description.
    ///
    /// Ranges of the same style may touch or overlap; they are merged.
    /// Entity ranges may not overlap each other.
    pub fn with_ranges(
        key: BlockKey,
        block_type: BlockType,
        text: impl Into<String>,
        styles: &[StyleRange],
        entities: &[EntityRange],
    ) -> ModelResult<Self> {
        let mut block = Self::new(key, block_type, text);
        let len = block.len();

        for range in styles {
            check_bounds(range.start, range.end, len)?;
            for meta in &mut block.chars[range.start..range.end] {
                meta.style.insert(range.style);
            }
        }

        for range in entities {
            check_bounds(range.start, range.end, len)?;
            for meta in &mut block.chars[range.start..range.end] {
                if meta.entity.is_some() {
                    return Err(ModelError::OverlappingEntity {
                        start: range.start,
                        end: range.end,
                    });
                }
                meta.entity = Some(range.entity);
            }
        }

        Ok(block)
    }

    // ==================== Getters ====================

    pub fn key(&self) -> &BlockKey {
        &self.key
    }

    pub fn block_type(&self) -> BlockType {
        self.block_type
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Per-character metadata, one entry per character.
    pub fn meta(&self) -> &[CharMeta] {
        &self.chars
    }

    /// Styles of the character at `offset` (empty past the end).
    pub fn style_at(&self, offset: usize) -> StyleSet {
        self.chars
            .get(offset)
            .map(|meta| meta.style.clone())
            .unwrap_or_default()
    }

    pub fn entity_at(&self, offset: usize) -> Option<EntityKey> {
        self.chars.get(offset).and_then(|meta| meta.entity)
    }

    /// Maximal style runs, grouped by style in layering order.
    pub fn inline_style_ranges(&self) -> Vec<StyleRange> {
        let mut ranges = Vec::new();

        for style in InlineStyle::ALL {
            let mut open: Option<usize> = None;
            for (i, meta) in self.chars.iter().enumerate() {
                match (meta.style.contains(&style), open) {
                    (true, None) => open = Some(i),
                    (false, Some(start)) => {
                        ranges.push(StyleRange::new(style, start, i));
                        open = None;
                    }
                    _ => {}
                }
            }
            if let Some(start) = open {
                ranges.push(StyleRange::new(style, start, self.len()));
            }
        }

        ranges
    }

    /// Maximal entity runs in text order.
    pub fn entity_ranges(&self) -> Vec<EntityRange> {
        let mut ranges: Vec<EntityRange> = Vec::new();

        for (i, meta) in self.chars.iter().enumerate() {
            let Some(entity) = meta.entity else { continue };
            match ranges.last_mut() {
                Some(last) if last.entity == entity && last.end == i => last.end = i + 1,
                _ => ranges.push(EntityRange::new(entity, i, i + 1)),
            }
        }

        ranges
    }

    /// Returns true if every character in `range` has `style`.
    /// An empty range has no style.
    pub fn has_style_throughout(&self, range: Range<usize>, style: InlineStyle) -> bool {
        let range = self.clamp(range);
        !range.is_empty()
            && self.chars[range]
                .iter()
                .all(|meta| meta.style.contains(&style))
    }

    // ==================== Derived Blocks ====================
    //
    // These never modify `self`. Offsets are clamped to the text.

    /// Same block with a different type.
    pub fn with_type(&self, block_type: BlockType) -> Block {
        Block {
            block_type,
            ..self.clone()
        }
    }

    /// Removes the characters in `range`.
    pub fn remove(&self, range: Range<usize>) -> Block {
        let range = self.clamp(range);
        let from = byte_index(&self.text, range.start);
        let to = byte_index(&self.text, range.end);

        let mut text = String::with_capacity(self.text.len() - (to - from));
        text.push_str(&self.text[..from]);
        text.push_str(&self.text[to..]);

        let mut chars = self.chars.clone();
        chars.drain(range);

        Block {
            key: self.key.clone(),
            block_type: self.block_type,
            text,
            chars,
        }
    }

    /// Inserts `text` at `offset`, every new character carrying `meta`.
    pub fn insert(&self, offset: usize, text: &str, meta: &CharMeta) -> Block {
        let offset = offset.min(self.len());
        let at = byte_index(&self.text, offset);

        let mut new_text = self.text.clone();
        new_text.insert_str(at, text);

        let mut chars = self.chars.clone();
        let count = text.chars().count();
        chars.splice(offset..offset, std::iter::repeat_n(meta.clone(), count));

        Block {
            key: self.key.clone(),
            block_type: self.block_type,
            text: new_text,
            chars,
        }
    }

    /// Cuts the block at `offset`.
    ///
    /// The head keeps this block's key and type; the tail gets `key` and
    /// `block_type`.
    pub fn split_at(&self, offset: usize, key: BlockKey, block_type: BlockType) -> (Block, Block) {
        let offset = offset.min(self.len());
        let at = byte_index(&self.text, offset);

        let head = Block {
            key: self.key.clone(),
            block_type: self.block_type,
            text: self.text[..at].to_string(),
            chars: self.chars[..offset].to_vec(),
        };
        let tail = Block {
            key,
            block_type,
            text: self.text[at..].to_string(),
            chars: self.chars[offset..].to_vec(),
        };

        (head, tail)
    }

    /// Adds (`enabled`) or removes `style` on every character in `range`.
    pub fn set_style(&self, range: Range<usize>, style: InlineStyle, enabled: bool) -> Block {
        self.map_meta(range, |meta| {
            if enabled {
                meta.style.insert(style);
            } else {
                meta.style.remove(&style);
            }
        })
    }

    /// Detaches any entity from the characters in `range`.
    pub fn clear_entity(&self, range: Range<usize>) -> Block {
        self.map_meta(range, |meta| meta.entity = None)
    }

    fn map_meta(&self, range: Range<usize>, mut f: impl FnMut(&mut CharMeta)) -> Block {
        let range = self.clamp(range);
        let mut block = self.clone();
        block.chars[range].iter_mut().for_each(|meta| f(meta));
        block
    }

    fn clamp(&self, range: Range<usize>) -> Range<usize> {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        start..end
    }
}

fn check_bounds(start: usize, end: usize, len: usize) -> ModelResult<()> {
    if start <= end && end <= len {
        Ok(())
    } else {
        Err(ModelError::InvalidRange { start, end, len })
    }
}

/// Byte index of the `offset`-th char (or the end of the string).
fn byte_index(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map_or(text.len(), |(index, _)| index)
}
