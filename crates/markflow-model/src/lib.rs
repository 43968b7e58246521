//! # Markflow Model
//!
//! Immutable document model for a block-based rich-text editor.
//!
//! ## Key Concepts for Learning Rust
//!
//! ### Values, not objects
//! - A `Snapshot` is a plain value: every edit builds a new one
//! - Blocks are shared between snapshots through `Arc`, so an edit to one
//!   paragraph only copies that paragraph
//! - Nothing hands out `&mut` access to a published snapshot
//!
//! ### Invariants live in constructors
//! - `Block::with_ranges` rejects ranges outside the text
//! - `Document::from_blocks` rejects duplicate keys and dangling entities
//! - `Snapshot::new` rejects selections that point at missing blocks

mod block;
mod document;
mod entity;
mod selection;
mod snapshot;

pub use block::{Block, BlockKey, BlockType, CharMeta, EntityRange, InlineStyle, StyleRange, StyleSet};
pub use document::Document;
pub use entity::{Entity, EntityKey, Mutability};
pub use selection::{Direction, Selection};
pub use snapshot::{ChangeType, Snapshot};

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised when an operation would break a model invariant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("Block not found: {0}")]
    UnknownBlock(BlockKey),

    #[error("Duplicate block key: {0}")]
    DuplicateKey(BlockKey),

    #[error("Range {start}..{end} is outside a block of length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("Entity ranges overlap at {start}..{end}")]
    OverlappingEntity { start: usize, end: usize },

    #[error("Entity not found: {0}")]
    UnknownEntity(EntityKey),

    #[error("A document needs at least one block")]
    EmptyDocument,
}
