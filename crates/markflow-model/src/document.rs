//! Documents: an ordered list of blocks plus an entity table.
//!
//! ## Learning: Structural Sharing with `Arc`
//!
//! Blocks are stored as `Arc<Block>`. Cloning a `Document` clones the
//! vector of pointers, not the text. Replacing one block produces a new
//! document that shares every other block with the old one, so a renderer
//! holding the previous document keeps a consistent view for free.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::block::{Block, BlockKey};
use crate::entity::{Entity, EntityKey};
use crate::{ModelError, ModelResult};

/// An immutable, ordered sequence of blocks with unique keys.
///
/// Invariant: never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    blocks: Vec<Arc<Block>>,
    entities: BTreeMap<EntityKey, Entity>,
}

impl Document {
    /// Creates a document holding a single empty unstyled block.
    pub fn new() -> Self {
        Self {
            blocks: vec![Arc::new(Block::empty(BlockKey::generate()))],
            entities: BTreeMap::new(),
        }
    }

    /// Builds a document, checking key uniqueness and entity references.
    pub fn from_blocks(
        blocks: Vec<Block>,
        entities: BTreeMap<EntityKey, Entity>,
    ) -> ModelResult<Self> {
        if blocks.is_empty() {
            return Err(ModelError::EmptyDocument);
        }

        let mut seen = HashSet::with_capacity(blocks.len());
        for block in &blocks {
            if !seen.insert(block.key().clone()) {
                return Err(ModelError::DuplicateKey(block.key().clone()));
            }
            for range in block.entity_ranges() {
                if !entities.contains_key(&range.entity) {
                    return Err(ModelError::UnknownEntity(range.entity));
                }
            }
        }

        Ok(Self {
            blocks: blocks.into_iter().map(Arc::new).collect(),
            entities,
        })
    }

    // ==================== Queries ====================

    /// Blocks in reading order.
    pub fn blocks(&self) -> impl DoubleEndedIterator<Item = &Block> {
        self.blocks.iter().map(|block| block.as_ref())
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn first_block(&self) -> &Block {
        &self.blocks[0]
    }

    /// Looks up a block by key.
    pub fn block(&self, key: &BlockKey) -> ModelResult<&Block> {
        self.index_of(key).map(|index| self.blocks[index].as_ref())
    }

    /// Position of a block in reading order.
    pub fn index_of(&self, key: &BlockKey) -> ModelResult<usize> {
        self.blocks
            .iter()
            .position(|block| block.key() == key)
            .ok_or_else(|| ModelError::UnknownBlock(key.clone()))
    }

    pub fn contains_key(&self, key: &BlockKey) -> bool {
        self.blocks.iter().any(|block| block.key() == key)
    }

    /// Blocks preceding `key`, nearest first.
    pub fn blocks_before(&self, key: &BlockKey) -> ModelResult<impl Iterator<Item = &Block>> {
        let index = self.index_of(key)?;
        Ok(self.blocks[..index].iter().rev().map(|block| block.as_ref()))
    }

    pub fn entities(&self) -> &BTreeMap<EntityKey, Entity> {
        &self.entities
    }

    pub fn entity(&self, key: EntityKey) -> Option<&Entity> {
        self.entities.get(&key)
    }

    /// Returns a key not used by any block in this document.
    pub fn fresh_key(&self) -> BlockKey {
        loop {
            let key = BlockKey::generate();
            if !self.contains_key(&key) {
                return key;
            }
        }
    }

    /// All text, blocks joined by newlines.
    pub fn plain_text(&self) -> String {
        self.blocks()
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    // ==================== Derived Documents ====================

    /// Replaces the block that has the same key as `block`.
    pub fn replace_block(&self, block: Block) -> ModelResult<Document> {
        let index = self.index_of(block.key())?;
        let mut blocks = self.blocks.clone();
        blocks[index] = Arc::new(block);
        Ok(Document {
            blocks,
            entities: self.entities.clone(),
        })
    }

    /// Replaces the block keyed like `head` with `head` followed by `tail`.
    pub fn replace_with_pair(&self, head: Block, tail: Block) -> ModelResult<Document> {
        if self.contains_key(tail.key()) {
            return Err(ModelError::DuplicateKey(tail.key().clone()));
        }

        let index = self.index_of(head.key())?;
        let mut blocks = self.blocks.clone();
        blocks[index] = Arc::new(head);
        blocks.insert(index + 1, Arc::new(tail));
        Ok(Document {
            blocks,
            entities: self.entities.clone(),
        })
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockType, EntityRange};
    use crate::entity::Mutability;

    fn doc(texts: &[(&str, &str)]) -> Document {
        let blocks = texts
            .iter()
            .map(|(key, text)| Block::new(BlockKey::new(*key), BlockType::Unstyled, *text))
            .collect();
        Document::from_blocks(blocks, BTreeMap::new()).unwrap()
    }

    #[test]
    fn test_new_document() {
        let doc = Document::new();
        assert_eq!(doc.block_count(), 1);
        assert!(doc.first_block().is_empty());
        assert_eq!(doc.first_block().block_type(), BlockType::Unstyled);
        assert!(doc.entities().is_empty());
    }

    #[test]
    fn test_rejects_empty_and_duplicates() {
        assert_eq!(
            Document::from_blocks(vec![], BTreeMap::new()),
            Err(ModelError::EmptyDocument)
        );

        let blocks = vec![
            Block::empty(BlockKey::new("a")),
            Block::empty(BlockKey::new("a")),
        ];
        assert_eq!(
            Document::from_blocks(blocks, BTreeMap::new()),
            Err(ModelError::DuplicateKey(BlockKey::new("a")))
        );
    }

    #[test]
    fn test_rejects_dangling_entity() {
        let block = Block::with_ranges(
            BlockKey::new("a"),
            BlockType::Unstyled,
            "link",
            &[],
            &[EntityRange::new(EntityKey::new(3), 0, 4)],
        )
        .unwrap();
        assert_eq!(
            Document::from_blocks(vec![block.clone()], BTreeMap::new()),
            Err(ModelError::UnknownEntity(EntityKey::new(3)))
        );

        let entities = BTreeMap::from([(EntityKey::new(3), Entity::new("LINK", Mutability::Mutable))]);
        assert!(Document::from_blocks(vec![block], entities).is_ok());
    }

    #[test]
    fn test_lookup() {
        let doc = doc(&[("a", "one"), ("b", "two"), ("c", "three")]);
        assert_eq!(doc.block(&BlockKey::new("b")).unwrap().text(), "two");
        assert_eq!(doc.index_of(&BlockKey::new("c")).unwrap(), 2);
        assert_eq!(
            doc.block(&BlockKey::new("zz")),
            Err(ModelError::UnknownBlock(BlockKey::new("zz")))
        );

        let before: Vec<_> = doc
            .blocks_before(&BlockKey::new("c"))
            .unwrap()
            .map(Block::text)
            .collect();
        assert_eq!(before, vec!["two", "one"]);
    }

    #[test]
    fn test_replace_shares_untouched_blocks() {
        let doc = doc(&[("a", "one"), ("b", "two")]);
        let updated = doc
            .replace_block(Block::new(BlockKey::new("b"), BlockType::HeaderOne, "2"))
            .unwrap();

        assert_eq!(updated.plain_text(), "one\n2");
        assert_eq!(doc.plain_text(), "one\ntwo");
        assert!(Arc::ptr_eq(&doc.blocks[0], &updated.blocks[0]));
    }

    #[test]
    fn test_replace_with_pair() {
        let doc = doc(&[("a", "onetwo"), ("c", "three")]);
        let (head, tail) = doc
            .block(&BlockKey::new("a"))
            .unwrap()
            .split_at(3, BlockKey::new("b"), BlockType::Unstyled);
        let updated = doc.replace_with_pair(head, tail).unwrap();
        assert_eq!(updated.plain_text(), "one\ntwo\nthree");
        assert_eq!(updated.index_of(&BlockKey::new("b")).unwrap(), 1);

        let (head, tail) = updated
            .block(&BlockKey::new("a"))
            .unwrap()
            .split_at(1, BlockKey::new("c"), BlockType::Unstyled);
        assert_eq!(
            updated.replace_with_pair(head, tail),
            Err(ModelError::DuplicateKey(BlockKey::new("c")))
        );
    }

    #[test]
    fn test_fresh_key_is_unused() {
        let doc = doc(&[("a", ""), ("b", "")]);
        let key = doc.fresh_key();
        assert!(!doc.contains_key(&key));
    }
}
