//! Saving and restoring documents.
//!
//! ## Learning: Serde Attributes as a Wire Contract
//!
//! The persisted form is a separate set of `Raw*` structs instead of
//! `#[derive(Serialize)]` on the model itself. The model stores styles per
//! character while the wire format stores ranges, and keeping the two apart
//! means the model can change without breaking saved files. Field renames
//! (`#[serde(rename_all = "camelCase")]`, `rename = "type"`) pin the JSON
//! shape:
//!
//! ```json
//! {
//!   "blocks": [{
//!     "key": "3f2a9c1e", "text": "hello", "type": "header-one", "depth": 0,
//!     "inlineStyleRanges": [{ "offset": 0, "length": 5, "style": "BOLD" }],
//!     "entityRanges": [], "data": {}
//!   }],
//!   "entityMap": {}
//! }
//! ```
//!
//! Loading fails closed: anything malformed yields a fresh empty document
//! and a warning, never an error the user has to deal with.
//!
//! Block `depth` and `data` are accepted on load and then dropped. No
//! block type nests and the model has no per-block payload, so there is
//! nothing to keep them in; `save` always writes `0` and `{}`. Entity
//! `data` is kept.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use markflow_model::{
    Block, BlockKey, BlockType, Document, Entity, EntityKey, EntityRange, InlineStyle, ModelResult,
    Mutability, StyleRange,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::CoreResult;

/// Identifier documents are saved under unless configured otherwise.
pub const STORAGE_KEY: &str = "EditorData";

// ==================== Raw Form ====================

/// Transferable form of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDocument {
    pub blocks: Vec<RawBlock>,
    #[serde(default)]
    pub entity_map: BTreeMap<EntityKey, RawEntity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    /// Regenerated on load when missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type", default)]
    pub block_type: BlockType,
    /// Dropped on load, written as `0`
    #[serde(default)]
    pub depth: u8,
    #[serde(default)]
    pub inline_style_ranges: Vec<RawStyleRange>,
    #[serde(default)]
    pub entity_ranges: Vec<RawEntityRange>,
    /// Dropped on load, written as `{}`
    #[serde(default)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStyleRange {
    pub offset: usize,
    pub length: usize,
    pub style: InlineStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntityRange {
    pub offset: usize,
    pub length: usize,
    pub key: EntityKey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEntity {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub mutability: Mutability,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl RawStyleRange {
    fn to_range(self) -> StyleRange {
        StyleRange::new(self.style, self.offset, self.offset.saturating_add(self.length))
    }
}

impl RawEntityRange {
    fn to_range(self) -> EntityRange {
        EntityRange::new(self.key, self.offset, self.offset.saturating_add(self.length))
    }
}

impl From<&Entity> for RawEntity {
    fn from(entity: &Entity) -> Self {
        Self {
            kind: entity.kind.clone(),
            mutability: entity.mutability,
            data: entity.data.clone(),
        }
    }
}

impl From<RawEntity> for Entity {
    fn from(raw: RawEntity) -> Self {
        Self {
            kind: raw.kind,
            mutability: raw.mutability,
            data: raw.data,
        }
    }
}

// ==================== Conversion ====================

/// Converts a document into its raw form.
pub fn save(document: &Document) -> RawDocument {
    let blocks = document
        .blocks()
        .map(|block| RawBlock {
            key: Some(block.key().as_str().to_string()),
            text: block.text().to_string(),
            block_type: block.block_type(),
            depth: 0,
            inline_style_ranges: block
                .inline_style_ranges()
                .into_iter()
                .map(|range| RawStyleRange {
                    offset: range.start,
                    length: range.len(),
                    style: range.style,
                })
                .collect(),
            entity_ranges: block
                .entity_ranges()
                .into_iter()
                .map(|range| RawEntityRange {
                    offset: range.start,
                    length: range.end - range.start,
                    key: range.entity,
                })
                .collect(),
            data: Map::new(),
        })
        .collect();

    let entity_map = document
        .entities()
        .iter()
        .map(|(key, entity)| (*key, RawEntity::from(entity)))
        .collect();

    RawDocument { blocks, entity_map }
}

/// Rebuilds a document from its raw form.
///
/// `None` and malformed input both give a single empty unstyled block.
pub fn load(raw: Option<RawDocument>) -> Document {
    let Some(raw) = raw else {
        return Document::new();
    };

    match into_document(raw) {
        Ok(document) => document,
        Err(e) => {
            tracing::warn!("Discarding malformed saved document: {}", e);
            Document::new()
        }
    }
}

fn into_document(raw: RawDocument) -> ModelResult<Document> {
    let mut taken: HashSet<String> = raw.blocks.iter().filter_map(|b| b.key.clone()).collect();

    let mut blocks = Vec::with_capacity(raw.blocks.len());
    for raw_block in raw.blocks {
        let key = match raw_block.key {
            Some(key) => BlockKey::new(key),
            None => fresh_key(&mut taken),
        };
        let styles: Vec<_> = raw_block.inline_style_ranges.into_iter().map(RawStyleRange::to_range).collect();
        let entities: Vec<_> = raw_block.entity_ranges.into_iter().map(RawEntityRange::to_range).collect();
        blocks.push(Block::with_ranges(
            key,
            raw_block.block_type,
            raw_block.text,
            &styles,
            &entities,
        )?);
    }

    let entities = raw
        .entity_map
        .into_iter()
        .map(|(key, entity)| (key, Entity::from(entity)))
        .collect();

    Document::from_blocks(blocks, entities)
}

fn fresh_key(taken: &mut HashSet<String>) -> BlockKey {
    loop {
        let key = BlockKey::generate();
        if taken.insert(key.as_str().to_string()) {
            return key;
        }
    }
}

// ==================== Storage ====================

/// A string key-value store.
pub trait Storage {
    /// Returns the value saved under `key`, if any.
    fn read(&self, key: &str) -> CoreResult<Option<String>>;

    /// Saves `value` under `key`, replacing what was there.
    fn write(&mut self, key: &str, value: &str) -> CoreResult<()>;
}

/// Stores each key as `<key>.json` in a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    directory: PathBuf,
}

impl FileStorage {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the file holding `key`.
    pub fn path(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> CoreResult<Option<String>> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> CoreResult<()> {
        std::fs::create_dir_all(&self.directory)?;
        let path = self.path(key);

        // Write to a temporary file first, then rename (atomic write)
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, value)?;
        std::fs::rename(&temp_path, &path)?;
        Ok(())
    }
}

/// Keeps values in memory. Useful for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> CoreResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> CoreResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Saves and restores one document in a storage.
#[derive(Debug, Clone)]
pub struct Persistence<S> {
    storage: S,
    key: String,
}

impl<S: Storage> Persistence<S> {
    /// Uses the default key.
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, STORAGE_KEY)
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Serializes `document` and writes it.
    pub fn save(&mut self, document: &Document) -> CoreResult<()> {
        let json = serde_json::to_string(&save(document))?;
        self.storage.write(&self.key, &json)?;
        tracing::debug!(key = %self.key, bytes = json.len(), "document saved");
        Ok(())
    }

    /// Reads the saved document.
    ///
    /// Storage errors are returned; missing or unparsable content gives
    /// the default document.
    pub fn load(&self) -> CoreResult<Document> {
        let raw = match self.storage.read(&self.key)? {
            Some(json) => match serde_json::from_str::<RawDocument>(&json) {
                Ok(raw) => Some(raw),
                Err(e) => {
                    tracing::warn!("Saved document is not valid: {}", e);
                    None
                }
            },
            None => None,
        };
        Ok(load(raw))
    }
}
