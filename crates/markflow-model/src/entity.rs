//! Entities: metadata objects attached to runs of characters (links,
//! mentions and the like).
//!
//! The editor never creates entities itself, but documents restored from
//! storage may carry them, so edits have to keep them consistent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key of an entity in a document's entity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(u32);

impl EntityKey {
    pub fn new(key: u32) -> Self {
        Self(key)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an entity reacts when the text it covers is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mutability {
    /// Text may change freely; the entity follows it
    #[default]
    Mutable,
    /// Any partial removal detaches the entity from the whole run
    Immutable,
    /// Treated like `Immutable` at the edges of a removal
    Segmented,
}

impl Mutability {
    /// Returns true if cutting through the entity's text detaches it.
    pub fn detaches_on_cut(&self) -> bool {
        !matches!(self, Mutability::Mutable)
    }
}

/// An entity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Free-form entity type (e.g. `LINK`)
    pub kind: String,
    pub mutability: Mutability,
    /// Arbitrary payload
    pub data: Map<String, Value>,
}

impl Entity {
    pub fn new(kind: impl Into<String>, mutability: Mutability) -> Self {
        Self {
            kind: kind.into(),
            mutability,
            data: Map::new(),
        }
    }

    /// Adds a payload field.
    pub fn with_data(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(name.into(), value.into());
        self
    }
}
