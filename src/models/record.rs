//! Vector records and document identifiers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Name of the vector field in every index.
pub const EMBEDDING_FIELD: &str = "embedding";

/// Name of the field that mirrors the document id inside the source.
pub const ID_FIELD: &str = "id";

/// Identifier of a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Creates a new document ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A vector with its id and metadata, as written by upsert.
///
/// The JSON form used by the CLI is
/// `{"id": "id:1", "embedding": [0.1, ...], "metadata": {"tags": ["p1"]}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Document identifier.
    pub id: DocumentId,
    /// Embedding components; length must equal the index dimension.
    pub embedding: Vec<f32>,
    /// Arbitrary metadata stored next to the embedding.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl VectorRecord {
    /// Creates a record without metadata.
    #[must_use]
    pub fn new(id: impl Into<DocumentId>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            embedding,
            metadata: Map::new(),
        }
    }

    /// Adds one metadata field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Replaces the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Builds the stored document body.
    ///
    /// The metadata is merged with the embedding and the id; `embedding` and
    /// `id` keys in the metadata are overwritten.
    #[must_use]
    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = self.metadata.clone();
        doc.insert(
            EMBEDDING_FIELD.to_string(),
            Value::Array(self.embedding.iter().map(|&c| Value::from(c)).collect()),
        );
        doc.insert(ID_FIELD.to_string(), Value::String(self.id.to_string()));
        doc
    }
}
