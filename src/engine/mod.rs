//! Search engine abstraction.
//!
//! The [`SearchEngine`] trait is the seam between vectorgate and the
//! document engine that stores and searches vectors.
//!
//! # Available Implementations
//!
//! | Engine | Use Case |
//! |--------|----------|
//! | [`OpenSearchEngine`] | OpenSearch (or a compatible service) with the k-NN plugin, over HTTP |
//! | [`InMemoryEngine`] | In-process engine for tests and offline tooling |
//!
//! # Implementor Notes
//!
//! - Methods use `&self` so one engine can be shared via `Arc<dyn SearchEngine>`
//! - Engines report failures through [`crate::Error`] without retrying
//! - Writes become visible to [`search`](SearchEngine::search) only after
//!   [`refresh`](SearchEngine::refresh); [`get`](SearchEngine::get) is realtime

mod memory;
mod opensearch;

pub use memory::InMemoryEngine;
pub use opensearch::OpenSearchEngine;

use crate::Result;
use crate::models::{DocumentId, SearchHit};
use crate::query::SearchRequest;
use serde_json::{Map, Value};

/// One bulk `index` action: create or replace a document.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexOp {
    /// Document id.
    pub id: DocumentId,
    /// Full document body.
    pub document: Map<String, Value>,
}

/// Trait for search engine backends.
pub trait SearchEngine: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    /// Creates an index with the given settings/mappings body.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ResourceAlreadyExists`] if the index exists.
    fn create_index(&self, index: &str, body: &Value) -> Result<()>;

    /// Deletes an index.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the index does not exist.
    fn delete_index(&self, index: &str) -> Result<()>;

    /// Makes all writes so far visible to search.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh fails.
    fn refresh(&self, index: &str) -> Result<()>;

    /// Writes a batch of documents, returning the number written.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Transport`] if the request fails or any item
    /// is rejected.
    fn bulk(&self, index: &str, ops: &[IndexOp]) -> Result<usize>;

    /// Returns the stored document body.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the document does not exist.
    fn get(&self, index: &str, id: &DocumentId) -> Result<Map<String, Value>>;

    /// Deletes a document.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the document does not exist.
    fn delete(&self, index: &str, id: &DocumentId) -> Result<()>;

    /// Runs a search and returns the raw hits in engine order.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails.
    fn search(&self, index: &str, request: &SearchRequest) -> Result<Vec<SearchHit>>;
}

impl<T: SearchEngine + ?Sized> SearchEngine for std::sync::Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn create_index(&self, index: &str, body: &Value) -> Result<()> {
        (**self).create_index(index, body)
    }

    fn delete_index(&self, index: &str) -> Result<()> {
        (**self).delete_index(index)
    }

    fn refresh(&self, index: &str) -> Result<()> {
        (**self).refresh(index)
    }

    fn bulk(&self, index: &str, ops: &[IndexOp]) -> Result<usize> {
        (**self).bulk(index, ops)
    }

    fn get(&self, index: &str, id: &DocumentId) -> Result<Map<String, Value>> {
        (**self).get(index, id)
    }

    fn delete(&self, index: &str, id: &DocumentId) -> Result<()> {
        (**self).delete(index, id)
    }

    fn search(&self, index: &str, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        (**self).search(index, request)
    }
}
