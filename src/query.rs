//! k-NN search request assembly.
//!
//! Wraps a compiled [`PredicateTree`] into the engine search body:
//!
//! ```json
//! {
//!   "size": 10,
//!   "sort": "_score",
//!   "query": {"knn": {"embedding": {"vector": [...], "k": 10, "filter": {"bool": {...}}}}},
//!   "_source": false
//! }
//! ```
//!
//! `_source` is `false` unless metadata was requested, so the engine only
//! returns ids and scores. The `filter` key is left out for an empty tree.

use crate::filter::PredicateTree;
use crate::models::{EMBEDDING_FIELD, SearchOptions};
use crate::{Error, Result};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::json;

/// Sort directive: relevance score, descending.
pub const SORT_BY_SCORE: &str = "_score";

/// Nearest-neighbor query over the embedding field.
#[derive(Debug, Clone, PartialEq)]
pub struct KnnQuery {
    /// Vector field name.
    pub field: String,
    /// Query vector.
    pub vector: Vec<f32>,
    /// Number of neighbors.
    pub k: usize,
    /// Filter restricting candidate documents.
    pub filter: PredicateTree,
}

impl Serialize for KnnQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut params = serde_json::Map::new();
        params.insert("vector".to_string(), json!(self.vector));
        params.insert("k".to_string(), json!(self.k));
        if !self.filter.is_empty() {
            params.insert("filter".to_string(), json!({ "bool": self.filter }));
        }

        let mut knn = serializer.serialize_map(Some(1))?;
        knn.serialize_entry("knn", &json!({ &self.field: params }))?;
        knn.end()
    }
}

/// A complete search request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    /// Result cap.
    pub size: usize,
    /// Sort directive.
    pub sort: &'static str,
    /// The k-NN query.
    pub query: KnnQuery,
    /// Whether stored documents are returned.
    #[serde(rename = "_source")]
    pub include_source: bool,
}

impl SearchRequest {
    /// Builds a k-NN request over the embedding field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the limit is zero or the vector is
    /// empty.
    pub fn knn(vector: &[f32], filter: PredicateTree, options: SearchOptions) -> Result<Self> {
        if options.limit == 0 {
            return Err(Error::InvalidInput(
                "search limit must be at least 1".to_string(),
            ));
        }
        if vector.is_empty() {
            return Err(Error::InvalidInput(
                "query vector must not be empty".to_string(),
            ));
        }

        Ok(Self {
            size: options.limit,
            sort: SORT_BY_SCORE,
            query: KnnQuery {
                field: EMBEDDING_FIELD.to_string(),
                vector: vector.to_vec(),
                k: options.limit,
                filter,
            },
            include_source: options.include_metadata,
        })
    }

    /// Serializes the request to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the body cannot be serialized.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| Error::transport("serialize_request", e))
    }
}

/// Builds a k-NN search request from a compiled filter.
///
/// # Errors
///
/// See [`SearchRequest::knn`].
pub fn build_search_request(
    vector: &[f32],
    filter: PredicateTree,
    limit: usize,
    include_metadata: bool,
) -> Result<SearchRequest> {
    SearchRequest::knn(
        vector,
        filter,
        SearchOptions::new(limit).with_metadata(include_metadata),
    )
}
