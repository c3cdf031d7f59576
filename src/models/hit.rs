//! Search hits and options.

use super::DocumentId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One raw hit returned by the engine.
///
/// Field names follow the engine response (`_index`, `_id`, `_score`,
/// `_source`) so hits pass through without re-mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Index the document lives in.
    #[serde(rename = "_index", default)]
    pub index: String,
    /// Document id.
    #[serde(rename = "_id")]
    pub id: DocumentId,
    /// Relevance score, higher is better.
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    /// Stored document, present only when metadata was requested.
    #[serde(rename = "_source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Map<String, Value>>,
}

/// Per-call search options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Maximum number of hits; also used as `k`.
    pub limit: usize,
    /// Whether to return stored documents with the hits.
    pub include_metadata: bool,
}

impl SearchOptions {
    /// Default result limit.
    pub const DEFAULT_LIMIT: usize = 10;

    /// Creates options with the given limit and no metadata.
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self {
            limit,
            include_metadata: false,
        }
    }

    /// Requests stored documents with the hits.
    #[must_use]
    pub const fn with_metadata(mut self, include_metadata: bool) -> Self {
        self.include_metadata = include_metadata;
        self
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT)
    }
}
