//! # vectorgate
//!
//! A client for k-NN vector indexes on an OpenSearch-compatible engine.
//!
//! vectorgate manages index lifecycle, bulk-upserts vectors with metadata,
//! fetches and deletes documents, and runs approximate nearest-neighbor
//! searches restricted by a small metadata filter language.
//!
//! ## Features
//!
//! - Mongo-style filters (`$eq`, `$neq`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`,
//!   `$nin`, `$and`) compiled to engine `bool` queries
//! - Synchronous upsert: writes are searchable when the call returns
//! - Pluggable engines behind the [`SearchEngine`] trait (HTTP and in-memory)
//!
//! ## Example
//!
//! ```rust,ignore
//! use vectorgate::{FilterSpec, IndexSpec, OpenSearchEngine, SearchOptions, VectorClient};
//!
//! let client = VectorClient::new(OpenSearchEngine::new(&engine_config)?);
//! client.create_index(&IndexSpec::new("movies", 384))?;
//! client.upsert("movies", &records)?;
//!
//! let filter: FilterSpec = r#"{"genre": {"$in": ["comedy", "drama"]}}"#.parse()?;
//! let hits = client.search("movies", &query_vector, &filter, SearchOptions::new(10))?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod cli;
pub mod client;
pub mod config;
pub mod engine;
pub mod filter;
pub mod models;
pub mod observability;
pub mod query;

// Re-exports for convenience
pub use client::VectorClient;
pub use config::{EngineConfig, VectorGateConfig};
pub use engine::{InMemoryEngine, OpenSearchEngine, SearchEngine};
pub use filter::{ConjunctionPolicy, FilterCompiler, FilterSpec, PredicateTree};
pub use models::{DocumentId, IndexSpec, SearchHit, SearchOptions, VectorRecord};
pub use query::{SearchRequest, build_search_request};

/// Error type for vectorgate operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `ResourceAlreadyExists` | Creating an index whose name is taken |
/// | `NotFound` | Fetching/deleting a missing document or index |
/// | `Transport` | Network, auth, HTTP status or (de)serialization failures, bulk item errors (including a wrong-dimension embedding) |
/// | `MalformedFilter` | Filter JSON outside the grammar, conjunction policy violations, filters with no JSON form |
/// | `InvalidInput` | Local argument checks (zero dimension, zero limit, empty vector, bad config) |
/// | `OperationFailed` | Local failures outside the engine: logging setup, log file I/O |
///
/// None of these are retried or recovered locally.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The index already exists.
    ///
    /// Callers usually delete and recreate the index.
    #[error("index '{index}' already exists")]
    ResourceAlreadyExists {
        /// The index name.
        index: String,
    },

    /// A document or index was not found.
    #[error("not found: {resource}")]
    NotFound {
        /// Description of the missing resource (`index/id` or `index`).
        resource: String,
    },

    /// The engine could not be reached or returned a failure.
    #[error("operation '{operation}' failed: {cause}")]
    Transport {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The filter is outside the supported grammar.
    ///
    /// Raised when:
    /// - An operator key is not one of `$eq`, `$neq`/`$ne`, `$gt`, `$gte`,
    ///   `$lt`, `$lte`, `$in`, `$nin`
    /// - An operand has the wrong shape (array for `$gt`, scalar for `$in`)
    /// - `$and` is not a list of single-field scalar objects
    /// - A `$and` field is rejected by [`ConjunctionPolicy::MultiValuedOnly`]
    #[error("malformed filter: {0}")]
    MalformedFilter(String),

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A local operation failed.
    ///
    /// Raised when:
    /// - The tracing subscriber is already installed
    /// - The log file or its directory cannot be created
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds a [`Error::Transport`] for `operation`.
    pub fn transport(operation: impl Into<String>, cause: impl ToString) -> Self {
        Self::Transport {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }

    /// Short label used in metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ResourceAlreadyExists { .. } => "already_exists",
            Self::NotFound { .. } => "not_found",
            Self::Transport { .. } => "transport",
            Self::MalformedFilter(_) => "malformed_filter",
            Self::InvalidInput(_) => "invalid_input",
            Self::OperationFailed { .. } => "operation_failed",
        }
    }
}

/// Result type alias for vectorgate operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::transport("bulk", "connection refused");
        assert_eq!(err.to_string(), "operation 'bulk' failed: connection refused");

        let err = Error::ResourceAlreadyExists {
            index: "test".to_string(),
        };
        assert_eq!(err.to_string(), "index 'test' already exists");

        let err = Error::NotFound {
            resource: "test/id:1".to_string(),
        };
        assert_eq!(err.to_string(), "not found: test/id:1");
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_local_failures_are_not_transport() {
        let err = Error::OperationFailed {
            operation: "observability_init".to_string(),
            cause: "logging already initialized".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "operation 'observability_init' failed: logging already initialized"
        );
        assert_eq!(err.kind(), "operation_failed");
        assert_ne!(err.kind(), Error::transport("bulk", "x").kind());
    }
}
