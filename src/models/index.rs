//! Index definitions.

use super::EMBEDDING_FIELD;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Definition of a k-NN index.
///
/// `engine`, `method` and `space_type` are handed to the engine as-is; the
/// only local check is that the dimension is non-zero.
///
/// # Common Values
///
/// | Field | Values |
/// |-------|--------|
/// | `engine` | `faiss` (default), `lucene`, `nmslib` |
/// | `method` | `hnsw` (default), `ivf` |
/// | `space_type` | `innerproduct` (default), `l2`, `cosinesimil`, `l1`, `linf` |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name.
    pub name: String,
    /// Vector dimension.
    pub dimension: usize,
    /// Matching engine.
    pub engine: String,
    /// Matching algorithm.
    pub method: String,
    /// Distance/space type.
    pub space_type: String,
}

impl IndexSpec {
    /// Default matching engine.
    pub const DEFAULT_ENGINE: &'static str = "faiss";

    /// Default matching algorithm.
    pub const DEFAULT_METHOD: &'static str = "hnsw";

    /// Default space type.
    pub const DEFAULT_SPACE_TYPE: &'static str = "innerproduct";

    /// Creates an index definition with default engine, method and space type.
    #[must_use]
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            engine: Self::DEFAULT_ENGINE.to_string(),
            method: Self::DEFAULT_METHOD.to_string(),
            space_type: Self::DEFAULT_SPACE_TYPE.to_string(),
        }
    }

    /// Sets the matching engine.
    #[must_use]
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    /// Sets the matching algorithm.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Sets the space type.
    #[must_use]
    pub fn with_space_type(mut self, space_type: impl Into<String>) -> Self {
        self.space_type = space_type.into();
        self
    }

    /// Validates the definition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the name is empty or the dimension
    /// is zero.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("index name must not be empty".to_string()));
        }
        if self.dimension == 0 {
            return Err(Error::InvalidInput(format!(
                "index '{}' must have a dimension greater than 0",
                self.name
            )));
        }
        Ok(())
    }

    /// Builds the index creation body.
    #[must_use]
    pub fn to_body(&self) -> Value {
        json!({
            "settings": {
                "index": {"knn": true}
            },
            "mappings": {
                "properties": {
                    EMBEDDING_FIELD: {
                        "type": "knn_vector",
                        "dimension": self.dimension,
                        "method": {
                            "name": self.method,
                            "space_type": self.space_type,
                            "engine": self.engine
                        }
                    }
                }
            }
        })
    }
}
