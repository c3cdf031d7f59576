//! Data models for vectorgate.
//!
//! Records written to an index, index definitions and search hits.

mod hit;
mod index;
mod record;

pub use hit::{SearchHit, SearchOptions};
pub use index::IndexSpec;
pub use record::{DocumentId, EMBEDDING_FIELD, ID_FIELD, VectorRecord};
