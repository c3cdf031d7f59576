//! Metadata filter language and its compiler.
//!
//! A [`FilterSpec`] is parsed from JSON (or built in code), then compiled by
//! a [`FilterCompiler`] into a [`PredicateTree`], the body of the engine's
//! `bool` query.
//!
//! ```rust
//! use vectorgate::filter::{FilterCompiler, FilterSpec};
//! use serde_json::json;
//!
//! let spec = FilterSpec::from_json(&json!({
//!     "tags": {"$in": ["p1"]},
//!     "no": {"$gte": 2200, "$lte": 2800}
//! }))?;
//! let tree = FilterCompiler::new().compile(&spec)?;
//! assert_eq!(tree.must.len(), 2);
//! # Ok::<(), vectorgate::Error>(())
//! ```

mod compiler;
mod expr;
mod literal;
mod predicate;

pub use compiler::{ConjunctionPolicy, FilterCompiler, compile};
pub use expr::{AND_KEY, FieldCondition, FilterEntry, FilterSpec, Operator};
pub use literal::Literal;
pub use predicate::{BoundKind, Clause, PredicateTree, RangeBounds};
