//! Compiled predicate trees.
//!
//! A [`PredicateTree`] is the body of an engine `bool` query. It serializes
//! directly into the query DSL:
//!
//! | Clause | Serialized form |
//! |--------|-----------------|
//! | `Term` | `{"term": {field: {"value": v}}}` |
//! | `Range` | `{"range": {field: {"gte": a, "lt": b}}}` |
//! | `TermsSet` | `{"terms_set": {field: {"terms": [...], "minimum_should_match_script": {"source": "Math.min(params.num_terms, n)"}}}}` |
//!
//! Empty `must` / `must_not` lists are left out of the output entirely.

use super::Literal;
use crate::{Error, Result};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::json;

/// Bounds of a range clause. Unset bounds are not serialized.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RangeBounds {
    /// Exclusive lower bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<Literal>,
    /// Inclusive lower bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<Literal>,
    /// Exclusive upper bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<Literal>,
    /// Inclusive upper bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<Literal>,
}

/// Kind of a range bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundKind {
    /// `gt`
    Gt,
    /// `gte`
    Gte,
    /// `lt`
    Lt,
    /// `lte`
    Lte,
}

impl RangeBounds {
    /// Creates bounds with a single bound set.
    #[must_use]
    pub fn single(kind: BoundKind, value: Literal) -> Self {
        let mut bounds = Self::default();
        bounds.set(kind, value);
        bounds
    }

    /// Sets a bound, replacing any previous value of the same kind.
    pub fn set(&mut self, kind: BoundKind, value: Literal) {
        let slot = match kind {
            BoundKind::Gt => &mut self.gt,
            BoundKind::Gte => &mut self.gte,
            BoundKind::Lt => &mut self.lt,
            BoundKind::Lte => &mut self.lte,
        };
        *slot = Some(value);
    }

    /// Returns true if no bound is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.gt.is_none() && self.gte.is_none() && self.lt.is_none() && self.lte.is_none()
    }

    /// Checks a value against every set bound.
    ///
    /// Values that cannot be compared with a bound do not match.
    #[must_use]
    pub fn contains(&self, value: &Literal) -> bool {
        use std::cmp::Ordering::{self, Equal, Greater, Less};

        let check = |bound: &Option<Literal>, accept: &[Ordering]| {
            bound.as_ref().is_none_or(|b| {
                value
                    .partial_cmp_value(b)
                    .is_some_and(|ord| accept.contains(&ord))
            })
        };

        check(&self.gt, &[Greater])
            && check(&self.gte, &[Greater, Equal])
            && check(&self.lt, &[Less])
            && check(&self.lte, &[Less, Equal])
    }
}

/// One atomic condition of a predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Exact match on a field value.
    Term {
        /// Field name.
        field: String,
        /// Value to match.
        value: Literal,
    },
    /// Range over a field.
    Range {
        /// Field name.
        field: String,
        /// Merged bounds.
        bounds: RangeBounds,
    },
    /// The field must hold at least `minimum_match` of `terms`.
    ///
    /// The engine caps the requirement at the number of terms, so the
    /// effective threshold is `min(terms.len(), minimum_match)`.
    TermsSet {
        /// Field name.
        field: String,
        /// Candidate terms, in input order.
        terms: Vec<Literal>,
        /// Required number of matching terms.
        minimum_match: usize,
    },
}

impl Clause {
    /// Returns the field the clause applies to.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Term { field, .. } | Self::Range { field, .. } | Self::TermsSet { field, .. } => {
                field
            },
        }
    }

    /// Returns the script used as `minimum_should_match_script` source.
    #[must_use]
    pub fn minimum_match_script(minimum_match: usize) -> String {
        format!("Math.min(params.num_terms, {minimum_match})")
    }
}

impl Serialize for Clause {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut outer = serializer.serialize_map(Some(1))?;
        match self {
            Self::Term { field, value } => {
                outer.serialize_entry("term", &json!({ field: { "value": value } }))?;
            },
            Self::Range { field, bounds } => {
                outer.serialize_entry("range", &json!({ field: bounds }))?;
            },
            Self::TermsSet {
                field,
                terms,
                minimum_match,
            } => {
                outer.serialize_entry(
                    "terms_set",
                    &json!({
                        field: {
                            "terms": terms,
                            "minimum_should_match_script": {
                                "source": Self::minimum_match_script(*minimum_match)
                            }
                        }
                    }),
                )?;
            },
        }
        outer.end()
    }
}

/// A compiled boolean predicate: every `must` clause holds and no
/// `must_not` clause does.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PredicateTree {
    /// Clauses that must all match.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Clause>,
    /// Clauses that must not match.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<Clause>,
}

impl PredicateTree {
    /// Creates an empty tree (matches everything).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            must: Vec::new(),
            must_not: Vec::new(),
        }
    }

    /// Returns true if both clause lists are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty()
    }

    /// Total number of clauses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.must.len() + self.must_not.len()
    }

    /// Serializes the tree to the JSON body of a `bool` query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFilter`] if a clause cannot be serialized.
    /// An empty object would match everything, so there is no fallback.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|e| Error::MalformedFilter(format!("cannot serialize predicate tree: {e}")))
    }
}
