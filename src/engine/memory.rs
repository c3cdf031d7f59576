//! In-process engine.
//!
//! Mirrors the engine semantics vectorgate relies on, without a cluster:
//! writes land in a pending document set that [`refresh`](SearchEngine::refresh)
//! publishes to search, `get` reads the latest write, and filters are
//! evaluated against stored documents the way the engine evaluates the
//! compiled `bool` query.
//!
//! Scores follow the engine's conversion of distances to similarities:
//!
//! | Space | Score |
//! |-------|-------|
//! | `l2` | `1 / (1 + d²)` |
//! | `l1` | `1 / (1 + d)` |
//! | `linf` | `1 / (1 + d)` |
//! | `cosinesimil` | `(1 + cos) / 2` |
//! | `innerproduct` | `dot + 1` if `dot >= 0`, else `1 / (1 - dot)` |

use super::{IndexOp, SearchEngine};
use crate::filter::{Clause, Literal, PredicateTree};
use crate::models::{DocumentId, EMBEDDING_FIELD, SearchHit};
use crate::query::SearchRequest;
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// Supported vector spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpaceType {
    L2,
    L1,
    LInf,
    Cosine,
    InnerProduct,
}

impl SpaceType {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "l2" => Ok(Self::L2),
            "l1" => Ok(Self::L1),
            "linf" => Ok(Self::LInf),
            "cosinesimil" => Ok(Self::Cosine),
            "innerproduct" => Ok(Self::InnerProduct),
            other => Err(Error::InvalidInput(format!(
                "unsupported space type '{other}'"
            ))),
        }
    }

    fn score(self, a: &[f32], b: &[f32]) -> f64 {
        let pairs = a.iter().zip(b).map(|(x, y)| (f64::from(*x), f64::from(*y)));
        match self {
            Self::L2 => 1.0 / (1.0 + pairs.map(|(x, y)| (x - y).powi(2)).sum::<f64>()),
            Self::L1 => 1.0 / (1.0 + pairs.map(|(x, y)| (x - y).abs()).sum::<f64>()),
            Self::LInf => 1.0 / (1.0 + pairs.map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)),
            Self::Cosine => {
                let (dot, na, nb) = pairs.fold((0.0, 0.0, 0.0), |(d, na, nb), (x, y)| {
                    (x.mul_add(y, d), x.mul_add(x, na), y.mul_add(y, nb))
                });
                let norm = na.sqrt() * nb.sqrt();
                let cos = if norm == 0.0 { 0.0 } else { dot / norm };
                f64::midpoint(1.0, cos)
            },
            Self::InnerProduct => {
                let dot: f64 = pairs.map(|(x, y)| x * y).sum();
                if dot >= 0.0 { dot + 1.0 } else { 1.0 / (1.0 - dot) }
            },
        }
    }
}

#[derive(Debug)]
struct MemoryIndex {
    dimension: usize,
    space_type: SpaceType,
    /// Latest writes.
    documents: BTreeMap<String, Map<String, Value>>,
    /// Snapshot taken at the last refresh.
    searchable: BTreeMap<String, Map<String, Value>>,
}

impl MemoryIndex {
    fn from_body(index: &str, body: &Value) -> Result<Self> {
        let embedding = body
            .pointer(&format!("/mappings/properties/{EMBEDDING_FIELD}"))
            .ok_or_else(|| {
                Error::InvalidInput(format!("index '{index}' has no {EMBEDDING_FIELD} mapping"))
            })?;
        let dimension = embedding
            .get("dimension")
            .and_then(Value::as_u64)
            .and_then(|d| usize::try_from(d).ok())
            .filter(|d| *d > 0)
            .ok_or_else(|| Error::InvalidInput(format!("index '{index}' has no dimension")))?;
        let space_type = embedding
            .pointer("/method/space_type")
            .and_then(Value::as_str)
            .map_or(Ok(SpaceType::L2), SpaceType::parse)?;

        Ok(Self {
            dimension,
            space_type,
            documents: BTreeMap::new(),
            searchable: BTreeMap::new(),
        })
    }

    fn check_document(&self, document: &Map<String, Value>) -> std::result::Result<(), String> {
        let Some(Value::Array(values)) = document.get(EMBEDDING_FIELD) else {
            return Err(format!("missing {EMBEDDING_FIELD} field"));
        };
        if values.len() != self.dimension {
            return Err(format!(
                "vector dimension mismatch: expected {}, got {}",
                self.dimension,
                values.len()
            ));
        }
        if !values.iter().all(Value::is_number) {
            return Err(format!("{EMBEDDING_FIELD} must contain only numbers"));
        }
        Ok(())
    }
}

/// In-memory engine.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    indexes: Mutex<HashMap<String, MemoryIndex>>,
}

impl InMemoryEngine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of documents visible to search in `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the index does not exist.
    pub fn searchable_count(&self, index: &str) -> Result<usize> {
        let indexes = self.lock("searchable_count")?;
        Ok(lookup(&indexes, index)?.searchable.len())
    }

    fn lock(&self, operation: &str) -> Result<MutexGuard<'_, HashMap<String, MemoryIndex>>> {
        self.indexes
            .lock()
            .map_err(|e| Error::transport(operation, format!("lock poisoned: {e}")))
    }
}

fn lookup<'a>(indexes: &'a HashMap<String, MemoryIndex>, index: &str) -> Result<&'a MemoryIndex> {
    indexes.get(index).ok_or_else(|| Error::NotFound {
        resource: index.to_string(),
    })
}

fn lookup_mut<'a>(
    indexes: &'a mut HashMap<String, MemoryIndex>,
    index: &str,
) -> Result<&'a mut MemoryIndex> {
    indexes.get_mut(index).ok_or_else(|| Error::NotFound {
        resource: index.to_string(),
    })
}

impl SearchEngine for InMemoryEngine {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn create_index(&self, index: &str, body: &Value) -> Result<()> {
        let mut indexes = self.lock("create_index")?;
        if indexes.contains_key(index) {
            return Err(Error::ResourceAlreadyExists {
                index: index.to_string(),
            });
        }
        indexes.insert(index.to_string(), MemoryIndex::from_body(index, body)?);
        Ok(())
    }

    fn delete_index(&self, index: &str) -> Result<()> {
        let mut indexes = self.lock("delete_index")?;
        indexes
            .remove(index)
            .map(drop)
            .ok_or_else(|| Error::NotFound {
                resource: index.to_string(),
            })
    }

    fn refresh(&self, index: &str) -> Result<()> {
        let mut indexes = self.lock("refresh")?;
        let target = lookup_mut(&mut indexes, index)?;
        target.searchable = target.documents.clone();
        Ok(())
    }

    fn bulk(&self, index: &str, ops: &[IndexOp]) -> Result<usize> {
        let mut indexes = self.lock("bulk")?;
        let target = lookup_mut(&mut indexes, index)?;

        let mut failures = Vec::new();
        for op in ops {
            match target.check_document(&op.document) {
                Ok(()) => {
                    target
                        .documents
                        .insert(op.id.as_str().to_string(), op.document.clone());
                },
                Err(reason) => failures.push(format!("{}: {reason}", op.id)),
            }
        }

        if failures.is_empty() {
            Ok(ops.len())
        } else {
            Err(Error::transport(
                "bulk",
                format!(
                    "{} of {} items failed: {}",
                    failures.len(),
                    ops.len(),
                    failures.join("; ")
                ),
            ))
        }
    }

    fn get(&self, index: &str, id: &DocumentId) -> Result<Map<String, Value>> {
        let indexes = self.lock("get")?;
        lookup(&indexes, index)?
            .documents
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| Error::NotFound {
                resource: format!("{index}/{id}"),
            })
    }

    fn delete(&self, index: &str, id: &DocumentId) -> Result<()> {
        let mut indexes = self.lock("delete")?;
        lookup_mut(&mut indexes, index)?
            .documents
            .remove(id.as_str())
            .map(drop)
            .ok_or_else(|| Error::NotFound {
                resource: format!("{index}/{id}"),
            })
    }

    fn search(&self, index: &str, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let indexes = self.lock("search")?;
        let target = lookup(&indexes, index)?;
        let query = &request.query;
        if query.vector.len() != target.dimension {
            return Err(Error::transport(
                "search",
                format!(
                    "query vector dimension mismatch: expected {}, got {}",
                    target.dimension,
                    query.vector.len()
                ),
            ));
        }

        let mut hits: Vec<SearchHit> = target
            .searchable
            .iter()
            .filter(|(_, document)| matches_tree(&query.filter, document))
            .filter_map(|(id, document)| {
                let embedding = embedding_of(document)?;
                Some(SearchHit {
                    index: index.to_string(),
                    id: DocumentId::new(id.clone()),
                    score: Some(target.space_type.score(&query.vector, &embedding)),
                    source: request.include_source.then(|| document.clone()),
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        hits.truncate(request.size.min(query.k));
        Ok(hits)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn embedding_of(document: &Map<String, Value>) -> Option<Vec<f32>> {
    document
        .get(EMBEDDING_FIELD)?
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

/// Evaluates a compiled tree against a stored document.
fn matches_tree(tree: &PredicateTree, document: &Map<String, Value>) -> bool {
    tree.must.iter().all(|clause| matches_clause(clause, document))
        && !tree
            .must_not
            .iter()
            .any(|clause| matches_clause(clause, document))
}

fn matches_clause(clause: &Clause, document: &Map<String, Value>) -> bool {
    let values = field_values(document, clause.field());
    match clause {
        Clause::Term { value, .. } => values.iter().any(|v| v.matches(value)),
        Clause::Range { bounds, .. } => values.iter().any(|v| bounds.contains(v)),
        Clause::TermsSet {
            terms,
            minimum_match,
            ..
        } => {
            if terms.is_empty() {
                return false;
            }
            let matched = terms
                .iter()
                .filter(|term| values.iter().any(|v| v.matches(term)))
                .count();
            matched >= (*minimum_match).min(terms.len())
        },
    }
}

/// Collects the scalar values at a (possibly dotted) field path, flattening
/// arrays.
fn field_values(document: &Map<String, Value>, field: &str) -> Vec<Literal> {
    let current: Vec<&Value> = match document.get(field) {
        Some(value) => vec![value],
        None => {
            let mut parts = field.split('.');
            let root = parts.next().and_then(|first| document.get(first));
            parts.fold(root.into_iter().collect(), |values, part| {
                values
                    .into_iter()
                    .flat_map(flatten)
                    .filter_map(|v| v.get(part))
                    .collect()
            })
        },
    };

    current
        .into_iter()
        .flat_map(flatten)
        .filter_map(Literal::from_json)
        .collect()
}

fn flatten(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().flat_map(flatten).collect(),
        other => vec![other],
    }
}
