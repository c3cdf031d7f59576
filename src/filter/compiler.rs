//! Filter compiler.
//!
//! Translates a [`FilterSpec`] into a [`PredicateTree`].
//!
//! # Translation Rules
//!
//! | Input | Clause | List |
//! |-------|--------|------|
//! | `{"f": v}` / `{"f": {"$eq": v}}` | `Term(f, v)` | `must` |
//! | `{"f": {"$neq": v}}` | `Term(f, v)` | `must_not` |
//! | `{"f": {"$in": [..]}}` | `TermsSet(f, [..], 1)` | `must` |
//! | `{"f": {"$nin": [..]}}` | `TermsSet(f, [..], 1)` | `must_not` |
//! | `{"f": {"$gt"/"$gte"/"$lt"/"$lte": v}}` | one merged `Range(f, ..)` | `must` |
//! | `{"$and": [{"f": a}, {"f": b}]}` | `TermsSet(f, [a, b], 2)` | `must` |
//!
//! `$and` groups fragments by field and requires every grouped value to be
//! present, which only makes sense for multi-valued fields such as tag
//! lists. A scalar field under `$and` with two values can never match.
//! [`ConjunctionPolicy`] controls whether that is accepted.

use super::{
    BoundKind, Clause, FieldCondition, FilterEntry, FilterSpec, Literal, Operator, PredicateTree,
    RangeBounds,
};
use crate::observability::metrics::FILTERS_COMPILED_TOTAL;
use crate::{Error, Result};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap};

/// How `$and` fragments are validated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConjunctionPolicy {
    /// Compile every `$and` group.
    #[default]
    Permissive,
    /// Only the listed multi-valued fields may appear under `$and`.
    MultiValuedOnly(BTreeSet<String>),
}

impl ConjunctionPolicy {
    fn check(&self, field: &str) -> Result<()> {
        match self {
            Self::Permissive => Ok(()),
            Self::MultiValuedOnly(fields) if fields.contains(field) => Ok(()),
            Self::MultiValuedOnly(_) => Err(Error::MalformedFilter(format!(
                "field '{field}' is not declared multi-valued and cannot be used under '$and'"
            ))),
        }
    }
}

/// Compiles filter specs into predicate trees.
///
/// The compiler holds only configuration; each call to
/// [`compile`](Self::compile) builds a fresh tree.
#[derive(Debug, Clone, Default)]
pub struct FilterCompiler {
    policy: ConjunctionPolicy,
}

impl FilterCompiler {
    /// Creates a compiler with the permissive conjunction policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the conjunction policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ConjunctionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the conjunction policy.
    #[must_use]
    pub const fn policy(&self) -> &ConjunctionPolicy {
        &self.policy
    }

    /// Compiles a filter into a predicate tree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFilter`] if a `$and` fragment violates the
    /// conjunction policy.
    pub fn compile(&self, spec: &FilterSpec) -> Result<PredicateTree> {
        let mut builder = TreeBuilder::default();

        for entry in spec.entries() {
            match entry {
                FilterEntry::And(fragments) => self.compile_conjunction(&mut builder, fragments)?,
                FilterEntry::Field {
                    field,
                    condition: FieldCondition::Equals(value),
                } => builder.must(Clause::Term {
                    field: field.clone(),
                    value: value.clone(),
                }),
                FilterEntry::Field {
                    field,
                    condition: FieldCondition::Operators(ops),
                } => {
                    for op in ops {
                        builder.apply(field, op);
                    }
                },
            }
        }

        let tree = builder.finish();
        metrics::counter!(FILTERS_COMPILED_TOTAL).increment(1);
        tracing::debug!(
            must = tree.must.len(),
            must_not = tree.must_not.len(),
            "Compiled filter"
        );
        Ok(tree)
    }

    fn compile_conjunction(
        &self,
        builder: &mut TreeBuilder,
        fragments: &[(String, Literal)],
    ) -> Result<()> {
        let mut groups: IndexMap<&str, Vec<Literal>> = IndexMap::new();
        for (field, value) in fragments {
            self.policy.check(field)?;
            groups.entry(field.as_str()).or_default().push(value.clone());
        }

        for (field, terms) in groups {
            builder.must(Clause::TermsSet {
                field: field.to_string(),
                minimum_match: terms.len(),
                terms,
            });
        }
        Ok(())
    }
}

/// Compiles with the default compiler.
///
/// # Errors
///
/// See [`FilterCompiler::compile`].
pub fn compile(spec: &FilterSpec) -> Result<PredicateTree> {
    FilterCompiler::new().compile(spec)
}

/// A `must` slot: either a finished clause or a placeholder for the range
/// clause of a field, resolved in [`TreeBuilder::finish`].
#[derive(Debug)]
enum MustSlot {
    Clause(Clause),
    Range(String),
}

/// In-progress tree with range clauses kept per field until finished.
#[derive(Debug, Default)]
struct TreeBuilder {
    must: Vec<MustSlot>,
    must_not: Vec<Clause>,
    ranges: HashMap<String, RangeBounds>,
}

impl TreeBuilder {
    fn must(&mut self, clause: Clause) {
        self.must.push(MustSlot::Clause(clause));
    }

    fn range(&mut self, field: &str, kind: BoundKind, value: Literal) {
        if let Some(bounds) = self.ranges.get_mut(field) {
            bounds.set(kind, value);
            return;
        }
        self.ranges
            .insert(field.to_string(), RangeBounds::single(kind, value));
        self.must.push(MustSlot::Range(field.to_string()));
    }

    fn apply(&mut self, field: &str, op: &Operator) {
        let field_name = || field.to_string();
        match op {
            Operator::Eq(value) => self.must(Clause::Term {
                field: field_name(),
                value: value.clone(),
            }),
            Operator::Neq(value) => self.must_not.push(Clause::Term {
                field: field_name(),
                value: value.clone(),
            }),
            Operator::In(terms) => self.must(Clause::TermsSet {
                field: field_name(),
                terms: terms.clone(),
                minimum_match: 1,
            }),
            Operator::Nin(terms) => self.must_not.push(Clause::TermsSet {
                field: field_name(),
                terms: terms.clone(),
                minimum_match: 1,
            }),
            Operator::Gt(value) => self.range(field, BoundKind::Gt, value.clone()),
            Operator::Gte(value) => self.range(field, BoundKind::Gte, value.clone()),
            Operator::Lt(value) => self.range(field, BoundKind::Lt, value.clone()),
            Operator::Lte(value) => self.range(field, BoundKind::Lte, value.clone()),
        }
    }

    fn finish(mut self) -> PredicateTree {
        let must = self
            .must
            .into_iter()
            .filter_map(|slot| match slot {
                MustSlot::Clause(clause) => Some(clause),
                MustSlot::Range(field) => self
                    .ranges
                    .remove(&field)
                    .map(|bounds| Clause::Range { field, bounds }),
            })
            .collect();

        PredicateTree {
            must,
            must_not: self.must_not,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use test_case::test_case;

    fn compile_json(value: &Value) -> PredicateTree {
        compile(&FilterSpec::from_json(value).unwrap()).unwrap()
    }

    fn term(field: &str, value: impl Into<Literal>) -> Clause {
        Clause::Term {
            field: field.to_string(),
            value: value.into(),
        }
    }

    fn terms_set(field: &str, terms: &[&str], minimum_match: usize) -> Clause {
        Clause::TermsSet {
            field: field.to_string(),
            terms: terms.iter().map(|&t| Literal::from(t)).collect(),
            minimum_match,
        }
    }

    #[test]
    fn test_scalar_equality() {
        let tree = compile_json(&json!({"genre": "comedy"}));
        assert_eq!(tree.must, vec![term("genre", "comedy")]);
        assert!(tree.must_not.is_empty());
    }

    #[test]
    fn test_large_unsigned_is_not_rounded() {
        let tree = compile_json(&json!({
            "n": 18_446_744_073_709_551_615_u64,
            "m": {"$lte": 18_446_744_073_709_551_615_u64}
        }));
        assert_eq!(
            tree.to_json().unwrap(),
            json!({"must": [
                {"term": {"n": {"value": 18_446_744_073_709_551_615_u64}}},
                {"range": {"m": {"lte": 18_446_744_073_709_551_615_u64}}}
            ]})
        );
    }

    #[test]
    fn test_eq_operator_matches_scalar_form() {
        assert_eq!(
            compile_json(&json!({"genre": {"$eq": "comedy"}})),
            compile_json(&json!({"genre": "comedy"}))
        );
    }

    #[test]
    fn test_neq_goes_to_must_not() {
        let tree = compile_json(&json!({"genre": {"$neq": "comedy"}}));
        assert!(tree.must.is_empty());
        assert_eq!(tree.must_not, vec![term("genre", "comedy")]);
    }

    #[test]
    fn test_range_operators_merge() {
        let tree = compile_json(&json!({"n": {"$gte": 10, "$lte": 20}}));
        let mut bounds = RangeBounds::single(BoundKind::Gte, Literal::Integer(10));
        bounds.set(BoundKind::Lte, Literal::Integer(20));
        assert_eq!(
            tree.must,
            vec![Clause::Range {
                field: "n".to_string(),
                bounds
            }]
        );
    }

    #[test]
    fn test_range_merges_across_entries_and_overwrites() {
        let spec = FilterSpec::new()
            .gt("n", 1)
            .eq("other", "x")
            .with_entry(FilterEntry::Field {
                field: "n".to_string(),
                condition: FieldCondition::Operators(vec![
                    Operator::Gt(Literal::Integer(5)),
                    Operator::Lt(Literal::Integer(9)),
                ]),
            });
        let tree = compile(&spec).unwrap();

        let mut bounds = RangeBounds::single(BoundKind::Gt, Literal::Integer(5));
        bounds.set(BoundKind::Lt, Literal::Integer(9));
        assert_eq!(
            tree.must,
            vec![
                Clause::Range {
                    field: "n".to_string(),
                    bounds
                },
                term("other", "x"),
            ]
        );
    }

    #[test]
    fn test_ranges_on_different_fields_stay_separate() {
        let tree = compile_json(&json!({"a": {"$gt": 1}, "b": {"$lt": 2}}));
        assert_eq!(tree.must.len(), 2);
        assert_eq!(tree.must[0].field(), "a");
        assert_eq!(tree.must[1].field(), "b");
    }

    #[test_case("$in", true; "in goes to must")]
    #[test_case("$nin", false; "nin goes to must_not")]
    fn test_set_membership(symbol: &str, positive: bool) {
        let mut ops = serde_json::Map::new();
        ops.insert(symbol.to_string(), json!(["a", "b"]));
        let tree = compile_json(&json!({"t": ops}));
        let expected = vec![terms_set("t", &["a", "b"], 1)];
        if positive {
            assert_eq!(tree.must, expected);
            assert!(tree.must_not.is_empty());
        } else {
            assert_eq!(tree.must_not, expected);
            assert!(tree.must.is_empty());
        }
    }

    #[test]
    fn test_conjunction_groups_by_field() {
        let tree = compile_json(&json!({"$and": [{"tag": "a"}, {"tag": "b"}]}));
        assert_eq!(tree.must, vec![terms_set("tag", &["a", "b"], 2)]);
    }

    #[test]
    fn test_conjunction_keeps_first_appearance_order() {
        let tree = compile_json(&json!({"$and": [
            {"genre": "comedy"},
            {"tags": "p1"},
            {"genre": "documentary"}
        ]}));
        assert_eq!(
            tree.must,
            vec![
                terms_set("genre", &["comedy", "documentary"], 2),
                terms_set("tags", &["p1"], 1),
            ]
        );
    }

    #[test]
    fn test_duplicate_representations_are_not_deduplicated() {
        let spec = FilterSpec::new()
            .eq("genre", "comedy")
            .with_operator("genre", Operator::Eq(Literal::from("comedy")));
        let tree = compile(&spec).unwrap();
        assert_eq!(tree.must, vec![term("genre", "comedy"), term("genre", "comedy")]);
    }

    #[test]
    fn test_empty_spec() {
        let tree = compile(&FilterSpec::new()).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.to_json().unwrap(), json!({}));
    }

    #[test]
    fn test_full_example_serialization() {
        let tree = compile_json(&json!({
            "name": {"$eq": "pp"},
            "tags": {"$in": ["p1", "t3"]},
            "no": {"$gte": 2200, "$lte": 2800},
            "kind": {"$neq": "draft"}
        }));
        assert_eq!(
            tree.to_json().unwrap(),
            json!({
                "must": [
                    {"term": {"name": {"value": "pp"}}},
                    {"terms_set": {"tags": {
                        "terms": ["p1", "t3"],
                        "minimum_should_match_script": {"source": "Math.min(params.num_terms, 1)"}
                    }}},
                    {"range": {"no": {"gte": 2200, "lte": 2800}}}
                ],
                "must_not": [
                    {"term": {"kind": {"value": "draft"}}}
                ]
            })
        );
    }

    #[test]
    fn test_multi_valued_only_policy() {
        let compiler = FilterCompiler::new().with_policy(ConjunctionPolicy::MultiValuedOnly(
            BTreeSet::from(["tags".to_string()]),
        ));

        let ok = FilterSpec::new().all_of("tags", ["p1", "p2"]);
        assert_eq!(
            compiler.compile(&ok).unwrap().must,
            vec![terms_set("tags", &["p1", "p2"], 2)]
        );

        let scalar = FilterSpec::new().all_of("genre", ["comedy", "documentary"]);
        let err = compiler.compile(&scalar).unwrap_err();
        assert!(matches!(err, Error::MalformedFilter(msg) if msg.contains("genre")));
    }

    #[test]
    fn test_policy_does_not_affect_other_operators() {
        let compiler = FilterCompiler::new()
            .with_policy(ConjunctionPolicy::MultiValuedOnly(BTreeSet::new()));
        let tree = compiler
            .compile(&FilterSpec::new().eq("genre", "comedy").any_of("genre", ["a"]))
            .unwrap();
        assert_eq!(tree.must.len(), 2);
    }
}
