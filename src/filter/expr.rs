//! Filter expressions.
//!
//! The filter language is a JSON object in the style popularised by
//! document stores:
//!
//! | Expression | Meaning |
//! |------------|---------|
//! | `{"genre": "comedy"}` | `genre` equals `comedy` |
//! | `{"genre": {"$eq": "comedy"}}` | same as above |
//! | `{"genre": {"$neq": "comedy"}}` | `genre` is not `comedy` (`$ne` also accepted) |
//! | `{"year": {"$gte": 2000, "$lt": 2010}}` | range, merged into one clause |
//! | `{"genre": {"$in": ["drama", "action"]}}` | at least one of |
//! | `{"genre": {"$nin": ["drama", "action"]}}` | none of |
//! | `{"$and": [{"tags": "a"}, {"tags": "b"}]}` | field holds all listed values |
//!
//! Top-level keys combine with AND. Anything outside this grammar is
//! rejected with [`Error::MalformedFilter`] rather than dropped.

use super::Literal;
use crate::{Error, Result};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Reserved top-level key holding a conjunction list.
pub const AND_KEY: &str = "$and";

/// A comparison or set-membership operator with its operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    /// `$eq`: field equals the operand.
    Eq(Literal),
    /// `$neq`: field does not equal the operand.
    Neq(Literal),
    /// `$gt`: strictly greater than.
    Gt(Literal),
    /// `$gte`: greater than or equal.
    Gte(Literal),
    /// `$lt`: strictly less than.
    Lt(Literal),
    /// `$lte`: less than or equal.
    Lte(Literal),
    /// `$in`: field holds at least one of the operands.
    In(Vec<Literal>),
    /// `$nin`: field holds none of the operands.
    Nin(Vec<Literal>),
}

impl Operator {
    /// Returns the operator symbol as written in JSON.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Eq(_) => "$eq",
            Self::Neq(_) => "$neq",
            Self::Gt(_) => "$gt",
            Self::Gte(_) => "$gte",
            Self::Lt(_) => "$lt",
            Self::Lte(_) => "$lte",
            Self::In(_) => "$in",
            Self::Nin(_) => "$nin",
        }
    }

    /// Parses a `(symbol, operand)` pair for `field`.
    fn parse(field: &str, symbol: &str, operand: &Value) -> Result<Self> {
        let scalar = || {
            Literal::from_json(operand).ok_or_else(|| {
                Error::MalformedFilter(format!(
                    "operator '{symbol}' on field '{field}' expects a scalar operand, got {operand}"
                ))
            })
        };
        let list = || -> Result<Vec<Literal>> {
            let Value::Array(items) = operand else {
                return Err(Error::MalformedFilter(format!(
                    "operator '{symbol}' on field '{field}' expects an array operand, got {operand}"
                )));
            };
            items
                .iter()
                .map(|item| {
                    Literal::from_json(item).ok_or_else(|| {
                        Error::MalformedFilter(format!(
                            "operator '{symbol}' on field '{field}' contains a non-scalar element {item}"
                        ))
                    })
                })
                .collect()
        };

        match symbol {
            "$eq" => Ok(Self::Eq(scalar()?)),
            "$neq" | "$ne" => Ok(Self::Neq(scalar()?)),
            "$gt" => Ok(Self::Gt(scalar()?)),
            "$gte" => Ok(Self::Gte(scalar()?)),
            "$lt" => Ok(Self::Lt(scalar()?)),
            "$lte" => Ok(Self::Lte(scalar()?)),
            "$in" => Ok(Self::In(list()?)),
            "$nin" => Ok(Self::Nin(list()?)),
            other => Err(Error::MalformedFilter(format!(
                "unknown operator '{other}' on field '{field}'"
            ))),
        }
    }

    fn operand_json(&self) -> Value {
        match self {
            Self::Eq(v) | Self::Neq(v) | Self::Gt(v) | Self::Gte(v) | Self::Lt(v) | Self::Lte(v) => {
                v.to_json()
            },
            Self::In(vs) | Self::Nin(vs) => Value::Array(vs.iter().map(Literal::to_json).collect()),
        }
    }
}

/// The condition attached to a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCondition {
    /// A bare scalar, meaning equality.
    Equals(Literal),
    /// An operator object, applied in order.
    Operators(Vec<Operator>),
}

/// One top-level entry of a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterEntry {
    /// A predicate on one field.
    Field {
        /// Metadata field name.
        field: String,
        /// Condition on the field.
        condition: FieldCondition,
    },
    /// The `$and` list: `(field, literal)` fragments grouped per field.
    And(Vec<(String, Literal)>),
}

/// A parsed metadata filter.
///
/// Build one from JSON:
///
/// ```rust
/// use vectorgate::filter::FilterSpec;
///
/// let spec: FilterSpec = r#"{"name": "pp", "no": {"$gte": 2200, "$lte": 2800}}"#.parse()?;
/// assert_eq!(spec.entries().len(), 2);
/// # Ok::<(), vectorgate::Error>(())
/// ```
///
/// or in code:
///
/// ```rust
/// use vectorgate::filter::FilterSpec;
///
/// let spec = FilterSpec::new().eq("name", "pp").gte("no", 2200).lte("no", 2800);
/// assert_eq!(spec.entries().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(try_from = "Value")]
pub struct FilterSpec {
    entries: Vec<FilterEntry>,
}

impl FilterSpec {
    /// Creates an empty filter (matches all).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Returns the entries in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[FilterEntry] {
        &self.entries
    }

    /// Returns true if the filter has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends a raw entry.
    #[must_use]
    pub fn with_entry(mut self, entry: FilterEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Adds a bare equality entry, `{"field": value}`.
    #[must_use]
    pub fn eq(self, field: impl Into<String>, value: impl Into<Literal>) -> Self {
        self.with_entry(FilterEntry::Field {
            field: field.into(),
            condition: FieldCondition::Equals(value.into()),
        })
    }

    /// Adds an operator to the field's operator object, creating it if needed.
    #[must_use]
    pub fn with_operator(mut self, field: impl Into<String>, op: Operator) -> Self {
        let field = field.into();
        let existing = self.entries.iter_mut().find_map(|entry| match entry {
            FilterEntry::Field {
                field: name,
                condition: FieldCondition::Operators(ops),
            } if *name == field => Some(ops),
            _ => None,
        });
        match existing {
            Some(ops) => ops.push(op),
            None => self.entries.push(FilterEntry::Field {
                field,
                condition: FieldCondition::Operators(vec![op]),
            }),
        }
        self
    }

    /// Adds `$neq`.
    #[must_use]
    pub fn neq(self, field: impl Into<String>, value: impl Into<Literal>) -> Self {
        self.with_operator(field, Operator::Neq(value.into()))
    }

    /// Adds `$gt`.
    #[must_use]
    pub fn gt(self, field: impl Into<String>, value: impl Into<Literal>) -> Self {
        self.with_operator(field, Operator::Gt(value.into()))
    }

    /// Adds `$gte`.
    #[must_use]
    pub fn gte(self, field: impl Into<String>, value: impl Into<Literal>) -> Self {
        self.with_operator(field, Operator::Gte(value.into()))
    }

    /// Adds `$lt`.
    #[must_use]
    pub fn lt(self, field: impl Into<String>, value: impl Into<Literal>) -> Self {
        self.with_operator(field, Operator::Lt(value.into()))
    }

    /// Adds `$lte`.
    #[must_use]
    pub fn lte(self, field: impl Into<String>, value: impl Into<Literal>) -> Self {
        self.with_operator(field, Operator::Lte(value.into()))
    }

    /// Adds `$in`.
    #[must_use]
    pub fn any_of<I, V>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        self.with_operator(field, Operator::In(values.into_iter().map(Into::into).collect()))
    }

    /// Adds `$nin`.
    #[must_use]
    pub fn none_of<I, V>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        self.with_operator(field, Operator::Nin(values.into_iter().map(Into::into).collect()))
    }

    /// Appends `{field: value}` fragments to the `$and` list.
    #[must_use]
    pub fn all_of<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        let field = field.into();
        let fragments = values.into_iter().map(|v| (field.clone(), v.into()));
        if let Some(FilterEntry::And(list)) = self
            .entries
            .iter_mut()
            .find(|entry| matches!(entry, FilterEntry::And(_)))
        {
            list.extend(fragments);
        } else {
            self.entries.push(FilterEntry::And(fragments.collect()));
        }
        self
    }

    /// Parses a filter from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFilter`] if the value is not a valid filter.
    pub fn from_json(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::MalformedFilter(format!(
                "filter must be a JSON object, got {value}"
            )));
        };

        let entries = map
            .iter()
            .map(|(key, value)| parse_entry(key, value))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { entries })
    }

    /// Renders the filter back to its JSON form.
    ///
    /// Entries on the same field share one operator object. A bare equality
    /// that meets an operator object on its field is written as `$eq`.
    /// Multiple `$and` entries (only possible through the builder) are
    /// concatenated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFilter`] if two entries put the same
    /// operator on one field, which a JSON object cannot hold.
    pub fn to_json(&self) -> Result<Value> {
        let mut map = Map::new();
        for entry in &self.entries {
            match entry {
                FilterEntry::Field {
                    field,
                    condition: FieldCondition::Equals(v),
                } => match map.get_mut(field) {
                    None => {
                        map.insert(field.clone(), v.to_json());
                    },
                    Some(slot) => insert_operator(slot, field, "$eq", v.to_json())?,
                },
                FilterEntry::Field {
                    field,
                    condition: FieldCondition::Operators(ops),
                } => {
                    let slot = map
                        .entry(field.clone())
                        .or_insert_with(|| Value::Object(Map::new()));
                    for op in ops {
                        insert_operator(slot, field, op.symbol(), op.operand_json())?;
                    }
                },
                FilterEntry::And(fragments) => {
                    let slot = map
                        .entry(AND_KEY.to_string())
                        .or_insert_with(|| Value::Array(Vec::new()));
                    if let Value::Array(list) = slot {
                        for (field, v) in fragments {
                            let mut fragment = Map::new();
                            fragment.insert(field.clone(), v.to_json());
                            list.push(Value::Object(fragment));
                        }
                    }
                },
            }
        }
        Ok(Value::Object(map))
    }
}

/// Adds `symbol: operand` to a field's slot, turning a bare equality into
/// `{"$eq": ..}` first.
fn insert_operator(slot: &mut Value, field: &str, symbol: &str, operand: Value) -> Result<()> {
    if !slot.is_object() {
        let scalar = std::mem::take(slot);
        let mut ops = Map::new();
        ops.insert("$eq".to_string(), scalar);
        *slot = Value::Object(ops);
    }
    let Value::Object(ops) = slot else {
        return Ok(());
    };
    if ops.contains_key(symbol) {
        return Err(Error::MalformedFilter(format!(
            "field '{field}' has operator '{symbol}' more than once; it has no JSON form"
        )));
    }
    ops.insert(symbol.to_string(), operand);
    Ok(())
}

fn parse_entry(key: &str, value: &Value) -> Result<FilterEntry> {
    if key == AND_KEY {
        return parse_conjunction(value).map(FilterEntry::And);
    }
    if key.starts_with('$') {
        return Err(Error::MalformedFilter(format!(
            "unsupported top-level operator '{key}'"
        )));
    }

    let condition = match value {
        Value::Object(ops) => FieldCondition::Operators(parse_operators(key, ops)?),
        other => FieldCondition::Equals(Literal::from_json(other).ok_or_else(|| {
            Error::MalformedFilter(format!(
                "field '{key}' must be a scalar or an operator object, got {other}"
            ))
        })?),
    };

    Ok(FilterEntry::Field {
        field: key.to_string(),
        condition,
    })
}

fn parse_operators(field: &str, ops: &Map<String, Value>) -> Result<Vec<Operator>> {
    if ops.is_empty() {
        return Err(Error::MalformedFilter(format!(
            "field '{field}' has an empty operator object"
        )));
    }
    if let Some(plain) = ops.keys().find(|k| !k.starts_with('$')) {
        return Err(Error::MalformedFilter(format!(
            "field '{field}' has nested key '{plain}'; nested objects are not supported"
        )));
    }
    ops.iter()
        .map(|(symbol, operand)| Operator::parse(field, symbol, operand))
        .collect()
}

fn parse_conjunction(value: &Value) -> Result<Vec<(String, Literal)>> {
    let Value::Array(items) = value else {
        return Err(Error::MalformedFilter(format!(
            "'{AND_KEY}' expects an array of single-field objects, got {value}"
        )));
    };

    items
        .iter()
        .map(|item| {
            let fragment = match item {
                Value::Object(map) if map.len() == 1 => map.iter().next(),
                _ => None,
            };
            let Some((field, literal)) = fragment else {
                return Err(Error::MalformedFilter(format!(
                    "'{AND_KEY}' elements must be single-field objects, got {item}"
                )));
            };
            let literal = Literal::from_json(literal).ok_or_else(|| {
                Error::MalformedFilter(format!(
                    "'{AND_KEY}' element for field '{field}' must hold a scalar, got {literal}"
                ))
            })?;
            Ok((field.clone(), literal))
        })
        .collect()
}

impl TryFrom<Value> for FilterSpec {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_json(&value)
    }
}

impl TryFrom<&Value> for FilterSpec {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        Self::from_json(value)
    }
}

impl FromStr for FilterSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s)
            .map_err(|e| Error::MalformedFilter(format!("filter is not valid JSON: {e}")))?;
        Self::from_json(&value)
    }
}

impl Serialize for FilterSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

/// Writes the JSON form, or the entries' debug form if the filter has none.
impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_json() {
            Ok(value) => write!(f, "{value}"),
            Err(_) => write!(f, "{:?}", self.entries),
        }
    }
}
