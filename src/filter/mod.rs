//! Metadata filter expressions.
//!
//! Filters arrive as JSON objects in the common `$`-operator dialect:
//!
//! ```text
//! {"category": "AI"}                                  equality
//! {"score": {"$gte": 0.8}}                            comparison
//! {"tags": {"$in": ["rust", "db"]}}                   membership
//! {"$and": [{"a": 1}, {"$or": [{"b": 2}, {"b": 3}]}]} combinators
//! {"$not": {"draft": true}}                           negation
//! ```
//!
//! Several field keys in one object are AND-ed in key order. A combinator
//! (`$and`, `$or`, `$not`) must be the only key of its object.
//!
//! The JSON is parsed once into [`FilterExpr`]; [`translate`] turns that into
//! the engine's native [`Where`] tree, and [`FilterExpr::from_native`] goes
//! the other way.

mod translate;

pub use translate::{translate, translate_json};

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::ops::Bound;
use strata_core::{json_type_name, Scalar};
use strata_engine::Where;

/// Comparison operator applied to a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    /// `$eq`
    Eq,
    /// `$ne`
    Ne,
    /// `$gt`
    Gt,
    /// `$gte`
    Gte,
    /// `$lt`
    Lt,
    /// `$lte`
    Lte,
    /// `$in`
    In,
    /// `$nin`
    Nin,
}

impl ComparisonOp {
    /// All operators
    pub const ALL: [ComparisonOp; 8] = [
        ComparisonOp::Eq,
        ComparisonOp::Ne,
        ComparisonOp::Gt,
        ComparisonOp::Gte,
        ComparisonOp::Lt,
        ComparisonOp::Lte,
        ComparisonOp::In,
        ComparisonOp::Nin,
    ];

    /// Wire name including the `$`
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "$eq",
            ComparisonOp::Ne => "$ne",
            ComparisonOp::Gt => "$gt",
            ComparisonOp::Gte => "$gte",
            ComparisonOp::Lt => "$lt",
            ComparisonOp::Lte => "$lte",
            ComparisonOp::In => "$in",
            ComparisonOp::Nin => "$nin",
        }
    }

    /// Parse a wire name
    pub fn parse(s: &str) -> Option<Self> {
        ComparisonOp::ALL.into_iter().find(|op| op.as_str() == s)
    }

    /// True for `$in` / `$nin`
    pub fn takes_list(&self) -> bool {
        matches!(self, ComparisonOp::In | ComparisonOp::Nin)
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical combinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombinatorKind {
    /// `$and`: all children
    And,
    /// `$or`: any child
    Or,
    /// `$not`: exactly one child, negated
    Not,
}

impl CombinatorKind {
    /// Wire name including the `$`
    pub fn as_str(&self) -> &'static str {
        match self {
            CombinatorKind::And => "$and",
            CombinatorKind::Or => "$or",
            CombinatorKind::Not => "$not",
        }
    }

    /// Parse a wire name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "$and" => Some(CombinatorKind::And),
            "$or" => Some(CombinatorKind::Or),
            "$not" => Some(CombinatorKind::Not),
            _ => None,
        }
    }
}

/// Operand of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Single value for `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`
    Scalar(Scalar),
    /// Non-empty value list for `$in`, `$nin`
    List(Vec<Scalar>),
}

impl Operand {
    fn to_json(&self) -> Value {
        match self {
            Operand::Scalar(s) => s.to_json(),
            Operand::List(items) => Value::Array(items.iter().map(Scalar::to_json).collect()),
        }
    }
}

/// Parsed filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// `{"field": value}`: implicit equality
    Literal {
        /// Metadata field
        field: String,
        /// Expected value
        value: Scalar,
    },
    /// `{"field": {"$op": operand}}`
    Operator {
        /// Metadata field
        field: String,
        /// Operator
        op: ComparisonOp,
        /// Operand, list-shaped for `$in`/`$nin`
        operand: Operand,
    },
    /// `{"$and": [...]}`, `{"$or": [...]}`, `{"$not": {...}}`
    Combinator {
        /// Combinator kind
        kind: CombinatorKind,
        /// Children in order; exactly one for `$not`
        children: Vec<FilterExpr>,
    },
}

impl FilterExpr {
    /// Parse a JSON filter
    ///
    /// Returns `None` for `{}` (match everything).
    ///
    /// ## Errors
    /// - `InvalidFilter` describing the first malformed clause
    pub fn parse(value: &Value) -> Result<Option<FilterExpr>> {
        match value {
            Value::Object(map) if map.is_empty() => Ok(None),
            Value::Object(map) => parse_object(map).map(Some),
            other => Err(Error::filter(format!(
                "filter must be an object, got {}",
                json_type_name(other)
            ))),
        }
    }

    /// `$and` of the given children
    pub fn and(children: Vec<FilterExpr>) -> Self {
        FilterExpr::Combinator {
            kind: CombinatorKind::And,
            children,
        }
    }

    /// `$or` of the given children
    pub fn or(children: Vec<FilterExpr>) -> Self {
        FilterExpr::Combinator {
            kind: CombinatorKind::Or,
            children,
        }
    }

    /// `$not` of one child
    #[allow(clippy::should_implement_trait)]
    pub fn not(child: FilterExpr) -> Self {
        FilterExpr::Combinator {
            kind: CombinatorKind::Not,
            children: vec![child],
        }
    }

    /// Render in the JSON wire form
    pub fn to_json(&self) -> Value {
        match self {
            FilterExpr::Literal { field, value } => single(field, value.to_json()),
            FilterExpr::Operator { field, op, operand } => {
                single(field, single(op.as_str(), operand.to_json()))
            }
            FilterExpr::Combinator {
                kind: CombinatorKind::Not,
                children,
            } if children.len() == 1 => single("$not", children[0].to_json()),
            FilterExpr::Combinator { kind, children } => single(
                kind.as_str(),
                Value::Array(children.iter().map(FilterExpr::to_json).collect()),
            ),
        }
    }

    /// Rebuild an expression from a native filter tree
    ///
    /// The result translates back to an equivalent (not necessarily
    /// identical) tree: `Not(Equals)` becomes `$ne`, `Not(AnyOf)` becomes
    /// `$nin`, and a two-sided range becomes an `$and` of two comparisons.
    pub fn from_native(filter: &Where) -> FilterExpr {
        match filter {
            Where::Equals { field, value } => FilterExpr::Literal {
                field: field.clone(),
                value: value.clone(),
            },
            Where::AnyOf { field, values } => FilterExpr::Operator {
                field: field.clone(),
                op: ComparisonOp::In,
                operand: Operand::List(values.clone()),
            },
            Where::Range {
                field,
                lower,
                upper,
            } => {
                let mut parts = Vec::with_capacity(2);
                match lower {
                    Bound::Included(v) => parts.push(comparison(field, ComparisonOp::Gte, v)),
                    Bound::Excluded(v) => parts.push(comparison(field, ComparisonOp::Gt, v)),
                    Bound::Unbounded => {}
                }
                match upper {
                    Bound::Included(v) => parts.push(comparison(field, ComparisonOp::Lte, v)),
                    Bound::Excluded(v) => parts.push(comparison(field, ComparisonOp::Lt, v)),
                    Bound::Unbounded => {}
                }
                // A fully unbounded range has no wire form; `translate` never builds one
                if parts.len() == 1 {
                    parts.remove(0)
                } else {
                    FilterExpr::and(parts)
                }
            }
            Where::Not(inner) => match inner.as_ref() {
                Where::Equals { field, value } => comparison(field, ComparisonOp::Ne, value),
                Where::AnyOf { field, values } => FilterExpr::Operator {
                    field: field.clone(),
                    op: ComparisonOp::Nin,
                    operand: Operand::List(values.clone()),
                },
                other => FilterExpr::not(FilterExpr::from_native(other)),
            },
            Where::And(children) => {
                FilterExpr::and(children.iter().map(FilterExpr::from_native).collect())
            }
            Where::Or(children) => {
                FilterExpr::or(children.iter().map(FilterExpr::from_native).collect())
            }
        }
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

fn comparison(field: &str, op: ComparisonOp, value: &Scalar) -> FilterExpr {
    FilterExpr::Operator {
        field: field.to_string(),
        op,
        operand: Operand::Scalar(value.clone()),
    }
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

// ============================================================================
// JSON parsing
// ============================================================================

/// Non-empty object → one clause, or an implicit `$and` of several field keys
///
/// A `$` key must be the only key of its object.
fn parse_object(map: &Map<String, Value>) -> Result<FilterExpr> {
    if map.is_empty() {
        return Err(Error::filter("empty filter object in nested position"));
    }
    if map.len() > 1 {
        if let Some(key) = map.keys().find(|k| k.starts_with('$')) {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            return Err(Error::filter(format!(
                "'{key}' must be the only key of its object, got {}; wrap the clauses in $and",
                keys.join(", ")
            )));
        }
    }

    let mut clauses = map
        .iter()
        .map(|(key, value)| parse_clause(key, value))
        .collect::<Result<Vec<_>>>()?;

    if clauses.len() == 1 {
        Ok(clauses.remove(0))
    } else {
        Ok(FilterExpr::and(clauses))
    }
}

fn parse_clause(key: &str, value: &Value) -> Result<FilterExpr> {
    if let Some(kind) = CombinatorKind::parse(key) {
        return parse_combinator(kind, value);
    }
    if key.starts_with('$') {
        return Err(Error::filter(format!(
            "unknown operator '{key}' at field position"
        )));
    }
    if key.is_empty() {
        return Err(Error::filter("field name cannot be empty"));
    }

    match value {
        Value::Object(ops) => parse_operator(key, ops),
        Value::Null => Err(Error::filter(format!(
            "field '{key}' compares against null, which is not supported"
        ))),
        Value::Array(_) => Err(Error::filter(format!(
            "field '{key}' has an array literal; use {{\"$in\": [...]}} for membership"
        ))),
        scalar => Ok(FilterExpr::Literal {
            field: key.to_string(),
            value: scalar_operand(key, "literal", scalar)?,
        }),
    }
}

fn parse_combinator(kind: CombinatorKind, value: &Value) -> Result<FilterExpr> {
    let name = kind.as_str();
    let children = match (kind, value) {
        (CombinatorKind::Not, Value::Object(map)) => vec![parse_object(map)?],
        (CombinatorKind::Not, Value::Array(items)) if items.len() == 1 => {
            vec![parse_child(name, &items[0])?]
        }
        (CombinatorKind::Not, Value::Array(items)) => {
            return Err(Error::filter(format!(
                "$not takes exactly one filter, got {}",
                items.len()
            )))
        }
        (_, Value::Array(items)) if items.is_empty() => {
            return Err(Error::filter(format!("{name} requires a non-empty array")))
        }
        (_, Value::Array(items)) => items
            .iter()
            .map(|item| parse_child(name, item))
            .collect::<Result<Vec<_>>>()?,
        (_, other) => {
            return Err(Error::filter(format!(
                "{name} requires {}, got {}",
                if kind == CombinatorKind::Not {
                    "an object"
                } else {
                    "an array of objects"
                },
                json_type_name(other)
            )))
        }
    };
    Ok(FilterExpr::Combinator { kind, children })
}

fn parse_child(parent: &str, value: &Value) -> Result<FilterExpr> {
    match value {
        Value::Object(map) => parse_object(map),
        other => Err(Error::filter(format!(
            "{parent} children must be objects, got {}",
            json_type_name(other)
        ))),
    }
}

fn parse_operator(field: &str, ops: &Map<String, Value>) -> Result<FilterExpr> {
    let mut entries = ops.iter();
    let (key, operand) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        (None, _) => {
            return Err(Error::filter(format!(
                "field '{field}' has an empty operator object"
            )))
        }
        (Some(_), Some(_)) => {
            let keys: Vec<&str> = ops.keys().map(String::as_str).collect();
            return Err(Error::filter(format!(
                "field '{field}' has {} operators ({}); use $and to combine them",
                keys.len(),
                keys.join(", ")
            )));
        }
    };

    if !key.starts_with('$') {
        return Err(Error::filter(format!(
            "field '{field}' has a nested object with key '{key}'; nested fields are not supported"
        )));
    }
    let op = ComparisonOp::parse(key)
        .ok_or_else(|| Error::filter(format!("unknown operator '{key}' on field '{field}'")))?;

    let operand = if op.takes_list() {
        match operand {
            Value::Array(items) if items.is_empty() => {
                return Err(Error::filter(format!(
                    "{op} on field '{field}' requires a non-empty array"
                )))
            }
            Value::Array(items) => Operand::List(
                items
                    .iter()
                    .map(|item| scalar_operand(field, op.as_str(), item))
                    .collect::<Result<Vec<_>>>()?,
            ),
            other => {
                return Err(Error::filter(format!(
                    "{op} on field '{field}' requires an array, got {}",
                    json_type_name(other)
                )))
            }
        }
    } else {
        Operand::Scalar(scalar_operand(field, op.as_str(), operand)?)
    };

    Ok(FilterExpr::Operator {
        field: field.to_string(),
        op,
        operand,
    })
}

fn scalar_operand(field: &str, what: &str, value: &Value) -> Result<Scalar> {
    match value {
        Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            Scalar::from_json(field, value).map_err(|e| Error::filter(e.to_string()))
        }
        other => Err(Error::filter(format!(
            "{what} on field '{field}' requires a scalar, got {}",
            json_type_name(other)
        ))),
    }
}
