//! Translation from [`FilterExpr`] to the engine's [`Where`] tree.

use super::{CombinatorKind, ComparisonOp, FilterExpr, Operand};
use crate::error::{Error, Result};
use serde_json::Value;
use std::ops::Bound;
use strata_engine::Where;

/// Translate an optional JSON filter
///
/// `None` and `{}` both mean "match everything" and yield `Ok(None)`.
///
/// ## Errors
/// - `InvalidFilter` if the JSON is malformed
pub fn translate_json(filter: Option<&Value>) -> Result<Option<Where>> {
    match filter {
        None => Ok(None),
        Some(value) => match FilterExpr::parse(value)? {
            None => Ok(None),
            Some(expr) => translate(&expr).map(Some),
        },
    }
}

/// Translate a parsed expression
///
/// Only shape errors that parsing cannot see (hand-built expressions with
/// the wrong operand shape or combinator arity) are reported here.
pub fn translate(expr: &FilterExpr) -> Result<Where> {
    match expr {
        FilterExpr::Literal { field, value } => Ok(Where::Equals {
            field: field.clone(),
            value: value.clone(),
        }),
        FilterExpr::Operator { field, op, operand } => translate_operator(field, *op, operand),
        FilterExpr::Combinator { kind, children } => {
            let mut translated = children.iter().map(translate).collect::<Result<Vec<_>>>()?;
            match kind {
                CombinatorKind::And | CombinatorKind::Or if translated.is_empty() => Err(
                    Error::filter(format!("{} requires at least one child", kind.as_str())),
                ),
                CombinatorKind::And => Ok(Where::And(translated)),
                CombinatorKind::Or => Ok(Where::Or(translated)),
                CombinatorKind::Not if translated.len() == 1 => {
                    Ok(Where::not(translated.remove(0)))
                }
                CombinatorKind::Not => Err(Error::filter(format!(
                    "$not takes exactly one child, got {}",
                    translated.len()
                ))),
            }
        }
    }
}

fn translate_operator(field: &str, op: ComparisonOp, operand: &Operand) -> Result<Where> {
    let field = field.to_string();
    match (op, operand) {
        (ComparisonOp::Eq, Operand::Scalar(v)) => Ok(Where::Equals {
            field,
            value: v.clone(),
        }),
        (ComparisonOp::Ne, Operand::Scalar(v)) => Ok(Where::not(Where::Equals {
            field,
            value: v.clone(),
        })),
        (ComparisonOp::Gt, Operand::Scalar(v)) => Ok(Where::range(
            field,
            Bound::Excluded(v.clone()),
            Bound::Unbounded,
        )),
        (ComparisonOp::Gte, Operand::Scalar(v)) => Ok(Where::range(
            field,
            Bound::Included(v.clone()),
            Bound::Unbounded,
        )),
        (ComparisonOp::Lt, Operand::Scalar(v)) => Ok(Where::range(
            field,
            Bound::Unbounded,
            Bound::Excluded(v.clone()),
        )),
        (ComparisonOp::Lte, Operand::Scalar(v)) => Ok(Where::range(
            field,
            Bound::Unbounded,
            Bound::Included(v.clone()),
        )),
        (ComparisonOp::In | ComparisonOp::Nin, Operand::List(values)) if values.is_empty() => {
            Err(Error::filter(format!(
                "{op} on field '{field}' requires a non-empty array"
            )))
        }
        (ComparisonOp::In, Operand::List(values)) => Ok(Where::AnyOf {
            field,
            values: values.clone(),
        }),
        (ComparisonOp::Nin, Operand::List(values)) => Ok(Where::not(Where::AnyOf {
            field,
            values: values.clone(),
        })),
        (op, Operand::List(_)) => Err(Error::filter(format!(
            "{op} on field '{field}' requires a scalar, got an array"
        ))),
        (op, Operand::Scalar(_)) => Err(Error::filter(format!(
            "{op} on field '{field}' requires an array"
        ))),
    }
}
