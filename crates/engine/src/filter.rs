//! Native metadata predicates
//!
//! `Where` is the engine's own filter language. It is evaluated against the
//! flat metadata of each entry before ranking, so `k` applies to the filtered
//! candidate set.
//!
//! Matching rules:
//! - A missing field never matches a leaf predicate.
//! - A list-valued field matches a leaf predicate when any element does.
//! - Range comparisons between incomparable kinds (string vs number) are false.

use std::ops::Bound;
use strata_core::{Metadata, Scalar};

/// Metadata predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    /// Field equals value
    Equals {
        /// Metadata field
        field: String,
        /// Expected value
        value: Scalar,
    },
    /// Field lies within the bounds
    Range {
        /// Metadata field
        field: String,
        /// Lower bound
        lower: Bound<Scalar>,
        /// Upper bound
        upper: Bound<Scalar>,
    },
    /// Field equals one of the values
    AnyOf {
        /// Metadata field
        field: String,
        /// Accepted values
        values: Vec<Scalar>,
    },
    /// All children match (empty list matches everything)
    And(Vec<Where>),
    /// At least one child matches (empty list matches nothing)
    Or(Vec<Where>),
    /// Child does not match
    Not(Box<Where>),
}

impl Where {
    /// `field == value`
    pub fn eq(field: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Where::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    /// `field` within `lower..upper`
    pub fn range(field: impl Into<String>, lower: Bound<Scalar>, upper: Bound<Scalar>) -> Self {
        Where::Range {
            field: field.into(),
            lower,
            upper,
        }
    }

    /// `field` in `values`
    pub fn any_of<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        Where::AnyOf {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Negate a predicate
    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Where) -> Self {
        Where::Not(Box::new(inner))
    }

    /// Evaluate against an entry's metadata
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            Where::Equals { field, value } => any_scalar(metadata, field, |s| s == value),
            Where::Range {
                field,
                lower,
                upper,
            } => any_scalar(metadata, field, |s| within(s, lower, upper)),
            Where::AnyOf { field, values } => {
                any_scalar(metadata, field, |s| values.iter().any(|v| s == v))
            }
            Where::And(children) => children.iter().all(|c| c.matches(metadata)),
            Where::Or(children) => children.iter().any(|c| c.matches(metadata)),
            Where::Not(inner) => !inner.matches(metadata),
        }
    }
}

fn any_scalar(metadata: &Metadata, field: &str, pred: impl Fn(&Scalar) -> bool) -> bool {
    metadata
        .get(field)
        .map(|value| value.scalars().any(|s| pred(s)))
        .unwrap_or(false)
}

fn within(value: &Scalar, lower: &Bound<Scalar>, upper: &Bound<Scalar>) -> bool {
    use std::cmp::Ordering::*;

    let lower_ok = match lower {
        Bound::Unbounded => true,
        Bound::Included(b) => matches!(value.compare(b), Some(Greater | Equal)),
        Bound::Excluded(b) => matches!(value.compare(b), Some(Greater)),
    };
    let upper_ok = match upper {
        Bound::Unbounded => true,
        Bound::Included(b) => matches!(value.compare(b), Some(Less | Equal)),
        Bound::Excluded(b) => matches!(value.compare(b), Some(Less)),
    };
    lower_ok && upper_ok
}
