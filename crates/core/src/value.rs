//! Metadata value types
//!
//! Metadata attached to a vector is a flat, string-keyed map. Values are
//! scalars or homogeneous lists of scalars. Nested objects and nulls are
//! not representable; conversion from JSON rejects them.
//!
//! ## Equality Rules
//!
//! - Numbers compare by value across `Int` and `Float` (`Int(1) == Float(1.0)`)
//! - Strings and booleans only equal their own type
//! - No coercion between strings and numbers

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use thiserror::Error;

/// Metadata map attached to a vector entry
///
/// BTreeMap for deterministic iteration and serialization.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Errors raised while building metadata
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetadataError {
    /// Metadata must be a JSON object
    #[error("metadata must be an object, got {actual}")]
    NotAnObject {
        /// JSON type that was supplied
        actual: &'static str,
    },

    /// Nested objects are not supported
    #[error("metadata field '{field}' is a nested object; only scalars and lists are supported")]
    NestedObject {
        /// Offending field
        field: String,
    },

    /// Null values are not supported
    #[error("metadata field '{field}' is null")]
    Null {
        /// Offending field
        field: String,
    },

    /// List elements must share one kind
    #[error("metadata field '{field}' mixes {first} and {other} values")]
    HeterogeneousList {
        /// Offending field
        field: String,
        /// Kind of the first element
        first: &'static str,
        /// Kind of the mismatching element
        other: &'static str,
    },

    /// NaN and infinities cannot be stored or compared
    #[error("metadata field '{field}' holds a non-finite number")]
    NonFinite {
        /// Offending field
        field: String,
    },
}

/// A scalar metadata value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 string
    String(String),
}

impl Scalar {
    /// Kind name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) | Scalar::Float(_) => "number",
            Scalar::String(_) => "string",
        }
    }

    /// Numeric view (ints widen to f64)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    /// Ordering between two scalars of compatible kinds
    ///
    /// Numbers order numerically, strings lexicographically, booleans
    /// `false < true`. Mismatched kinds are unordered.
    pub fn compare(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Int(a), Scalar::Int(b)) => Some(a.cmp(b)),
            (Scalar::String(a), Scalar::String(b)) => Some(a.cmp(b)),
            (Scalar::Bool(a), Scalar::Bool(b)) => Some(a.cmp(b)),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }

    /// Convert a JSON value into a scalar
    pub fn from_json(field: &str, value: &serde_json::Value) -> Result<Scalar, MetadataError> {
        match value {
            serde_json::Value::Bool(b) => Ok(Scalar::Bool(*b)),
            serde_json::Value::Number(n) => Ok(match n.as_i64() {
                Some(i) => Scalar::Int(i),
                // u64 beyond i64::MAX and all floats land here
                None => Scalar::Float(n.as_f64().unwrap_or(f64::NAN)),
            }),
            serde_json::Value::String(s) => Ok(Scalar::String(s.clone())),
            serde_json::Value::Null => Err(MetadataError::Null {
                field: field.to_string(),
            }),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                Err(MetadataError::NestedObject {
                    field: field.to_string(),
                })
            }
        }
    }

    /// Convert to a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Bool(b) => serde_json::Value::Bool(*b),
            Scalar::Int(i) => serde_json::Value::from(*i),
            Scalar::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Scalar::String(s) => serde_json::Value::String(s.clone()),
        }
    }

    fn is_finite(&self) -> bool {
        match self {
            Scalar::Float(f) => f.is_finite(),
            _ => true,
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v as i64)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::Float(v as f64)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::String(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::String(v.to_string())
    }
}

/// A metadata value: a scalar or a homogeneous list of scalars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Single scalar
    Scalar(Scalar),
    /// List of scalars sharing one kind
    List(Vec<Scalar>),
}

impl MetadataValue {
    /// Convert a JSON value into a metadata value
    pub fn from_json(field: &str, value: &serde_json::Value) -> Result<Self, MetadataError> {
        let parsed = match value {
            serde_json::Value::Array(items) => MetadataValue::List(
                items
                    .iter()
                    .map(|item| Scalar::from_json(field, item))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            other => MetadataValue::Scalar(Scalar::from_json(field, other)?),
        };
        parsed.validate(field)?;
        Ok(parsed)
    }

    /// Convert to a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            MetadataValue::Scalar(s) => s.to_json(),
            MetadataValue::List(items) => {
                serde_json::Value::Array(items.iter().map(Scalar::to_json).collect())
            }
        }
    }

    /// Check invariants: finite numbers, homogeneous lists
    pub fn validate(&self, field: &str) -> Result<(), MetadataError> {
        let items: &[Scalar] = match self {
            MetadataValue::Scalar(s) => std::slice::from_ref(s),
            MetadataValue::List(items) => items,
        };

        if items.iter().any(|s| !s.is_finite()) {
            return Err(MetadataError::NonFinite {
                field: field.to_string(),
            });
        }

        if let Some(first) = items.first() {
            if let Some(other) = items.iter().find(|s| s.kind() != first.kind()) {
                return Err(MetadataError::HeterogeneousList {
                    field: field.to_string(),
                    first: first.kind(),
                    other: other.kind(),
                });
            }
        }

        Ok(())
    }

    /// Iterate the scalar(s) held by this value
    pub fn scalars(&self) -> impl Iterator<Item = &Scalar> {
        let items: &[Scalar] = match self {
            MetadataValue::Scalar(s) => std::slice::from_ref(s),
            MetadataValue::List(items) => items,
        };
        items.iter()
    }

    /// Get the scalar if this is not a list
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            MetadataValue::Scalar(s) => Some(s),
            MetadataValue::List(_) => None,
        }
    }
}

macro_rules! scalar_metadata_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for MetadataValue {
                fn from(v: $t) -> Self {
                    MetadataValue::Scalar(v.into())
                }
            }
        )*
    };
}

scalar_metadata_from!(bool, i32, i64, f32, f64, String, &str);

impl From<Scalar> for MetadataValue {
    fn from(v: Scalar) -> Self {
        MetadataValue::Scalar(v)
    }
}

impl<T: Into<Scalar>> FromIterator<T> for MetadataValue {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        MetadataValue::List(iter.into_iter().map(Into::into).collect())
    }
}

/// Build a metadata map from a JSON object
///
/// `null` is accepted and yields an empty map.
pub fn metadata_from_json(value: &serde_json::Value) -> Result<Metadata, MetadataError> {
    match value {
        serde_json::Value::Null => Ok(Metadata::new()),
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(k, v)| Ok((k.clone(), MetadataValue::from_json(k, v)?)))
            .collect(),
        other => Err(MetadataError::NotAnObject {
            actual: json_type_name(other),
        }),
    }
}

/// Render a metadata map as a JSON object
pub fn metadata_to_json(metadata: &Metadata) -> serde_json::Value {
    serde_json::Value::Object(
        metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

/// Validate every field of a metadata map
pub fn validate_metadata(metadata: &Metadata) -> Result<(), MetadataError> {
    metadata.iter().try_for_each(|(k, v)| v.validate(k))
}

/// JSON type name for error messages
pub fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
