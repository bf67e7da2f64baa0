//! Argument and configuration values.
//!
//! One [`Value`] type covers everything a service description can carry:
//! scalars, ordered arrays with mixed integer/string keys, references,
//! nested statements, raw code literals, enum cases, and dynamic
//! parameters whose concrete value is only known at container runtime.

use crate::{Reference, Statement};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered map used for plain arrays and argument lists alike.
///
/// Positional entries carry [`ArrayKey::Int`] keys numbered from zero,
/// named entries carry [`ArrayKey::Str`] keys. Insertion order is
/// preserved, which is what makes tagged/typed expansion and argument
/// splicing deterministic.
pub type ValueMap = IndexMap<ArrayKey, Value>;

/// Key of a [`ValueMap`] entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArrayKey {
    Int(i64),
    Str(String),
}

impl From<i64> for ArrayKey {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for ArrayKey {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for ArrayKey {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl fmt::Display for ArrayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

/// A value appearing in arguments, tags, parameters, or setup calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(ValueMap),
    /// A reference to another service.
    Ref(Reference),
    /// A nested construction or invocation statement.
    Stmt(Box<Statement>),
    /// Raw target-language code, emitted verbatim by the generator.
    Literal(String),
    /// A `Class::Case` enum literal.
    EnumCase { class: String, case: String },
    /// A value only known at container runtime, carried symbolically.
    Dynamic(DynamicParameter),
}

impl Value {
    /// Builds an integer-keyed array from a plain list of values.
    pub fn list(items: Vec<Value>) -> Self {
        Self::Array(value_list(items))
    }

    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Scalars are the only values that may take part in string
    /// concatenation during parameter expansion.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Str(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ValueMap> {
        match self {
            Self::Array(map) => Some(map),
            _ => None,
        }
    }

    /// Short description of the value shape, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Array(_) => "array",
            Self::Ref(_) => "reference",
            Self::Stmt(_) => "statement",
            Self::Literal(_) => "literal",
            Self::EnumCase { .. } => "enum case",
            Self::Dynamic(_) => "dynamic parameter",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Reference> for Value {
    fn from(v: Reference) -> Self {
        Self::Ref(v)
    }
}

impl From<Statement> for Value {
    fn from(v: Statement) -> Self {
        Self::Stmt(Box::new(v))
    }
}

/// Builds an integer-keyed [`ValueMap`] from a plain list of values.
pub fn value_list(items: Vec<Value>) -> ValueMap {
    items
        .into_iter()
        .enumerate()
        .map(|(i, v)| (ArrayKey::Int(i as i64), v))
        .collect()
}

/// Tests whether a map is a plain list: integer keys counting up from
/// zero with no gaps and no named entries.
pub fn is_list(map: &ValueMap) -> bool {
    map.keys()
        .enumerate()
        .all(|(i, key)| matches!(key, ArrayKey::Int(n) if *n == i as i64))
}

/// Generated-code expression for a parameter resolved at container
/// runtime.
///
/// Expansion composes these symbolically: indexing appends a subscript,
/// concatenation wraps the expression in parentheses and joins it with
/// quoted string fragments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DynamicParameter {
    expression: String,
}

impl DynamicParameter {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }
}

impl fmt::Display for DynamicParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_list_keys() {
        let map = value_list(vec![Value::Int(1), Value::str("a")]);
        assert_eq!(
            map.keys().cloned().collect::<Vec<_>>(),
            vec![ArrayKey::Int(0), ArrayKey::Int(1)]
        );
        assert!(is_list(&map));
    }

    #[test]
    fn test_is_list_rejects_named_and_gaps() {
        let mut map = ValueMap::new();
        map.insert(ArrayKey::Int(0), Value::Int(1));
        map.insert(ArrayKey::Str("x".into()), Value::Int(2));
        assert!(!is_list(&map));

        let mut gappy = ValueMap::new();
        gappy.insert(ArrayKey::Int(0), Value::Int(1));
        gappy.insert(ArrayKey::Int(2), Value::Int(2));
        assert!(!is_list(&gappy));
    }

    #[test]
    fn test_scalar_classification() {
        assert!(Value::Null.is_scalar());
        assert!(Value::str("x").is_scalar());
        assert!(!Value::list(vec![]).is_scalar());
        assert!(!Value::Ref(Reference::named("a")).is_scalar());
    }
}
