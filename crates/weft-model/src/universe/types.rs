//! Declared types as they appear in reflected signatures.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type keywords that never name a class.
pub const BUILTIN_TYPES: &[&str] = &[
    "array", "bool", "callable", "false", "float", "int", "iterable", "mixed", "never", "null",
    "object", "parent", "self", "static", "string", "true", "void",
];

/// A declared parameter or return type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    /// A class, interface, or builtin keyword.
    Named(String),
    /// `?T`
    Nullable(Box<TypeRef>),
    /// `A|B`
    Union(Vec<TypeRef>),
    /// `A&B`
    Intersection(Vec<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn nullable(inner: TypeRef) -> Self {
        Self::Nullable(Box::new(inner))
    }

    pub fn union(members: Vec<TypeRef>) -> Self {
        Self::Union(members)
    }

    pub fn intersection(members: Vec<TypeRef>) -> Self {
        Self::Intersection(members)
    }

    /// Tests whether a name is a builtin type keyword rather than a
    /// class name. Case-insensitive, like the host language.
    pub fn is_builtin_name(name: &str) -> bool {
        BUILTIN_TYPES
            .iter()
            .any(|builtin| builtin.eq_ignore_ascii_case(name))
    }

    pub fn is_union(&self) -> bool {
        matches!(self, Self::Union(_))
    }

    pub fn is_intersection(&self) -> bool {
        matches!(self, Self::Intersection(_))
    }

    /// Whether the type is explicitly nullable. `mixed` does not count:
    /// it still requires a declared value where one is mandatory.
    pub fn allows_null(&self) -> bool {
        match self {
            Self::Nullable(_) => true,
            Self::Named(name) => name.eq_ignore_ascii_case("null"),
            Self::Union(members) => members.iter().any(TypeRef::allows_null),
            Self::Intersection(_) => false,
        }
    }

    /// The single name behind this type, if there is exactly one.
    ///
    /// Nullability is transparent: `?Foo` and `Foo|null` both yield
    /// `Foo`. Unions of two or more non-null members yield nothing.
    pub fn single_name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Nullable(inner) => inner.single_name(),
            Self::Union(members) => {
                let mut non_null = members
                    .iter()
                    .filter(|m| !matches!(m, Self::Named(n) if n.eq_ignore_ascii_case("null")));
                let first = non_null.next()?;
                if non_null.next().is_some() {
                    None
                } else {
                    first.single_name()
                }
            }
            Self::Intersection(_) => None,
        }
    }

    /// The single class name behind this type; builtins (including
    /// `object` and `mixed`) do not qualify.
    pub fn single_class(&self) -> Option<&str> {
        self.single_name()
            .filter(|name| !Self::is_builtin_name(name))
    }

    /// Whether the type is exactly the builtin named `name`.
    pub fn is_builtin(&self, name: &str) -> bool {
        matches!(self, Self::Named(n) if n.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Nullable(inner) => write!(f, "?{inner}"),
            Self::Union(members) => {
                let parts: Vec<String> = members.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join("|"))
            }
            Self::Intersection(members) => {
                let parts: Vec<String> = members.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join("&"))
            }
        }
    }
}
