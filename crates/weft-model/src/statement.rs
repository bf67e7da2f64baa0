//! Symbolic construction and invocation statements.
//!
//! A [`Statement`] describes one object construction or callable
//! invocation without performing it: `(entity, arguments)`. Statements
//! are first-class values and nest freely: an argument may be a
//! statement, and a callable's head may be another statement whose
//! result is the call target.

use crate::value::{value_list, Value, ValueMap};
use crate::Reference;
use serde::{Deserialize, Serialize};

/// Head of a callable entity: what the member is looked up on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityHead {
    /// Global scope; the member names a free function.
    Function,
    /// A class, for static calls.
    Class(String),
    /// Another service.
    Ref(Reference),
    /// The result of a nested statement.
    Stmt(Box<Statement>),
}

impl From<Reference> for EntityHead {
    fn from(r: Reference) -> Self {
        Self::Ref(r)
    }
}

impl From<Statement> for EntityHead {
    fn from(s: Statement) -> Self {
        Self::Stmt(Box::new(s))
    }
}

impl From<&str> for EntityHead {
    fn from(class: &str) -> Self {
        Self::Class(class.to_string())
    }
}

/// What a statement denotes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entity {
    /// A class to instantiate, a pseudo-function name
    /// (`not`/`bool`/`int`/`float`/`string`), or a raw passthrough
    /// expression when the string contains `?`.
    Class(String),
    /// Call or alias the referenced service.
    Ref(Reference),
    /// A member access on a head: method call, `$name` property write,
    /// or `$name[]` array append.
    Callable { head: EntityHead, member: String },
}

impl Entity {
    pub fn class(name: impl Into<String>) -> Self {
        Self::Class(name.into())
    }

    pub fn callable(head: impl Into<EntityHead>, member: impl Into<String>) -> Self {
        Self::Callable {
            head: head.into(),
            member: member.into(),
        }
    }

    /// A free-function call entity.
    pub fn function(name: impl Into<String>) -> Self {
        Self::Callable {
            head: EntityHead::Function,
            member: name.into(),
        }
    }
}

impl From<Reference> for Entity {
    fn from(r: Reference) -> Self {
        Self::Ref(r)
    }
}

impl From<&str> for Entity {
    fn from(class: &str) -> Self {
        Self::Class(class.to_string())
    }
}

/// A symbolic `(entity, arguments)` expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub entity: Entity,
    pub arguments: ValueMap,
}

impl Statement {
    pub fn new(entity: impl Into<Entity>) -> Self {
        Self {
            entity: entity.into(),
            arguments: ValueMap::new(),
        }
    }

    pub fn with_args(entity: impl Into<Entity>, arguments: ValueMap) -> Self {
        Self {
            entity: entity.into(),
            arguments,
        }
    }

    /// Statement with positional arguments only.
    pub fn with_list(entity: impl Into<Entity>, arguments: Vec<Value>) -> Self {
        Self {
            entity: entity.into(),
            arguments: value_list(arguments),
        }
    }
}
