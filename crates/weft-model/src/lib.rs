// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Value model for the weft container builder.
//!
//! This crate contains the symbolic description types consumed by the
//! resolver: references, statements, argument values, service
//! definitions, and the reflection universe they are checked against.
//! It carries no resolution logic of its own.

pub mod definition;
pub mod error;
pub mod reference;
pub mod statement;
pub mod universe;
pub mod value;

// Re-export commonly used types
pub use definition::ServiceDefinition;
pub use error::{ErrorKind, Result, ServiceError};
pub use reference::Reference;
pub use statement::{Entity, EntityHead, Statement};
pub use universe::types::{TypeRef, BUILTIN_TYPES};
pub use universe::{
    ClassInfo, ClassKind, FunctionInfo, MethodInfo, Parameter, Signature, TypeUniverse, Visibility,
};
pub use value::{is_list, value_list, ArrayKey, DynamicParameter, Value, ValueMap};
