//! Error values for service resolution.
//!
//! Failures are ordinary values, not panics. A [`ServiceError`] pairs a
//! machine-readable [`ErrorKind`] with a human-readable message; the
//! resolution boundaries progressively enrich the message (a bracketed
//! service descriptor, a `Related to …` suffix) while the kind stays
//! stable for programmatic handling.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Resolution result type.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// A failure raised while resolving or completing service definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ServiceError {
    /// Category of this failure.
    pub kind: ErrorKind,
    /// Human-readable message; mutated by context decoration.
    pub message: String,
}

impl ServiceError {
    /// Creates a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// A missing-service lookup failure.
    ///
    /// Callers that treat absence as "inject nothing" match on
    /// [`ErrorKind::MissingService`] and recover; everything else
    /// propagates.
    pub fn missing_service(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingService, message)
    }

    /// Raised by type-based lookups while definition types are still
    /// being resolved.
    pub fn not_allowed_during_resolving() -> Self {
        Self::new(
            ErrorKind::NotAllowedDuringResolving,
            "Type-based service lookups are not available until all service types are resolved.",
        )
    }

    /// Tests the error category.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

/// Category of resolution failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A definition's type resolution re-entered itself.
    CircularReference,
    /// Neither a creator nor a declared class yields a service type.
    UnknownServiceType,
    /// A named class does not exist in the universe.
    ClassNotFound,
    /// Instantiation of an abstract class.
    ClassIsAbstract,
    /// Instantiation through a non-public constructor.
    NonPublicConstructor,
    /// Arguments supplied to a class without a constructor.
    UnexpectedConstructorArgs,
    /// A method exists but cannot be called (non-public, or a
    /// non-static trait method).
    MethodNotCallable,
    /// A named free function does not exist.
    FunctionNotFound,
    /// A member name that is not a function, method or property name.
    BadEntityName,
    /// Supplied arguments cannot be matched to the target signature.
    ArgumentMismatch,
    /// A parameter with an intersection type cannot be autowired.
    IntersectionTypeUnsupported,
    /// A parameter with a union type and no default cannot be autowired.
    UnionWithoutDefault,
    /// A required parameter could not be satisfied.
    UnresolvedDependency,
    /// A declared or inferred type does not fit where it is used.
    TypeMismatch,
    /// No service satisfies a name or type lookup.
    MissingService,
    /// Several services satisfy a type lookup.
    AmbiguousService,
    /// A type lookup happened while types are still being resolved.
    NotAllowedDuringResolving,
}
