// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Resolution core of the weft container builder.
//!
//! Given a registry of declarative service definitions, this crate
//! infers a concrete class for every service, normalizes and
//! type-checks every construction and invocation statement, and fills
//! in missing arguments by autowiring against the type universe.

pub mod resolve;

pub use resolve::*;
