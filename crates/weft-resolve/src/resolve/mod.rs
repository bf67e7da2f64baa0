//! Resolution passes over the service definition registry.

pub mod autowire;
pub mod builder;
pub mod helpers;
pub mod parameters;
pub mod resolver;

pub use autowire::autowire_arguments;
pub use builder::ContainerBuilder;
pub use helpers::{ensure_class_type, filter_arguments, prefix_service_name};
pub use parameters::{escape, expand, ExpandError};
pub use resolver::{convert_references, Resolver};
