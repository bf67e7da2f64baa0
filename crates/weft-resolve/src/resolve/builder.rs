//! Service definition registry and two-phase pipeline driver.
//!
//! The builder owns the ordered definition map and answers the queries
//! the resolver needs: name and type lookups, tag and autowire
//! searches, and the append-only reflection dependency log. Type-based
//! lookups are refused while any definition still lacks a resolved
//! type; the resolver leaves such references untouched and revisits
//! them during completion.

use crate::resolve::resolver::Resolver;
use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;
use tracing::debug;
use weft_model::{Result, ServiceDefinition, ServiceError, TypeUniverse, Value};

/// Registry of service definitions bound to a type universe.
#[derive(Debug)]
pub struct ContainerBuilder {
    universe: Arc<TypeUniverse>,
    definitions: IndexMap<String, ServiceDefinition>,
    dependencies: IndexSet<String>,
}

impl ContainerBuilder {
    /// Reserved name under which the container itself is addressable.
    pub const THIS_CONTAINER: &'static str = "container";

    /// Class of the generated container service.
    pub const CONTAINER_CLASS: &'static str = "Weft\\Container";

    pub fn new(universe: Arc<TypeUniverse>) -> Self {
        let mut builder = Self {
            universe,
            definitions: IndexMap::new(),
            dependencies: IndexSet::new(),
        };
        builder.add_definition(ServiceDefinition::imported(
            Self::THIS_CONTAINER,
            Self::CONTAINER_CLASS,
        ));
        builder
    }

    pub fn universe(&self) -> &Arc<TypeUniverse> {
        &self.universe
    }

    /// Registers a definition, replacing any previous one of the same
    /// name.
    pub fn add_definition(&mut self, definition: ServiceDefinition) -> &mut ServiceDefinition {
        let name = definition.name().to_string();
        match self.definitions.entry(name) {
            indexmap::map::Entry::Occupied(mut occupied) => {
                occupied.insert(definition);
                occupied.into_mut()
            }
            indexmap::map::Entry::Vacant(vacant) => vacant.insert(definition),
        }
    }

    pub fn has_definition(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn get_definition(&self, name: &str) -> Result<&ServiceDefinition> {
        self.definitions
            .get(name)
            .ok_or_else(|| ServiceError::missing_service(format!("Service '{name}' not found.")))
    }

    pub fn get_definition_mut(&mut self, name: &str) -> Result<&mut ServiceDefinition> {
        self.definitions
            .get_mut(name)
            .ok_or_else(|| ServiceError::missing_service(format!("Service '{name}' not found.")))
    }

    /// The ordered definition map.
    pub fn definitions(&self) -> &IndexMap<String, ServiceDefinition> {
        &self.definitions
    }

    /// True while any definition still lacks a resolved type.
    pub fn needs_resolve(&self) -> bool {
        self.definitions
            .values()
            .any(|definition| definition.class_type().is_none())
    }

    /// Selects the single autowired service satisfying a type.
    ///
    /// Fails with [`weft_model::ErrorKind::NotAllowedDuringResolving`]
    /// while types are still being resolved; the caller keeps the
    /// reference symbolic and retries later.
    pub fn get_by_type(&self, ty: &str, throw: bool) -> Result<Option<String>> {
        if self.needs_resolve() {
            return Err(ServiceError::not_allowed_during_resolving());
        }
        let ty = ty.trim_start_matches('\\');
        let matches: Vec<&str> = self
            .definitions
            .iter()
            .filter(|(_, definition)| {
                definition.is_autowired()
                    && definition
                        .class_type()
                        .is_some_and(|class| self.universe.is_a(class, ty))
            })
            .map(|(name, _)| name.as_str())
            .collect();
        match matches.as_slice() {
            [] if throw => Err(ServiceError::missing_service(format!(
                "Service of type '{ty}' not found."
            ))),
            [] => Ok(None),
            [single] => Ok(Some((*single).to_string())),
            many => Err(ServiceError::new(
                weft_model::ErrorKind::AmbiguousService,
                format!("Multiple services of type '{ty}' found: {}.", many.join(", ")),
            )),
        }
    }

    /// All autowired services of a type, in definition order.
    pub fn find_autowired(&self, ty: &str) -> Vec<String> {
        let ty = ty.trim_start_matches('\\');
        self.definitions
            .iter()
            .filter(|(_, definition)| {
                definition.is_autowired()
                    && definition
                        .class_type()
                        .is_some_and(|class| self.universe.is_a(class, ty))
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// All services carrying a tag, with their payloads, in definition
    /// order.
    pub fn find_by_tag(&self, tag: &str) -> Vec<(String, Value)> {
        self.definitions
            .iter()
            .filter_map(|(name, definition)| {
                definition
                    .tag(tag)
                    .map(|payload| (name.clone(), payload.clone()))
            })
            .collect()
    }

    /// Records a reflection the generated container depends on.
    pub fn add_dependency(&mut self, dependency: impl Into<String>) -> &mut Self {
        self.dependencies.insert(dependency.into());
        self
    }

    pub fn dependencies(&self) -> &IndexSet<String> {
        &self.dependencies
    }

    /// Wraps raw target-language code so it survives argument passes
    /// untouched.
    pub fn literal(expression: impl Into<String>) -> Value {
        Value::Literal(expression.into())
    }

    /// Name of the generated container method creating a service, e.g.
    /// `createServiceOrm__Mapper` for `orm.mapper`.
    pub fn method_name(service: &str) -> String {
        let camel: Vec<String> = service.split('.').map(ucfirst).collect();
        format!("createService{}", camel.join("__"))
    }

    /// Phase 1: resolves the type of every definition.
    pub fn resolve(&mut self) -> Result<()> {
        debug!(definitions = self.definitions.len(), "resolving service types");
        let names: Vec<String> = self.definitions.keys().cloned().collect();
        let mut resolver = Resolver::new(self);
        for name in &names {
            resolver.resolve_definition(name)?;
        }
        Ok(())
    }

    /// Phase 1 followed by Phase 2: freezes every definition with a
    /// resolved type and completed creator/setup statements.
    pub fn complete(&mut self) -> Result<()> {
        self.resolve()?;
        debug!("completing service definitions");
        let names: Vec<String> = self.definitions.keys().cloned().collect();
        let mut resolver = Resolver::new(self);
        for name in &names {
            resolver.complete_definition(name)?;
        }
        Ok(())
    }
}

fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
