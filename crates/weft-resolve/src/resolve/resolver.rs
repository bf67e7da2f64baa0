//! Two-phase service resolution.
//!
//! Phase 1 ([`Resolver::resolve_definition`]) infers a concrete class
//! for every definition, recursing through references and detecting
//! cycles. Phase 2 ([`Resolver::complete_definition`]) normalizes and
//! type-checks every creator and setup statement and fills in missing
//! arguments by autowiring. Phase 2 never creates new definitions.
//!
//! # Pipeline Position
//!
//! ```text
//! Load → Expand → Filter → Type Resolution → Completion → Generate
//!                              ^^^^^^^^^^^^^^^^^^^^^^^
//!                                    YOU ARE HERE
//! ```
//!
//! Errors are decorated only at the `resolve_definition` /
//! `complete_definition` / `complete_statement` boundaries: a
//! `[<descriptor>]` prefix naming the service, and a `Related to …`
//! suffix naming the statement. Inner recursive calls never swallow or
//! re-annotate.

use crate::resolve::autowire::autowire_arguments;
use crate::resolve::builder::ContainerBuilder;
use crate::resolve::helpers::{is_constant_name, is_valid_member, make_reference, short_class_name};
use indexmap::IndexSet;
use std::sync::Arc;
use tracing::trace;
use weft_model::{
    is_list, ClassKind, Entity, EntityHead, ErrorKind, Reference, Result, ServiceError, Signature,
    Statement, TypeRef, TypeUniverse, Value, ValueMap, Visibility,
};

const PSEUDO_FUNCTIONS: &[&str] = &["not", "bool", "int", "float", "string"];

/// The resolution engine. Single-threaded and non-reentrant; one
/// resolver drives one builder at a time.
pub struct Resolver<'a> {
    builder: &'a mut ContainerBuilder,
    universe: Arc<TypeUniverse>,
    /// Names of definitions whose type resolution is on the stack.
    recursive: IndexSet<String>,
    current_service: Option<String>,
    current_service_type: Option<String>,
    current_service_allowed: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(builder: &'a mut ContainerBuilder) -> Self {
        let universe = Arc::clone(builder.universe());
        Self {
            builder,
            universe,
            recursive: IndexSet::new(),
            current_service: None,
            current_service_type: None,
            current_service_allowed: false,
        }
    }

    pub fn builder(&mut self) -> &mut ContainerBuilder {
        self.builder
    }

    /// Phase 1: ensures the definition has a resolved type.
    pub fn resolve_definition(&mut self, name: &str) -> Result<()> {
        if self.recursive.contains(name) {
            let names: Vec<&str> = self.recursive.iter().map(String::as_str).collect();
            return Err(ServiceError::new(
                ErrorKind::CircularReference,
                format!(
                    "Circular reference detected for services: {}.",
                    names.join(", ")
                ),
            ));
        }
        trace!(service = name, "resolving service type");
        self.recursive.insert(name.to_string());
        let mut result = self.resolve_definition_body(name);
        if result.is_ok() {
            let unresolved = self
                .builder
                .get_definition(name)
                .map(|definition| definition.class_type().is_none())
                .unwrap_or(false);
            if unresolved {
                result = Err(ServiceError::new(
                    ErrorKind::UnknownServiceType,
                    "Type of service is unknown.",
                ));
            }
        }
        self.recursive.shift_remove(name);
        result.map_err(|error| self.complete_exception(error, name))
    }

    fn resolve_definition_body(&mut self, name: &str) -> Result<()> {
        let definition = self.builder.get_definition(name)?;
        if definition.is_imported() {
            return Ok(());
        }
        let creator = definition.creator().cloned();
        let declared = definition.class_type().map(String::from);
        match (creator, declared) {
            (None, None) => Ok(()),
            (None, Some(class)) => {
                let class = crate::resolve::helpers::ensure_class_type(
                    Some(&TypeRef::named(&class)),
                    "type of service",
                    "",
                    false,
                    &self.universe,
                )?;
                self.builder
                    .get_definition_mut(name)?
                    .set_creator(Statement::new(Entity::Class(class)));
                Ok(())
            }
            (Some(creator), None) => {
                if let Some(inferred) = self.resolve_entity_type(&creator)? {
                    self.builder.get_definition_mut(name)?.set_class(inferred);
                }
                Ok(())
            }
            (Some(_), Some(class)) => {
                // declared type wins over the creator's inferred type
                crate::resolve::helpers::ensure_class_type(
                    Some(&TypeRef::named(&class)),
                    "type of service",
                    "",
                    false,
                    &self.universe,
                )?;
                Ok(())
            }
        }
    }

    /// Infers the class an entity would produce if invoked.
    pub fn resolve_entity_type(&mut self, statement: &Statement) -> Result<Option<String>> {
        let universe = Arc::clone(&self.universe);
        let entity = self.normalize_entity(statement)?;
        match entity {
            Entity::Callable { head, member } => {
                let context = match &head {
                    EntityHead::Ref(reference) => self.resolve_reference_type(reference)?,
                    EntityHead::Stmt(inner) => self.resolve_entity_type(inner)?,
                    EntityHead::Class(class) => Some(class.clone()),
                    EntityHead::Function => None,
                };
                if matches!(head, EntityHead::Function) {
                    let Some(function) = universe.function(&member) else {
                        return Err(ServiceError::new(
                            ErrorKind::FunctionNotFound,
                            format!("Function {member}() does not exist."),
                        ));
                    };
                    self.builder.add_dependency(member.clone());
                    return Ok(return_type_class(
                        function.signature.return_type.as_ref(),
                        None,
                    ));
                }
                let Some(class) = context else {
                    return Ok(None);
                };
                let Some(method) = universe.find_method(&class, &member) else {
                    return Err(ServiceError::new(
                        ErrorKind::MethodNotCallable,
                        format!("Method {class}::{member}() does not exist."),
                    ));
                };
                if method.visibility != Visibility::Public {
                    return Err(ServiceError::new(
                        ErrorKind::MethodNotCallable,
                        format!("Method {class}::{member}() is not callable."),
                    ));
                }
                if let Some(origin) = &method.trait_origin {
                    if !method.is_static {
                        return Err(ServiceError::new(
                            ErrorKind::MethodNotCallable,
                            format!("Method {origin}::{member}() is not callable."),
                        ));
                    }
                }
                self.builder.add_dependency(format!("{class}::{member}"));
                Ok(return_type_class(
                    method.signature.return_type.as_ref(),
                    Some(&class),
                ))
            }
            Entity::Ref(reference) => self.resolve_reference_type(&reference),
            Entity::Class(name) => {
                if name.contains('?') || PSEUDO_FUNCTIONS.contains(&name.as_str()) {
                    return Ok(None);
                }
                if !universe.class_exists(&name) {
                    let message = if universe.interface_exists(&name) {
                        format!("Interface {name} can not be used as a factory, did you mean 'implement'?")
                    } else {
                        format!("Class '{name}' not found.")
                    };
                    return Err(ServiceError::new(ErrorKind::ClassNotFound, message));
                }
                Ok(Some(name))
            }
        }
    }

    /// The class a reference resolves to, resolving the target
    /// definition first when necessary.
    pub fn resolve_reference_type(&mut self, reference: &Reference) -> Result<Option<String>> {
        match reference {
            Reference::ToSelf => Ok(self.current_service_type.clone()),
            Reference::Typed(ty) => Ok(Some(ty.trim_start_matches('\\').to_string())),
            Reference::Named(name) => {
                if self.builder.get_definition(name)?.class_type().is_none() {
                    self.resolve_definition(name)?;
                }
                Ok(self
                    .builder
                    .get_definition(name)?
                    .class_type()
                    .map(String::from))
            }
        }
    }

    /// Phase 2: freezes a fully-typed, fully-argumented definition.
    pub fn complete_definition(&mut self, name: &str) -> Result<()> {
        let definition = self.builder.get_definition(name)?;
        let class = definition.class_type().map(String::from);
        if definition.is_imported() {
            if let Some(class) = class {
                self.builder.add_dependency(class);
            }
            return Ok(());
        }
        trace!(service = name, "completing service definition");
        self.current_service = self.builder.has_definition(name).then(|| name.to_string());
        self.current_service_type = class.clone();
        self.current_service_allowed = false;

        let result = self.complete_definition_body(name);
        if result.is_ok() {
            if let Some(class) = class {
                self.builder.add_dependency(class);
            }
        }
        self.current_service = None;
        self.current_service_type = None;
        self.current_service_allowed = false;
        result.map_err(|error| self.complete_exception(error, name))
    }

    fn complete_definition_body(&mut self, name: &str) -> Result<()> {
        let definition = self.builder.get_definition(name)?;
        let creator = definition
            .creator()
            .cloned()
            .or_else(|| definition.class_type().map(|class| Statement::new(Entity::class(class))));
        let setup = definition.setup().to_vec();
        let Some(creator) = creator else {
            return Err(ServiceError::new(
                ErrorKind::UnknownServiceType,
                "Type of service is unknown.",
            ));
        };

        let completed_creator = self.complete_statement(&creator, false)?;
        let mut completed_setup = Vec::with_capacity(setup.len());
        for statement in setup {
            // bare member names are shorthand for a call on the service
            let statement = match &statement.entity {
                Entity::Class(member) if !member.contains([':', '@', '?', '\\']) => {
                    Statement::with_args(
                        Entity::callable(Reference::ToSelf, member.clone()),
                        statement.arguments.clone(),
                    )
                }
                _ => statement,
            };
            completed_setup.push(self.complete_statement(&statement, true)?);
        }

        let definition = self.builder.get_definition_mut(name)?;
        definition.set_creator(completed_creator);
        definition.set_setup(completed_setup);
        Ok(())
    }

    /// Normalizes and type-checks one statement, returning a new
    /// statement with completed arguments. The input is not mutated.
    pub fn complete_statement(
        &mut self,
        statement: &Statement,
        current_service_allowed: bool,
    ) -> Result<Statement> {
        self.current_service_allowed = current_service_allowed;
        let universe = Arc::clone(&self.universe);
        let mut entity = self.normalize_entity(statement)?;
        let mut arguments = convert_references(&statement.arguments);

        entity = match entity {
            // raw expression: passed through, no argument checks
            Entity::Class(expr) if expr.contains('?') => Entity::Class(expr),

            Entity::Class(name) if PSEUDO_FUNCTIONS.contains(&name.as_str()) => {
                if arguments.len() != 1 {
                    return Err(ServiceError::new(
                        ErrorKind::ArgumentMismatch,
                        format!("Function {name}() expects 1 parameter, {} given.", arguments.len()),
                    ));
                }
                Entity::Class(name)
            }

            Entity::Class(class) => {
                let Some(info) = universe.class(&class) else {
                    return Err(ServiceError::new(
                        ErrorKind::ClassNotFound,
                        format!("Class '{class}' not found."),
                    ));
                };
                match info.kind {
                    ClassKind::Class { is_abstract: false } => {}
                    ClassKind::Class { is_abstract: true } => {
                        return Err(ServiceError::new(
                            ErrorKind::ClassIsAbstract,
                            format!("Class {class} is abstract."),
                        ));
                    }
                    ClassKind::Interface | ClassKind::Trait => {
                        return Err(ServiceError::new(
                            ErrorKind::ClassNotFound,
                            format!("Class '{class}' not found."),
                        ));
                    }
                    ClassKind::Enum => {
                        return Err(ServiceError::new(
                            ErrorKind::ClassIsAbstract,
                            format!("Class {class} cannot be instantiated."),
                        ));
                    }
                }
                match universe.constructor(&class) {
                    Some(constructor) => {
                        if constructor.visibility != Visibility::Public {
                            return Err(ServiceError::new(
                                ErrorKind::NonPublicConstructor,
                                format!("Class {class} has {} constructor.", constructor.visibility),
                            ));
                        }
                        let callable = format!("{class}::__construct");
                        arguments = self.autowire(&callable, &constructor.signature, arguments)?;
                        self.builder.add_dependency(callable);
                    }
                    None if !arguments.is_empty() => {
                        return Err(ServiceError::new(
                            ErrorKind::UnexpectedConstructorArgs,
                            format!("Unable to pass arguments, class {class} has no constructor."),
                        ));
                    }
                    None => {}
                }
                Entity::Class(class)
            }

            Entity::Ref(reference) => {
                // aliasing a service: route through the generated
                // container accessor
                let service = match &reference {
                    Reference::ToSelf => self
                        .current_service
                        .clone()
                        .unwrap_or_else(|| reference.value().to_string()),
                    other => other.value().to_string(),
                };
                Entity::callable(
                    Reference::named(ContainerBuilder::THIS_CONTAINER),
                    ContainerBuilder::method_name(&service),
                )
            }

            Entity::Callable { head, member } => {
                if !is_valid_member(&member) {
                    return Err(ServiceError::new(
                        ErrorKind::BadEntityName,
                        format!("Expected function, method or property name, '{member}' given."),
                    ));
                }
                let head = match head {
                    EntityHead::Function => {
                        if !is_list(&arguments) {
                            return Err(ServiceError::new(
                                ErrorKind::ArgumentMismatch,
                                format!("Unable to pass specified arguments to {member}()."),
                            ));
                        }
                        let Some(function) = universe.function(&member) else {
                            return Err(ServiceError::new(
                                ErrorKind::FunctionNotFound,
                                format!("Function {member}() does not exist."),
                            ));
                        };
                        arguments = self.autowire(&member, &function.signature, arguments)?;
                        self.builder.add_dependency(member.clone());
                        EntityHead::Function
                    }
                    EntityHead::Stmt(inner) => {
                        let completed =
                            self.complete_statement(&inner, self.current_service_allowed)?;
                        EntityHead::Stmt(Box::new(completed))
                    }
                    other => other,
                };
                if !matches!(head, EntityHead::Function) {
                    if member.starts_with('$') {
                        if !is_list(&arguments) || arguments.len() > 1 {
                            return Err(ServiceError::new(
                                ErrorKind::ArgumentMismatch,
                                format!(
                                    "Property {member} expects zero or one argument, {} given.",
                                    arguments.len()
                                ),
                            ));
                        }
                        if arguments.is_empty() && member.ends_with("[]") {
                            return Err(ServiceError::new(
                                ErrorKind::ArgumentMismatch,
                                format!("Missing argument for {member}."),
                            ));
                        }
                    } else {
                        // the completed head's resolved type drives the
                        // member lookup
                        let head_type = match &head {
                            EntityHead::Ref(reference) => self.resolve_reference_type(reference)?,
                            EntityHead::Class(class) => self
                                .resolve_entity_type(&Statement::new(Entity::class(class.clone())))?,
                            EntityHead::Stmt(inner) => self.resolve_entity_type(inner)?,
                            EntityHead::Function => None,
                        };
                        if let Some(class) = head_type {
                            if let Some(method) = universe.find_method(&class, &member) {
                                if method.visibility != Visibility::Public {
                                    return Err(ServiceError::new(
                                        ErrorKind::MethodNotCallable,
                                        format!("Method {class}::{member}() is not callable."),
                                    ));
                                }
                                let callable = format!("{class}::{member}");
                                arguments =
                                    self.autowire(&callable, &method.signature, arguments)?;
                                self.builder.add_dependency(callable);
                            }
                        }
                    }
                }
                Entity::Callable { head, member }
            }
        };

        match self.complete_arguments(arguments) {
            Ok(arguments) => Ok(Statement { entity, arguments }),
            Err(mut error) => {
                if !error.message.contains("\nRelated to") {
                    let suffix = if self.current_service_allowed {
                        " in setup"
                    } else {
                        ""
                    };
                    error.message.push_str(&format!(
                        "\nRelated to {}{suffix}.",
                        self.entity_to_string(&entity)
                    ));
                }
                Err(error)
            }
        }
    }

    /// Recursively completes argument values: references are
    /// normalized, nested statements completed, and `typed`/`tagged`
    /// markers expanded to reference lists.
    pub fn complete_arguments(&mut self, arguments: ValueMap) -> Result<ValueMap> {
        let mut out = ValueMap::new();
        for (key, value) in arguments {
            out.insert(key, self.complete_argument(value)?);
        }
        Ok(out)
    }

    fn complete_argument(&mut self, value: Value) -> Result<Value> {
        match value {
            Value::Ref(reference) => Ok(Value::Ref(self.normalize_reference(&reference)?)),
            Value::Array(map) => self.complete_arguments(map).map(Value::Array),
            Value::Stmt(statement) => match &statement.entity {
                Entity::Class(word) if word == "typed" || word == "tagged" => {
                    self.expand_injections(word == "tagged", &statement.arguments)
                }
                _ => {
                    let allowed = self.current_service_allowed;
                    Ok(Value::Stmt(Box::new(
                        self.complete_statement(&statement, allowed)?,
                    )))
                }
            },
            other => Ok(other),
        }
    }

    /// Replaces a `typed(T, …)` or `tagged(tag, …)` marker with the
    /// list of matching services, skipping the service being resolved.
    fn expand_injections(&mut self, tagged: bool, arguments: &ValueMap) -> Result<Value> {
        let kind = if tagged { "tagged" } else { "typed" };
        let mut services = Vec::new();
        for value in arguments.values() {
            let Some(key) = value.as_str() else {
                return Err(ServiceError::new(
                    ErrorKind::ArgumentMismatch,
                    format!("Expected string argument for {kind}(), {} given.", value.type_name()),
                ));
            };
            let names: Vec<String> = if tagged {
                self.builder
                    .find_by_tag(key)
                    .into_iter()
                    .map(|(name, _)| name)
                    .collect()
            } else {
                self.builder.find_autowired(key)
            };
            for name in names {
                if self.current_service.as_deref() != Some(name.as_str()) {
                    services.push(Value::Ref(Reference::Named(name)));
                }
            }
        }
        Ok(Value::list(services))
    }

    fn normalize_entity(&mut self, statement: &Statement) -> Result<Entity> {
        match &statement.entity {
            Entity::Ref(reference) => Ok(Entity::Ref(self.normalize_reference(reference)?)),
            Entity::Callable {
                head: EntityHead::Ref(reference),
                member,
            } => Ok(Entity::Callable {
                head: EntityHead::Ref(self.normalize_reference(reference)?),
                member: member.clone(),
            }),
            other => Ok(other.clone()),
        }
    }

    /// Canonicalizes a reference: names must exist, the current
    /// service's own name folds to `ToSelf`, and type references are
    /// resolved when the builder can already answer.
    pub fn normalize_reference(&mut self, reference: &Reference) -> Result<Reference> {
        match reference {
            Reference::ToSelf => Ok(Reference::ToSelf),
            Reference::Named(name) => {
                if !self.builder.has_definition(name) {
                    return Err(ServiceError::missing_service(format!(
                        "Reference to missing service '{name}'."
                    )));
                }
                if self.current_service.as_deref() == Some(name.as_str()) {
                    Ok(Reference::ToSelf)
                } else {
                    Ok(reference.clone())
                }
            }
            Reference::Typed(ty) => match self.get_by_type(ty) {
                Ok(resolved) => Ok(resolved),
                Err(error) if error.is(ErrorKind::NotAllowedDuringResolving) => {
                    Ok(reference.clone())
                }
                Err(error) => Err(error),
            },
        }
    }

    /// Resolves a type to a reference, preferring the enclosing service
    /// where allowed and refusing constructor self-injection.
    fn get_by_type(&mut self, ty: &str) -> Result<Reference> {
        if self.current_service.is_some() && self.current_service_allowed {
            if let Some(current_type) = &self.current_service_type {
                if self.universe.is_a(current_type, ty) {
                    return Ok(Reference::ToSelf);
                }
            }
        }
        let name = match self.builder.get_by_type(ty, true)? {
            Some(name) => name,
            None => {
                return Err(ServiceError::missing_service(format!(
                    "Service of type '{ty}' not found."
                )));
            }
        };
        if !self.current_service_allowed && self.current_service.as_deref() == Some(name.as_str()) {
            return Err(ServiceError::missing_service(format!(
                "Service of type '{ty}' not found."
            )));
        }
        Ok(Reference::Named(name))
    }

    fn autowire(
        &mut self,
        callable: &str,
        signature: &Signature,
        arguments: ValueMap,
    ) -> Result<ValueMap> {
        let universe = Arc::clone(&self.universe);
        let mut getter = |ty: &str, single: bool| -> Result<Value> {
            if single {
                self.get_by_type(ty).map(Value::Ref)
            } else {
                let current = self.current_service.clone();
                let services = self
                    .builder
                    .find_autowired(ty)
                    .into_iter()
                    .filter(|name| current.as_deref() != Some(name.as_str()))
                    .map(|name| Value::Ref(Reference::Named(name)))
                    .collect();
                Ok(Value::list(services))
            }
        };
        autowire_arguments(&universe, callable, signature, arguments, &mut getter)
    }

    /// Prefixes an error with the definition's descriptor, once, and
    /// shortens the definition class in `Class::member` mentions.
    fn complete_exception(&self, mut error: ServiceError, name: &str) -> ServiceError {
        if error.message.starts_with("[Service ") {
            return error;
        }
        let (descriptor, class) = match self.builder.get_definition(name) {
            Ok(definition) => (definition.descriptor(), definition.class_type().map(String::from)),
            Err(_) => (format!("Service '{name}'"), None),
        };
        if let Some(class) = class {
            let short = short_class_name(&class);
            if short != class {
                error.message = error
                    .message
                    .replace(&format!("{class}::"), &format!("{short}::"));
            }
        }
        error.message = format!("[{descriptor}]\n{}", error.message);
        error
    }

    fn reference_to_text(&self, reference: &Reference) -> String {
        match (reference, &self.current_service) {
            (Reference::ToSelf, Some(current)) => format!("@{current}"),
            _ => reference.to_string(),
        }
    }

    /// Formats a statement entity for diagnostics.
    pub fn entity_to_string(&self, entity: &Entity) -> String {
        match entity {
            Entity::Class(class) => format!("{class}::__construct()"),
            Entity::Ref(reference) => self.reference_to_text(reference),
            Entity::Callable { head, member } => {
                let parens = if member.contains('$') { "" } else { "()" };
                match head {
                    EntityHead::Function => format!("{member}{parens}"),
                    EntityHead::Class(class) => format!("{class}::{member}{parens}"),
                    EntityHead::Ref(reference) => {
                        format!("{}::{member}{parens}", self.reference_to_text(reference))
                    }
                    EntityHead::Stmt(inner) => format!(
                        "[{}]::{member}{parens}",
                        self.entity_to_string(&inner.entity)
                    ),
                }
            }
        }
    }
}

fn return_type_class(ty: Option<&TypeRef>, context: Option<&str>) -> Option<String> {
    let ty = ty?;
    let name = ty.single_name()?;
    if name.eq_ignore_ascii_case("self") || name.eq_ignore_ascii_case("static") {
        return context.map(String::from);
    }
    ty.single_class()
        .map(|class| class.trim_start_matches('\\').to_string())
}

/// Interprets `@service`, `@service::CONST`, `@service::property` and
/// `@@escaped` strings inside raw argument arrays.
pub fn convert_references(arguments: &ValueMap) -> ValueMap {
    arguments
        .iter()
        .map(|(key, value)| (key.clone(), convert_reference_value(value)))
        .collect()
}

fn convert_reference_value(value: &Value) -> Value {
    match value {
        Value::Array(map) => Value::Array(convert_references(map)),
        Value::Str(s) if s.starts_with("@@") => Value::Str(s[1..].to_string()),
        Value::Str(s) if s.len() > 1 && s.starts_with('@') => {
            let body = &s[1..];
            match body.split_once("::") {
                None => Value::Ref(make_reference(body)),
                Some((service, member)) if is_constant_name(member) => Value::Stmt(Box::new(
                    Statement::new(Entity::callable(make_reference(service), member)),
                )),
                Some((service, member)) => Value::Stmt(Box::new(Statement::new(
                    Entity::callable(make_reference(service), format!("${member}")),
                ))),
            }
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_model::{value_list, ClassInfo, MethodInfo, Parameter, ServiceDefinition};

    fn universe() -> Arc<TypeUniverse> {
        let mut u = TypeUniverse::new();
        u.add_class(ClassInfo::interface("App\\LoggerInterface"));
        u.add_class(ClassInfo::new("App\\Logger").with_interface("App\\LoggerInterface"));
        u.add_class(
            ClassInfo::new("App\\Mailer").with_constructor(
                MethodInfo::constructor().with_param(Parameter::typed(
                    "logger",
                    TypeRef::named("App\\Logger"),
                )),
            ),
        );
        Arc::new(u)
    }

    fn builder_with(defs: Vec<(&str, &str)>) -> ContainerBuilder {
        let mut builder = ContainerBuilder::new(universe());
        for (name, class) in defs {
            let mut definition = ServiceDefinition::new(name);
            definition.set_class(class);
            builder.add_definition(definition);
        }
        builder
    }

    #[test]
    fn test_normalize_reference_folds_current_service() {
        let mut builder = builder_with(vec![("logger", "App\\Logger")]);
        let mut resolver = Resolver::new(&mut builder);
        resolver.current_service = Some("logger".to_string());
        assert_eq!(
            resolver
                .normalize_reference(&Reference::named("logger"))
                .unwrap(),
            Reference::ToSelf
        );
    }

    #[test]
    fn test_normalize_reference_missing_name() {
        let mut builder = builder_with(vec![]);
        let mut resolver = Resolver::new(&mut builder);
        let err = resolver
            .normalize_reference(&Reference::named("gone"))
            .unwrap_err();
        assert_eq!(err.message, "Reference to missing service 'gone'.");
    }

    #[test]
    fn test_normalize_reference_resolves_type() {
        let mut builder = builder_with(vec![("logger", "App\\Logger")]);
        let mut resolver = Resolver::new(&mut builder);
        assert_eq!(
            resolver
                .normalize_reference(&Reference::typed("App\\LoggerInterface"))
                .unwrap(),
            Reference::named("logger")
        );
    }

    #[test]
    fn test_normalize_reference_keeps_type_while_resolving() {
        let mut builder = builder_with(vec![("logger", "App\\Logger")]);
        builder.add_definition(ServiceDefinition::new("pending"));
        let mut resolver = Resolver::new(&mut builder);
        let reference = Reference::typed("App\\LoggerInterface");
        assert_eq!(
            resolver.normalize_reference(&reference).unwrap(),
            reference
        );
    }

    #[test]
    fn test_self_injection_guard() {
        let mut builder = builder_with(vec![("logger", "App\\Logger")]);
        let mut resolver = Resolver::new(&mut builder);
        resolver.current_service = Some("logger".to_string());
        resolver.current_service_type = Some("App\\Logger".to_string());
        resolver.current_service_allowed = false;
        let err = resolver.get_by_type("App\\Logger").unwrap_err();
        assert!(err.is(ErrorKind::MissingService));
    }

    #[test]
    fn test_self_autowiring_in_setup_scope() {
        let mut builder = builder_with(vec![("logger", "App\\Logger")]);
        let mut resolver = Resolver::new(&mut builder);
        resolver.current_service = Some("logger".to_string());
        resolver.current_service_type = Some("App\\Logger".to_string());
        resolver.current_service_allowed = true;
        assert_eq!(
            resolver.get_by_type("App\\LoggerInterface").unwrap(),
            Reference::ToSelf
        );
    }

    #[test]
    fn test_scope_cleared_after_completion() {
        let mut builder = builder_with(vec![("logger", "App\\Logger"), ("mailer", "App\\Mailer")]);
        builder.resolve().unwrap();
        let mut resolver = Resolver::new(&mut builder);
        resolver.complete_definition("mailer").unwrap();
        assert!(resolver.current_service.is_none());
        assert!(resolver.current_service_type.is_none());
        assert!(!resolver.current_service_allowed);
    }

    #[test]
    fn test_scope_cleared_after_failed_completion() {
        let mut builder = builder_with(vec![("broken", "App\\Logger")]);
        builder
            .get_definition_mut("broken")
            .unwrap()
            .set_creator(Statement::new(Entity::class("App\\Gone")));
        let mut resolver = Resolver::new(&mut builder);
        assert!(resolver.complete_definition("broken").is_err());
        assert!(resolver.current_service.is_none());
        assert!(resolver.current_service_type.is_none());
        assert!(!resolver.current_service_allowed);
    }

    #[test]
    fn test_complete_exception_is_idempotent() {
        let mut builder = builder_with(vec![("logger", "App\\Logger")]);
        let resolver = Resolver::new(&mut builder);
        let decorated = resolver.complete_exception(
            ServiceError::new(ErrorKind::ClassNotFound, "Class 'X' not found."),
            "logger",
        );
        assert_eq!(
            decorated.message,
            "[Service 'logger' of type App\\Logger]\nClass 'X' not found."
        );
        let again = resolver.complete_exception(decorated.clone(), "logger");
        assert_eq!(again, decorated);
    }

    #[test]
    fn test_complete_exception_shortens_class_names() {
        let mut builder = builder_with(vec![("mailer", "App\\Mailer")]);
        let resolver = Resolver::new(&mut builder);
        let decorated = resolver.complete_exception(
            ServiceError::new(
                ErrorKind::ArgumentMismatch,
                "Unable to pass specified arguments to App\\Mailer::__construct().",
            ),
            "mailer",
        );
        assert_eq!(
            decorated.message,
            "[Service 'mailer' of type App\\Mailer]\nUnable to pass specified arguments to Mailer::__construct()."
        );
    }

    #[test]
    fn test_entity_to_string() {
        let mut builder = builder_with(vec![]);
        let resolver = Resolver::new(&mut builder);
        assert_eq!(
            resolver.entity_to_string(&Entity::class("App\\Mailer")),
            "App\\Mailer::__construct()"
        );
        assert_eq!(
            resolver.entity_to_string(&Entity::Ref(Reference::named("logger"))),
            "@logger"
        );
        assert_eq!(
            resolver.entity_to_string(&Entity::callable(Reference::named("logger"), "log")),
            "@logger::log()"
        );
        assert_eq!(
            resolver.entity_to_string(&Entity::callable("App\\Mailer", "$from")),
            "App\\Mailer::$from"
        );
        assert_eq!(
            resolver.entity_to_string(&Entity::function("strrev")),
            "strrev()"
        );
    }

    #[test]
    fn test_convert_references() {
        let args = value_list(vec![
            Value::str("@logger"),
            Value::str("@App\\Logger"),
            Value::str("@@literal"),
            Value::str("@cfg::LIMIT"),
            Value::str("@cfg::host"),
            Value::str("plain"),
        ]);
        let converted = convert_references(&args);
        let values: Vec<&Value> = converted.values().collect();
        assert_eq!(values[0], &Value::Ref(Reference::named("logger")));
        assert_eq!(values[1], &Value::Ref(Reference::typed("App\\Logger")));
        assert_eq!(values[2], &Value::str("@literal"));
        assert_eq!(
            values[3],
            &Value::Stmt(Box::new(Statement::new(Entity::callable(
                Reference::named("cfg"),
                "LIMIT"
            ))))
        );
        assert_eq!(
            values[4],
            &Value::Stmt(Box::new(Statement::new(Entity::callable(
                Reference::named("cfg"),
                "$host"
            ))))
        );
        assert_eq!(values[5], &Value::str("plain"));
    }

    #[test]
    fn test_return_type_class() {
        assert_eq!(
            return_type_class(Some(&TypeRef::named("App\\Obj")), None),
            Some("App\\Obj".to_string())
        );
        assert_eq!(
            return_type_class(Some(&TypeRef::named("static")), Some("App\\Factory")),
            Some("App\\Factory".to_string())
        );
        assert_eq!(return_type_class(Some(&TypeRef::named("mixed")), None), None);
        assert_eq!(return_type_class(Some(&TypeRef::named("object")), None), None);
        assert_eq!(
            return_type_class(
                Some(&TypeRef::union(vec![
                    TypeRef::named("A"),
                    TypeRef::named("B")
                ])),
                None
            ),
            None
        );
        assert_eq!(return_type_class(None, None), None);
    }
}
