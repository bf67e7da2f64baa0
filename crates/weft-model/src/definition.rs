//! Declarative service definitions.
//!
//! A definition records how to build one service: an optional declared
//! class, an optional creator statement, and a list of setup statements
//! applied to the fresh instance. The resolver fills in the class during
//! type resolution and rewrites creator/setup during completion.

use crate::{Statement, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One service in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    name: String,
    class: Option<String>,
    creator: Option<Statement>,
    setup: Vec<Statement>,
    tags: IndexMap<String, Value>,
    autowired: bool,
    imported: bool,
}

impl ServiceDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: None,
            creator: None,
            setup: Vec::new(),
            tags: IndexMap::new(),
            autowired: true,
            imported: false,
        }
    }

    /// A definition for a service supplied from outside the container.
    ///
    /// Imported definitions carry a declared type but no creator; both
    /// resolution phases leave them untouched.
    pub fn imported(name: impl Into<String>, class: impl Into<String>) -> Self {
        let mut def = Self::new(name);
        def.class = Some(class.into());
        def.imported = true;
        def
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved or declared class of the service, once known.
    pub fn class_type(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn set_class(&mut self, class: impl Into<String>) -> &mut Self {
        self.class = Some(class.into());
        self
    }

    pub fn creator(&self) -> Option<&Statement> {
        self.creator.as_ref()
    }

    pub fn set_creator(&mut self, creator: Statement) -> &mut Self {
        self.creator = Some(creator);
        self
    }

    pub fn setup(&self) -> &[Statement] {
        &self.setup
    }

    pub fn add_setup(&mut self, statement: Statement) -> &mut Self {
        self.setup.push(statement);
        self
    }

    pub fn set_setup(&mut self, setup: Vec<Statement>) -> &mut Self {
        self.setup = setup;
        self
    }

    pub fn tags(&self) -> &IndexMap<String, Value> {
        &self.tags
    }

    pub fn tag(&self, name: &str) -> Option<&Value> {
        self.tags.get(name)
    }

    pub fn add_tag(&mut self, name: impl Into<String>, payload: Value) -> &mut Self {
        self.tags.insert(name.into(), payload);
        self
    }

    pub fn is_autowired(&self) -> bool {
        self.autowired
    }

    pub fn set_autowired(&mut self, autowired: bool) -> &mut Self {
        self.autowired = autowired;
        self
    }

    pub fn is_imported(&self) -> bool {
        self.imported
    }

    /// Formats the definition for diagnostics, e.g.
    /// `Service 'mailer' of type App\Mailer`.
    pub fn descriptor(&self) -> String {
        match &self.class {
            Some(class) => format!("Service '{}' of type {}", self.name, class),
            None => format!("Service '{}'", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Entity;

    #[test]
    fn test_descriptor() {
        let mut def = ServiceDefinition::new("mailer");
        assert_eq!(def.descriptor(), "Service 'mailer'");
        def.set_class("App\\Mailer");
        assert_eq!(def.descriptor(), "Service 'mailer' of type App\\Mailer");
    }

    #[test]
    fn test_imported_skips_nothing_else() {
        let def = ServiceDefinition::imported("container", "Weft\\Container");
        assert!(def.is_imported());
        assert_eq!(def.class_type(), Some("Weft\\Container"));
        assert!(def.creator().is_none());
    }

    #[test]
    fn test_setup_accumulates_in_order() {
        let mut def = ServiceDefinition::new("svc");
        def.add_setup(Statement::new(Entity::class("A")));
        def.add_setup(Statement::new(Entity::class("B")));
        assert_eq!(def.setup().len(), 2);
    }
}
