//! Reflection registry over the ambient class and function universe.
//!
//! The resolver never inspects live code; it asks this registry. The
//! universe is populated up front with class, interface, trait, enum,
//! and function declarations, and answers the reflection queries the
//! resolver needs: signatures, return types, constructor lookup,
//! visibility, subtype tests, constants and enum cases.
//!
//! Class names are namespaced with `\`; a leading `\` is tolerated on
//! lookup and means the same fully-qualified name.

pub mod types;

use crate::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use types::TypeRef;

/// Method visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
        })
    }
}

/// What kind of type a [`ClassInfo`] declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassKind {
    Class { is_abstract: bool },
    Interface,
    Trait,
    Enum,
}

/// One declared parameter of a callable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub ty: Option<TypeRef>,
    pub has_default: bool,
    pub variadic: bool,
}

impl Parameter {
    /// An untyped, required parameter.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            has_default: false,
            variadic: false,
        }
    }

    pub fn typed(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            ty: Some(ty),
            ..Self::new(name)
        }
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Optional parameters stop positional binding once skipped.
    pub fn is_optional(&self) -> bool {
        self.has_default || self.variadic
    }
}

/// Reflected signature of a callable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub parameters: Vec<Parameter>,
    pub return_type: Option<TypeRef>,
    /// Raw doc-comment; scanned for `@param Class[] $p` array hints.
    pub doc: Option<String>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn returning(mut self, ty: TypeRef) -> Self {
        self.return_type = Some(ty);
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

/// A reflected method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodInfo {
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    /// Name of the trait the method comes from, if any.
    pub trait_origin: Option<String>,
    pub signature: Signature,
}

impl MethodInfo {
    /// A public instance method with an empty signature.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            is_static: false,
            trait_origin: None,
            signature: Signature::new(),
        }
    }

    /// A public constructor.
    pub fn constructor() -> Self {
        Self::new("__construct")
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn from_trait(mut self, trait_name: impl Into<String>) -> Self {
        self.trait_origin = Some(trait_name.into());
        self
    }

    pub fn with_param(mut self, parameter: Parameter) -> Self {
        self.signature.parameters.push(parameter);
        self
    }

    pub fn returning(mut self, ty: TypeRef) -> Self {
        self.signature.return_type = Some(ty);
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.signature.doc = Some(doc.into());
        self
    }
}

/// A reflected free function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub signature: Signature,
}

impl FunctionInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signature: Signature::new(),
        }
    }

    pub fn with_param(mut self, parameter: Parameter) -> Self {
        self.signature.parameters.push(parameter);
        self
    }

    pub fn returning(mut self, ty: TypeRef) -> Self {
        self.signature.return_type = Some(ty);
        self
    }
}

/// A reflected class-like declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    pub kind: ClassKind,
    pub parent: Option<String>,
    pub interfaces: Vec<String>,
    pub constructor: Option<MethodInfo>,
    pub methods: IndexMap<String, MethodInfo>,
    pub constants: IndexMap<String, Value>,
    /// Enum cases, when `kind` is [`ClassKind::Enum`].
    pub cases: Vec<String>,
}

impl ClassInfo {
    /// A concrete class.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ClassKind::Class { is_abstract: false },
            parent: None,
            interfaces: Vec::new(),
            constructor: None,
            methods: IndexMap::new(),
            constants: IndexMap::new(),
            cases: Vec::new(),
        }
    }

    pub fn abstract_class(name: impl Into<String>) -> Self {
        Self {
            kind: ClassKind::Class { is_abstract: true },
            ..Self::new(name)
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            kind: ClassKind::Interface,
            ..Self::new(name)
        }
    }

    pub fn new_trait(name: impl Into<String>) -> Self {
        Self {
            kind: ClassKind::Trait,
            ..Self::new(name)
        }
    }

    pub fn enumeration(name: impl Into<String>, cases: Vec<&str>) -> Self {
        Self {
            kind: ClassKind::Enum,
            cases: cases.into_iter().map(String::from).collect(),
            ..Self::new(name)
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn with_constructor(mut self, constructor: MethodInfo) -> Self {
        self.constructor = Some(constructor);
        self
    }

    pub fn with_method(mut self, method: MethodInfo) -> Self {
        self.methods.insert(method.name.clone(), method);
        self
    }

    pub fn with_constant(mut self, name: impl Into<String>, value: Value) -> Self {
        self.constants.insert(name.into(), value);
        self
    }

    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self.kind, ClassKind::Class { is_abstract: true })
    }

    /// Only concrete classes can be instantiated by a creator statement.
    pub fn is_instantiable(&self) -> bool {
        matches!(self.kind, ClassKind::Class { is_abstract: false })
    }
}

/// Read-only view of every class, interface, trait, enum, and free
/// function the container can reflect on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeUniverse {
    classes: IndexMap<String, ClassInfo>,
    functions: IndexMap<String, FunctionInfo>,
}

fn normalize(name: &str) -> &str {
    name.strip_prefix('\\').unwrap_or(name)
}

impl TypeUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&mut self, class: ClassInfo) -> &mut Self {
        self.classes.insert(class.name.clone(), class);
        self
    }

    pub fn add_function(&mut self, function: FunctionInfo) -> &mut Self {
        self.functions.insert(function.name.clone(), function);
        self
    }

    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(normalize(name))
    }

    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.get(name)
    }

    /// `class_exists`: concrete/abstract classes and enums qualify,
    /// interfaces and traits do not.
    pub fn class_exists(&self, name: &str) -> bool {
        matches!(
            self.class(name).map(|c| &c.kind),
            Some(ClassKind::Class { .. }) | Some(ClassKind::Enum)
        )
    }

    pub fn interface_exists(&self, name: &str) -> bool {
        matches!(self.class(name).map(|c| &c.kind), Some(ClassKind::Interface))
    }

    /// `class_exists || interface_exists`.
    pub fn type_exists(&self, name: &str) -> bool {
        self.class_exists(name) || self.interface_exists(name)
    }

    pub fn is_enum(&self, name: &str) -> bool {
        matches!(self.class(name).map(|c| &c.kind), Some(ClassKind::Enum))
    }

    /// Subtype test over the parent chain and interface lists, both
    /// transitive. A type is-a itself.
    pub fn is_a(&self, child: &str, ancestor: &str) -> bool {
        let ancestor = normalize(ancestor);
        let mut queue = vec![normalize(child).to_string()];
        let mut seen = Vec::new();
        while let Some(current) = queue.pop() {
            if current == ancestor {
                return true;
            }
            if seen.contains(&current) {
                continue;
            }
            seen.push(current.clone());
            if let Some(info) = self.classes.get(&current) {
                if let Some(parent) = &info.parent {
                    queue.push(normalize(parent).to_string());
                }
                for interface in &info.interfaces {
                    queue.push(normalize(interface).to_string());
                }
            }
        }
        false
    }

    /// Looks a method up on a class, walking the parent chain and
    /// implemented interfaces.
    pub fn find_method(&self, class: &str, method: &str) -> Option<&MethodInfo> {
        self.walk_hierarchy(class, |info| info.methods.get(method))
    }

    /// The constructor a class is instantiated through, inherited if
    /// the class itself declares none.
    pub fn constructor(&self, class: &str) -> Option<&MethodInfo> {
        self.walk_hierarchy(class, |info| info.constructor.as_ref())
    }

    /// A class constant, inherited lookups included.
    pub fn constant(&self, class: &str, name: &str) -> Option<&Value> {
        self.walk_hierarchy(class, |info| info.constants.get(name))
    }

    pub fn enum_has_case(&self, class: &str, case: &str) -> bool {
        self.class(class)
            .map(|info| info.kind == ClassKind::Enum && info.cases.iter().any(|c| c == case))
            .unwrap_or(false)
    }

    fn walk_hierarchy<'a, T: ?Sized>(
        &'a self,
        class: &str,
        pick: impl Fn(&'a ClassInfo) -> Option<&'a T>,
    ) -> Option<&'a T> {
        let mut queue = vec![normalize(class).to_string()];
        let mut seen = Vec::new();
        while let Some(current) = queue.pop() {
            if seen.contains(&current) {
                continue;
            }
            seen.push(current.clone());
            if let Some(info) = self.classes.get(&current) {
                if let Some(found) = pick(info) {
                    return Some(found);
                }
                if let Some(parent) = &info.parent {
                    queue.push(normalize(parent).to_string());
                }
                for interface in &info.interfaces {
                    queue.push(normalize(interface).to_string());
                }
            }
        }
        None
    }
}
