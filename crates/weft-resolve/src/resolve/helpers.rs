//! Normalization helpers shared by configuration loading and the
//! resolver.
//!
//! These are pure functions over the value model: canonicalizing raw
//! config arguments, namespacing extension services, validating
//! reflected types, and small name utilities.

use weft_model::{
    Entity, EntityHead, ErrorKind, Reference, Result, ServiceError, Statement, TypeRef,
    TypeUniverse, Value, ValueMap,
};

/// Builds a reference from the text after an `@` marker: `self` is the
/// reserved self-reference, names containing a namespace separator are
/// type references, everything else is a definition name.
pub(crate) fn make_reference(name: &str) -> Reference {
    if name == "self" {
        Reference::ToSelf
    } else if name.contains('\\') {
        Reference::typed(name)
    } else {
        Reference::named(name)
    }
}

/// The class name after the last namespace separator.
pub(crate) fn short_class_name(class: &str) -> &str {
    class.rsplit('\\').next().unwrap_or(class)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validates a callable member: an optionally `$`-prefixed,
/// optionally `[]`-suffixed identifier path.
pub(crate) fn is_valid_member(member: &str) -> bool {
    let m = member.strip_prefix('$').unwrap_or(member);
    let m = m.strip_suffix("[]").unwrap_or(m);
    let m = m.strip_prefix('\\').unwrap_or(m);
    !m.is_empty() && m.split('\\').all(is_identifier)
}

/// `CONSTANT_NAME` / `CaseName`: an identifier starting with an
/// uppercase letter.
pub(crate) fn is_constant_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Validates that a reflected type names exactly one existing class or
/// interface, optionally tolerating nullability.
///
/// Returns the class name with any leading `\` stripped.
pub fn ensure_class_type(
    ty: Option<&TypeRef>,
    hint: &str,
    descriptor: &str,
    allow_nullable: bool,
    universe: &TypeUniverse,
) -> Result<String> {
    let suffix = if descriptor.is_empty() {
        String::new()
    } else {
        format!(" in {descriptor}")
    };
    let Some(ty) = ty else {
        return Err(ServiceError::new(
            ErrorKind::UnknownServiceType,
            format!("{} is not declared{suffix}.", capitalize(hint)),
        ));
    };
    match ty.single_class() {
        Some(class) if allow_nullable || !ty.allows_null() => {
            if !universe.type_exists(class) {
                return Err(ServiceError::new(
                    ErrorKind::ClassNotFound,
                    format!("Class '{class}' not found.\nCheck the {hint}{suffix}."),
                ));
            }
            Ok(class.trim_start_matches('\\').to_string())
        }
        _ => Err(ServiceError::new(
            ErrorKind::TypeMismatch,
            format!("{} is expected to be a class, '{ty}' given{suffix}.", capitalize(hint)),
        )),
    }
}

fn parse_constant_ref(s: &str) -> Option<(&str, &str)> {
    let (class, member) = s.split_once("::")?;
    if class.is_empty()
        || !class
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '\\')
        || class.chars().next().is_some_and(|c| c.is_ascii_digit())
    {
        return None;
    }
    is_constant_name(member).then_some((class, member))
}

fn is_service_marker(s: &str) -> bool {
    s.len() > 1
        && s.starts_with('@')
        && !s.starts_with("@@")
        && s[1..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '\\')
}

/// Canonicalizes raw config arguments: `@name` markers become
/// [`Reference`]s, `Class::CONST` is resolved to the constant's value,
/// `Class::Case` of an enum becomes an enum literal, and nested arrays
/// and statements are rewritten recursively.
pub fn filter_arguments(arguments: &ValueMap, universe: &TypeUniverse) -> Result<ValueMap> {
    let mut out = ValueMap::new();
    for (key, value) in arguments {
        out.insert(key.clone(), filter_argument(value, universe)?);
    }
    Ok(out)
}

fn filter_argument(value: &Value, universe: &TypeUniverse) -> Result<Value> {
    match value {
        Value::Str(s) => {
            if let Some((class, member)) = parse_constant_ref(s) {
                if universe.enum_has_case(class, member) {
                    Ok(Value::EnumCase {
                        class: class.to_string(),
                        case: member.to_string(),
                    })
                } else if let Some(constant) = universe.constant(class, member) {
                    Ok(constant.clone())
                } else {
                    Err(ServiceError::new(
                        ErrorKind::ClassNotFound,
                        format!("Constant {s} not found."),
                    ))
                }
            } else if is_service_marker(s) {
                Ok(Value::Ref(make_reference(&s[1..])))
            } else {
                Ok(value.clone())
            }
        }
        Value::Array(map) => filter_arguments(map, universe).map(Value::Array),
        Value::Stmt(stmt) => filter_statement(stmt, universe).map(|s| Value::Stmt(Box::new(s))),
        other => Ok(other.clone()),
    }
}

fn filter_statement(statement: &Statement, universe: &TypeUniverse) -> Result<Statement> {
    let entity = match &statement.entity {
        Entity::Callable {
            head: EntityHead::Stmt(inner),
            member,
        } => Entity::Callable {
            head: EntityHead::Stmt(Box::new(filter_statement(inner, universe)?)),
            member: member.clone(),
        },
        other => other.clone(),
    };
    Ok(Statement {
        entity,
        arguments: filter_arguments(&statement.arguments, universe)?,
    })
}

/// Rewrites `@extension.X` markers and `extension.X` references to
/// carry a concrete namespace prefix, recursing into statements and
/// arrays. Used when an extension's definitions are merged into the
/// main registry.
pub fn prefix_service_name(value: Value, namespace: &str) -> Value {
    match value {
        Value::Str(s) => match s.strip_prefix("@extension.") {
            Some(rest) => Value::Str(format!("@{namespace}.{rest}")),
            None => Value::Str(s),
        },
        Value::Ref(reference) => Value::Ref(prefix_reference(reference, namespace)),
        Value::Stmt(statement) => Value::Stmt(Box::new(prefix_statement(*statement, namespace))),
        Value::Array(map) => Value::Array(
            map.into_iter()
                .map(|(key, value)| (key, prefix_service_name(value, namespace)))
                .collect(),
        ),
        other => other,
    }
}

fn prefix_reference(reference: Reference, namespace: &str) -> Reference {
    match reference {
        Reference::Named(name) => match name.strip_prefix("extension.") {
            Some(rest) => Reference::named(format!("{namespace}.{rest}")),
            None => Reference::Named(name),
        },
        other => other,
    }
}

fn prefix_statement(statement: Statement, namespace: &str) -> Statement {
    let entity = match statement.entity {
        Entity::Ref(reference) => Entity::Ref(prefix_reference(reference, namespace)),
        Entity::Callable { head, member } => Entity::Callable {
            head: match head {
                EntityHead::Ref(reference) => EntityHead::Ref(prefix_reference(reference, namespace)),
                EntityHead::Stmt(inner) => {
                    EntityHead::Stmt(Box::new(prefix_statement(*inner, namespace)))
                }
                other => other,
            },
            member,
        },
        other => other,
    };
    Statement {
        entity,
        arguments: statement
            .arguments
            .into_iter()
            .map(|(key, value)| (key, prefix_service_name(value, namespace)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_model::{value_list, ClassInfo};

    #[test]
    fn test_member_validation() {
        assert!(is_valid_member("create"));
        assert!(is_valid_member("$items"));
        assert!(is_valid_member("$items[]"));
        assert!(is_valid_member("App\\helpers\\format"));
        assert!(is_valid_member("\\strrev"));
        assert!(!is_valid_member(""));
        assert!(!is_valid_member("$"));
        assert!(!is_valid_member("two words"));
        assert!(!is_valid_member("1st"));
    }

    #[test]
    fn test_short_class_name() {
        assert_eq!(short_class_name("App\\Sub\\Mailer"), "Mailer");
        assert_eq!(short_class_name("Mailer"), "Mailer");
    }

    #[test]
    fn test_filter_arguments_constants_and_refs() {
        let mut universe = TypeUniverse::new();
        universe.add_class(ClassInfo::new("App\\Config").with_constant("LIMIT", Value::Int(10)));
        universe.add_class(ClassInfo::enumeration("App\\Level", vec!["Info"]));

        let args = value_list(vec![
            Value::str("App\\Config::LIMIT"),
            Value::str("App\\Level::Info"),
            Value::str("@mailer"),
            Value::str("plain"),
        ]);
        let filtered = filter_arguments(&args, &universe).unwrap();
        let values: Vec<&Value> = filtered.values().collect();
        assert_eq!(values[0], &Value::Int(10));
        assert_eq!(
            values[1],
            &Value::EnumCase {
                class: "App\\Level".to_string(),
                case: "Info".to_string()
            }
        );
        assert_eq!(values[2], &Value::Ref(Reference::named("mailer")));
        assert_eq!(values[3], &Value::str("plain"));
    }

    #[test]
    fn test_filter_arguments_unknown_constant() {
        let universe = TypeUniverse::new();
        let args = value_list(vec![Value::str("App\\Config::LIMIT")]);
        let err = filter_arguments(&args, &universe).unwrap_err();
        assert_eq!(err.message, "Constant App\\Config::LIMIT not found.");
    }

    #[test]
    fn test_filter_arguments_backslash_means_type() {
        let universe = TypeUniverse::new();
        let args = value_list(vec![Value::str("@App\\Logger")]);
        let filtered = filter_arguments(&args, &universe).unwrap();
        assert_eq!(
            filtered.values().next().unwrap(),
            &Value::Ref(Reference::typed("App\\Logger"))
        );
    }

    #[test]
    fn test_prefix_service_name() {
        let value = Value::list(vec![
            Value::str("@extension.db"),
            Value::Ref(Reference::named("extension.cache")),
            Value::str("@other"),
        ]);
        let prefixed = prefix_service_name(value, "blog");
        let map = prefixed.as_array().unwrap();
        let values: Vec<&Value> = map.values().collect();
        assert_eq!(values[0], &Value::str("@blog.db"));
        assert_eq!(values[1], &Value::Ref(Reference::named("blog.cache")));
        assert_eq!(values[2], &Value::str("@other"));
    }

    #[test]
    fn test_ensure_class_type() {
        let mut universe = TypeUniverse::new();
        universe.add_class(ClassInfo::new("App\\Mailer"));

        let ty = TypeRef::named("App\\Mailer");
        assert_eq!(
            ensure_class_type(Some(&ty), "return type", "", false, &universe).unwrap(),
            "App\\Mailer"
        );

        let err = ensure_class_type(None, "return type", "create()", false, &universe).unwrap_err();
        assert_eq!(err.message, "Return type is not declared in create().");

        let nullable = TypeRef::nullable(TypeRef::named("App\\Mailer"));
        assert!(ensure_class_type(Some(&nullable), "return type", "", false, &universe).is_err());
        assert!(ensure_class_type(Some(&nullable), "return type", "", true, &universe).is_ok());

        let missing = TypeRef::named("App\\Gone");
        let err = ensure_class_type(Some(&missing), "type of service", "", false, &universe).unwrap_err();
        assert_eq!(
            err.message,
            "Class 'App\\Gone' not found.\nCheck the type of service."
        );
    }
}
