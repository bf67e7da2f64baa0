//! Signature-driven argument completion.
//!
//! Merges caller-supplied arguments (positional and named) with values
//! inferred from parameter types. Class-typed parameters are satisfied
//! through a getter callback so the caller decides what a type lookup
//! means; array parameters documented as `Class[]` or
//! `array<int, Class>` receive list injections.

use indexmap::IndexMap;
use std::collections::BTreeMap;
use weft_model::{
    ArrayKey, ErrorKind, Parameter, Result, ServiceError, Signature, TypeRef, TypeUniverse, Value,
    ValueMap,
};

/// Resolves a type to an injectable value. `single` selects between one
/// reference and an ordered list of references.
pub type Getter<'a> = dyn FnMut(&str, bool) -> Result<Value> + 'a;

/// Completes the argument list of `callable` against its reflected
/// signature.
///
/// Declared parameters are bound in order: variadics drain the
/// positional tail, named and positional supplies are consumed, and
/// unsupplied parameters are autowired by type. Positional binding
/// stops at the first skipped optional parameter; any later bindings
/// are emitted under parameter names. Leftover supplied arguments are
/// a hard error.
pub fn autowire_arguments(
    universe: &TypeUniverse,
    callable: &str,
    signature: &Signature,
    supplied: ValueMap,
    getter: &mut Getter<'_>,
) -> Result<ValueMap> {
    let mut named: IndexMap<String, Value> = IndexMap::new();
    let mut positional: BTreeMap<i64, Value> = BTreeMap::new();
    for (key, value) in supplied {
        match key {
            ArrayKey::Int(index) => {
                positional.insert(index, value);
            }
            ArrayKey::Str(name) => {
                named.insert(name, value);
            }
        }
    }

    let mut res = ValueMap::new();
    let mut use_name = false;

    for (index, parameter) in signature.parameters.iter().enumerate() {
        let num = index as i64;
        let desc = format!("${} in {callable}()", parameter.name);

        if parameter.variadic {
            if let Some(value) = named.shift_remove(&parameter.name) {
                let items = match value {
                    Value::Array(items) => items,
                    other => {
                        return Err(ServiceError::new(
                            ErrorKind::ArgumentMismatch,
                            format!("Parameter {desc} must be array, {} given.", other.type_name()),
                        ));
                    }
                };
                if use_name {
                    res.insert(ArrayKey::Str(parameter.name.clone()), Value::Array(items));
                } else {
                    let mut slot = num;
                    for (_, item) in items {
                        res.insert(ArrayKey::Int(slot), item);
                        slot += 1;
                    }
                }
            } else {
                let keys: Vec<i64> = positional.keys().copied().collect();
                let items: Vec<Value> = keys.iter().filter_map(|k| positional.remove(k)).collect();
                if use_name {
                    if !items.is_empty() {
                        res.insert(ArrayKey::Str(parameter.name.clone()), Value::list(items));
                    }
                } else {
                    let mut slot = num;
                    for item in items {
                        res.insert(ArrayKey::Int(slot), item);
                        slot += 1;
                    }
                }
            }
        } else if let Some(value) = named.shift_remove(&parameter.name) {
            let key = if use_name {
                ArrayKey::Str(parameter.name.clone())
            } else {
                ArrayKey::Int(num)
            };
            res.insert(key, value);
        } else if let Some(value) = positional.remove(&num) {
            res.insert(ArrayKey::Int(num), value);
        } else if let Some(value) = autowire_argument(universe, callable, parameter, &desc, signature, getter)? {
            let key = if use_name {
                ArrayKey::Str(parameter.name.clone())
            } else {
                ArrayKey::Int(num)
            };
            res.insert(key, value);
        } else if parameter.is_optional() {
            // no value and no autowire hit: later parameters bind by name
            use_name = true;
        } else {
            res.insert(ArrayKey::Int(num), Value::Null);
            tracing::warn!(parameter = %desc, "parameter should have a declared value");
        }
    }

    let mut next = signature.parameters.len() as i64;
    while !use_name {
        match positional.remove(&next) {
            Some(value) => {
                res.insert(ArrayKey::Int(next), value);
                next += 1;
            }
            None => break,
        }
    }

    if !positional.is_empty() || !named.is_empty() {
        return Err(ServiceError::new(
            ErrorKind::ArgumentMismatch,
            format!("Unable to pass specified arguments to {callable}()."),
        ));
    }
    Ok(res)
}

/// Infers one parameter's value from its declared type.
///
/// Returns `Ok(None)` when the parameter is not autowireable and the
/// caller should fall back to optional/required handling.
fn autowire_argument(
    universe: &TypeUniverse,
    callable: &str,
    parameter: &Parameter,
    desc: &str,
    signature: &Signature,
    getter: &mut Getter<'_>,
) -> Result<Option<Value>> {
    let Some(ty) = &parameter.ty else {
        return Ok(None);
    };

    if let Some(class) = ty.single_class() {
        return match getter(class, true) {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.is(ErrorKind::MissingService) => {
                if ty.allows_null() {
                    Ok(None)
                } else if universe.type_exists(class) {
                    Err(ServiceError::missing_service(format!(
                        "Service of type {class} required by {desc} not found."
                    )))
                } else {
                    Err(ServiceError::new(
                        ErrorKind::ClassNotFound,
                        format!("Class '{class}' required by {desc} not found."),
                    ))
                }
            }
            Err(mut error) => {
                error.message = format!("{} (required by {desc})", error.message);
                Err(error)
            }
        };
    }

    if ty.is_intersection() {
        return Err(ServiceError::new(
            ErrorKind::IntersectionTypeUnsupported,
            format!("Parameter {desc} has intersection type, so its value must be specified."),
        ));
    }

    if ty.is_builtin("array") {
        if let Some(element) = array_element_class(universe, callable, parameter, signature) {
            return getter(&element, false).map(Some);
        }
    }

    if parameter.is_optional() || ty.allows_null() {
        return Ok(None);
    }

    if ty.is_union() {
        return Err(ServiceError::new(
            ErrorKind::UnionWithoutDefault,
            format!("Parameter {desc} has union type and no default value, so its value must be specified."),
        ));
    }
    Err(ServiceError::new(
        ErrorKind::UnresolvedDependency,
        format!("Parameter {desc} has no class type or default value, so its value must be specified."),
    ))
}

/// Looks for a `@param Class[] $name` or `@param array<int, Class>
/// $name` doc line and resolves the element class relative to the
/// declaring namespace.
fn array_element_class(
    universe: &TypeUniverse,
    callable: &str,
    parameter: &Parameter,
    signature: &Signature,
) -> Option<String> {
    let doc = signature.doc.as_deref()?;
    let wanted = format!("${}", parameter.name);
    for line in doc.lines() {
        let line = line.trim().trim_start_matches('*').trim();
        let Some(rest) = line.strip_prefix("@param") else {
            continue;
        };
        let Some(name_at) = rest.find(&wanted) else {
            continue;
        };
        let type_text = rest[..name_at].trim();
        let element = if let Some(inner) = type_text.strip_suffix("[]") {
            inner.trim()
        } else if let Some(inner) = type_text
            .strip_prefix("array<")
            .and_then(|t| t.strip_suffix('>'))
        {
            inner.rsplit(',').next().map(str::trim)?
        } else {
            continue;
        };
        return expand_class_name(element, namespace_of(callable), universe);
    }
    None
}

fn namespace_of(callable: &str) -> Option<&str> {
    let owner = callable.split("::").next().unwrap_or(callable);
    let cut = owner.rfind('\\')?;
    Some(&owner[..cut])
}

fn expand_class_name(
    name: &str,
    namespace: Option<&str>,
    universe: &TypeUniverse,
) -> Option<String> {
    if let Some(absolute) = name.strip_prefix('\\') {
        return universe.type_exists(absolute).then(|| absolute.to_string());
    }
    if TypeRef::is_builtin_name(name) {
        return None;
    }
    if let Some(namespace) = namespace {
        let qualified = format!("{namespace}\\{name}");
        if universe.type_exists(&qualified) {
            return Some(qualified);
        }
    }
    universe.type_exists(name).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_model::{value_list, ClassInfo, Reference};

    fn simple_getter(
        known: Vec<(&'static str, &'static str)>,
    ) -> impl FnMut(&str, bool) -> Result<Value> {
        move |ty: &str, single: bool| {
            let matches: Vec<&str> = known
                .iter()
                .filter(|(t, _)| *t == ty)
                .map(|(_, name)| *name)
                .collect();
            if single {
                match matches.first() {
                    Some(name) => Ok(Value::Ref(Reference::named(*name))),
                    None => Err(ServiceError::missing_service(format!(
                        "Service of type '{ty}' not found."
                    ))),
                }
            } else {
                Ok(Value::list(
                    matches
                        .into_iter()
                        .map(|name| Value::Ref(Reference::named(name)))
                        .collect(),
                ))
            }
        }
    }

    fn universe() -> TypeUniverse {
        let mut u = TypeUniverse::new();
        u.add_class(ClassInfo::new("App\\Logger"));
        u.add_class(ClassInfo::new("App\\Handler"));
        u
    }

    #[test]
    fn test_positional_and_named_supply() {
        let signature = Signature::new()
            .with_param(Parameter::new("first"))
            .with_param(Parameter::new("second"));
        let mut supplied = ValueMap::new();
        supplied.insert("second".into(), Value::Int(2));
        supplied.insert(ArrayKey::Int(0), Value::Int(1));

        let mut getter = simple_getter(vec![]);
        let out = autowire_arguments(&universe(), "f", &signature, supplied, &mut getter).unwrap();
        assert_eq!(out.get(&ArrayKey::Int(0)), Some(&Value::Int(1)));
        assert_eq!(out.get(&ArrayKey::Int(1)), Some(&Value::Int(2)));
    }

    #[test]
    fn test_autowire_by_type() {
        let signature = Signature::new().with_param(Parameter::typed(
            "logger",
            TypeRef::named("App\\Logger"),
        ));
        let mut getter = simple_getter(vec![("App\\Logger", "logger")]);
        let out =
            autowire_arguments(&universe(), "App\\Mail::__construct", &signature, ValueMap::new(), &mut getter)
                .unwrap();
        assert_eq!(
            out.get(&ArrayKey::Int(0)),
            Some(&Value::Ref(Reference::named("logger")))
        );
    }

    #[test]
    fn test_missing_required_service() {
        let signature = Signature::new().with_param(Parameter::typed(
            "logger",
            TypeRef::named("App\\Logger"),
        ));
        let mut getter = simple_getter(vec![]);
        let err = autowire_arguments(&universe(), "App\\Mail::__construct", &signature, ValueMap::new(), &mut getter)
            .unwrap_err();
        assert_eq!(
            err.message,
            "Service of type App\\Logger required by $logger in App\\Mail::__construct() not found."
        );
    }

    #[test]
    fn test_missing_unknown_class() {
        let signature =
            Signature::new().with_param(Parameter::typed("dep", TypeRef::named("App\\Gone")));
        let mut getter = simple_getter(vec![]);
        let err = autowire_arguments(&universe(), "f", &signature, ValueMap::new(), &mut getter)
            .unwrap_err();
        assert!(err.is(ErrorKind::ClassNotFound));
        assert_eq!(err.message, "Class 'App\\Gone' required by $dep in f() not found.");
    }

    #[test]
    fn test_nullable_class_collapses_to_skip() {
        let signature = Signature::new().with_param(
            Parameter::typed("logger", TypeRef::nullable(TypeRef::named("App\\Logger")))
                .with_default(),
        );
        let mut getter = simple_getter(vec![]);
        let out = autowire_arguments(&universe(), "f", &signature, ValueMap::new(), &mut getter)
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_intersection_rejected() {
        let signature = Signature::new().with_param(Parameter::typed(
            "both",
            TypeRef::intersection(vec![TypeRef::named("A"), TypeRef::named("B")]),
        ));
        let mut getter = simple_getter(vec![]);
        let err = autowire_arguments(&universe(), "f", &signature, ValueMap::new(), &mut getter)
            .unwrap_err();
        assert!(err.is(ErrorKind::IntersectionTypeUnsupported));
    }

    #[test]
    fn test_union_without_default_rejected() {
        let signature = Signature::new().with_param(Parameter::typed(
            "either",
            TypeRef::union(vec![TypeRef::named("A"), TypeRef::named("B")]),
        ));
        let mut getter = simple_getter(vec![]);
        let err = autowire_arguments(&universe(), "f", &signature, ValueMap::new(), &mut getter)
            .unwrap_err();
        assert!(err.is(ErrorKind::UnionWithoutDefault));
        assert_eq!(
            err.message,
            "Parameter $either in f() has union type and no default value, so its value must be specified."
        );
    }

    #[test]
    fn test_mixed_without_default_rejected() {
        let signature =
            Signature::new().with_param(Parameter::typed("anything", TypeRef::named("mixed")));
        let mut getter = simple_getter(vec![]);
        let err = autowire_arguments(&universe(), "f", &signature, ValueMap::new(), &mut getter)
            .unwrap_err();
        assert!(err.is(ErrorKind::UnresolvedDependency));
        assert_eq!(
            err.message,
            "Parameter $anything in f() has no class type or default value, so its value must be specified."
        );

        // with a default the parameter is simply skipped
        let signature = Signature::new()
            .with_param(Parameter::typed("anything", TypeRef::named("mixed")).with_default());
        let mut getter = simple_getter(vec![]);
        let out = autowire_arguments(&universe(), "f", &signature, ValueMap::new(), &mut getter)
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_doc_array_injection() {
        let signature = Signature::new()
            .with_param(Parameter::typed("handlers", TypeRef::named("array")))
            .with_doc("@param Handler[] $handlers");
        let mut getter = simple_getter(vec![("App\\Handler", "h1"), ("App\\Handler", "h2")]);
        let out = autowire_arguments(
            &universe(),
            "App\\Manager::__construct",
            &signature,
            ValueMap::new(),
            &mut getter,
        )
        .unwrap();
        assert_eq!(
            out.get(&ArrayKey::Int(0)),
            Some(&Value::list(vec![
                Value::Ref(Reference::named("h1")),
                Value::Ref(Reference::named("h2")),
            ]))
        );
    }

    #[test]
    fn test_generic_array_doc_form() {
        let signature = Signature::new()
            .with_param(Parameter::typed("handlers", TypeRef::named("array")))
            .with_doc("@param array<int, Handler> $handlers");
        let mut getter = simple_getter(vec![("App\\Handler", "h1")]);
        let out = autowire_arguments(
            &universe(),
            "App\\Manager::__construct",
            &signature,
            ValueMap::new(),
            &mut getter,
        )
        .unwrap();
        assert_eq!(
            out.get(&ArrayKey::Int(0)),
            Some(&Value::list(vec![Value::Ref(Reference::named("h1"))]))
        );
    }

    #[test]
    fn test_variadic_drains_tail() {
        let signature = Signature::new()
            .with_param(Parameter::new("first"))
            .with_param(Parameter::new("rest").variadic());
        let supplied = value_list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let mut getter = simple_getter(vec![]);
        let out = autowire_arguments(&universe(), "f", &signature, supplied, &mut getter).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out.get(&ArrayKey::Int(2)), Some(&Value::Int(3)));
    }

    #[test]
    fn test_variadic_named_array() {
        let signature = Signature::new().with_param(Parameter::new("items").variadic());
        let mut supplied = ValueMap::new();
        supplied.insert(
            "items".into(),
            Value::list(vec![Value::Int(1), Value::Int(2)]),
        );
        let mut getter = simple_getter(vec![]);
        let out = autowire_arguments(&universe(), "f", &signature, supplied, &mut getter).unwrap();
        assert_eq!(out.get(&ArrayKey::Int(0)), Some(&Value::Int(1)));
        assert_eq!(out.get(&ArrayKey::Int(1)), Some(&Value::Int(2)));
    }

    #[test]
    fn test_skipped_optional_switches_to_names() {
        let signature = Signature::new()
            .with_param(Parameter::new("first").with_default())
            .with_param(Parameter::new("second"));
        let mut supplied = ValueMap::new();
        supplied.insert("second".into(), Value::Int(2));
        let mut getter = simple_getter(vec![]);
        let out = autowire_arguments(&universe(), "f", &signature, supplied, &mut getter).unwrap();
        assert_eq!(
            out.get(&ArrayKey::Str("second".to_string())),
            Some(&Value::Int(2))
        );
        assert!(out.get(&ArrayKey::Int(0)).is_none());
    }

    #[test]
    fn test_untyped_required_becomes_null() {
        let signature = Signature::new().with_param(Parameter::new("value"));
        let mut getter = simple_getter(vec![]);
        let out = autowire_arguments(&universe(), "f", &signature, ValueMap::new(), &mut getter)
            .unwrap();
        assert_eq!(out.get(&ArrayKey::Int(0)), Some(&Value::Null));
    }

    #[test]
    fn test_leftover_arguments_rejected() {
        let signature = Signature::new().with_param(Parameter::new("only"));
        let mut supplied = ValueMap::new();
        supplied.insert("only".into(), Value::Int(1));
        supplied.insert("extra".into(), Value::Int(2));
        let mut getter = simple_getter(vec![]);
        let err = autowire_arguments(&universe(), "f", &signature, supplied, &mut getter)
            .unwrap_err();
        assert_eq!(err.message, "Unable to pass specified arguments to f().");
    }

    #[test]
    fn test_trailing_positional_extras_pass_through() {
        let signature = Signature::new().with_param(Parameter::new("first"));
        let supplied = value_list(vec![Value::Int(1), Value::Int(2)]);
        let mut getter = simple_getter(vec![]);
        let out = autowire_arguments(&universe(), "f", &signature, supplied, &mut getter).unwrap();
        assert_eq!(out.get(&ArrayKey::Int(1)), Some(&Value::Int(2)));
    }
}
