//! `%placeholder%` parameter expansion.
//!
//! Expands `%name%` and `%a.b%` placeholders in arbitrary config values
//! against a parameter map. A placeholder spanning a whole string
//! yields the raw parameter value of any type; placeholders embedded in
//! a larger string concatenate, which requires every piece to be
//! scalar. When a placeholder resolves to a [`DynamicParameter`], a
//! value only known at container runtime, the result stays symbolic:
//! indexing appends subscripts and concatenation composes a quoted
//! expression such as `'x:' . ($cfg['port'])`.

use indexmap::IndexSet;
use thiserror::Error;
use weft_model::{ArrayKey, DynamicParameter, Entity, EntityHead, Statement, Value, ValueMap};

/// Failures raised during placeholder expansion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpandError {
    #[error("Missing parameter '{0}'.")]
    MissingParameter(String),

    #[error("Circular reference detected for parameters: {0}.")]
    CircularReference(String),

    #[error("Unable to concatenate non-scalar parameter '{0}' into '{1}'.")]
    NonScalarConcat(String, String),
}

/// Expands placeholders in `value` against `params`.
///
/// With `recursive` enabled, parameter values are themselves expanded,
/// with cycle detection keyed by placeholder name.
pub fn expand(value: &Value, params: &ValueMap, recursive: bool) -> Result<Value, ExpandError> {
    let visited = recursive.then(IndexSet::new);
    expand_value(value, params, visited.as_ref())
}

/// Escapes a value so a later expansion pass leaves it untouched:
/// every `%` is doubled and a leading `@` is doubled. Array keys are
/// escaped as well.
pub fn escape(value: &Value) -> Value {
    match value {
        Value::Str(s) => {
            let mut out = s.replace('%', "%%");
            if out.starts_with('@') {
                out.insert(0, '@');
            }
            Value::Str(out)
        }
        Value::Array(map) => Value::Array(
            map.iter()
                .map(|(key, value)| {
                    let key = match key {
                        ArrayKey::Str(s) => ArrayKey::Str(s.replace('%', "%%")),
                        other => other.clone(),
                    };
                    (key, escape(value))
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

fn expand_value(
    value: &Value,
    params: &ValueMap,
    visited: Option<&IndexSet<String>>,
) -> Result<Value, ExpandError> {
    match value {
        Value::Str(s) => expand_string(s, params, visited),
        Value::Array(map) => {
            let mut out = ValueMap::new();
            for (key, value) in map {
                let key = match key {
                    ArrayKey::Str(s) => expand_key(s, params, visited)?,
                    other => other.clone(),
                };
                out.insert(key, expand_value(value, params, visited)?);
            }
            Ok(Value::Array(out))
        }
        Value::Stmt(statement) => Ok(Value::Stmt(Box::new(expand_statement(
            statement, params, visited,
        )?))),
        other => Ok(other.clone()),
    }
}

fn expand_statement(
    statement: &Statement,
    params: &ValueMap,
    visited: Option<&IndexSet<String>>,
) -> Result<Statement, ExpandError> {
    let entity = match &statement.entity {
        Entity::Class(s) => Entity::Class(expand_to_string(s, params, visited)?),
        Entity::Callable { head, member } => Entity::Callable {
            head: match head {
                EntityHead::Class(c) => EntityHead::Class(expand_to_string(c, params, visited)?),
                EntityHead::Stmt(inner) => {
                    EntityHead::Stmt(Box::new(expand_statement(inner, params, visited)?))
                }
                other => other.clone(),
            },
            member: expand_to_string(member, params, visited)?,
        },
        other => other.clone(),
    };
    let mut arguments = ValueMap::new();
    for (key, value) in &statement.arguments {
        let key = match key {
            ArrayKey::Str(s) => expand_key(s, params, visited)?,
            other => other.clone(),
        };
        arguments.insert(key, expand_value(value, params, visited)?);
    }
    Ok(Statement { entity, arguments })
}

fn expand_key(
    key: &str,
    params: &ValueMap,
    visited: Option<&IndexSet<String>>,
) -> Result<ArrayKey, ExpandError> {
    match expand_string(key, params, visited)? {
        Value::Str(s) => Ok(ArrayKey::Str(s)),
        Value::Int(n) => Ok(ArrayKey::Int(n)),
        other if other.is_scalar() => Ok(ArrayKey::Str(stringify(&other))),
        _ => Err(ExpandError::NonScalarConcat(key.to_string(), key.to_string())),
    }
}

fn expand_to_string(
    s: &str,
    params: &ValueMap,
    visited: Option<&IndexSet<String>>,
) -> Result<String, ExpandError> {
    match expand_string(s, params, visited)? {
        Value::Str(out) => Ok(out),
        other if other.is_scalar() => Ok(stringify(&other)),
        _ => Err(ExpandError::NonScalarConcat(s.to_string(), s.to_string())),
    }
}

enum Part {
    Text(String),
    Placeholder(String),
}

/// Splits a string on `%name%` markers where `name` consists of word
/// characters, dots and dashes. `%%` (an empty name) is the escape for
/// a literal percent sign.
fn split_placeholders(s: &str) -> Vec<Part> {
    let chars: Vec<char> = s.chars().collect();
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '%' {
            if let Some(j) = find_closing(&chars, i + 1) {
                if !text.is_empty() {
                    parts.push(Part::Text(std::mem::take(&mut text)));
                }
                parts.push(Part::Placeholder(chars[i + 1..j].iter().collect()));
                i = j + 1;
                continue;
            }
        }
        text.push(chars[i]);
        i += 1;
    }
    if !text.is_empty() {
        parts.push(Part::Text(text));
    }
    parts
}

fn find_closing(chars: &[char], from: usize) -> Option<usize> {
    for (offset, c) in chars[from..].iter().enumerate() {
        if *c == '%' {
            return Some(from + offset);
        }
        if !(c.is_ascii_alphanumeric() || *c == '_' || *c == '.' || *c == '-') {
            return None;
        }
    }
    None
}

fn expand_string(
    s: &str,
    params: &ValueMap,
    visited: Option<&IndexSet<String>>,
) -> Result<Value, ExpandError> {
    let parts = split_placeholders(s);
    let whole = matches!(parts.as_slice(), [Part::Placeholder(name)] if !name.is_empty());

    enum Piece {
        Text(String),
        Dynamic(DynamicParameter),
    }

    let mut pieces = Vec::new();
    for part in &parts {
        match part {
            Part::Text(text) => pieces.push(Piece::Text(text.clone())),
            Part::Placeholder(name) if name.is_empty() => pieces.push(Piece::Text("%".to_string())),
            Part::Placeholder(name) => {
                if let Some(seen) = visited {
                    if seen.contains(name) {
                        let mut names: Vec<&str> = seen.iter().map(String::as_str).collect();
                        if !names.contains(&name.as_str()) {
                            names.push(name);
                        }
                        return Err(ExpandError::CircularReference(names.join(", ")));
                    }
                }
                let mut value = lookup(name, params)?;
                if let Some(seen) = visited {
                    let mut extended = seen.clone();
                    extended.insert(name.clone());
                    value = expand_value(&value, params, Some(&extended))?;
                }
                if whole {
                    return Ok(value);
                }
                match value {
                    Value::Dynamic(dynamic) => pieces.push(Piece::Dynamic(dynamic)),
                    scalar if scalar.is_scalar() => pieces.push(Piece::Text(stringify(&scalar))),
                    _ => return Err(ExpandError::NonScalarConcat(name.clone(), s.to_string())),
                }
            }
        }
    }

    if pieces.iter().any(|p| matches!(p, Piece::Dynamic(_))) {
        let exprs: Vec<String> = pieces
            .iter()
            .filter(|p| !matches!(p, Piece::Text(t) if t.is_empty()))
            .map(|p| match p {
                Piece::Text(text) => quote(text),
                Piece::Dynamic(dynamic) => format!("({dynamic})"),
            })
            .collect();
        return Ok(Value::Dynamic(DynamicParameter::new(exprs.join(" . "))));
    }

    let mut out = String::new();
    for piece in pieces {
        if let Piece::Text(text) = piece {
            out.push_str(&text);
        }
    }
    Ok(Value::Str(out))
}

/// Walks a dotted parameter path. Dynamic intermediates keep
/// accumulating index subscripts symbolically. The bare `%parameters%`
/// placeholder yields the whole map when no parameter shadows the name.
fn lookup(name: &str, params: &ValueMap) -> Result<Value, ExpandError> {
    if name == "parameters" && !params.contains_key(&ArrayKey::Str("parameters".to_string())) {
        return Ok(Value::Array(params.clone()));
    }
    let mut current = Value::Array(params.clone());
    for segment in name.split('.') {
        current = match current {
            Value::Array(map) => {
                let by_name = map.get(&ArrayKey::Str(segment.to_string())).cloned();
                let by_index = || {
                    segment
                        .parse::<i64>()
                        .ok()
                        .and_then(|n| map.get(&ArrayKey::Int(n)).cloned())
                };
                match by_name.or_else(by_index) {
                    Some(value) => value,
                    None => return Err(ExpandError::MissingParameter(name.to_string())),
                }
            }
            Value::Dynamic(dynamic) => Value::Dynamic(DynamicParameter::new(format!(
                "{}[{}]",
                dynamic.expression(),
                export_key(segment)
            ))),
            _ => return Err(ExpandError::MissingParameter(name.to_string())),
        };
    }
    Ok(current)
}

fn export_key(segment: &str) -> String {
    if segment.parse::<i64>().is_ok() {
        segment.to_string()
    } else {
        quote(segment)
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Str(s) => s.clone(),
        _ => String::new(),
    }
}
