//! Schema validation of a [`FormState`].
//!
//! Coercion is lax in the usual places: integral floats and numeric strings
//! become integers, integers become floats, and the common boolean spellings
//! become booleans. Errors carry the full path to the offending sub-value.

use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::fmt;

use super::FormState;
use crate::domain::schema::choice_repr;
use crate::domain::{DeclaredType, FieldPath, FormSchema};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub path: FieldPath,
    pub message: String,
}

impl FieldError {
    fn new(path: &FieldPath, message: impl Into<String>) -> Self {
        Self {
            path: path.clone(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// Every declared field, with defaults filled in for absent optionals.
    Valid { instance: Map<String, Value> },
    Invalid { errors: Vec<FieldError> },
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// One `path: message` line per error; empty when valid.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Valid { .. } => Vec::new(),
            Self::Invalid { errors } => errors.iter().map(ToString::to_string).collect(),
        }
    }
}

pub fn validate(schema: &FormSchema, state: &FormState) -> ValidationOutcome {
    let mut instance = Map::new();
    let mut errors = Vec::new();

    for field in schema.fields() {
        let path = FieldPath::field(&field.name);
        match state.get(&field.name) {
            Some(value) => {
                if let Some(coerced) = coerce(&field.declared, value, &path, Mode::Lax, &mut errors) {
                    instance.insert(field.name.clone(), coerced);
                }
            }
            None => match field.default_value() {
                Some(default) => {
                    instance.insert(field.name.clone(), default);
                }
                None => errors.push(FieldError::new(&path, "Field required")),
            },
        }
    }

    if errors.is_empty() {
        ValidationOutcome::Valid { instance }
    } else {
        tracing::debug!(count = errors.len(), "Form state failed validation");
        ValidationOutcome::Invalid { errors }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Only values already of the declared JSON type.
    Strict,
    Lax,
}

fn coerce(declared: &DeclaredType, value: &Value, path: &FieldPath, mode: Mode, errors: &mut Vec<FieldError>) -> Option<Value> {
    let result = match declared {
        DeclaredType::Any => Ok(value.clone()),
        DeclaredType::Null => match value {
            Value::Null => Ok(Value::Null),
            _ => Err("Input should be None".to_string()),
        },
        DeclaredType::Bool => coerce_bool(value, mode),
        DeclaredType::Int => coerce_int(value, mode),
        DeclaredType::Float => coerce_float(value, mode),
        DeclaredType::String => match value {
            Value::String(_) => Ok(value.clone()),
            _ => Err("Input should be a valid string".to_string()),
        },
        DeclaredType::Enum(choices) => {
            if choices.contains(value) {
                Ok(value.clone())
            } else {
                Err(format!("Input should be {}", describe_choices(choices)))
            }
        }
        DeclaredType::List(item) => {
            let Value::Array(items) = value else {
                errors.push(FieldError::new(path, "Input should be a valid list"));
                return None;
            };
            let mut out = Vec::with_capacity(items.len());
            let before = errors.len();
            for (idx, element) in items.iter().enumerate() {
                if let Some(v) = coerce(item, element, &path.push_index(idx), mode, errors) {
                    out.push(v);
                }
            }
            return (errors.len() == before).then_some(Value::Array(out));
        }
        DeclaredType::Map(inner) => {
            let Value::Object(entries) = value else {
                errors.push(FieldError::new(path, "Input should be a valid dictionary"));
                return None;
            };
            let mut out = Map::new();
            let before = errors.len();
            for (key, element) in entries {
                if let Some(v) = coerce(inner, element, &path.push_key(key), mode, errors) {
                    out.insert(key.clone(), v);
                }
            }
            return (errors.len() == before).then_some(Value::Object(out));
        }
        DeclaredType::Optional(inner) => {
            if value.is_null() {
                return Some(Value::Null);
            }
            return coerce(inner, value, path, mode, errors);
        }
        DeclaredType::Union(members) => return coerce_union(declared, members, value, path, errors),
    };

    match result {
        Ok(v) => Some(v),
        Err(message) => {
            errors.push(FieldError::new(path, message));
            None
        }
    }
}

/// Members are tried strictly first, then laxly. A string that matches no
/// member is parsed as JSON and tried again.
fn coerce_union(
    declared: &DeclaredType,
    members: &[DeclaredType],
    value: &Value,
    path: &FieldPath,
    errors: &mut Vec<FieldError>,
) -> Option<Value> {
    let attempt = |candidate: &Value| {
        for mode in [Mode::Strict, Mode::Lax] {
            for member in members {
                let mut scratch = Vec::new();
                if let Some(v) = coerce(member, candidate, path, mode, &mut scratch) {
                    return Some(v);
                }
            }
        }
        None
    };

    let matched = attempt(value).or_else(|| match value {
        Value::String(text) => serde_json::from_str::<Value>(text.trim())
            .ok()
            .filter(|parsed| !parsed.is_string())
            .and_then(|parsed| attempt(&parsed)),
        _ => None,
    });

    if matched.is_none() {
        errors.push(FieldError::new(
            path,
            format!("Input does not match any of the allowed types ({})", declared),
        ));
    }
    matched
}

fn coerce_bool(value: &Value, mode: Mode) -> Result<Value, String> {
    const INVALID: &str = "Input should be a valid boolean";
    match (value, mode) {
        (Value::Bool(_), _) => Ok(value.clone()),
        (_, Mode::Strict) => Err(INVALID.to_string()),
        (Value::Number(n), Mode::Lax) => match n.as_i64() {
            Some(0) => Ok(Value::Bool(false)),
            Some(1) => Ok(Value::Bool(true)),
            _ => Err(INVALID.to_string()),
        },
        (Value::String(s), Mode::Lax) => match s.trim().to_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "f" | "no" | "n" | "off" | "0" => Ok(Value::Bool(false)),
            _ => Err(INVALID.to_string()),
        },
        _ => Err(INVALID.to_string()),
    }
}

fn coerce_int(value: &Value, mode: Mode) -> Result<Value, String> {
    const INVALID: &str = "Input should be a valid integer";
    match (value, mode) {
        (Value::Number(n), _) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        (_, Mode::Strict) => Err(INVALID.to_string()),
        (Value::Number(n), Mode::Lax) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.is_finite() => Ok(Value::from(f as i64)),
            _ => Err(format!("{}, got a number with a fractional part", INVALID)),
        },
        (Value::Bool(b), Mode::Lax) => Ok(Value::from(i64::from(*b))),
        (Value::String(s), Mode::Lax) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("{}, unable to parse string as an integer", INVALID)),
        _ => Err(INVALID.to_string()),
    }
}

fn coerce_float(value: &Value, mode: Mode) -> Result<Value, String> {
    const INVALID: &str = "Input should be a valid number";
    let as_number = |f: f64| {
        Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| INVALID.to_string())
    };
    match (value, mode) {
        (Value::Number(n), Mode::Strict) if n.is_f64() => Ok(value.clone()),
        (Value::Number(n), Mode::Lax) => n.as_f64().ok_or_else(|| INVALID.to_string()).and_then(as_number),
        (_, Mode::Strict) => Err(INVALID.to_string()),
        (Value::Bool(b), Mode::Lax) => as_number(if *b { 1.0 } else { 0.0 }),
        (Value::String(s), Mode::Lax) => match s.trim().parse::<f64>() {
            Ok(f) => as_number(f),
            Err(_) => Err(format!("{}, unable to parse string as a number", INVALID)),
        },
        _ => Err(INVALID.to_string()),
    }
}

/// `'a'`, `'a' or 'b'`, `'a', 'b' or 'c'`.
fn describe_choices(choices: &[Value]) -> String {
    let quoted: Vec<String> = choices.iter().map(choice_repr).collect();
    match quoted.split_last() {
        None => "one of no choices".to_string(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
    }
}
