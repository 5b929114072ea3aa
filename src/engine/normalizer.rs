//! Declared type → canonical dispatch tag.

use serde::Serialize;
use serde_json::Value;

use crate::domain::{DeclaredType, SchemaField};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tag", content = "of", rename_all = "snake_case")]
pub enum TypeTag {
    Bool,
    Int,
    Float,
    Enum(Vec<Value>),
    List(Box<TypeTag>),
    Map,
    String,
    /// Anything the widget table has no dedicated entry for.
    Complex,
}

impl TypeTag {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub tag: TypeTag,
    /// Carried over from the schema; normalization never changes it.
    pub required: bool,
}

pub fn normalize(field: &SchemaField) -> Normalized {
    Normalized {
        tag: normalize_type(&field.declared),
        required: field.required(),
    }
}

pub fn normalize_type(declared: &DeclaredType) -> TypeTag {
    match declared {
        DeclaredType::Bool => TypeTag::Bool,
        DeclaredType::Int => TypeTag::Int,
        DeclaredType::Float => TypeTag::Float,
        DeclaredType::String => TypeTag::String,
        DeclaredType::Enum(choices) => TypeTag::Enum(choices.clone()),
        DeclaredType::List(item) => TypeTag::List(Box::new(normalize_type(item))),
        DeclaredType::Map(_) => TypeTag::Map,
        DeclaredType::Optional(inner) => normalize_type(inner),
        DeclaredType::Union(members) => normalize_union(members),
        DeclaredType::Any | DeclaredType::Null => TypeTag::Complex,
    }
}

fn normalize_union(members: &[DeclaredType]) -> TypeTag {
    let present: Vec<&DeclaredType> = members
        .iter()
        .filter(|m| **m != DeclaredType::Null)
        .collect();

    match present.as_slice() {
        [single] => normalize_type(single),
        [a, b] if is_float_int_pair(a, b) => TypeTag::Float,
        _ => TypeTag::Complex,
    }
}

fn is_float_int_pair(a: &DeclaredType, b: &DeclaredType) -> bool {
    matches!(
        (a, b),
        (DeclaredType::Float, DeclaredType::Int) | (DeclaredType::Int, DeclaredType::Float)
    )
}
