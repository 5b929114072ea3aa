//! Declared parameter schemas.
//!
//! A [`FormSchema`] is built once when an operation is registered and never
//! mutated afterwards. Field types are an explicit closed set so every
//! consumer can dispatch on them with exhaustive matches.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Duplicate field name: {0}")]
    DuplicateField(String),

    #[error("Invalid field name: '{0}'")]
    InvalidFieldName(String),

    #[error("Schema root must be an object with properties")]
    NotAnObject,

    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    #[error("Circular reference: {0}")]
    CircularReference(String),

    #[error("Schema nesting exceeds {0} levels")]
    DepthExceeded(usize),

    #[error("Schema serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Declared type of a schema field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum DeclaredType {
    Bool,
    Int,
    Float,
    String,
    /// Unconstrained value.
    Any,
    Null,
    Enum(Vec<Value>),
    List(Box<DeclaredType>),
    /// String-keyed mapping whose values have the inner type.
    Map(Box<DeclaredType>),
    Optional(Box<DeclaredType>),
    Union(Vec<DeclaredType>),
}

impl DeclaredType {
    pub fn list(item: DeclaredType) -> Self {
        Self::List(Box::new(item))
    }

    pub fn map(value: DeclaredType) -> Self {
        Self::Map(Box::new(value))
    }

    pub fn optional(inner: DeclaredType) -> Self {
        match inner {
            already @ Self::Optional(_) => already,
            other => Self::Optional(Box::new(other)),
        }
    }

    pub fn choices<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Enum(values.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::String => write!(f, "str"),
            Self::Any => write!(f, "Any"),
            Self::Null => write!(f, "None"),
            Self::Enum(choices) => {
                let rendered: Vec<String> = choices.iter().map(choice_repr).collect();
                write!(f, "Literal[{}]", rendered.join(", "))
            }
            Self::List(item) => write!(f, "list[{}]", item),
            Self::Map(value) => write!(f, "dict[str, {}]", value),
            Self::Optional(inner) => write!(f, "Optional[{}]", inner),
            Self::Union(members) => {
                let rendered: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                write!(f, "Union[{}]", rendered.join(", "))
            }
        }
    }
}

/// Quoted representation of an enum choice, as shown in messages.
pub fn choice_repr(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s),
        other => other.to_string(),
    }
}

/// Produces a fresh default value each time a field's default is needed.
#[derive(Clone)]
pub struct DefaultFactory(Arc<dyn Fn() -> Value + Send + Sync>);

impl DefaultFactory {
    pub fn new(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn produce(&self) -> Value {
        (self.0)()
    }
}

impl fmt::Debug for DefaultFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultFactory(..)")
    }
}

#[derive(Debug, Clone)]
pub struct SchemaField {
    pub name: String,
    pub declared: DeclaredType,
    pub default: Option<Value>,
    pub default_factory: Option<DefaultFactory>,
    pub description: Option<String>,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, declared: DeclaredType) -> Self {
        Self {
            name: name.into(),
            declared,
            default: None,
            default_factory: None,
            description: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_default_factory(mut self, factory: DefaultFactory) -> Self {
        self.default_factory = Some(factory);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// A field is required when it has neither a default nor a default factory.
    pub fn required(&self) -> bool {
        self.default.is_none() && self.default_factory.is_none()
    }

    /// The value used when the field is left out: the static default, else a
    /// freshly produced factory value.
    pub fn default_value(&self) -> Option<Value> {
        self.default
            .clone()
            .or_else(|| self.default_factory.as_ref().map(DefaultFactory::produce))
    }
}

/// Ordered, name-unique collection of fields.
#[derive(Debug, Clone, Default)]
pub struct FormSchema {
    fields: Vec<SchemaField>,
}

impl FormSchema {
    pub fn new(fields: Vec<SchemaField>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        for field in &fields {
            if !is_identifier(&field.name) {
                return Err(SchemaError::InvalidFieldName(field.name.clone()));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }
        Ok(Self { fields })
    }

    /// Build a schema from a JSON Schema object document.
    pub fn from_json_schema(schema: &Value) -> Result<Self, SchemaError> {
        super::json_schema::import(schema)
    }

    /// Build a schema from a Rust parameter struct.
    pub fn of<T: JsonSchema>() -> Result<Self, SchemaError> {
        let root = schemars::schema_for!(T);
        let document = serde_json::to_value(root)?;
        Self::from_json_schema(&document)
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &SchemaField> {
        self.fields.iter().filter(|f| f.required())
    }

    pub fn optional_fields(&self) -> impl Iterator<Item = &SchemaField> {
        self.fields.iter().filter(|f| !f.required())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_follows_defaults() {
        let plain = SchemaField::new("x", DeclaredType::Int);
        let defaulted = SchemaField::new("y", DeclaredType::Int).with_default(0);
        let factory = SchemaField::new("z", DeclaredType::list(DeclaredType::Int))
            .with_default_factory(DefaultFactory::new(|| json!([])));

        assert!(plain.required());
        assert!(!defaulted.required());
        assert!(!factory.required());
        assert_eq!(factory.default_value(), Some(json!([])));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = FormSchema::new(vec![
            SchemaField::new("a", DeclaredType::Int),
            SchemaField::new("a", DeclaredType::String),
        ]);
        assert!(matches!(result, Err(SchemaError::DuplicateField(name)) if name == "a"));
    }

    #[test]
    fn test_invalid_names_rejected() {
        for bad in ["", "1abc", "has space", "dash-name"] {
            let result = FormSchema::new(vec![SchemaField::new(bad, DeclaredType::Int)]);
            assert!(matches!(result, Err(SchemaError::InvalidFieldName(_))), "{bad}");
        }
        assert!(FormSchema::new(vec![SchemaField::new("latticeConstant", DeclaredType::Float)]).is_ok());
    }

    #[test]
    fn test_partitions_keep_declaration_order() {
        let schema = FormSchema::new(vec![
            SchemaField::new("z", DeclaredType::Int).with_default(0),
            SchemaField::new("x", DeclaredType::Int),
            SchemaField::new("y", DeclaredType::String),
        ])
        .unwrap();

        let required: Vec<&str> = schema.required_fields().map(|f| f.name.as_str()).collect();
        let optional: Vec<&str> = schema.optional_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(required, vec!["x", "y"]);
        assert_eq!(optional, vec!["z"]);
    }

    #[test]
    fn test_display_names() {
        let ty = DeclaredType::optional(DeclaredType::Union(vec![
            DeclaredType::Int,
            DeclaredType::list(DeclaredType::String),
        ]));
        assert_eq!(ty.to_string(), "Optional[Union[int, list[str]]]");
        assert_eq!(DeclaredType::choices(["a", "b"]).to_string(), "Literal['a', 'b']");
    }
}
