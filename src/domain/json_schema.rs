//! JSON Schema import with `$ref` support.
//!
//! Converts an object schema (as exported by Pydantic models or derived by
//! `schemars`) into a [`FormSchema`]. References into `#/$defs` and
//! `#/definitions` are followed with cycle detection.

use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

use super::schema::{DeclaredType, FormSchema, SchemaError, SchemaField};

/// Context for schema resolution, carrying available definitions
struct ResolutionContext {
    definitions: HashMap<String, Value>,
    /// Refs currently being expanded
    visiting: HashSet<String>,
    max_depth: usize,
}

impl ResolutionContext {
    fn from_schema(schema: &Value) -> Self {
        let mut definitions = HashMap::new();
        for key in ["definitions", "$defs"] {
            if let Some(defs) = schema.get(key).and_then(Value::as_object) {
                for (name, def) in defs {
                    definitions.insert(name.clone(), def.clone());
                }
            }
        }
        Self {
            definitions,
            visiting: HashSet::new(),
            max_depth: 20,
        }
    }
}

pub(crate) fn import(schema: &Value) -> Result<FormSchema, SchemaError> {
    let mut ctx = ResolutionContext::from_schema(schema);
    let empty = Map::new();
    let root = dereference_root(schema, &ctx)?.clone();

    let properties = match root.get("properties") {
        Some(Value::Object(props)) => props,
        Some(_) => return Err(SchemaError::NotAnObject),
        None if root.get("type").and_then(Value::as_str) == Some("object") => &empty,
        None => return Err(SchemaError::NotAnObject),
    };
    let required: HashSet<&str> = root
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut fields = Vec::with_capacity(properties.len());
    for (name, property) in properties {
        let declared = resolve(property, &mut ctx, 0)?;
        let mut field = SchemaField::new(name.clone(), declared);
        field.description = property
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);
        field.default = match property.get("default") {
            Some(default) => Some(default.clone()),
            // Left out of `required` without an explicit default: absent means null.
            None if !required.contains(name.as_str()) => Some(Value::Null),
            None => None,
        };
        fields.push(field);
    }

    FormSchema::new(fields)
}

/// The root may itself be a bare reference to a definition.
fn dereference_root<'a>(schema: &'a Value, ctx: &'a ResolutionContext) -> Result<&'a Value, SchemaError> {
    match schema.get("$ref").and_then(Value::as_str) {
        Some(reference) => lookup(reference, ctx),
        None => Ok(schema),
    }
}

fn lookup<'a>(reference: &str, ctx: &'a ResolutionContext) -> Result<&'a Value, SchemaError> {
    let name = reference
        .strip_prefix("#/definitions/")
        .or_else(|| reference.strip_prefix("#/$defs/"))
        .ok_or_else(|| SchemaError::UnresolvedReference(reference.to_string()))?;
    ctx.definitions
        .get(name)
        .ok_or_else(|| SchemaError::UnresolvedReference(reference.to_string()))
}

fn resolve(schema: &Value, ctx: &mut ResolutionContext, depth: usize) -> Result<DeclaredType, SchemaError> {
    if depth > ctx.max_depth {
        return Err(SchemaError::DepthExceeded(ctx.max_depth));
    }

    let Value::Object(object) = schema else {
        return Ok(DeclaredType::Any);
    };

    if let Some(reference) = object.get("$ref").and_then(Value::as_str) {
        return resolve_ref(reference, ctx, depth);
    }

    // schemars wraps a lone $ref in allOf when it attaches metadata
    if let Some(all_of) = object.get("allOf").and_then(Value::as_array) {
        if all_of.len() == 1 {
            return resolve(&all_of[0], ctx, depth + 1);
        }
        return Ok(DeclaredType::Any);
    }

    if let Some(variants) = object
        .get("anyOf")
        .or_else(|| object.get("oneOf"))
        .and_then(Value::as_array)
    {
        let members = variants
            .iter()
            .map(|v| resolve(v, ctx, depth + 1))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(combine(members));
    }

    if let Some(constant) = object.get("const") {
        return Ok(DeclaredType::Enum(vec![constant.clone()]));
    }

    if let Some(values) = object.get("enum").and_then(Value::as_array) {
        let choices: Vec<Value> = values.iter().filter(|v| !v.is_null()).cloned().collect();
        let declared = DeclaredType::Enum(choices);
        return Ok(if values.iter().any(Value::is_null) {
            DeclaredType::optional(declared)
        } else {
            declared
        });
    }

    match object.get("type") {
        Some(Value::String(name)) => resolve_named(name, object, ctx, depth),
        Some(Value::Array(names)) => {
            let members = names
                .iter()
                .filter_map(Value::as_str)
                .map(|name| resolve_named(name, object, ctx, depth))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(combine(members))
        }
        _ if object.contains_key("properties") => Ok(DeclaredType::map(DeclaredType::Any)),
        _ => Ok(DeclaredType::Any),
    }
}

fn resolve_named(
    name: &str,
    object: &Map<String, Value>,
    ctx: &mut ResolutionContext,
    depth: usize,
) -> Result<DeclaredType, SchemaError> {
    Ok(match name {
        "null" => DeclaredType::Null,
        "boolean" => DeclaredType::Bool,
        "integer" => DeclaredType::Int,
        "number" => DeclaredType::Float,
        "string" => DeclaredType::String,
        "array" => match object.get("items") {
            // Tuple-style items collapse to an unconstrained element
            Some(Value::Array(_)) | None => DeclaredType::list(DeclaredType::Any),
            Some(items) => DeclaredType::list(resolve(items, ctx, depth + 1)?),
        },
        "object" => match object.get("additionalProperties") {
            Some(values @ Value::Object(_)) => DeclaredType::map(resolve(values, ctx, depth + 1)?),
            _ => DeclaredType::map(DeclaredType::Any),
        },
        _ => DeclaredType::Any,
    })
}

fn resolve_ref(reference: &str, ctx: &mut ResolutionContext, depth: usize) -> Result<DeclaredType, SchemaError> {
    if !ctx.visiting.insert(reference.to_string()) {
        return Err(SchemaError::CircularReference(reference.to_string()));
    }
    let target = lookup(reference, ctx)?.clone();
    let result = resolve(&target, ctx, depth + 1);
    ctx.visiting.remove(reference);
    result
}

/// Fold union members: a `null` member makes the rest optional.
fn combine(members: Vec<DeclaredType>) -> DeclaredType {
    let nullable = members.iter().any(|m| *m == DeclaredType::Null);
    let mut rest: Vec<DeclaredType> = members
        .into_iter()
        .filter(|m| *m != DeclaredType::Null)
        .collect();

    let inner = match rest.len() {
        0 => return DeclaredType::Null,
        1 => rest.remove(0),
        _ => DeclaredType::Union(rest),
    };
    if nullable {
        DeclaredType::optional(inner)
    } else {
        inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_pydantic_style_schema() {
        let schema = json!({
            "title": "GenerateVaspPoscarSchema",
            "type": "object",
            "properties": {
                "formula": {"type": "string", "description": "Chemical formula"},
                "lattice": {"anyOf": [{"type": "number"}, {"type": "integer"}], "default": 5.43},
                "output_path": {"anyOf": [{"type": "string"}, {"type": "null"}], "default": null},
                "mode": {"enum": ["fast", "accurate"], "type": "string", "default": "fast"},
                "kpts": {"type": "array", "items": {"type": "integer"}},
                "tags": {"type": "object", "additionalProperties": {"type": "string"}}
            },
            "required": ["formula", "kpts"]
        });

        let form = FormSchema::from_json_schema(&schema).unwrap();
        let names: Vec<&str> = form.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["formula", "lattice", "output_path", "mode", "kpts", "tags"]);

        let formula = form.field("formula").unwrap();
        assert_eq!(formula.declared, DeclaredType::String);
        assert!(formula.required());
        assert_eq!(formula.description.as_deref(), Some("Chemical formula"));

        assert_eq!(
            form.field("lattice").unwrap().declared,
            DeclaredType::Union(vec![DeclaredType::Float, DeclaredType::Int])
        );
        assert_eq!(
            form.field("output_path").unwrap().declared,
            DeclaredType::optional(DeclaredType::String)
        );
        assert_eq!(form.field("mode").unwrap().declared, DeclaredType::choices(["fast", "accurate"]));
        assert_eq!(form.field("kpts").unwrap().declared, DeclaredType::list(DeclaredType::Int));
        assert_eq!(form.field("tags").unwrap().declared, DeclaredType::map(DeclaredType::String));

        // not required, no explicit default
        let tags = form.field("tags").unwrap();
        assert!(!tags.required());
        assert_eq!(tags.default, Some(Value::Null));
    }

    #[test]
    fn test_refs_are_followed() {
        let schema = json!({
            "type": "object",
            "properties": {
                "calc": {"$ref": "#/$defs/CalcType", "default": "relax"}
            },
            "$defs": {
                "CalcType": {"enum": ["relax", "static"], "type": "string"}
            }
        });
        let form = FormSchema::from_json_schema(&schema).unwrap();
        assert_eq!(form.field("calc").unwrap().declared, DeclaredType::choices(["relax", "static"]));
    }

    #[test]
    fn test_circular_reference_is_an_error() {
        let schema = json!({
            "type": "object",
            "properties": {"node": {"$ref": "#/definitions/Node"}},
            "definitions": {
                "Node": {"$ref": "#/definitions/Node"}
            }
        });
        let result = FormSchema::from_json_schema(&schema);
        assert!(matches!(result, Err(SchemaError::CircularReference(_))));
    }

    #[test]
    fn test_unknown_reference_is_an_error() {
        let schema = json!({
            "type": "object",
            "properties": {"node": {"$ref": "#/definitions/Missing"}}
        });
        assert!(matches!(
            FormSchema::from_json_schema(&schema),
            Err(SchemaError::UnresolvedReference(_))
        ));
    }

    #[test]
    fn test_non_object_root_rejected() {
        assert!(matches!(
            FormSchema::from_json_schema(&json!({"type": "string"})),
            Err(SchemaError::NotAnObject)
        ));
    }

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    #[serde(rename_all = "lowercase")]
    enum Shape {
        Cubic,
        Hexagonal,
    }

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct SupercellParams {
        /// Structure file to expand
        poscar_path: String,
        scaling: Vec<i64>,
        #[serde(default)]
        wrap: bool,
        shape: Shape,
        comment: Option<String>,
    }

    #[test]
    fn test_schema_from_rust_type() {
        let form = FormSchema::of::<SupercellParams>().unwrap();
        let names: Vec<&str> = form.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["poscar_path", "scaling", "wrap", "shape", "comment"]);

        let path = form.field("poscar_path").unwrap();
        assert!(path.required());
        assert_eq!(path.description.as_deref(), Some("Structure file to expand"));
        assert_eq!(form.field("scaling").unwrap().declared, DeclaredType::list(DeclaredType::Int));
        assert_eq!(form.field("wrap").unwrap().default, Some(json!(false)));
        assert_eq!(form.field("shape").unwrap().declared, DeclaredType::choices(["cubic", "hexagonal"]));
        assert_eq!(
            form.field("comment").unwrap().declared,
            DeclaredType::optional(DeclaredType::String)
        );
        assert!(!form.field("comment").unwrap().required());
    }
}
