//! Text round-trip for list- and mapping-typed fields.
//!
//! Numeric lists use comma-separated numerals; every other list and every
//! mapping uses JSON. Decoding never fails outward: malformed text yields
//! [`Decoded::Fallback`] and the caller keeps the field's default.

use serde::Serialize;
use serde_json::{Map, Number, Value};

use super::normalizer::TypeTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberKind {
    Int,
    Float,
}

/// Text representation chosen for a composite field.
#[derive(Debug, Clone, PartialEq)]
pub enum CompositeKind {
    NumberList(NumberKind),
    StructuredList(TypeTag),
    Map,
}

impl CompositeKind {
    pub fn for_tag(tag: &TypeTag) -> Option<Self> {
        match tag {
            TypeTag::List(item) => Some(match item.as_ref() {
                TypeTag::Int => Self::NumberList(NumberKind::Int),
                TypeTag::Float => Self::NumberList(NumberKind::Float),
                other => Self::StructuredList(other.clone()),
            }),
            TypeTag::Map => Some(Self::Map),
            _ => None,
        }
    }

    /// Value used when the field has no usable default.
    pub fn empty(&self) -> Value {
        match self {
            Self::NumberList(_) | Self::StructuredList(_) => Value::Array(Vec::new()),
            Self::Map => Value::Object(Map::new()),
        }
    }

    /// Whether `value` has the right outer shape for this kind.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::NumberList(_) | Self::StructuredList(_) => value.is_array(),
            Self::Map => value.is_object(),
        }
    }
}

/// Outcome of parsing composite text.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Parsed(Value),
    /// Keep the previous default; `error` is shown next to the raw text.
    Fallback { error: String },
}

impl Decoded {
    pub fn or_default(self, default: &Value) -> Value {
        match self {
            Self::Parsed(value) => value,
            Self::Fallback { .. } => default.clone(),
        }
    }
}

pub fn encode(kind: &CompositeKind, value: &Value) -> String {
    match (kind, value) {
        (CompositeKind::NumberList(number), Value::Array(items)) => items
            .iter()
            .map(|item| encode_number(*number, item))
            .collect::<Vec<_>>()
            .join(", "),
        (CompositeKind::StructuredList(_), Value::Array(_)) => {
            serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string())
        }
        (CompositeKind::Map, Value::Object(_)) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
        }
        _ => encode(kind, &kind.empty()),
    }
}

/// Float elements always print with a fractional part so that integral
/// JSON numbers decode back as the floats they stand for.
fn encode_number(kind: NumberKind, item: &Value) -> String {
    match (kind, item.as_f64()) {
        (NumberKind::Float, Some(f)) => Value::from(f).to_string(),
        _ => item.to_string(),
    }
}

pub fn decode(kind: &CompositeKind, text: &str) -> Decoded {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Decoded::Parsed(kind.empty());
    }

    match kind {
        CompositeKind::NumberList(number) => decode_numbers(*number, trimmed),
        CompositeKind::StructuredList(item) => match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Array(items)) => match items.iter().position(|v| !conforms(item, v)) {
                Some(idx) => Decoded::Fallback {
                    error: format!("Element {} is not a valid {}", idx, tag_name(item)),
                },
                None => Decoded::Parsed(Value::Array(items)),
            },
            Ok(_) => Decoded::Fallback { error: "Expected a JSON list".to_string() },
            Err(e) => Decoded::Fallback { error: format!("Invalid JSON: {}", e) },
        },
        CompositeKind::Map => match serde_json::from_str::<Value>(trimmed) {
            Ok(value @ Value::Object(_)) => Decoded::Parsed(value),
            Ok(_) => Decoded::Fallback { error: "Expected a JSON object".to_string() },
            Err(e) => Decoded::Fallback { error: format!("Invalid JSON: {}", e) },
        },
    }
}

fn decode_numbers(kind: NumberKind, text: &str) -> Decoded {
    let mut values = Vec::new();
    for piece in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let parsed = match kind {
            NumberKind::Int => piece.parse::<i64>().ok().map(Value::from),
            NumberKind::Float => piece
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
        };
        match parsed {
            Some(value) => values.push(value),
            None => {
                let expected = match kind {
                    NumberKind::Int => "an integer",
                    NumberKind::Float => "a number",
                };
                return Decoded::Fallback {
                    error: format!("'{}' is not {}", piece, expected),
                };
            }
        }
    }
    Decoded::Parsed(Value::Array(values))
}

/// Structural check of a decoded element against its list item tag.
fn conforms(tag: &TypeTag, value: &Value) -> bool {
    match tag {
        TypeTag::Bool => value.is_boolean(),
        TypeTag::Int => value.is_i64() || value.is_u64(),
        TypeTag::Float => value.is_number(),
        TypeTag::String => value.is_string(),
        TypeTag::Enum(choices) => choices.contains(value),
        TypeTag::List(item) => value
            .as_array()
            .map_or(false, |items| items.iter().all(|v| conforms(item, v))),
        TypeTag::Map => value.is_object(),
        TypeTag::Complex => true,
    }
}

fn tag_name(tag: &TypeTag) -> &'static str {
    match tag {
        TypeTag::Bool => "boolean",
        TypeTag::Int => "integer",
        TypeTag::Float => "number",
        TypeTag::String => "string",
        TypeTag::Enum(_) => "choice",
        TypeTag::List(_) => "list",
        TypeTag::Map => "object",
        TypeTag::Complex => "value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn int_list() -> CompositeKind {
        CompositeKind::NumberList(NumberKind::Int)
    }

    fn float_list() -> CompositeKind {
        CompositeKind::NumberList(NumberKind::Float)
    }

    #[test]
    fn test_kind_selection() {
        assert_eq!(CompositeKind::for_tag(&TypeTag::List(Box::new(TypeTag::Int))), Some(int_list()));
        assert_eq!(
            CompositeKind::for_tag(&TypeTag::List(Box::new(TypeTag::String))),
            Some(CompositeKind::StructuredList(TypeTag::String))
        );
        assert_eq!(CompositeKind::for_tag(&TypeTag::Map), Some(CompositeKind::Map));
        assert_eq!(CompositeKind::for_tag(&TypeTag::String), None);
    }

    #[test]
    fn test_number_list_encoding() {
        assert_eq!(encode(&int_list(), &json!([2, 2, 1])), "2, 2, 1");
        assert_eq!(encode(&float_list(), &json!([0.5, 1.25])), "0.5, 1.25");
        assert_eq!(encode(&int_list(), &Value::Null), "");
    }

    #[test]
    fn test_round_trips() {
        let cases = [
            (int_list(), json!([1, -2, 3])),
            (float_list(), json!([0.25, 1.5, -3.0])),
            (CompositeKind::StructuredList(TypeTag::String), json!(["Si", "O"])),
            (CompositeKind::StructuredList(TypeTag::List(Box::new(TypeTag::Int))), json!([[1, 0], [0, 1]])),
            (CompositeKind::Map, json!({"ENCUT": 520, "ISMEAR": 0, "nested": {"a": [1, 2]}})),
            (int_list(), json!([])),
            (CompositeKind::Map, json!({})),
        ];
        for (kind, value) in cases {
            let text = encode(&kind, &value);
            assert_eq!(decode(&kind, &text), Decoded::Parsed(value.clone()), "text: {text}");
        }
    }

    #[test]
    fn test_integral_floats_keep_float_form() {
        let text = encode(&float_list(), &json!([0, 0, 1]));
        assert_eq!(text, "0.0, 0.0, 1.0");

        let decoded = decode(&float_list(), &text).or_default(&Value::Null);
        assert_eq!(decoded, json!([0.0, 0.0, 1.0]));
        assert_eq!(encode(&float_list(), &decoded), text);
        assert_eq!(decode(&float_list(), &encode(&float_list(), &decoded)), Decoded::Parsed(decoded));
    }

    #[test]
    fn test_empty_text_is_empty_composite() {
        assert_eq!(decode(&int_list(), "   "), Decoded::Parsed(json!([])));
        assert_eq!(decode(&CompositeKind::StructuredList(TypeTag::String), ""), Decoded::Parsed(json!([])));
        assert_eq!(decode(&CompositeKind::Map, ""), Decoded::Parsed(json!({})));
    }

    #[test]
    fn test_trailing_commas_are_ignored() {
        assert_eq!(decode(&int_list(), "1, 2,"), Decoded::Parsed(json!([1, 2])));
    }

    #[test]
    fn test_malformed_text_falls_back() {
        let default = json!([4, 4, 4]);
        let decoded = decode(&int_list(), "4, four, 4");
        assert!(matches!(decoded, Decoded::Fallback { ref error } if error.contains("four")));
        assert_eq!(decoded.or_default(&default), default);

        assert!(matches!(decode(&int_list(), "1.5"), Decoded::Fallback { .. }));
        assert!(matches!(decode(&CompositeKind::Map, "{\"a\": "), Decoded::Fallback { .. }));
        assert!(matches!(decode(&CompositeKind::Map, "[1]"), Decoded::Fallback { .. }));
        assert!(matches!(
            decode(&CompositeKind::StructuredList(TypeTag::String), "[\"a\", 2]"),
            Decoded::Fallback { .. }
        ));
    }
}
