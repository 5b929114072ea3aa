//! Widget selection: one control per field, chosen by normalized type tag.
//!
//! Each call renders a descriptor the browser draws and returns the raw
//! value the control currently holds. Browser input arrives as a
//! [`WidgetInput`] keyed by field name; an input of the wrong kind for the
//! chosen control is ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::HashMap;

use super::assist::{AssistRegistry, Feedback, FieldAssist, Preset};
use super::composite::{self, CompositeKind, Decoded, NumberKind};
use super::normalizer::{normalize, TypeTag};
use super::resolver::{FileInput, FileResolver, ResolveMode};
use super::{field_label, FormPolicy, Notice};
use crate::domain::SchemaField;

/// Raw input from one browser control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum WidgetInput {
    Text(String),
    Bool(bool),
    Integer(i64),
    Float(f64),
    /// Label of the selected option.
    Choice(String),
    File(FileInput),
    Assisted(AssistedInput),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistedInput {
    /// Preset label; `None` is "(none)".
    #[serde(default)]
    pub preset: Option<String>,
    /// Text typed by the user, if any.
    #[serde(default)]
    pub text: Option<String>,
}

/// All browser inputs of one form, keyed by field name.
pub type Interaction = HashMap<String, WidgetInput>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredFormat {
    List,
    Map,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Control {
    Select {
        options: Vec<String>,
        selected: usize,
    },
    Toggle,
    Integer {
        step: i64,
    },
    Float {
        step: f64,
        decimals: usize,
    },
    NumberList {
        element: NumberKind,
    },
    StructuredText {
        format: StructuredFormat,
    },
    FilePicker {
        existing: Vec<String>,
        selected: Option<String>,
        mode: ResolveMode,
    },
    AssistedText {
        presets: Vec<Preset>,
        preset: Option<String>,
        format: String,
        hint: String,
        placeholder: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        feedback: Option<Feedback>,
    },
    Text {
        placeholder: String,
    },
    ComplexText,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedWidget {
    pub field: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    pub control: Control,
    /// Raw value the control contributes to the form state.
    pub value: Value,
    /// Text shown in text-like controls, kept verbatim even when it does not parse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
}

pub struct WidgetSelector<'a> {
    policy: &'a FormPolicy,
    assists: &'a AssistRegistry,
    files: FileResolver<'a>,
}

impl<'a> WidgetSelector<'a> {
    pub fn new(policy: &'a FormPolicy, assists: &'a AssistRegistry, files: FileResolver<'a>) -> Self {
        Self { policy, assists, files }
    }

    pub fn render(&self, field: &SchemaField, input: Option<&WidgetInput>) -> RenderedWidget {
        let label = field_label(&field.name);
        let widget = RenderedWidget {
            field: field.name.clone(),
            label,
            help: field.description.clone(),
            control: Control::ComplexText,
            value: Value::Null,
            text: None,
            notices: Vec::new(),
        };

        match normalize(field).tag {
            TypeTag::Enum(choices) => render_choice(widget, field, &choices, input),
            TypeTag::Bool => render_toggle(widget, field, input),
            TypeTag::Int => render_integer(widget, field, input),
            TypeTag::Float => render_float(widget, field, input),
            tag @ (TypeTag::List(_) | TypeTag::Map) => match CompositeKind::for_tag(&tag) {
                Some(kind) => render_composite(widget, field, &kind, input),
                None => render_complex(widget, field, input),
            },
            TypeTag::String => {
                if self.policy.is_path_field(&field.name) {
                    self.render_file(widget, field, input)
                } else if let Some(assist) = self.assists.get(&field.name) {
                    render_assisted(widget, field, assist, input)
                } else {
                    render_text(widget, field, input)
                }
            }
            TypeTag::Complex => render_complex(widget, field, input),
        }
    }

    fn render_file(&self, mut widget: RenderedWidget, field: &SchemaField, input: Option<&WidgetInput>) -> RenderedWidget {
        let file_input = match input {
            Some(WidgetInput::File(file)) => Some(file),
            other => {
                ignore_mismatch(field, other);
                None
            }
        };
        let resolution = self.files.resolve(field, file_input);
        widget.control = Control::FilePicker {
            existing: resolution.existing,
            selected: resolution.selected,
            mode: resolution.mode,
        };
        widget.value = Value::String(resolution.value);
        widget.notices = resolution.notices;
        widget
    }
}

fn ignore_mismatch(field: &SchemaField, input: Option<&WidgetInput>) {
    if let Some(input) = input {
        tracing::debug!(field = %field.name, ?input, "Ignoring input of the wrong kind");
    }
}

fn choice_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_choice(mut widget: RenderedWidget, field: &SchemaField, choices: &[Value], input: Option<&WidgetInput>) -> RenderedWidget {
    let options: Vec<String> = choices.iter().map(choice_label).collect();
    let initial = field
        .default
        .as_ref()
        .and_then(|d| choices.iter().position(|c| c == d))
        .unwrap_or(0);

    let selected = match input {
        Some(WidgetInput::Choice(label)) => options.iter().position(|o| o == label).unwrap_or(initial),
        other => {
            ignore_mismatch(field, other);
            initial
        }
    };

    widget.value = choices.get(selected).cloned().unwrap_or(Value::Null);
    widget.control = Control::Select { options, selected };
    widget
}

fn render_toggle(mut widget: RenderedWidget, field: &SchemaField, input: Option<&WidgetInput>) -> RenderedWidget {
    let value = match input {
        Some(WidgetInput::Bool(b)) => *b,
        other => {
            ignore_mismatch(field, other);
            field.default.as_ref().and_then(Value::as_bool).unwrap_or(false)
        }
    };
    widget.control = Control::Toggle;
    widget.value = Value::Bool(value);
    widget
}

fn render_integer(mut widget: RenderedWidget, field: &SchemaField, input: Option<&WidgetInput>) -> RenderedWidget {
    let default = field
        .default
        .as_ref()
        .and_then(|d| d.as_i64().or_else(|| d.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)))
        .unwrap_or(0);
    let value = match input {
        Some(WidgetInput::Integer(i)) => *i,
        other => {
            ignore_mismatch(field, other);
            default
        }
    };
    widget.control = Control::Integer { step: 1 };
    widget.value = Value::from(value);
    widget
}

fn render_float(mut widget: RenderedWidget, field: &SchemaField, input: Option<&WidgetInput>) -> RenderedWidget {
    let default = field.default.as_ref().and_then(Value::as_f64).unwrap_or(0.0);
    let value = match input {
        Some(WidgetInput::Float(f)) if f.is_finite() => *f,
        Some(WidgetInput::Integer(i)) => *i as f64,
        other => {
            ignore_mismatch(field, other);
            default
        }
    };
    widget.control = Control::Float { step: 0.01, decimals: 4 };
    widget.text = Some(format!("{:.4}", value));
    widget.value = Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null);
    widget
}

fn render_composite(mut widget: RenderedWidget, field: &SchemaField, kind: &CompositeKind, input: Option<&WidgetInput>) -> RenderedWidget {
    let default = field
        .default_value()
        .filter(|d| kind.accepts(d))
        .unwrap_or_else(|| kind.empty());

    widget.control = match kind {
        CompositeKind::NumberList(element) => Control::NumberList { element: *element },
        CompositeKind::StructuredList(_) => Control::StructuredText { format: StructuredFormat::List },
        CompositeKind::Map => Control::StructuredText { format: StructuredFormat::Map },
    };

    match input {
        Some(WidgetInput::Text(text)) => {
            match composite::decode(kind, text) {
                Decoded::Parsed(value) => widget.value = value,
                Decoded::Fallback { error } => {
                    tracing::debug!(field = %field.name, %error, "Composite text did not parse, keeping default");
                    widget.notices.push(Notice::error(error));
                    widget.value = default;
                }
            }
            widget.text = Some(text.clone());
        }
        other => {
            ignore_mismatch(field, other);
            widget.text = Some(composite::encode(kind, &default));
            widget.value = default;
        }
    }
    widget
}

fn string_default(field: &SchemaField) -> String {
    match &field.default {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

fn placeholder(label: &str) -> String {
    format!("Enter {}...", label.to_lowercase())
}

fn render_assisted(mut widget: RenderedWidget, field: &SchemaField, assist: &FieldAssist, input: Option<&WidgetInput>) -> RenderedWidget {
    let assisted = match input {
        Some(WidgetInput::Assisted(assisted)) => assisted.clone(),
        Some(WidgetInput::Text(text)) => AssistedInput { preset: None, text: Some(text.clone()) },
        other => {
            ignore_mismatch(field, other);
            AssistedInput::default()
        }
    };

    let preset = assisted
        .preset
        .filter(|label| assist.preset_value(label).is_some());
    let text = assisted
        .text
        .or_else(|| preset.as_deref().and_then(|l| assist.preset_value(l)).map(str::to_string))
        .unwrap_or_else(|| string_default(field));

    widget.control = Control::AssistedText {
        presets: assist.presets.clone(),
        preset,
        format: assist.format.clone(),
        hint: assist.hint.clone(),
        placeholder: placeholder(&widget.label),
        feedback: assist.check(&text),
    };
    widget.text = Some(text.clone());
    widget.value = Value::String(text);
    widget
}

fn render_text(mut widget: RenderedWidget, field: &SchemaField, input: Option<&WidgetInput>) -> RenderedWidget {
    let text = match input {
        Some(WidgetInput::Text(text)) => text.clone(),
        other => {
            ignore_mismatch(field, other);
            string_default(field)
        }
    };
    widget.control = Control::Text { placeholder: placeholder(&widget.label) };
    widget.text = Some(text.clone());
    widget.value = Value::String(text);
    widget
}

fn render_complex(mut widget: RenderedWidget, field: &SchemaField, input: Option<&WidgetInput>) -> RenderedWidget {
    let text = match input {
        Some(WidgetInput::Text(text)) => text.clone(),
        other => {
            ignore_mismatch(field, other);
            match &field.default {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            }
        }
    };
    widget.label = format!("{} (Complex Type)", widget.label);
    widget.control = Control::ComplexText;
    widget.text = Some(text.clone());
    widget.value = Value::String(text);
    widget
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DeclaredType;
    use crate::session::SessionFileStore;
    use serde_json::json;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        store: SessionFileStore,
        policy: FormPolicy,
        assists: AssistRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let store = SessionFileStore::open(temp.path()).unwrap();
            Self {
                _temp: temp,
                store,
                policy: FormPolicy::default(),
                assists: AssistRegistry::builtin(),
            }
        }

        fn render(&self, field: &SchemaField, input: Option<WidgetInput>) -> RenderedWidget {
            let selector = WidgetSelector::new(&self.policy, &self.assists, FileResolver::new(&self.store));
            selector.render(field, input.as_ref())
        }
    }

    #[test]
    fn test_enum_uses_default_or_first_choice() {
        let fx = Fixture::new();
        let field = SchemaField::new("mode", DeclaredType::choices(["relax", "static", "md"]));
        let widget = fx.render(&field, None);
        assert_eq!(widget.value, json!("relax"));

        let widget = fx.render(&field.clone().with_default("md"), None);
        assert_eq!(widget.value, json!("md"));
        assert_eq!(widget.control, Control::Select { options: vec!["relax".into(), "static".into(), "md".into()], selected: 2 });

        let widget = fx.render(&field.clone().with_default("unknown"), None);
        assert_eq!(widget.value, json!("relax"));

        let widget = fx.render(&field, Some(WidgetInput::Choice("static".into())));
        assert_eq!(widget.value, json!("static"));
    }

    #[test]
    fn test_non_string_choices_keep_their_values() {
        let fx = Fixture::new();
        let field = SchemaField::new("ismear", DeclaredType::choices([json!(-5), json!(0), json!(1)]));
        let widget = fx.render(&field, Some(WidgetInput::Choice("0".into())));
        assert_eq!(widget.value, json!(0));
    }

    #[test]
    fn test_scalar_defaults() {
        let fx = Fixture::new();
        assert_eq!(fx.render(&SchemaField::new("wrap", DeclaredType::Bool), None).value, json!(false));
        assert_eq!(fx.render(&SchemaField::new("steps", DeclaredType::Int), None).value, json!(0));
        assert_eq!(fx.render(&SchemaField::new("steps", DeclaredType::Int).with_default(50), None).value, json!(50));

        let float = fx.render(&SchemaField::new("fmax", DeclaredType::Float).with_default(0.05), None);
        assert_eq!(float.value, json!(0.05));
        assert_eq!(float.text.as_deref(), Some("0.0500"));
        assert_eq!(float.control, Control::Float { step: 0.01, decimals: 4 });
    }

    #[test]
    fn test_float_int_union_renders_as_float() {
        let fx = Fixture::new();
        let field = SchemaField::new(
            "lattice_constant",
            DeclaredType::Union(vec![DeclaredType::Float, DeclaredType::Int]),
        )
        .with_default(5);
        let widget = fx.render(&field, None);
        assert_eq!(widget.value, json!(5.0));
        assert!(matches!(widget.control, Control::Float { .. }));
    }

    #[test]
    fn test_number_list_widget() {
        let fx = Fixture::new();
        let field = SchemaField::new("kpts", DeclaredType::list(DeclaredType::Int)).with_default(json!([4, 4, 4]));
        let widget = fx.render(&field, None);
        assert_eq!(widget.text.as_deref(), Some("4, 4, 4"));
        assert_eq!(widget.value, json!([4, 4, 4]));

        let widget = fx.render(&field, Some(WidgetInput::Text("8, 8, 2".into())));
        assert_eq!(widget.value, json!([8, 8, 2]));
    }

    #[test]
    fn test_malformed_composite_keeps_default_and_text() {
        let fx = Fixture::new();
        let field = SchemaField::new("incar", DeclaredType::map(DeclaredType::Any)).with_default(json!({"ENCUT": 400}));
        let widget = fx.render(&field, Some(WidgetInput::Text("{\"ENCUT\": ".into())));
        assert_eq!(widget.value, json!({"ENCUT": 400}));
        assert_eq!(widget.text.as_deref(), Some("{\"ENCUT\": "));
        assert_eq!(widget.notices.len(), 1);
    }

    #[test]
    fn test_path_field_uses_file_picker() {
        let fx = Fixture::new();
        fx.store.persist("POSCAR", b"x").unwrap();
        let field = SchemaField::new("poscar_path", DeclaredType::String);
        let widget = fx.render(
            &field,
            Some(WidgetInput::File(FileInput { selected: Some("POSCAR".into()), ..Default::default() })),
        );
        assert!(matches!(widget.control, Control::FilePicker { ref existing, .. } if existing == &vec!["POSCAR".to_string()]));
        assert_eq!(widget.value, json!(fx.store.path_of("POSCAR").to_string_lossy()));
    }

    #[test]
    fn test_assisted_precedence() {
        let fx = Fixture::new();
        let field = SchemaField::new("formula", DeclaredType::String).with_default("Si");

        assert_eq!(fx.render(&field, None).value, json!("Si"));

        let preset = AssistedInput { preset: Some("Perovskite".into()), text: None };
        assert_eq!(fx.render(&field, Some(WidgetInput::Assisted(preset))).value, json!("SrTiO3"));

        let typed = AssistedInput { preset: Some("Perovskite".into()), text: Some("nacl".into()) };
        let widget = fx.render(&field, Some(WidgetInput::Assisted(typed)));
        assert_eq!(widget.value, json!("nacl"));
        match widget.control {
            Control::AssistedText { feedback: Some(feedback), .. } => assert!(!feedback.valid),
            other => panic!("unexpected control {other:?}"),
        }
    }

    #[test]
    fn test_plain_text_placeholder() {
        let fx = Fixture::new();
        let widget = fx.render(&SchemaField::new("job_name", DeclaredType::String), None);
        assert_eq!(widget.control, Control::Text { placeholder: "Enter job name...".into() });
        assert_eq!(widget.value, json!(""));
    }

    #[test]
    fn test_complex_fallback() {
        let fx = Fixture::new();
        let field = SchemaField::new(
            "magmom",
            DeclaredType::Union(vec![DeclaredType::Float, DeclaredType::list(DeclaredType::Float)]),
        )
        .with_default(json!([1.0, -1.0]));
        let widget = fx.render(&field, None);
        assert_eq!(widget.label, "Magmom (Complex Type)");
        assert_eq!(widget.value, json!("[1.0,-1.0]"));
    }

    #[test]
    fn test_mismatched_input_is_ignored() {
        let fx = Fixture::new();
        let field = SchemaField::new("steps", DeclaredType::Int).with_default(3);
        assert_eq!(fx.render(&field, Some(WidgetInput::Text("10".into()))).value, json!(3));
    }
}
