//! Form assembly: render every field once, split required from optional,
//! and collect the filled values into a [`FormState`].

use serde::Serialize;
use serde_json::{Map, Value};

use super::assist::AssistRegistry;
use super::resolver::FileResolver;
use super::widget::{Interaction, RenderedWidget, WidgetSelector};
use super::FormPolicy;
use crate::domain::FormSchema;
use crate::session::SessionFileStore;

/// Field name → raw widget value, holding only filled values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormState(Map<String, Value>);

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` unless it is null or the empty string.
    pub fn insert_filled(&mut self, name: &str, value: Value) -> bool {
        if is_filled(&value) {
            self.0.insert(name.to_string(), value);
            true
        } else {
            false
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionalGroup {
    /// The group is drawn collapsed.
    pub expanded: bool,
    pub widgets: Vec<RenderedWidget>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedForm {
    pub required: Vec<RenderedWidget>,
    /// Absent when the schema has no optional fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional: Option<OptionalGroup>,
    pub state: FormState,
}

impl RenderedForm {
    /// All widgets in declaration order within each group.
    pub fn widgets(&self) -> impl Iterator<Item = &RenderedWidget> {
        self.required
            .iter()
            .chain(self.optional.iter().flat_map(|g| g.widgets.iter()))
    }

    pub fn widget(&self, field: &str) -> Option<&RenderedWidget> {
        self.widgets().find(|w| w.field == field)
    }
}

pub struct FormAssembler<'a> {
    policy: &'a FormPolicy,
    assists: &'a AssistRegistry,
    store: &'a SessionFileStore,
}

impl<'a> FormAssembler<'a> {
    pub fn new(policy: &'a FormPolicy, assists: &'a AssistRegistry, store: &'a SessionFileStore) -> Self {
        Self { policy, assists, store }
    }

    pub fn assemble(&self, schema: &FormSchema, interaction: &Interaction) -> RenderedForm {
        let selector = WidgetSelector::new(self.policy, self.assists, FileResolver::new(self.store));
        let mut state = FormState::new();
        let mut required = Vec::new();
        let mut optional_widgets = Vec::new();

        for field in schema.fields() {
            let widget = selector.render(field, interaction.get(&field.name));
            state.insert_filled(&field.name, widget.value.clone());
            if field.required() {
                required.push(widget);
            } else {
                optional_widgets.push(widget);
            }
        }

        let optional = (!optional_widgets.is_empty()).then(|| OptionalGroup {
            expanded: false,
            widgets: optional_widgets,
        });

        tracing::debug!(
            fields = schema.len(),
            filled = state.len(),
            "Assembled form"
        );

        RenderedForm { required, optional, state }
    }
}
