//! Ordered catalogue of the operations a session can run.

use anyhow::Context;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::adapters::builtin_operations::{ListSessionFiles, ListSessionFilesParams};
use crate::adapters::command_operation::CommandOperation;
use crate::config::OperationConfig;
use crate::domain::{DeclaredType, FormSchema, OperationPort};

pub struct Operation {
    pub id: String,
    pub title: String,
    pub category: String,
    pub icon: Option<String>,
    pub description: String,
    pub schema: FormSchema,
    pub port: Arc<dyn OperationPort>,
}

impl Operation {
    pub fn summary(&self) -> OperationSummary {
        OperationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            category: self.category.clone(),
            icon: self.icon.clone(),
            description: self.description.clone(),
        }
    }

    pub fn detail(&self) -> OperationDetail {
        OperationDetail {
            summary: self.summary(),
            fields: self
                .schema
                .fields()
                .iter()
                .map(|f| FieldDescriptor {
                    name: f.name.clone(),
                    declared: f.declared.clone(),
                    type_name: f.declared.to_string(),
                    required: f.required(),
                    default: f.default_value(),
                    description: f.description.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationSummary {
    pub id: String,
    pub title: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub declared: DeclaredType,
    /// Declared type as written in messages, e.g. `list[int]`.
    pub type_name: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationDetail {
    #[serde(flatten)]
    pub summary: OperationSummary,
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub name: String,
    pub operations: Vec<OperationSummary>,
}

#[derive(Default)]
pub struct OperationRegistry {
    operations: Vec<Arc<Operation>>,
    index: HashMap<String, usize>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in operations followed by the configured command operations.
    pub fn from_config(configs: &[OperationConfig]) -> anyhow::Result<Self> {
        let mut registry = Self::new();
        registry.register_builtins()?;
        for config in configs {
            let schema = FormSchema::from_json_schema(&config.input_schema)
                .with_context(|| format!("Invalid input schema for operation '{}'", config.id))?;
            registry.register(Operation {
                id: config.id.clone(),
                title: config.title.clone(),
                category: config.category.clone(),
                icon: config.icon.clone(),
                description: config.description.clone(),
                schema,
                port: Arc::new(CommandOperation::from_config(&config.command)),
            })?;
        }
        tracing::info!("Registered {} operations", registry.len());
        Ok(registry)
    }

    pub fn register_builtins(&mut self) -> anyhow::Result<()> {
        self.register(Operation {
            id: "list_session_files".to_string(),
            title: "List Session Files".to_string(),
            category: "Session".to_string(),
            icon: Some("📁".to_string()),
            description: "List the files in this session, optionally filtered by a glob pattern.".to_string(),
            schema: FormSchema::of::<ListSessionFilesParams>()?,
            port: Arc::new(ListSessionFiles),
        })
    }

    pub fn register(&mut self, operation: Operation) -> anyhow::Result<()> {
        if self.index.contains_key(&operation.id) {
            anyhow::bail!("Duplicate operation id: {}", operation.id);
        }
        self.index.insert(operation.id.clone(), self.operations.len());
        self.operations.push(Arc::new(operation));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<Operation>> {
        self.index.get(id).map(|&i| self.operations[i].clone())
    }

    /// Categories in order of first appearance, operations in registration order.
    pub fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = Vec::new();
        for operation in &self.operations {
            match categories.iter_mut().find(|c| c.name == operation.category) {
                Some(category) => category.operations.push(operation.summary()),
                None => categories.push(Category {
                    name: operation.category.clone(),
                    operations: vec![operation.summary()],
                }),
            }
        }
        categories
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommandConfig;
    use serde_json::json;

    fn config(id: &str, category: &str) -> OperationConfig {
        OperationConfig {
            id: id.to_string(),
            title: id.to_uppercase(),
            category: category.to_string(),
            icon: None,
            description: String::new(),
            input_schema: json!({
                "type": "object",
                "properties": {"formula": {"type": "string"}},
                "required": ["formula"]
            }),
            command: CommandConfig {
                program: "masgent-tool".to_string(),
                args: vec![],
            },
        }
    }

    #[test]
    fn test_categories_keep_first_appearance_order() {
        let registry = OperationRegistry::from_config(&[
            config("generate_structure", "Structure"),
            config("vasp_inputs", "VASP"),
            config("supercell", "Structure"),
        ])
        .unwrap();

        let categories = registry.categories();
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Session", "Structure", "VASP"]);
        let ids: Vec<&str> = categories[1].operations.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["generate_structure", "supercell"]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = OperationRegistry::from_config(&[config("list_session_files", "X")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_detail_describes_fields() {
        let registry = OperationRegistry::from_config(&[config("generate_structure", "Structure")]).unwrap();
        let detail = registry.get("generate_structure").unwrap().detail();
        assert_eq!(detail.fields.len(), 1);
        assert_eq!(detail.fields[0].type_name, "str");
        assert!(detail.fields[0].required);
        assert!(registry.get("missing").is_none());
    }
}
