use std::collections::HashMap;
use thiserror::Error;

use crate::config::{OperationConfig, ServerSettings, SessionSettings, Settings};
use crate::domain::{DeclaredType, FormSchema};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Duplicate entry: {0}")]
    Duplicate(String),
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_server(&settings.server) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_sessions(&settings.sessions) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_operations(&settings.operations) {
            errors.extend(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(server: &ServerSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if server.host.is_empty() {
            errors.push(ValidationError::MissingField("server.host".to_string()));
        }

        if server.port == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_sessions(sessions: &SessionSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if sessions.root_dir.as_os_str().is_empty() {
            errors.push(ValidationError::MissingField("sessions.root_dir".to_string()));
        }

        if !(4..=32).contains(&sessions.id_length) {
            errors.push(ValidationError::InvalidValue {
                field: "sessions.id_length".to_string(),
                reason: format!("Must be between 4 and 32, got {}", sessions.id_length),
            });
        }

        if sessions.dir_env_var.is_empty() {
            errors.push(ValidationError::MissingField("sessions.dir_env_var".to_string()));
        }

        if sessions.max_upload_bytes == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "sessions.max_upload_bytes".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_operations(operations: &[OperationConfig]) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut seen_ids = HashMap::new();

        for (idx, operation) in operations.iter().enumerate() {
            if let Some(prev_idx) = seen_ids.insert(&operation.id, idx) {
                errors.push(ValidationError::Duplicate(format!(
                    "Operation id '{}' appears at indices {} and {}",
                    operation.id, prev_idx, idx
                )));
            }

            if operation.id.is_empty() {
                errors.push(ValidationError::MissingField(format!("operations[{}].id", idx)));
            } else if !operation
                .id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            {
                errors.push(ValidationError::InvalidValue {
                    field: format!("operations[{}].id", idx),
                    reason: "Only letters, digits, '_' and '-' are allowed".to_string(),
                });
            }

            if operation.title.is_empty() {
                errors.push(ValidationError::MissingField(format!("operations[{}].title", idx)));
            }

            if operation.category.is_empty() {
                errors.push(ValidationError::MissingField(format!("operations[{}].category", idx)));
            }

            if operation.command.program.is_empty() {
                errors.push(ValidationError::MissingField(format!(
                    "operations[{}].command.program",
                    idx
                )));
            }

            match FormSchema::from_json_schema(&operation.input_schema) {
                Ok(schema) => {
                    for field in schema.fields() {
                        if has_empty_choices(&field.declared) {
                            errors.push(ValidationError::InvalidValue {
                                field: format!("operations[{}].input_schema.{}", idx, field.name),
                                reason: "Enum must have at least one choice".to_string(),
                            });
                        }
                    }
                }
                Err(e) => errors.push(ValidationError::InvalidValue {
                    field: format!("operations[{}].input_schema", idx),
                    reason: e.to_string(),
                }),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn has_empty_choices(declared: &DeclaredType) -> bool {
    match declared {
        DeclaredType::Enum(choices) => choices.is_empty(),
        DeclaredType::List(inner) | DeclaredType::Map(inner) | DeclaredType::Optional(inner) => has_empty_choices(inner),
        DeclaredType::Union(members) => members.iter().any(has_empty_choices),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChatSettings, CommandConfig, UiSettings};
    use crate::engine::FormPolicy;
    use serde_json::json;

    fn operation(id: &str) -> OperationConfig {
        OperationConfig {
            id: id.to_string(),
            title: "Generate Supercell".to_string(),
            category: "Structure".to_string(),
            icon: None,
            description: String::new(),
            input_schema: json!({
                "type": "object",
                "properties": {"poscar_path": {"type": "string"}},
                "required": ["poscar_path"]
            }),
            command: CommandConfig {
                program: "masgent-tool".to_string(),
                args: vec!["supercell".to_string()],
            },
        }
    }

    fn settings(operations: Vec<OperationConfig>) -> Settings {
        Settings {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            sessions: SessionSettings::default(),
            display: FormPolicy::default(),
            ui: UiSettings::default(),
            chat: ChatSettings::default(),
            operations,
        }
    }

    #[test]
    fn test_valid_settings() {
        assert!(ConfigValidator::validate(&settings(vec![operation("supercell")])).is_ok());
    }

    #[test]
    fn test_server_and_session_errors() {
        let mut s = settings(vec![]);
        s.server.host.clear();
        s.server.port = 0;
        s.sessions.id_length = 2;
        s.sessions.max_upload_bytes = 0;

        let errors = ConfigValidator::validate(&s).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingField(f) if f == "server.host")));
    }

    #[test]
    fn test_duplicate_operation_ids() {
        let errors = ConfigValidator::validate(&settings(vec![operation("supercell"), operation("supercell")])).unwrap_err();
        assert!(matches!(&errors[0], ValidationError::Duplicate(msg) if msg.contains("supercell")));
    }

    #[test]
    fn test_operation_field_errors() {
        let mut op = operation("bad id");
        op.title.clear();
        op.command.program.clear();
        let errors = ConfigValidator::validate(&settings(vec![op])).unwrap_err();
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert!(messages.iter().any(|m| m.contains("operations[0].id")));
        assert!(messages.iter().any(|m| m.contains("operations[0].title")));
        assert!(messages.iter().any(|m| m.contains("operations[0].command.program")));
    }

    #[test]
    fn test_schema_problems() {
        let mut unresolved = operation("a");
        unresolved.input_schema = json!({"type": "object", "properties": {"x": {"$ref": "#/$defs/Missing"}}});
        let mut empty_enum = operation("b");
        empty_enum.input_schema = json!({"type": "object", "properties": {"mode": {"enum": []}}, "required": ["mode"]});

        let errors = ConfigValidator::validate(&settings(vec![unresolved, empty_enum])).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[1].to_string().contains("operations[1].input_schema.mode"));
    }
}
