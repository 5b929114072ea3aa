//! Operations that ship with the server.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::domain::{OperationContext, OperationPort};
use crate::session::SessionFileStore;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListSessionFilesParams {
    /// Glob pattern matched against file names, e.g. `*.vasp`. Empty lists everything.
    pub pattern: Option<String>,
}

/// Lists the session's files, optionally filtered by a glob pattern.
pub struct ListSessionFiles;

#[async_trait]
impl OperationPort for ListSessionFiles {
    async fn invoke(&self, ctx: &OperationContext, kwargs: &Map<String, Value>) -> anyhow::Result<Value> {
        let params: ListSessionFilesParams = serde_json::from_value(Value::Object(kwargs.clone()))?;
        let pattern = match params.pattern.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => glob::Pattern::new(p)?,
            _ => glob::Pattern::new("*")?,
        };

        let store = SessionFileStore::open(&ctx.session_dir)?;
        let paths: Vec<Value> = store
            .list_where(|name| pattern.matches(name))
            .into_iter()
            .map(|name| Value::String(store.path_of(&name).to_string_lossy().into_owned()))
            .collect();

        tracing::debug!("Listed {} session files matching '{}'", paths.len(), pattern);
        Ok(Value::Array(paths))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FormSchema;
    use serde_json::json;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> OperationContext {
        OperationContext {
            session_id: "abcd1234".to_string(),
            session_dir: dir.path().to_path_buf(),
            env: vec![],
        }
    }

    #[test]
    fn test_schema_has_optional_pattern() {
        let schema = FormSchema::of::<ListSessionFilesParams>().unwrap();
        let field = schema.field("pattern").unwrap();
        assert!(!field.required());
        assert_eq!(field.default, Some(Value::Null));
    }

    #[tokio::test]
    async fn test_pattern_filters_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.vasp"), "x").unwrap();
        std::fs::write(dir.path().join("b.cif"), "x").unwrap();

        let mut kwargs = Map::new();
        kwargs.insert("pattern".to_string(), json!("*.vasp"));
        let result = ListSessionFiles.invoke(&context(&dir), &kwargs).await.unwrap();
        assert_eq!(result, json!([dir.path().join("a.vasp").to_string_lossy()]));

        kwargs.insert("pattern".to_string(), Value::Null);
        let result = ListSessionFiles.invoke(&context(&dir), &kwargs).await.unwrap();
        assert_eq!(result.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_bad_pattern_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut kwargs = Map::new();
        kwargs.insert("pattern".to_string(), json!("[unclosed"));
        assert!(ListSessionFiles.invoke(&context(&dir), &kwargs).await.is_err());
    }
}
