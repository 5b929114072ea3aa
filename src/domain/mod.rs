use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub mod json_schema;
pub mod path;
pub mod schema;

pub use path::{FieldPath, PathSegment};
pub use schema::{DeclaredType, DefaultFactory, FormSchema, SchemaError, SchemaField};

/// Everything an operation may know about the session it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationContext {
    pub session_id: String,
    pub session_dir: PathBuf,
    /// Variables exported to collaborator tooling for this invocation only.
    pub env: Vec<(String, String)>,
}

impl OperationContext {
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// An external parameterized operation, called with validated keyword arguments.
#[async_trait]
pub trait OperationPort: Send + Sync {
    async fn invoke(&self, ctx: &OperationContext, kwargs: &Map<String, Value>) -> anyhow::Result<Value>;
}

/// Text-in/text-out conversational collaborator used by chat mode.
#[async_trait]
pub trait ResponderPort: Send + Sync {
    async fn respond(&self, text: &str) -> anyhow::Result<String>;

    /// Forget any conversation the responder keeps.
    async fn reset(&self) {}
}

/// Builds a session's responder from its API key.
pub trait ResponderFactory: Send + Sync {
    fn create(&self, api_key: String) -> Arc<dyn ResponderPort>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Visualization {
    pub file_name: String,
    /// Model format understood by the browser viewer (e.g. "xyz").
    pub format: String,
    pub model: String,
    pub formula: String,
    pub atom_count: usize,
    /// Element counts sorted by symbol.
    pub composition: Vec<ElementCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lattice: Option<LatticeParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ElementCount {
    pub symbol: String,
    pub count: usize,
}

/// Cell lengths in Å and angles in degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LatticeParameters {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

#[derive(Debug, Error)]
pub enum VisualizerError {
    #[error("Visualization unavailable: {0}")]
    Unavailable(String),

    #[error("Error visualizing structure: {0}")]
    Failed(String),
}

/// Structure renderer invoked with a resolved, existing path.
#[async_trait]
pub trait VisualizerPort: Send + Sync {
    async fn render(&self, path: &Path) -> Result<Visualization, VisualizerError>;
}
