//! Wire types shared with the Masgent Web server.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

// ============================================================================
// Catalogue and sessions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OperationSummary {
    pub id: String,
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Category {
    pub name: String,
    pub operations: Vec<OperationSummary>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct CredentialFlags {
    pub gemini: bool,
    pub materials_project: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub directory: String,
    pub files: Vec<String>,
    pub credentials: CredentialFlags,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UiSettings {
    pub sidebar_file_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientConfig {
    pub ui: UiSettings,
    pub chat_model: String,
}

// ============================================================================
// Forms
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadPayload {
    pub name: String,
    pub content_base64: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveMode {
    #[default]
    Existing,
    Upload,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileInput {
    pub selected: Option<String>,
    pub upload: Option<UploadPayload>,
    pub last: ResolveMode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistedInput {
    pub preset: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum WidgetInput {
    Text(String),
    Bool(bool),
    Integer(i64),
    Float(f64),
    Choice(String),
    File(FileInput),
    Assisted(AssistedInput),
}

pub type Interaction = HashMap<String, WidgetInput>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Preset {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Feedback {
    pub valid: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Control {
    Select { options: Vec<String>, selected: usize },
    Toggle,
    Integer { step: i64 },
    Float { step: f64, decimals: usize },
    NumberList { element: String },
    StructuredText { format: String },
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
        #[serde(default)]
        feedback: Option<Feedback>,
    },
    Text { placeholder: String },
    ComplexText,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderedWidget {
    pub field: String,
    pub label: String,
    #[serde(default)]
    pub help: Option<String>,
    pub control: Control,
    pub value: Value,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OptionalGroup {
    pub expanded: bool,
    pub widgets: Vec<RenderedWidget>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderedForm {
    pub required: Vec<RenderedWidget>,
    #[serde(default)]
    pub optional: Option<OptionalGroup>,
    pub state: Map<String, Value>,
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultKind {
    NoOutput,
    File {
        path: String,
        file_name: String,
        #[serde(default)]
        preview: Option<String>,
        downloadable: bool,
    },
    Text { text: String },
    Mapping { entries: Map<String, Value> },
    FileList { paths: Vec<String>, file_names: Vec<String> },
    List { items: Vec<Value> },
    Opaque { value: Value },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DisplayInstructions {
    #[serde(flatten)]
    pub kind: ResultKind,
    #[serde(default)]
    pub notice: Option<Notice>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ElementCount {
    pub symbol: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LatticeParameters {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Visualization {
    pub file_name: String,
    pub format: String,
    pub model: String,
    pub formula: String,
    pub atom_count: usize,
    pub composition: Vec<ElementCount>,
    #[serde(default)]
    pub lattice: Option<LatticeParameters>,
    #[serde(default)]
    pub volume: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VisualizationOutcome {
    Rendered { visualization: Visualization },
    Skipped { notice: Notice },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionReport {
    Invalid { messages: Vec<String> },
    Failed { message: String, detail: String },
    Completed {
        display: DisplayInstructions,
        #[serde(default)]
        visualization: Option<VisualizationOutcome>,
    },
}

// ============================================================================
// Chat
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
    Plan,
    Result,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatLog {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub pending_plan: Option<String>,
}
