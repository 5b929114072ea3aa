use config::{Config, File};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub mod validator;

use crate::cli::Cli;
use crate::engine::FormPolicy;
use crate::session::{ChatScript, ConfirmationPolicy};

#[derive(Debug, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub sessions: SessionSettings,
    /// Keyword and extension sets used by the form engine.
    #[serde(default)]
    pub display: FormPolicy,
    #[serde(default)]
    pub ui: UiSettings,
    #[serde(default)]
    pub chat: ChatSettings,
    #[serde(default)]
    pub operations: Vec<OperationConfig>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionSettings {
    /// Parent directory of all session stores.
    #[serde(default = "default_sessions_root")]
    pub root_dir: PathBuf,
    /// Length of generated session ids.
    #[serde(default = "default_id_length")]
    pub id_length: usize,
    /// Variable through which operations learn the session directory.
    #[serde(default = "default_dir_env_var")]
    pub dir_env_var: String,
    /// Largest request body the API accepts. Uploads arrive base64 encoded
    /// inside JSON, so this bounds a file at roughly three quarters of it.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Seconds a session may sit untouched before its in-memory context
    /// is dropped. Files stay on disk. Zero keeps sessions forever.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

fn default_sessions_root() -> PathBuf {
    PathBuf::from("masgent_sessions")
}

fn default_id_length() -> usize {
    8
}

fn default_dir_env_var() -> String {
    "MASGENT_SESSION_RUNS_DIR".to_string()
}

fn default_max_upload_bytes() -> usize {
    64 * 1024 * 1024
}

fn default_idle_timeout_secs() -> u64 {
    24 * 60 * 60
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            root_dir: default_sessions_root(),
            id_length: default_id_length(),
            dir_env_var: default_dir_env_var(),
            max_upload_bytes: default_max_upload_bytes(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UiSettings {
    /// Session files listed in the sidebar before "... and N more".
    #[serde(default = "default_sidebar_file_limit")]
    pub sidebar_file_limit: usize,
}

fn default_sidebar_file_limit() -> usize {
    10
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            sidebar_file_limit: default_sidebar_file_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChatSettings {
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_template")]
    pub request_template: String,
    /// Words marking a reply as a plan awaiting confirmation.
    #[serde(default = "default_confirmation_keywords")]
    pub confirmation_keywords: Vec<String>,
    #[serde(default = "default_confirm_message")]
    pub confirm_message: String,
    #[serde(default = "default_execute_instruction")]
    pub execute_instruction: String,
    #[serde(default = "default_cancel_message")]
    pub cancel_message: String,
}

fn default_chat_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_request_template() -> String {
    crate::session::chat::DEFAULT_REQUEST_TEMPLATE.to_string()
}

fn default_confirmation_keywords() -> Vec<String> {
    ["confirm", "proceed", "execute", "plan"]
        .map(String::from)
        .to_vec()
}

fn default_confirm_message() -> String {
    ChatScript::default().confirm_message
}

fn default_execute_instruction() -> String {
    ChatScript::default().execute_instruction
}

fn default_cancel_message() -> String {
    ChatScript::default().cancel_message
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: default_chat_model(),
            base_url: default_gemini_base_url(),
            request_template: default_request_template(),
            confirmation_keywords: default_confirmation_keywords(),
            confirm_message: default_confirm_message(),
            execute_instruction: default_execute_instruction(),
            cancel_message: default_cancel_message(),
        }
    }
}

impl ChatSettings {
    pub fn script(&self) -> ChatScript {
        ChatScript {
            request_template: self.request_template.clone(),
            confirm_message: self.confirm_message.clone(),
            execute_instruction: self.execute_instruction.clone(),
            cancel_message: self.cancel_message.clone(),
            policy: ConfirmationPolicy::new(self.confirmation_keywords.iter().cloned()),
        }
    }
}

/// An operation backed by an external program.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OperationConfig {
    /// URL-safe identifier, unique across all operations.
    pub id: String,
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: String,
    /// JSON Schema of the keyword arguments.
    #[serde(default = "default_input_schema")]
    pub input_schema: Value,
    pub command: CommandConfig,
}

fn default_input_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {}
    })
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Settings {
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::from_root(".")
    }

    /// Create settings from CLI arguments (config file, then CLI and env overrides)
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let root = cli
            .config
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        let mut settings = Self::load(&cli.config)?;
        settings.apply_cli_overrides(cli);
        settings.load_external_configs(&root)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load `<root>/masgent-web.toml` (optional) and `<root>/config/operations/*`.
    pub fn from_root(root: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let root = root.as_ref();
        let mut settings = Self::load(&root.join("masgent-web.toml"))?;
        settings.load_external_configs(root)?;
        settings.validate()?;
        Ok(settings)
    }

    fn load(config_path: &Path) -> Result<Self, anyhow::Error> {
        let s = Config::builder()
            .add_source(File::from(config_path.to_path_buf()).required(false))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .build()?;

        Ok(s.try_deserialize()?)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        validator::ConfigValidator::validate(self).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })
    }

    /// Apply CLI argument overrides to settings
    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(dir) = &cli.sessions_dir {
            self.sessions.root_dir = dir.clone();
        }
    }

    fn load_external_configs(&mut self, root: &Path) -> Result<(), anyhow::Error> {
        self.load_operations_from_dir(&root.join("config").join("operations"))
    }

    fn load_operations_from_dir(&mut self, dir: &Path) -> Result<(), anyhow::Error> {
        let pattern = format!("{}/*", dir.display());
        let mut paths = Vec::new();
        for entry in glob::glob(&pattern)? {
            match entry {
                Ok(path) => paths.push(path),
                Err(e) => tracing::warn!("Failed to read glob entry: {}", e),
            }
        }
        paths.sort();

        for path in paths {
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if !matches!(ext, "json" | "yaml" | "yml" | "toml") {
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            let operation: OperationConfig = match ext {
                "json" => serde_json::from_str(&content)?,
                "toml" => toml::from_str(&content)?,
                _ => serde_yaml::from_str(&content)?,
            };
            tracing::debug!("Loaded operation {} from {}", operation.id, path.display());
            self.operations.push(operation);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_script_from_settings() {
        let chat = ChatSettings {
            confirmation_keywords: vec!["Approve".to_string()],
            ..ChatSettings::default()
        };
        let script = chat.script();
        assert!(script.policy.is_plan("please approve this"));
        assert!(!script.policy.is_plan("please confirm"));
        assert_eq!(script.wrap("hi"), crate::session::chat::DEFAULT_REQUEST_TEMPLATE.replace("{input}", "hi"));
    }

    #[test]
    fn test_section_defaults() {
        let sessions = SessionSettings::default();
        assert_eq!(sessions.root_dir, PathBuf::from("masgent_sessions"));
        assert_eq!(sessions.id_length, 8);
        assert_eq!(sessions.max_upload_bytes, 64 * 1024 * 1024);
        assert_eq!(sessions.idle_timeout_secs, 86_400);
        assert_eq!(UiSettings::default().sidebar_file_limit, 10);
        assert_eq!(ChatSettings::default().model, "gemini-2.5-flash");
    }
}
