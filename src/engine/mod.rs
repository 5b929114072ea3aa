//! Schema-driven form engine.
//!
//! One render pass runs schema → [`assembler::FormAssembler`] (normalizer,
//! widget selector, file resolver, composite serializer per field) →
//! [`assembler::FormState`] → [`validator::validate`]. After the operation
//! returns, [`dispatcher::ResultDispatcher`] classifies its result.
//!
//! The engine is synchronous and keeps no state between passes apart from
//! the files it writes into the session store.

use serde::{Deserialize, Serialize};

pub mod assembler;
pub mod assist;
pub mod composite;
pub mod dispatcher;
pub mod normalizer;
pub mod resolver;
pub mod validator;
pub mod widget;

pub use assembler::{FormAssembler, FormState, RenderedForm};
pub use dispatcher::{DisplayInstructions, ResultDispatcher, ResultKind};
pub use normalizer::{normalize, TypeTag};
pub use validator::{validate, FieldError, ValidationOutcome};
pub use widget::{Interaction, RenderedWidget, WidgetInput};

/// Keyword and extension sets that steer widget selection and result display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormPolicy {
    /// Case-insensitive substrings of a field name that mark it as a path.
    #[serde(default = "default_path_keywords")]
    pub path_keywords: Vec<String>,
    /// Extensions whose content is previewed inline and offered for download.
    #[serde(default = "default_preview_extensions")]
    pub preview_extensions: Vec<String>,
    /// Extensions the visualizer understands.
    #[serde(default = "default_structure_extensions")]
    pub structure_extensions: Vec<String>,
    /// Bytes of a file shown inline; longer files are cut and marked.
    #[serde(default = "default_max_preview_bytes")]
    pub max_preview_bytes: usize,
}

fn default_path_keywords() -> Vec<String> {
    ["path", "file", "poscar", "cif"].map(String::from).to_vec()
}

fn default_preview_extensions() -> Vec<String> {
    [".vasp", ".poscar", ".cif", ".xyz", ".txt", ".sh"]
        .map(String::from)
        .to_vec()
}

fn default_structure_extensions() -> Vec<String> {
    [".vasp", ".poscar", ".cif", ".xyz"].map(String::from).to_vec()
}

fn default_max_preview_bytes() -> usize {
    64 * 1024
}

impl Default for FormPolicy {
    fn default() -> Self {
        Self {
            path_keywords: default_path_keywords(),
            preview_extensions: default_preview_extensions(),
            structure_extensions: default_structure_extensions(),
            max_preview_bytes: default_max_preview_bytes(),
        }
    }
}

impl FormPolicy {
    pub fn is_path_field(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.path_keywords
            .iter()
            .any(|kw| lowered.contains(&kw.to_lowercase()))
    }

    pub fn is_previewable(&self, file_name: &str) -> bool {
        has_extension(file_name, &self.preview_extensions)
    }

    pub fn is_structure_file(&self, file_name: &str) -> bool {
        has_extension(file_name, &self.structure_extensions)
    }

    /// Files shown in the visualizer panel: structure extensions, or any
    /// name mentioning POSCAR.
    pub fn is_structure_candidate(&self, file_name: &str) -> bool {
        self.is_structure_file(file_name) || file_name.to_lowercase().contains("poscar")
    }
}

fn has_extension(file_name: &str, extensions: &[String]) -> bool {
    let lowered = file_name.to_lowercase();
    extensions
        .iter()
        .any(|ext| lowered.ends_with(&ext.to_lowercase()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Inline message attached to a widget or a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

/// Human label for a field name: `poscar_path` → `Poscar Path`,
/// `latticeConstant` → `Lattice Constant`.
pub fn field_label(name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in name.chars() {
        if c == '_' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_ascii_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_labels() {
        assert_eq!(field_label("poscar_path"), "Poscar Path");
        assert_eq!(field_label("latticeConstant"), "Lattice Constant");
        assert_eq!(field_label("mp_id"), "Mp Id");
        assert_eq!(field_label("kpoints"), "Kpoints");
        assert_eq!(field_label("_private"), "Private");
    }

    #[test]
    fn test_path_keywords_are_case_insensitive() {
        let policy = FormPolicy::default();
        assert!(policy.is_path_field("poscar_path"));
        assert!(policy.is_path_field("InputFile"));
        assert!(policy.is_path_field("CIF_source"));
        assert!(!policy.is_path_field("formula"));
    }

    #[test]
    fn test_extension_sets() {
        let policy = FormPolicy::default();
        assert!(policy.is_previewable("run.sh"));
        assert!(policy.is_structure_file("OUT.VASP"));
        assert!(!policy.is_structure_file("notes.txt"));
        assert!(policy.is_structure_candidate("POSCAR_relaxed"));
        assert!(!policy.is_structure_candidate("INCAR"));
    }
}
