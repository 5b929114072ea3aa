//! Classification of operation results into display instructions.
//!
//! Strings naming an existing file are files; every other string is text.
//! Dispatch reads files for previews but never modifies the session.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::{FormPolicy, Notice};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultKind {
    NoOutput,
    File {
        path: String,
        file_name: String,
        /// Text content for previewable extensions.
        #[serde(skip_serializing_if = "Option::is_none")]
        preview: Option<String>,
        downloadable: bool,
    },
    Text {
        text: String,
    },
    Mapping {
        entries: Map<String, Value>,
    },
    FileList {
        paths: Vec<String>,
        file_names: Vec<String>,
    },
    List {
        items: Vec<Value>,
    },
    Opaque {
        value: Value,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayInstructions {
    #[serde(flatten)]
    pub kind: ResultKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
    /// Structure file to hand to the visualizer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualize: Option<PathBuf>,
}

impl DisplayInstructions {
    fn plain(kind: ResultKind) -> Self {
        Self { kind, notice: None, visualize: None }
    }
}

pub struct ResultDispatcher<'a> {
    policy: &'a FormPolicy,
}

impl<'a> ResultDispatcher<'a> {
    pub fn new(policy: &'a FormPolicy) -> Self {
        Self { policy }
    }

    pub fn dispatch(&self, result: &Value) -> DisplayInstructions {
        match result {
            Value::Null => DisplayInstructions {
                kind: ResultKind::NoOutput,
                notice: Some(Notice::warning("Tool returned no output.")),
                visualize: None,
            },
            Value::String(s) if Path::new(s).is_file() => self.dispatch_file(s),
            Value::String(s) => DisplayInstructions::plain(ResultKind::Text { text: s.clone() }),
            Value::Object(entries) => DisplayInstructions::plain(ResultKind::Mapping { entries: entries.clone() }),
            Value::Array(items) => match existing_paths(items) {
                Some(paths) => {
                    let file_names = paths.iter().map(|p| base_name(p)).collect();
                    DisplayInstructions {
                        notice: Some(Notice::success(format!("Created {} files", paths.len()))),
                        kind: ResultKind::FileList { paths, file_names },
                        visualize: None,
                    }
                }
                None => DisplayInstructions::plain(ResultKind::List { items: items.clone() }),
            },
            other => DisplayInstructions::plain(ResultKind::Opaque { value: other.clone() }),
        }
    }

    fn dispatch_file(&self, path: &str) -> DisplayInstructions {
        let file_name = base_name(path);
        let previewable = self.policy.is_previewable(&file_name);
        let preview = if previewable { read_preview(path, self.policy.max_preview_bytes) } else { None };
        let visualize = self
            .policy
            .is_structure_file(&file_name)
            .then(|| PathBuf::from(path));

        DisplayInstructions {
            notice: Some(Notice::success(format!("File created: `{}`", file_name))),
            kind: ResultKind::File {
                path: path.to_string(),
                file_name,
                preview,
                downloadable: previewable,
            },
            visualize,
        }
    }
}

/// Every element as a path string, when all of them name existing files.
fn existing_paths(items: &[Value]) -> Option<Vec<String>> {
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|item| match item {
            Value::String(s) if Path::new(s).is_file() => Some(s.clone()),
            _ => None,
        })
        .collect()
}

fn base_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Appended to a preview cut at the byte limit.
pub const TRUNCATION_MARKER: &str = "\n... (truncated)";

fn read_preview(path: &str, limit: usize) -> Option<String> {
    let mut bytes = Vec::new();
    let read = fs::File::open(path).and_then(|file| file.take(limit as u64 + 1).read_to_end(&mut bytes));
    if let Err(e) = read {
        tracing::warn!("Could not read {} for preview: {}", path, e);
        return None;
    }

    if bytes.len() <= limit {
        return Some(String::from_utf8_lossy(&bytes).into_owned());
    }

    bytes.truncate(limit);
    let mut text = String::from_utf8_lossy(&bytes).into_owned();
    // A cut through a multi-byte character leaves one replacement char.
    if text.ends_with('\u{FFFD}') {
        text.pop();
    }
    text.push_str(TRUNCATION_MARKER);
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NoticeLevel;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_null_is_no_output() {
        let policy = FormPolicy::default();
        let shown = ResultDispatcher::new(&policy).dispatch(&Value::Null);
        assert_eq!(shown.kind, ResultKind::NoOutput);
        assert_eq!(shown.notice, Some(Notice::warning("Tool returned no output.")));
    }

    #[test]
    fn test_structure_file_is_previewed_and_visualized() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "POSCAR_2x2x1.vasp", "Si\n1.0\n");
        let policy = FormPolicy::default();

        let shown = ResultDispatcher::new(&policy).dispatch(&json!(path));
        match &shown.kind {
            ResultKind::File { file_name, preview, downloadable, .. } => {
                assert_eq!(file_name, "POSCAR_2x2x1.vasp");
                assert_eq!(preview.as_deref(), Some("Si\n1.0\n"));
                assert!(downloadable);
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(shown.notice.unwrap().message, "File created: `POSCAR_2x2x1.vasp`");
        assert_eq!(shown.visualize, Some(PathBuf::from(&path)));
    }

    #[test]
    fn test_long_preview_is_truncated() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "traj.xyz", &"H 0.0 0.0 0.0\n".repeat(1000));
        let policy = FormPolicy {
            max_preview_bytes: 140,
            ..FormPolicy::default()
        };

        let shown = ResultDispatcher::new(&policy).dispatch(&json!(path));
        match &shown.kind {
            ResultKind::File { preview: Some(preview), downloadable, .. } => {
                assert_eq!(preview, &format!("{}{}", "H 0.0 0.0 0.0\n".repeat(10), TRUNCATION_MARKER));
                assert!(downloadable);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_preview_at_limit_is_whole() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "run.sh", "echo hi\n");
        let policy = FormPolicy {
            max_preview_bytes: 8,
            ..FormPolicy::default()
        };

        let shown = ResultDispatcher::new(&policy).dispatch(&json!(path));
        assert!(matches!(&shown.kind, ResultKind::File { preview: Some(p), .. } if p == "echo hi\n"));
    }

    #[test]
    fn test_non_previewable_file() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "WAVECAR", "binary");
        let policy = FormPolicy::default();

        let shown = ResultDispatcher::new(&policy).dispatch(&json!(path));
        assert!(matches!(shown.kind, ResultKind::File { preview: None, downloadable: false, .. }));
        assert!(shown.visualize.is_none());
    }

    #[test]
    fn test_missing_path_is_text() {
        let policy = FormPolicy::default();
        let shown = ResultDispatcher::new(&policy).dispatch(&json!("/nonexistent/out.vasp"));
        assert_eq!(shown.kind, ResultKind::Text { text: "/nonexistent/out.vasp".into() });
        assert!(shown.notice.is_none());
    }

    #[test]
    fn test_file_list_and_mixed_list() {
        let temp = TempDir::new().unwrap();
        let a = write(&temp, "a.cif", "a");
        let b = write(&temp, "b.xyz", "b");
        let policy = FormPolicy::default();
        let dispatcher = ResultDispatcher::new(&policy);

        let shown = dispatcher.dispatch(&json!([a, b]));
        assert!(matches!(&shown.kind, ResultKind::FileList { file_names, .. } if file_names == &vec!["a.cif".to_string(), "b.xyz".to_string()]));
        let notice = shown.notice.unwrap();
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(notice.message, "Created 2 files");

        let shown = dispatcher.dispatch(&json!([a, "not-a-file"]));
        assert!(matches!(shown.kind, ResultKind::List { .. }));

        let shown = dispatcher.dispatch(&json!([]));
        assert_eq!(shown.kind, ResultKind::List { items: vec![] });
    }

    #[test]
    fn test_mapping_and_opaque() {
        let policy = FormPolicy::default();
        let dispatcher = ResultDispatcher::new(&policy);
        assert!(matches!(dispatcher.dispatch(&json!({"energy": -5.4})).kind, ResultKind::Mapping { .. }));
        assert_eq!(dispatcher.dispatch(&json!(42)).kind, ResultKind::Opaque { value: json!(42) });
        assert_eq!(dispatcher.dispatch(&json!(true)).kind, ResultKind::Opaque { value: json!(true) });
    }
}
