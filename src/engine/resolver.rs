//! "Pick existing / supply new" resolution for path-typed fields.
//!
//! Uploads are written into the session store during the render pass, so an
//! upload survives a later validation failure.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Notice;
use crate::domain::SchemaField;
use crate::session::SessionFileStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveMode {
    #[default]
    Existing,
    Upload,
}

impl ResolveMode {
    fn other(self) -> Self {
        match self {
            Self::Existing => Self::Upload,
            Self::Upload => Self::Existing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPayload {
    pub name: String,
    pub content_base64: String,
}

/// Browser-side state of one file widget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInput {
    /// Existing file name; `None` is "(none)".
    #[serde(default)]
    pub selected: Option<String>,
    #[serde(default)]
    pub upload: Option<UploadPayload>,
    /// Mode the user interacted with most recently.
    #[serde(default)]
    pub last: ResolveMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedFrom {
    Existing,
    Upload,
    Default,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileResolution {
    /// Resolved path, the string default, or "".
    pub value: String,
    pub source: ResolvedFrom,
    /// Store contents after any upload of this pass.
    pub existing: Vec<String>,
    /// Selection still valid against `existing`.
    pub selected: Option<String>,
    pub mode: ResolveMode,
    pub notices: Vec<Notice>,
}

pub struct FileResolver<'a> {
    store: &'a SessionFileStore,
}

impl<'a> FileResolver<'a> {
    pub fn new(store: &'a SessionFileStore) -> Self {
        Self { store }
    }

    pub fn resolve(&self, field: &SchemaField, input: Option<&FileInput>) -> FileResolution {
        let empty = FileInput::default();
        let input = input.unwrap_or(&empty);
        let mut notices = Vec::new();

        let uploaded = input
            .upload
            .as_ref()
            .and_then(|payload| self.persist_upload(payload, &mut notices));

        let existing = self.store.list();

        let selected = match &input.selected {
            Some(name) if existing.contains(name) => Some(name.clone()),
            Some(name) => {
                tracing::warn!("Selected file '{}' for {} is no longer in the session", name, field.name);
                notices.push(Notice::warning(format!("{} is no longer in the session", name)));
                None
            }
            None => None,
        };
        let picked = selected.as_ref().map(|name| self.store.path_of(name));

        if existing.is_empty() {
            notices.push(Notice::info("No files in session. Upload a file or run a tool first."));
        }

        let from_mode = |mode: ResolveMode| match mode {
            ResolveMode::Existing => picked.clone().map(|p| (p, ResolvedFrom::Existing)),
            ResolveMode::Upload => uploaded.clone().map(|p| (p, ResolvedFrom::Upload)),
        };

        let (value, source) = match from_mode(input.last).or_else(|| from_mode(input.last.other())) {
            Some((path, source)) => (path.to_string_lossy().into_owned(), source),
            None => match &field.default {
                Some(Value::String(default)) if !default.is_empty() => (default.clone(), ResolvedFrom::Default),
                _ => (String::new(), ResolvedFrom::Empty),
            },
        };

        FileResolution {
            value,
            source,
            existing,
            selected,
            mode: input.last,
            notices,
        }
    }

    fn persist_upload(&self, payload: &UploadPayload, notices: &mut Vec<Notice>) -> Option<std::path::PathBuf> {
        let bytes = match base64::engine::general_purpose::STANDARD.decode(payload.content_base64.trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                notices.push(Notice::error(format!("Could not read upload {}: {}", payload.name, e)));
                return None;
            }
        };
        match self.store.persist(&payload.name, &bytes) {
            Ok(path) => {
                let saved = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| payload.name.clone());
                notices.push(Notice::success(format!("Saved: {}", saved)));
                Some(path)
            }
            Err(e) => {
                tracing::warn!("Upload of {} failed: {}", payload.name, e);
                notices.push(Notice::error(format!("Upload failed: {}", e)));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DeclaredType;
    use tempfile::TempDir;

    fn store_with(files: &[&str]) -> (TempDir, SessionFileStore) {
        let temp = TempDir::new().unwrap();
        let store = SessionFileStore::open(temp.path()).unwrap();
        for name in files {
            store.persist(name, b"data").unwrap();
        }
        (temp, store)
    }

    fn upload(name: &str, content: &[u8]) -> UploadPayload {
        UploadPayload {
            name: name.to_string(),
            content_base64: base64::engine::general_purpose::STANDARD.encode(content),
        }
    }

    fn path_field() -> SchemaField {
        SchemaField::new("poscar_path", DeclaredType::String)
    }

    #[test]
    fn test_select_existing() {
        let (_temp, store) = store_with(&["a.cif", "b.vasp"]);
        let input = FileInput {
            selected: Some("b.vasp".to_string()),
            ..Default::default()
        };

        let resolution = FileResolver::new(&store).resolve(&path_field(), Some(&input));
        assert_eq!(resolution.value, store.path_of("b.vasp").to_string_lossy());
        assert_eq!(resolution.source, ResolvedFrom::Existing);
        assert_eq!(resolution.existing, vec!["a.cif", "b.vasp"]);
    }

    #[test]
    fn test_upload_is_persisted_and_listed() {
        let (_temp, store) = store_with(&["a.cif", "b.vasp"]);
        let input = FileInput {
            upload: Some(upload("c.xyz", b"1\nH\nH 0 0 0\n")),
            last: ResolveMode::Upload,
            ..Default::default()
        };

        let resolution = FileResolver::new(&store).resolve(&path_field(), Some(&input));
        assert_eq!(resolution.value, store.path_of("c.xyz").to_string_lossy());
        assert_eq!(resolution.source, ResolvedFrom::Upload);
        assert!(resolution.existing.contains(&"c.xyz".to_string()));
        assert!(store.list().contains(&"c.xyz".to_string()));
    }

    #[test]
    fn test_last_interacted_mode_wins() {
        let (_temp, store) = store_with(&["a.cif"]);
        let mut input = FileInput {
            selected: Some("a.cif".to_string()),
            upload: Some(upload("new.vasp", b"x")),
            last: ResolveMode::Existing,
        };

        let resolver = FileResolver::new(&store);
        assert_eq!(resolver.resolve(&path_field(), Some(&input)).source, ResolvedFrom::Existing);

        input.last = ResolveMode::Upload;
        let resolution = resolver.resolve(&path_field(), Some(&input));
        assert_eq!(resolution.source, ResolvedFrom::Upload);
        assert!(resolution.value.ends_with("new.vasp"));
    }

    #[test]
    fn test_falls_back_to_other_mode_then_default() {
        let (_temp, store) = store_with(&["a.cif"]);
        let input = FileInput {
            selected: Some("a.cif".to_string()),
            last: ResolveMode::Upload,
            ..Default::default()
        };
        let resolver = FileResolver::new(&store);
        assert_eq!(resolver.resolve(&path_field(), Some(&input)).source, ResolvedFrom::Existing);

        let with_default = path_field().with_default("POSCAR");
        let resolution = resolver.resolve(&with_default, None);
        assert_eq!(resolution.value, "POSCAR");
        assert_eq!(resolution.source, ResolvedFrom::Default);

        let resolution = resolver.resolve(&path_field(), None);
        assert_eq!(resolution.value, "");
        assert_eq!(resolution.source, ResolvedFrom::Empty);
    }

    #[test]
    fn test_stale_selection_is_dropped() {
        let (_temp, store) = store_with(&["a.cif"]);
        let input = FileInput {
            selected: Some("gone.vasp".to_string()),
            ..Default::default()
        };
        let resolution = FileResolver::new(&store).resolve(&path_field(), Some(&input));
        assert_eq!(resolution.source, ResolvedFrom::Empty);
        assert!(resolution.selected.is_none());
        assert!(resolution.notices.iter().any(|n| n.message.contains("gone.vasp")));
    }

    #[test]
    fn test_bad_upload_payload_reports_error() {
        let (_temp, store) = store_with(&[]);
        let input = FileInput {
            upload: Some(UploadPayload {
                name: "x.cif".to_string(),
                content_base64: "***not base64***".to_string(),
            }),
            last: ResolveMode::Upload,
            ..Default::default()
        };
        let resolution = FileResolver::new(&store).resolve(&path_field(), Some(&input));
        assert_eq!(resolution.value, "");
        assert!(store.list().is_empty());
        assert!(resolution.notices.iter().any(|n| n.level == super::super::NoticeLevel::Error));
    }
}
