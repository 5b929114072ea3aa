//! Per-session file directory.
//!
//! Holds uploads and operation outputs. File names are unique within the
//! store; writing an existing name overwrites it. Nothing here deletes files.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid file name: '{0}'")]
    InvalidName(String),

    #[error("File not found in session: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone)]
pub struct SessionFileStore {
    root: PathBuf,
}

impl SessionFileStore {
    /// Open the store at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of the regular files currently in the store, sorted.
    pub fn list(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Failed to read session directory {}: {}", self.root.display(), e);
                return Vec::new();
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }

    /// Files whose name passes `keep`.
    pub fn list_where(&self, keep: impl Fn(&str) -> bool) -> Vec<String> {
        self.list().into_iter().filter(|name| keep(name)).collect()
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Path of `name` when it is a regular file directly inside the store.
    pub fn existing(&self, name: &str) -> Option<PathBuf> {
        let clean = sanitize(name).ok()?;
        if clean != name {
            return None;
        }
        let path = self.path_of(&clean);
        path.is_file().then_some(path)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.existing(name).is_some()
    }

    /// Write `bytes` under the base name of `name`, replacing any file with
    /// that name. Returns the persisted path.
    pub fn persist(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        let clean = sanitize(name)?;
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Io {
            path: self.root.clone(),
            source,
        })?;
        let path = self.path_of(&clean);
        fs::write(&path, bytes).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!("Saved {} ({} bytes) to {}", clean, bytes.len(), self.root.display());
        Ok(path)
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let path = self
            .existing(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        fs::read(&path).map_err(|source| StoreError::Io { path, source })
    }
}

/// Reduce a client-supplied name to a bare file name.
fn sanitize(name: &str) -> Result<String, StoreError> {
    let base = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("sessions").join("abc12345");
        let store = SessionFileStore::open(&root).unwrap();
        assert!(root.is_dir());
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_list_is_sorted_and_skips_directories() {
        let temp = TempDir::new().unwrap();
        let store = SessionFileStore::open(temp.path()).unwrap();
        store.persist("b.vasp", b"b").unwrap();
        store.persist("a.cif", b"a").unwrap();
        fs::create_dir(temp.path().join("subdir")).unwrap();

        assert_eq!(store.list(), vec!["a.cif", "b.vasp"]);
    }

    #[test]
    fn test_persist_overwrites() {
        let temp = TempDir::new().unwrap();
        let store = SessionFileStore::open(temp.path()).unwrap();
        store.persist("POSCAR", b"first").unwrap();
        let path = store.persist("POSCAR", b"second").unwrap();

        assert_eq!(fs::read(path).unwrap(), b"second");
        assert_eq!(store.list(), vec!["POSCAR"]);
    }

    #[test]
    fn test_persist_strips_directories() {
        let temp = TempDir::new().unwrap();
        let store = SessionFileStore::open(temp.path()).unwrap();
        let path = store.persist("../../etc/evil.txt", b"x").unwrap();
        assert_eq!(path, temp.path().join("evil.txt"));
        assert!(matches!(store.persist("..", b"x"), Err(StoreError::InvalidName(_))));
    }

    #[test]
    fn test_existing_rejects_traversal() {
        let temp = TempDir::new().unwrap();
        let store = SessionFileStore::open(temp.path().join("s")).unwrap();
        fs::write(temp.path().join("outside.txt"), b"x").unwrap();

        assert!(store.existing("../outside.txt").is_none());
        assert!(matches!(store.read("../outside.txt"), Err(StoreError::NotFound(_))));
    }
}
