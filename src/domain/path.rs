//! Field path representation for validation errors.
//!
//! A path addresses a field or a sub-value inside it, e.g. `kpoints.1` or
//! `settings.ENCUT`. Segments are joined with dots.

use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Top-level field name
    Field(String),
    /// Sequence element
    Index(usize),
    /// Mapping key
    Key(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn field(name: &str) -> Self {
        Self::root().push_field(name)
    }

    pub fn push_field(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.segments.push(PathSegment::Field(name.to_string()));
        next
    }

    pub fn push_index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.segments.push(PathSegment::Index(index));
        next
    }

    pub fn push_key(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.segments.push(PathSegment::Key(key.to_string()));
        next
    }

    pub fn segments(&self) -> impl Iterator<Item = &PathSegment> {
        self.segments.iter()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                PathSegment::Field(name) | PathSegment::Key(name) => f.write_str(name)?,
                PathSegment::Index(idx) => write!(f, "{}", idx)?,
            }
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_path_display() {
        let path = FieldPath::field("kpoints").push_index(1);
        assert_eq!(path.to_string(), "kpoints.1");

        let path = FieldPath::field("incar").push_key("ENCUT");
        assert_eq!(path.to_string(), "incar.ENCUT");
    }

    #[test]
    fn test_root_is_empty() {
        assert!(FieldPath::root().is_root());
        assert_eq!(FieldPath::root().to_string(), "");
        assert!(!FieldPath::field("x").is_root());
    }

    #[test]
    fn test_serializes_as_string() {
        let path = FieldPath::field("items").push_index(0);
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"items.0\"");
    }
}
