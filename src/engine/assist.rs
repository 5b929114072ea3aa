//! Assisted string fields: example presets, a format hint, and advisory
//! validation feedback for well-known parameter names.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

static FORMULA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z][a-zA-Z0-9]*$").expect("valid regex"));
static MP_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^mp-\d+$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub label: String,
    pub value: String,
}

/// Result of the advisory check. Never blocks submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub valid: bool,
    pub message: String,
}

impl Feedback {
    fn ok(message: &str) -> Self {
        Self { valid: true, message: message.to_string() }
    }

    fn bad(message: impl Into<String>) -> Self {
        Self { valid: false, message: message.into() }
    }
}

pub struct FieldAssist {
    pub presets: Vec<Preset>,
    pub format: String,
    pub hint: String,
    check: fn(&str) -> Feedback,
}

impl FieldAssist {
    fn new(presets: &[(&str, &str)], format: &str, hint: &str, check: fn(&str) -> Feedback) -> Self {
        Self {
            presets: presets
                .iter()
                .map(|(label, value)| Preset { label: label.to_string(), value: value.to_string() })
                .collect(),
            format: format.to_string(),
            hint: hint.to_string(),
            check,
        }
    }

    /// Feedback for non-empty text only.
    pub fn check(&self, text: &str) -> Option<Feedback> {
        (!text.is_empty()).then(|| (self.check)(text))
    }

    pub fn preset_value(&self, label: &str) -> Option<&str> {
        self.presets
            .iter()
            .find(|p| p.label == label)
            .map(|p| p.value.as_str())
    }
}

pub struct AssistRegistry {
    fields: HashMap<String, FieldAssist>,
}

impl AssistRegistry {
    pub fn empty() -> Self {
        Self { fields: HashMap::new() }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(
            "scaling_matrix",
            FieldAssist::new(
                &[
                    ("2x2x2 supercell", "2 0 0; 0 2 0; 0 0 2"),
                    ("3x3x1 supercell", "3 0 0; 0 3 0; 0 0 1"),
                    ("2x1x1 supercell", "2 0 0; 0 1 0; 0 0 1"),
                ],
                "a b c; d e f; g h i (semicolon-separated rows)",
                "Use semicolons to separate rows, spaces for numbers",
                check_scaling_matrix,
            ),
        );
        registry.register(
            "formula",
            FieldAssist::new(
                &[
                    ("Silicon", "Si"),
                    ("Sodium Chloride", "NaCl"),
                    ("Titanium Dioxide", "TiO2"),
                    ("Perovskite", "SrTiO3"),
                ],
                "Chemical formula (e.g., NaCl, TiO2)",
                "Use element symbols with optional numbers",
                check_formula,
            ),
        );
        registry.register(
            "mp_id",
            FieldAssist::new(
                &[("Silicon", "mp-149"), ("NaCl", "mp-22862"), ("Diamond", "mp-66")],
                "mp-XXXXX (Materials Project ID)",
                "Find IDs at materialsproject.org",
                check_mp_id,
            ),
        );
        registry.register(
            "kpoints",
            FieldAssist::new(
                &[("Standard", "4 4 4"), ("Dense", "8 8 8"), ("Anisotropic", "6 6 4")],
                "kx ky kz (space-separated integers)",
                "Higher values = more accurate but slower",
                check_kpoints,
            ),
        );
        registry
    }

    pub fn register(&mut self, field: impl Into<String>, assist: FieldAssist) {
        self.fields.insert(field.into(), assist);
    }

    pub fn get(&self, field: &str) -> Option<&FieldAssist> {
        self.fields.get(field)
    }
}

impl Default for AssistRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn check_scaling_matrix(value: &str) -> Feedback {
    if value.trim().is_empty() {
        return Feedback::bad("Scaling matrix cannot be empty");
    }
    let rows: Vec<&str> = value.split(';').collect();
    if rows.len() != 3 {
        return Feedback::bad(format!("Expected 3 rows, got {}", rows.len()));
    }
    for (i, row) in rows.iter().enumerate() {
        let numbers: Vec<&str> = row.split_whitespace().collect();
        if numbers.len() != 3 {
            return Feedback::bad(format!("Row {}: Expected 3 numbers, got {}", i + 1, numbers.len()));
        }
        if numbers.iter().any(|n| n.parse::<i64>().is_err()) {
            return Feedback::bad("All values must be integers");
        }
    }
    Feedback::ok("Valid scaling matrix")
}

fn check_formula(value: &str) -> Feedback {
    if value.trim().is_empty() {
        return Feedback::bad("Formula cannot be empty");
    }
    if !FORMULA.is_match(value) {
        return Feedback::bad("Formula must start with capital letter and contain only letters/numbers");
    }
    Feedback::ok("Valid formula")
}

fn check_mp_id(value: &str) -> Feedback {
    if value.trim().is_empty() {
        return Feedback::bad("MP ID cannot be empty");
    }
    if !MP_ID.is_match(value) {
        return Feedback::bad("MP ID must be in format: mp-XXXXX");
    }
    Feedback::ok("Valid MP ID")
}

fn check_kpoints(value: &str) -> Feedback {
    if value.trim().is_empty() {
        return Feedback::bad("K-points cannot be empty");
    }
    let numbers: Vec<&str> = value.split_whitespace().collect();
    if numbers.len() != 3 {
        return Feedback::bad(format!("Expected 3 numbers, got {}", numbers.len()));
    }
    for n in numbers {
        match n.parse::<i64>() {
            Ok(k) if k < 1 => return Feedback::bad("K-points must be positive integers"),
            Ok(_) => {}
            Err(_) => return Feedback::bad("K-points must be integers"),
        }
    }
    Feedback::ok("Valid k-points")
}
