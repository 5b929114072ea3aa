//! Per-session credentials.
//!
//! Values are write-only through the API: they can be set and cleared, and
//! only their presence is reported back. A session value shadows the process
//! environment variable of the same name.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    Gemini,
    MaterialsProject,
}

impl CredentialKind {
    pub const ALL: [CredentialKind; 2] = [Self::Gemini, Self::MaterialsProject];

    /// Environment variable carrying this credential.
    pub fn env_var(self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::MaterialsProject => "MP_API_KEY",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::MaterialsProject => "materials_project",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gemini" => Ok(Self::Gemini),
            "materials_project" | "mp" => Ok(Self::MaterialsProject),
            other => Err(format!("Unknown credential: {}", other)),
        }
    }
}

/// Which credentials are available to a session, without their values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CredentialFlags {
    pub gemini: bool,
    pub materials_project: bool,
}

#[derive(Default)]
pub struct SessionCredentials {
    values: HashMap<CredentialKind, SecretString>,
}

impl SessionCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value; blank values clear the credential instead.
    pub fn set(&mut self, kind: CredentialKind, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            self.clear(kind);
            return;
        }
        self.values.insert(kind, SecretString::from(value.trim().to_string()));
        tracing::info!("Stored {} credential for session", kind);
    }

    pub fn clear(&mut self, kind: CredentialKind) -> bool {
        self.values.remove(&kind).is_some()
    }

    pub fn is_set(&self, kind: CredentialKind) -> bool {
        self.values.contains_key(&kind)
    }

    /// Session value, falling back to the process environment.
    pub fn get_or_env(&self, kind: CredentialKind) -> Option<String> {
        if let Some(secret) = self.values.get(&kind) {
            return Some(secret.expose_secret().to_string());
        }
        std::env::var(kind.env_var()).ok().filter(|v| !v.is_empty())
    }

    pub fn flags(&self) -> CredentialFlags {
        CredentialFlags {
            gemini: self.get_or_env(CredentialKind::Gemini).is_some(),
            materials_project: self.get_or_env(CredentialKind::MaterialsProject).is_some(),
        }
    }
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("set", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}
