//! Explicit per-session state.
//!
//! A [`SessionContext`] owns everything one browser session accumulates: its
//! file store, credentials, and chat log. The [`SessionRegistry`] keeps a
//! context in memory until it has sat idle past the configured timeout;
//! files stay on disk, so a returning id reopens them with fresh
//! credentials and an empty chat log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

pub mod chat;
pub mod credentials;
pub mod store;

pub use chat::{ChatError, ChatLog, ChatMessage, ChatRole, ChatScript, ConfirmationPolicy};
pub use credentials::{CredentialFlags, CredentialKind, SessionCredentials};
pub use store::{SessionFileStore, StoreError};

use crate::domain::{OperationContext, ResponderPort};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid session id: '{0}'")]
    InvalidId(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct SessionContext {
    pub id: String,
    pub store: SessionFileStore,
    pub credentials: SessionCredentials,
    pub chat: ChatLog,
    /// Conversation partner for chat mode, created on first use.
    pub responder: Option<Arc<dyn ResponderPort>>,
    pub created_at: DateTime<Utc>,
}

/// What the browser is told about a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub directory: PathBuf,
    pub files: Vec<String>,
    pub credentials: CredentialFlags,
    pub created_at: DateTime<Utc>,
}

impl SessionContext {
    fn new(id: String, store: SessionFileStore) -> Self {
        Self {
            id,
            store,
            credentials: SessionCredentials::new(),
            chat: ChatLog::new(),
            responder: None,
            created_at: Utc::now(),
        }
    }

    /// Invocation context exporting the session directory under `dir_var`
    /// and the Materials Project key when one is available.
    pub fn operation_context(&self, dir_var: &str) -> OperationContext {
        let mut env = vec![(
            dir_var.to_string(),
            self.store.root().to_string_lossy().into_owned(),
        )];
        let mp = CredentialKind::MaterialsProject;
        if let Some(key) = self.credentials.get_or_env(mp) {
            env.push((mp.env_var().to_string(), key));
        }
        OperationContext {
            session_id: self.id.clone(),
            session_dir: self.store.root().to_path_buf(),
            env,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            directory: self.store.root().to_path_buf(),
            files: self.store.list(),
            credentials: self.credentials.flags(),
            created_at: self.created_at,
        }
    }

    /// Store or clear a credential. Changing the Gemini key drops the
    /// current responder so the next chat turn starts with the new key.
    pub fn set_credential(&mut self, kind: CredentialKind, value: Option<String>) {
        match value {
            Some(value) => self.credentials.set(kind, value),
            None => {
                self.credentials.clear(kind);
            }
        }
        if kind == CredentialKind::Gemini {
            self.responder = None;
        }
    }
}

pub type SharedSession = Arc<Mutex<SessionContext>>;

struct Entry {
    session: SharedSession,
    /// Milliseconds since the registry started.
    last_seen: AtomicU64,
}

pub struct SessionRegistry {
    root: PathBuf,
    id_length: usize,
    started: Instant,
    sessions: RwLock<HashMap<String, Entry>>,
}

impl SessionRegistry {
    pub fn new(root: impl Into<PathBuf>, id_length: usize) -> Self {
        Self {
            root: root.into(),
            id_length,
            started: Instant::now(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Start a session with a fresh id.
    pub async fn create(&self) -> Result<(String, SharedSession), SessionError> {
        let mut sessions = self.sessions.write().await;
        let id = loop {
            let candidate: String = uuid::Uuid::new_v4()
                .simple()
                .to_string()
                .chars()
                .take(self.id_length)
                .collect();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };
        let session = self.open(&id)?;
        sessions.insert(id.clone(), self.entry(session.clone()));
        tracing::info!("Created session {} at {}", id, self.root.join(&id).display());
        Ok((id, session))
    }

    /// Look up a session, re-creating a well-formed unknown id.
    pub async fn get_or_create(&self, id: &str) -> Result<SharedSession, SessionError> {
        if !self.is_well_formed(id) {
            return Err(SessionError::InvalidId(id.to_string()));
        }

        {
            let sessions = self.sessions.read().await;
            if let Some(entry) = sessions.get(id) {
                entry.last_seen.store(self.now_ms(), Ordering::Relaxed);
                return Ok(entry.session.clone());
            }
        }

        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get(id) {
            entry.last_seen.store(self.now_ms(), Ordering::Relaxed);
            return Ok(entry.session.clone());
        }
        tracing::info!(session_id = %id, "Auto-creating session for unknown id");
        let session = self.open(id)?;
        sessions.insert(id.to_string(), self.entry(session.clone()));
        Ok(session)
    }

    /// Drop contexts untouched for longer than `max_idle` that no request
    /// currently holds. Their directories are left in place.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = self.now_ms();
        let max_idle_ms = max_idle.as_millis() as u64;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let idle = now.saturating_sub(entry.last_seen.load(Ordering::Relaxed)) >= max_idle_ms;
            let in_use = Arc::strong_count(&entry.session) > 1;
            if idle && !in_use {
                tracing::debug!(session_id = %id, "Evicting idle session");
                return false;
            }
            true
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!("Evicted {} idle sessions, {} remain", evicted, sessions.len());
        }
        evicted
    }

    /// Sweeps idle sessions in the background until the runtime shuts down.
    pub fn spawn_idle_sweeper(self: Arc<Self>, max_idle: Duration) -> tokio::task::JoinHandle<()> {
        let period = (max_idle / 4).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.evict_idle(max_idle).await;
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn entry(&self, session: SharedSession) -> Entry {
        Entry {
            session,
            last_seen: AtomicU64::new(self.now_ms()),
        }
    }

    fn open(&self, id: &str) -> Result<SharedSession, SessionError> {
        let store = SessionFileStore::open(self.root.join(id))?;
        Ok(Arc::new(Mutex::new(SessionContext::new(id.to_string(), store))))
    }

    fn is_well_formed(&self, id: &str) -> bool {
        id.len() == self.id_length && id.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }
}
