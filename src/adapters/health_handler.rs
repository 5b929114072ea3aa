use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use crate::adapters::operation_registry::OperationRegistry;
use crate::session::SessionRegistry;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub operations: usize,
    pub active_sessions: usize,
    pub sessions_root: String,
}

pub struct HealthHandler {
    registry: Arc<OperationRegistry>,
    sessions: Arc<SessionRegistry>,
    started: Instant,
}

impl HealthHandler {
    pub fn new(registry: Arc<OperationRegistry>, sessions: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            sessions,
            started: Instant::now(),
        }
    }

    /// Always 200 while the process serves requests.
    pub async fn health(&self) -> impl IntoResponse {
        let status = HealthStatus {
            status: "healthy",
            version: env!("CARGO_PKG_VERSION"),
            uptime_seconds: self.started.elapsed().as_secs(),
            checks: HealthChecks {
                operations: self.registry.len(),
                active_sessions: self.sessions.len().await,
                sessions_root: self.sessions.root().display().to_string(),
            },
        };

        (StatusCode::OK, Json(status))
    }

    /// 503 until at least one operation is registered and the sessions
    /// root can be created.
    pub async fn ready(&self) -> impl IntoResponse {
        if self.registry.is_empty() {
            return not_ready("No operations registered".to_string());
        }

        let root = self.sessions.root();
        if let Err(e) = tokio::fs::create_dir_all(root).await {
            tracing::warn!("Sessions root {} is not usable: {}", root.display(), e);
            return not_ready(format!("Sessions directory unavailable: {}", e));
        }

        (StatusCode::OK, Json(json!({
            "status": "ready",
            "operations": self.registry.len()
        })))
    }

    pub async fn live(&self) -> impl IntoResponse {
        (StatusCode::OK, Json(json!({
            "status": "alive",
            "uptime_seconds": self.started.elapsed().as_secs()
        })))
    }
}

fn not_ready(message: String) -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::SERVICE_UNAVAILABLE, Json(json!({
        "status": "not_ready",
        "message": message
    })))
}
