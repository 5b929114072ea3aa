//! REST API handlers for the web UI.
//!
//! Every session-scoped route resolves its session first: malformed ids are
//! rejected with 400, unknown well-formed ids are re-created.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::adapters::health_handler::HealthHandler;
use crate::adapters::metrics_handler::{MetricsCollector, MetricsHandler};
use crate::adapters::operation_handler::{ExecutionReport, OperationHandler, VisualizationOutcome};
use crate::adapters::operation_registry::{Category, Operation, OperationDetail, OperationRegistry};
use crate::config::{Settings, UiSettings};
use crate::domain::{ResponderFactory, ResponderPort, VisualizerPort};
use crate::engine::assist::AssistRegistry;
use crate::engine::{FormPolicy, Interaction, RenderedForm};
use crate::session::{
    ChatError, ChatLog, ChatScript, CredentialFlags, CredentialKind, SessionContext, SessionError,
    SessionRegistry, SessionSummary, SharedSession,
};

/// Shared application state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub registry: Arc<OperationRegistry>,
    pub sessions: Arc<SessionRegistry>,
    pub operations: Arc<OperationHandler>,
    pub metrics: Arc<MetricsCollector>,
    pub responders: Arc<dyn ResponderFactory>,
    pub chat_script: Arc<ChatScript>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        responders: Arc<dyn ResponderFactory>,
        visualizer: Arc<dyn VisualizerPort>,
    ) -> anyhow::Result<Self> {
        let registry = Arc::new(OperationRegistry::from_config(&settings.operations)?);
        let sessions = Arc::new(SessionRegistry::new(
            settings.sessions.root_dir.clone(),
            settings.sessions.id_length,
        ));
        let metrics = Arc::new(MetricsCollector::new()?);
        let operations = Arc::new(OperationHandler::new(
            settings.display.clone(),
            Arc::new(AssistRegistry::builtin()),
            visualizer,
            metrics.clone(),
            settings.sessions.dir_env_var.clone(),
        ));
        let chat_script = Arc::new(settings.chat.script());

        Ok(Self {
            settings: Arc::new(settings),
            registry,
            sessions,
            operations,
            metrics,
            responders,
            chat_script,
        })
    }

    pub fn health_handler(&self) -> HealthHandler {
        HealthHandler::new(self.registry.clone(), self.sessions.clone())
    }

    pub fn metrics_handler(&self) -> MetricsHandler {
        MetricsHandler::new(self.metrics.clone())
    }
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

type ApiResult<T> = (StatusCode, Json<ApiResponse<T>>);

fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

fn fail<T>(status: StatusCode, message: impl Into<String>) -> ApiResult<T> {
    (status, Json(ApiResponse::error(message)))
}

/// Client-side display settings.
#[derive(Serialize)]
pub struct ClientConfig {
    pub ui: UiSettings,
    pub display: FormPolicy,
    pub chat_model: String,
}

#[derive(Debug, Deserialize)]
pub struct CredentialBody {
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct VisualizeBody {
    pub file: String,
}

// ============================================================================
// Helpers
// ============================================================================

async fn resolve_session<T>(state: &AppState, id: &str) -> Result<SharedSession, ApiResult<T>> {
    state.sessions.get_or_create(id).await.map_err(|e| match e {
        SessionError::InvalidId(_) => fail(StatusCode::BAD_REQUEST, e.to_string()),
        SessionError::Store(_) => {
            tracing::error!("Failed to open session {}: {}", id, e);
            fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    })
}

fn resolve_operation<T>(state: &AppState, id: &str) -> Result<Arc<Operation>, ApiResult<T>> {
    state
        .registry
        .get(id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, format!("Operation not found: {}", id)))
}

/// The session's responder, created from its Gemini key on first use.
fn responder_for(state: &AppState, ctx: &mut SessionContext) -> Option<Arc<dyn ResponderPort>> {
    if let Some(responder) = &ctx.responder {
        return Some(responder.clone());
    }
    let key = ctx.credentials.get_or_env(CredentialKind::Gemini)?;
    let responder = state.responders.create(key);
    ctx.responder = Some(responder.clone());
    Some(responder)
}

fn no_gemini_key<T>() -> ApiResult<T> {
    fail(
        StatusCode::PRECONDITION_FAILED,
        "Please set your Gemini API key to use chat mode",
    )
}

fn chat_error<T>(e: ChatError) -> ApiResult<T> {
    let status = match e {
        ChatError::NoPendingPlan => StatusCode::CONFLICT,
        ChatError::EmptyMessage => StatusCode::BAD_REQUEST,
    };
    fail(status, e.to_string())
}

// ============================================================================
// Configuration and Operations
// ============================================================================

/// GET /api/config - Display settings for the client
pub async fn get_client_config(State(state): State<AppState>) -> impl IntoResponse {
    ok(ClientConfig {
        ui: state.settings.ui.clone(),
        display: state.settings.display.clone(),
        chat_model: state.settings.chat.model.clone(),
    })
}

/// GET /api/operations - Categories with their operations
pub async fn list_operations(State(state): State<AppState>) -> impl IntoResponse {
    ok::<Vec<Category>>(state.registry.categories())
}

/// GET /api/operations/:id - Operation summary and fields
pub async fn get_operation(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match resolve_operation::<OperationDetail>(&state, &id) {
        Ok(operation) => ok(operation.detail()),
        Err(e) => e,
    }
}

// ============================================================================
// Sessions
// ============================================================================

/// POST /api/sessions - Start a new session
pub async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    match state.sessions.create().await {
        Ok((_, session)) => {
            state.metrics.sessions_created.inc();
            let summary = session.lock().await.summary();
            (StatusCode::CREATED, Json(ApiResponse::success(summary)))
        }
        Err(e) => {
            tracing::error!("Failed to create session: {}", e);
            fail::<SessionSummary>(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /api/sessions/:id - Session summary
pub async fn get_session(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match resolve_session::<SessionSummary>(&state, &id).await {
        Ok(session) => ok(session.lock().await.summary()),
        Err(e) => e,
    }
}

/// GET /api/sessions/:id/files - File names in the session store
pub async fn list_files(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match resolve_session::<Vec<String>>(&state, &id).await {
        Ok(session) => ok(session.lock().await.store.list()),
        Err(e) => e,
    }
}

/// GET /api/sessions/:id/files/:name - Download a session file
pub async fn download_file(
    State(state): State<AppState>,
    Path((id, name)): Path<(String, String)>,
) -> Response {
    let session = match resolve_session::<()>(&state, &id).await {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };
    let bytes = match session.lock().await.store.read(&name) {
        Ok(bytes) => bytes,
        Err(e) => return fail::<()>(StatusCode::NOT_FOUND, e.to_string()).into_response(),
    };

    let mime = mime_guess::from_path(&name).first_or_octet_stream();
    (
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", name)),
        ],
        bytes,
    )
        .into_response()
}

/// PUT /api/sessions/:id/credentials/:kind - Store a credential
pub async fn set_credential(
    State(state): State<AppState>,
    Path((id, kind)): Path<(String, String)>,
    Json(body): Json<CredentialBody>,
) -> impl IntoResponse {
    update_credential(&state, &id, &kind, Some(body.value)).await
}

/// DELETE /api/sessions/:id/credentials/:kind - Forget a credential
pub async fn delete_credential(
    State(state): State<AppState>,
    Path((id, kind)): Path<(String, String)>,
) -> impl IntoResponse {
    update_credential(&state, &id, &kind, None).await
}

async fn update_credential(
    state: &AppState,
    id: &str,
    kind: &str,
    value: Option<String>,
) -> ApiResult<CredentialFlags> {
    let kind: CredentialKind = match kind.parse() {
        Ok(kind) => kind,
        Err(e) => return fail(StatusCode::BAD_REQUEST, e),
    };
    let session = match resolve_session(state, id).await {
        Ok(session) => session,
        Err(e) => return e,
    };
    let mut ctx = session.lock().await;
    ctx.set_credential(kind, value);
    tracing::info!(session_id = %id, "Updated {} credential", kind);
    ok(ctx.credentials.flags())
}

// ============================================================================
// Forms and Execution
// ============================================================================

/// POST /api/sessions/:id/operations/:op/render - One render pass
pub async fn render_form(
    State(state): State<AppState>,
    Path((id, op)): Path<(String, String)>,
    Json(interaction): Json<Interaction>,
) -> impl IntoResponse {
    let operation = match resolve_operation::<RenderedForm>(&state, &op) {
        Ok(operation) => operation,
        Err(e) => return e,
    };
    let session = match resolve_session(&state, &id).await {
        Ok(session) => session,
        Err(e) => return e,
    };
    let ctx = session.lock().await;
    ok(state.operations.render(&ctx, &operation, &interaction))
}

/// POST /api/sessions/:id/operations/:op/execute - Validate and run
pub async fn execute_operation(
    State(state): State<AppState>,
    Path((id, op)): Path<(String, String)>,
    Json(interaction): Json<Interaction>,
) -> impl IntoResponse {
    let operation = match resolve_operation::<ExecutionReport>(&state, &op) {
        Ok(operation) => operation,
        Err(e) => return e,
    };
    let session = match resolve_session(&state, &id).await {
        Ok(session) => session,
        Err(e) => return e,
    };
    let ctx = session.lock().await;
    ok(state.operations.execute(&ctx, &operation, &interaction).await)
}

// ============================================================================
// Visualizer
// ============================================================================

/// GET /api/sessions/:id/structures - Files the visualizer panel offers
pub async fn list_structures(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let session = match resolve_session::<Vec<String>>(&state, &id).await {
        Ok(session) => session,
        Err(e) => return e,
    };
    let policy = state.operations.policy();
    let files = session
        .lock()
        .await
        .store
        .list_where(|name| policy.is_structure_candidate(name));
    ok(files)
}

/// POST /api/sessions/:id/visualize - Render one session structure file
pub async fn visualize_structure(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<VisualizeBody>,
) -> impl IntoResponse {
    let session = match resolve_session::<VisualizationOutcome>(&state, &id).await {
        Ok(session) => session,
        Err(e) => return e,
    };
    let ctx = session.lock().await;
    match ctx.store.existing(&body.file) {
        Some(path) => ok(state.operations.visualize(&path).await),
        None => fail(
            StatusCode::NOT_FOUND,
            format!("File not found in session: {}", body.file),
        ),
    }
}

// ============================================================================
// Chat
// ============================================================================

/// GET /api/sessions/:id/chat - History and pending plan
pub async fn get_chat(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match resolve_session::<ChatLog>(&state, &id).await {
        Ok(session) => ok(session.lock().await.chat.clone()),
        Err(e) => e,
    }
}

/// DELETE /api/sessions/:id/chat - Clear history and the responder's conversation
pub async fn clear_chat(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let session = match resolve_session::<ChatLog>(&state, &id).await {
        Ok(session) => session,
        Err(e) => return e,
    };
    let mut ctx = session.lock().await;
    let responder = ctx.responder.clone();
    ctx.chat.clear(responder.as_deref()).await;
    ok(ctx.chat.clone())
}

/// POST /api/sessions/:id/chat - Send a request
pub async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ChatBody>,
) -> impl IntoResponse {
    let session = match resolve_session::<ChatLog>(&state, &id).await {
        Ok(session) => session,
        Err(e) => return e,
    };
    let mut ctx = session.lock().await;
    let Some(responder) = responder_for(&state, &mut ctx) else {
        return no_gemini_key();
    };
    if let Err(e) = ctx.chat.send(responder.as_ref(), &state.chat_script, &body.message).await {
        return chat_error(e);
    }
    state.metrics.chat_turns.with_label_values(&["send"]).inc();
    ok(ctx.chat.clone())
}

/// POST /api/sessions/:id/chat/confirm - Execute the pending plan
pub async fn confirm_chat(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let session = match resolve_session::<ChatLog>(&state, &id).await {
        Ok(session) => session,
        Err(e) => return e,
    };
    let mut ctx = session.lock().await;
    let Some(responder) = responder_for(&state, &mut ctx) else {
        return no_gemini_key();
    };
    if let Err(e) = ctx.chat.confirm(responder.as_ref(), &state.chat_script).await {
        return chat_error(e);
    }
    state.metrics.chat_turns.with_label_values(&["confirm"]).inc();
    ok(ctx.chat.clone())
}

/// POST /api/sessions/:id/chat/cancel - Drop the pending plan
pub async fn cancel_chat(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let session = match resolve_session::<ChatLog>(&state, &id).await {
        Ok(session) => session,
        Err(e) => return e,
    };
    let mut ctx = session.lock().await;
    if let Err(e) = ctx.chat.cancel(&state.chat_script) {
        return chat_error(e);
    }
    state.metrics.chat_turns.with_label_values(&["cancel"]).inc();
    ok(ctx.chat.clone())
}
