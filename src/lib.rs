//! # Masgent Web
//!
//! Browser front-end for a catalogue of parameterized scientific operations.
//! Every operation declares a typed input schema; the server turns that
//! schema into form widgets, validates what the user entered, calls the
//! operation, and classifies whatever it returns into display instructions.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use masgent_web::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Reads ./masgent-web.toml and ./config/operations/*
//!     let settings = Settings::new()?;
//!     println!("{} operations configured", settings.operations.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Domain**: schema model and the ports to external collaborators
//! - **Engine**: the synchronous form engine (render, validate, dispatch)
//! - **Session**: per-session files, credentials, and chat state
//! - **Adapters**: HTTP handlers and port implementations
//! - **Config**: configuration loading and validation

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod session;

use crate::adapters::api_handler::{self, AppState};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

/// Creates the Axum application router with all endpoints configured.
pub fn create_app(state: AppState) -> Router {
    let health_handler = Arc::new(state.health_handler());
    let metrics_handler = Arc::new(state.metrics_handler());
    let body_limit = state.settings.sessions.max_upload_bytes;

    let public_router = Router::new()
        .route("/health", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.health().await }
            }
        }))
        .route("/health/ready", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.ready().await }
            }
        }))
        .route("/health/live", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.live().await }
            }
        }))
        .route("/metrics", get({
            let handler = metrics_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.metrics().await }
            }
        }));

    let api_router = Router::new()
        .route("/config", get(api_handler::get_client_config))
        // Operation catalogue
        .route("/operations", get(api_handler::list_operations))
        .route("/operations/:id", get(api_handler::get_operation))
        // Sessions and their files
        .route("/sessions", post(api_handler::create_session))
        .route("/sessions/:id", get(api_handler::get_session))
        .route("/sessions/:id/files", get(api_handler::list_files))
        .route("/sessions/:id/files/:name", get(api_handler::download_file))
        .route(
            "/sessions/:id/credentials/:kind",
            put(api_handler::set_credential).delete(api_handler::delete_credential),
        )
        // Forms
        .route("/sessions/:id/operations/:op/render", post(api_handler::render_form))
        .route("/sessions/:id/operations/:op/execute", post(api_handler::execute_operation))
        // Visualizer panel
        .route("/sessions/:id/structures", get(api_handler::list_structures))
        .route("/sessions/:id/visualize", post(api_handler::visualize_structure))
        // Chat mode
        .route(
            "/sessions/:id/chat",
            get(api_handler::get_chat)
                .post(api_handler::send_chat)
                .delete(api_handler::clear_chat),
        )
        .route("/sessions/:id/chat/confirm", post(api_handler::confirm_chat))
        .route("/sessions/:id/chat/cancel", post(api_handler::cancel_chat))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    public_router
        .nest("/api", api_router)
        // UI endpoint (catch-all for SPA)
        .fallback(crate::adapters::ui_handler::UIHandler::serve)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}
