//! API client for the Masgent Web backend

#![allow(dead_code)]

use crate::types::*;
use gloo_net::http::{Request, Response};
use serde::Serialize;

const API_BASE: &str = "/api";

pub async fn get_client_config() -> Result<ClientConfig, String> {
    fetch_json(&format!("{}/config", API_BASE)).await
}

pub async fn list_operations() -> Result<Vec<Category>, String> {
    fetch_json(&format!("{}/operations", API_BASE)).await
}

// ============================================================================
// Sessions
// ============================================================================

pub async fn create_session() -> Result<SessionSummary, String> {
    post_json(&format!("{}/sessions", API_BASE), &serde_json::json!({})).await
}

pub async fn get_session(id: &str) -> Result<SessionSummary, String> {
    fetch_json(&format!("{}/sessions/{}", API_BASE, id)).await
}

/// Download link for a session file
pub fn file_url(session: &str, name: &str) -> String {
    format!("{}/sessions/{}/files/{}", API_BASE, session, urlencoding::encode(name))
}

pub async fn set_credential(session: &str, kind: &str, value: &str) -> Result<CredentialFlags, String> {
    let url = format!("{}/sessions/{}/credentials/{}", API_BASE, session, kind);
    put_json(&url, &serde_json::json!({ "value": value })).await
}

pub async fn delete_credential(session: &str, kind: &str) -> Result<CredentialFlags, String> {
    let url = format!("{}/sessions/{}/credentials/{}", API_BASE, session, kind);
    let response = Request::delete(&url)
        .send()
        .await
        .map_err(|e| format!("Request failed: {}", e))?;
    unwrap_response(response).await
}

// ============================================================================
// Forms
// ============================================================================

pub async fn render_form(session: &str, operation: &str, interaction: &Interaction) -> Result<RenderedForm, String> {
    let url = format!("{}/sessions/{}/operations/{}/render", API_BASE, session, operation);
    post_json(&url, interaction).await
}

pub async fn execute(session: &str, operation: &str, interaction: &Interaction) -> Result<ExecutionReport, String> {
    let url = format!("{}/sessions/{}/operations/{}/execute", API_BASE, session, operation);
    post_json(&url, interaction).await
}

// ============================================================================
// Visualizer
// ============================================================================

pub async fn list_structures(session: &str) -> Result<Vec<String>, String> {
    fetch_json(&format!("{}/sessions/{}/structures", API_BASE, session)).await
}

pub async fn visualize(session: &str, file: &str) -> Result<VisualizationOutcome, String> {
    let url = format!("{}/sessions/{}/visualize", API_BASE, session);
    post_json(&url, &serde_json::json!({ "file": file })).await
}

// ============================================================================
// Chat
// ============================================================================

pub async fn get_chat(session: &str) -> Result<ChatLog, String> {
    fetch_json(&format!("{}/sessions/{}/chat", API_BASE, session)).await
}

pub async fn send_chat(session: &str, message: &str) -> Result<ChatLog, String> {
    let url = format!("{}/sessions/{}/chat", API_BASE, session);
    post_json(&url, &serde_json::json!({ "message": message })).await
}

pub async fn confirm_plan(session: &str) -> Result<ChatLog, String> {
    let url = format!("{}/sessions/{}/chat/confirm", API_BASE, session);
    post_json(&url, &serde_json::json!({})).await
}

pub async fn cancel_plan(session: &str) -> Result<ChatLog, String> {
    let url = format!("{}/sessions/{}/chat/cancel", API_BASE, session);
    post_json(&url, &serde_json::json!({})).await
}

pub async fn clear_chat(session: &str) -> Result<ChatLog, String> {
    let url = format!("{}/sessions/{}/chat", API_BASE, session);
    let response = Request::delete(&url)
        .send()
        .await
        .map_err(|e| format!("Request failed: {}", e))?;
    unwrap_response(response).await
}

// ============================================================================
// Helpers
// ============================================================================

async fn unwrap_response<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, String> {
    let api_response: ApiResponse<T> = response
        .json()
        .await
        .map_err(|e| format!("Failed to parse response: {}", e))?;

    if api_response.success {
        api_response.data.ok_or_else(|| "No data in response".to_string())
    } else {
        Err(api_response.error.unwrap_or_else(|| "Unknown error".to_string()))
    }
}

async fn fetch_json<T: serde::de::DeserializeOwned>(url: &str) -> Result<T, String> {
    let response = Request::get(url)
        .send()
        .await
        .map_err(|e| format!("Request failed: {}", e))?;
    unwrap_response(response).await
}

async fn post_json<T: Serialize, R: serde::de::DeserializeOwned>(url: &str, body: &T) -> Result<R, String> {
    let response = Request::post(url)
        .json(body)
        .map_err(|e| format!("Failed to serialize body: {}", e))?
        .send()
        .await
        .map_err(|e| format!("Request failed: {}", e))?;
    unwrap_response(response).await
}

async fn put_json<T: Serialize, R: serde::de::DeserializeOwned>(url: &str, body: &T) -> Result<R, String> {
    let response = Request::put(url)
        .json(body)
        .map_err(|e| format!("Failed to serialize body: {}", e))?
        .send()
        .await
        .map_err(|e| format!("Request failed: {}", e))?;
    unwrap_response(response).await
}
