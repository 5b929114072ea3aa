//! Google Gemini chat responder.
//!
//! One responder per session keeps that session's conversation so every
//! request carries the full history.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::ChatSettings;
use crate::domain::{ResponderFactory, ResponderPort};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Speaker {
    User,
    Model,
}

impl Speaker {
    fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

pub struct GeminiResponder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    history: Mutex<Vec<(Speaker, String)>>,
}

impl GeminiResponder {
    pub fn new(client: reqwest::Client, api_key: String, base_url: String, model: String) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            history: Mutex::new(Vec::new()),
        }
    }

    fn build_request_body(history: &[(Speaker, String)]) -> Value {
        let contents: Vec<Value> = history
            .iter()
            .map(|(speaker, text)| {
                json!({
                    "role": speaker.as_str(),
                    "parts": [{ "text": text }]
                })
            })
            .collect();
        json!({ "contents": contents })
    }

    fn parse_response(response: &GeminiResponse) -> anyhow::Result<String> {
        let candidate = response
            .candidates
            .first()
            .ok_or_else(|| anyhow::anyhow!("No candidates in response"))?;

        let text: String = candidate
            .content
            .as_ref()
            .and_then(|c| c.parts.as_ref())
            .map(|parts| parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default();

        if text.is_empty() {
            anyhow::bail!(
                "Empty response (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            );
        }
        Ok(text)
    }

    async fn generate(&self, body: &Value) -> anyhow::Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error {}: {}", status.as_u16(), error_text);
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse response: {}", e))?;
        Self::parse_response(&parsed)
    }
}

#[async_trait]
impl ResponderPort for GeminiResponder {
    async fn respond(&self, text: &str) -> anyhow::Result<String> {
        let mut history = self.history.lock().await;
        history.push((Speaker::User, text.to_string()));
        let body = Self::build_request_body(&history);

        match self.generate(&body).await {
            Ok(reply) => {
                history.push((Speaker::Model, reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                history.pop();
                Err(e)
            }
        }
    }

    async fn reset(&self) {
        self.history.lock().await.clear();
    }
}

/// Creates one [`GeminiResponder`] per session, sharing the HTTP client.
pub struct GeminiResponderFactory {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiResponderFactory {
    pub fn new(settings: &ChatSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
        }
    }
}

impl ResponderFactory for GeminiResponderFactory {
    fn create(&self, api_key: String) -> Arc<dyn ResponderPort> {
        Arc::new(GeminiResponder::new(
            self.client.clone(),
            api_key,
            self.base_url.clone(),
            self.model.clone(),
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_alternates_roles() {
        let history = vec![
            (Speaker::User, "make a supercell".to_string()),
            (Speaker::Model, "Plan: ...".to_string()),
            (Speaker::User, "Confirmed. Execute the plan now.".to_string()),
        ];
        let body = GeminiResponder::build_request_body(&history);
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "Confirmed. Execute the plan now.");
    }

    #[test]
    fn test_parse_response_joins_parts() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello "}, {"text": "there"}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(GeminiResponder::parse_response(&response).unwrap(), "Hello there");
    }

    #[test]
    fn test_parse_response_errors() {
        let empty: GeminiResponse = serde_json::from_value(json!({"candidates": []})).unwrap();
        assert!(GeminiResponder::parse_response(&empty).is_err());

        let blocked: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();
        let err = GeminiResponder::parse_response(&blocked).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_factory_uses_settings() {
        let settings = ChatSettings {
            base_url: "http://localhost:9/v1beta/".to_string(),
            ..ChatSettings::default()
        };
        let factory = GeminiResponderFactory::new(&settings);
        assert_eq!(factory.model, "gemini-2.5-flash");
        let responder = GeminiResponder::new(reqwest::Client::new(), "k".into(), settings.base_url.clone(), factory.model.clone());
        assert_eq!(responder.base_url, "http://localhost:9/v1beta");
    }
}
