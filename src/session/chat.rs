//! Chat-mode conversation state: history, pending plan, and the
//! plan/confirm/cancel protocol around a [`ResponderPort`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ResponderPort;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("No plan is awaiting confirmation")]
    NoPendingPlan,

    #[error("Message cannot be empty")]
    EmptyMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
    /// A reply held back until the user confirms or cancels it.
    Plan,
    /// The reply to a confirmed plan.
    Result,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Decides whether a reply asks for confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    keywords: Vec<String>,
}

impl ConfirmationPolicy {
    pub fn new(keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn is_plan(&self, reply: &str) -> bool {
        let lowered = reply.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k))
    }
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self::new(["confirm", "proceed", "execute", "plan"])
    }
}

/// Fixed texts of the chat protocol.
#[derive(Debug, Clone)]
pub struct ChatScript {
    /// Wraps each user request; `{input}` is replaced by the request text.
    pub request_template: String,
    /// Recorded as the user's message when a plan is confirmed.
    pub confirm_message: String,
    /// Sent to the responder when a plan is confirmed.
    pub execute_instruction: String,
    pub cancel_message: String,
    pub policy: ConfirmationPolicy,
}

impl Default for ChatScript {
    fn default() -> Self {
        Self {
            request_template: DEFAULT_REQUEST_TEMPLATE.to_string(),
            confirm_message: "Confirmed. Please execute the plan.".to_string(),
            execute_instruction: "Confirmed. Execute the plan now.".to_string(),
            cancel_message: "Plan cancelled. How else can I help you?".to_string(),
            policy: ConfirmationPolicy::default(),
        }
    }
}

pub const DEFAULT_REQUEST_TEMPLATE: &str = "Request/Confirmation: {input} (If this is a Request: ALWAYS output a workflow plan with chosen tools and required parameters FIRST and ask for confirmation; if this is a Confirmation: ignore the instruction above.)";

impl ChatScript {
    pub fn wrap(&self, input: &str) -> String {
        self.request_template.replace("{input}", input)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
    pending_plan: Option<String>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn pending_plan(&self) -> Option<&str> {
        self.pending_plan.as_deref()
    }

    /// Record the user's request, forward it wrapped, and record the reply.
    pub async fn send(
        &mut self,
        responder: &dyn ResponderPort,
        script: &ChatScript,
        input: &str,
    ) -> Result<&ChatMessage, ChatError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.messages.push(ChatMessage::new(ChatRole::User, input));

        let reply = match responder.respond(&script.wrap(input)).await {
            Ok(reply) if script.policy.is_plan(&reply) => {
                self.pending_plan = Some(reply.clone());
                ChatMessage::new(ChatRole::Plan, reply)
            }
            Ok(reply) => ChatMessage::new(ChatRole::Assistant, reply),
            Err(e) => failure(e),
        };
        Ok(self.push(reply))
    }

    /// Execute the pending plan.
    pub async fn confirm(&mut self, responder: &dyn ResponderPort, script: &ChatScript) -> Result<&ChatMessage, ChatError> {
        if self.pending_plan.take().is_none() {
            return Err(ChatError::NoPendingPlan);
        }
        self.messages
            .push(ChatMessage::new(ChatRole::User, script.confirm_message.clone()));

        let reply = match responder.respond(&script.execute_instruction).await {
            Ok(reply) => ChatMessage::new(ChatRole::Result, reply),
            Err(e) => failure(e),
        };
        Ok(self.push(reply))
    }

    pub fn cancel(&mut self, script: &ChatScript) -> Result<&ChatMessage, ChatError> {
        if self.pending_plan.take().is_none() {
            return Err(ChatError::NoPendingPlan);
        }
        Ok(self.push(ChatMessage::new(ChatRole::Assistant, script.cancel_message.clone())))
    }

    /// Empty the history and the pending plan, and reset the responder's conversation.
    pub async fn clear(&mut self, responder: Option<&dyn ResponderPort>) {
        self.messages.clear();
        self.pending_plan = None;
        if let Some(responder) = responder {
            responder.reset().await;
        }
    }

    fn push(&mut self, message: ChatMessage) -> &ChatMessage {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }
}

fn failure(error: anyhow::Error) -> ChatMessage {
    tracing::warn!("Responder failed: {:#}", error);
    ChatMessage::new(ChatRole::Assistant, format!("Error: {}", error))
}
