//! LLM request/response types for Examiner.
//!
//! These types model the data shapes for chat-completion calls: the
//! messages that make up a topic history, the request/response pair a
//! provider exchanges, and the errors a provider or the gateway can raise.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Role of a message in an LLM conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in an LLM conversation.
///
/// Messages are never edited after being appended to a topic history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request to an LLM provider for a completion.
///
/// The system prompt travels as the first entry of `messages` (the
/// OpenAI chat convention), not as a separate field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// Response from an LLM provider for a non-streaming completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    pub content: String,
    pub model: String,
    pub usage: Usage,
}

/// Token usage for a completion request/response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Errors from LLM provider operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("provider overloaded: {0}")]
    Overloaded(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Failure classes surfaced by the LLM gateway.
///
/// Every variant is recoverable from the session's point of view: the
/// client gets a non-fatal `error` event and may retry.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No provider installed, or the startup probe failed.
    #[error("llm gateway not ready: {0}")]
    NotReady(String),

    #[error("llm call exceeded deadline of {0:?}")]
    Timeout(Duration),

    #[error("upstream error: {0}")]
    Upstream(#[from] LlmError),

    #[error("empty response from llm provider")]
    EmptyResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_role_display_matches_wire_name() {
        for role in [MessageRole::System, MessageRole::User, MessageRole::Assistant] {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{role}\""));
        }
    }

    #[test]
    fn test_message_role_serde() {
        let json = serde_json::to_string(&MessageRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        let parsed: MessageRole = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, MessageRole::Assistant);
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::system("s").role, MessageRole::System);
        assert_eq!(Message::user("u").role, MessageRole::User);
        let reply = Message::assistant("a");
        assert_eq!(reply.role, MessageRole::Assistant);
        assert_eq!(reply.content, "a");
    }

    #[test]
    fn test_gateway_error_display() {
        let err = GatewayError::Timeout(Duration::from_secs(180));
        assert!(err.to_string().contains("180s"));

        let err: GatewayError = LlmError::AuthenticationFailed.into();
        assert_eq!(err.to_string(), "upstream error: authentication failed");
    }
}
