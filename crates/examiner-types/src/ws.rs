//! WebSocket envelope exchanged between the interview client and server.
//!
//! Every frame is a JSON object `{ "type": ..., "content": ... }` where the
//! shape of `content` depends on `type`. Inbound decoding is lenient: an
//! unknown type or a malformed payload yields a message that the session
//! simply ignores.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Type tag of a [`WsMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Session accepted; content carries the remaining quota.
    Init,
    /// Inbound: `{topic, content}` answer. Outbound: the AI reply string.
    Chat,
    /// Non-fatal failure notice (or connection rejection with `{code, message}`).
    Error,
    /// Quota ran out; the stream terminates after this frame.
    QuotaExhausted,
    /// Connection rejected because the user has no quota left.
    QuotaError,
    /// Any type this server does not understand.
    #[serde(other)]
    Unknown,
}

/// The wire envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsMessage {
    #[serde(rename = "type")]
    pub kind: WsMessageType,
    #[serde(default)]
    pub content: Value,
}

/// A validated inbound answer for one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatInput {
    pub topic: String,
    pub answer: String,
}

impl WsMessage {
    pub fn init(quota: i64) -> Self {
        Self {
            kind: WsMessageType::Init,
            content: json!({ "quota": quota }),
        }
    }

    pub fn chat(text: impl Into<String>) -> Self {
        Self {
            kind: WsMessageType::Chat,
            content: Value::String(text.into()),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: WsMessageType::Error,
            content: Value::String(text.into()),
        }
    }

    pub fn quota_exhausted(text: impl Into<String>) -> Self {
        Self {
            kind: WsMessageType::QuotaExhausted,
            content: Value::String(text.into()),
        }
    }

    /// A rejection sent right before the server closes a fresh connection.
    pub fn rejection(kind: WsMessageType, code: u16, message: impl Into<String>) -> Self {
        Self {
            kind,
            content: json!({ "code": code, "message": message.into() }),
        }
    }

    /// Decode a raw frame. Returns `None` for anything that is not a JSON envelope.
    pub fn decode(raw: &[u8]) -> Option<Self> {
        serde_json::from_slice(raw).ok()
    }

    /// Serialize to the JSON text sent over the socket.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Extract the answer of a `chat` frame.
    ///
    /// Only `chat` envelopes whose content is an object with a non-empty
    /// string `topic` and a non-empty string `content` qualify.
    pub fn chat_input(&self) -> Option<ChatInput> {
        if self.kind != WsMessageType::Chat {
            return None;
        }
        let fields = self.content.as_object()?;
        let topic = fields.get("topic").and_then(Value::as_str).unwrap_or_default();
        let answer = fields
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if topic.is_empty() || answer.is_empty() {
            return None;
        }
        Some(ChatInput {
            topic: topic.to_string(),
            answer: answer.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_chat_frame() {
        let raw = br#"{"type":"chat","content":{"topic":"Java memory model","content":"happens-before"}}"#;
        let msg = WsMessage::decode(raw).unwrap();
        let input = msg.chat_input().unwrap();
        assert_eq!(input.topic, "Java memory model");
        assert_eq!(input.answer, "happens-before");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(WsMessage::decode(b"not json").is_none());
        assert!(WsMessage::decode(br#"{"content":"no type"}"#).is_none());
    }

    #[test]
    fn test_unknown_type_is_tolerated() {
        let msg = WsMessage::decode(br#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg.kind, WsMessageType::Unknown);
        assert!(msg.chat_input().is_none());
    }

    #[test]
    fn test_chat_input_requires_topic_and_answer() {
        let cases: [&[u8]; 5] = [
            br#"{"type":"chat","content":"plain string"}"#,
            br#"{"type":"chat","content":{"topic":"","content":"x"}}"#,
            br#"{"type":"chat","content":{"topic":"t","content":""}}"#,
            br#"{"type":"chat","content":{"topic":"t"}}"#,
            br#"{"type":"chat","content":{"topic":1,"content":"x"}}"#,
        ];
        for raw in cases {
            let msg = WsMessage::decode(raw).unwrap();
            assert!(msg.chat_input().is_none(), "{}", String::from_utf8_lossy(raw));
        }
    }

    #[test]
    fn test_non_chat_type_is_not_an_answer() {
        let msg =
            WsMessage::decode(br#"{"type":"error","content":{"topic":"t","content":"x"}}"#).unwrap();
        assert!(msg.chat_input().is_none());
    }

    #[test]
    fn test_outbound_encoding() {
        let json = WsMessage::chat("well done").encode().unwrap();
        assert_eq!(json, r#"{"type":"chat","content":"well done"}"#);

        let json = WsMessage::quota_exhausted("time is up").encode().unwrap();
        assert_eq!(json, r#"{"type":"quota_exhausted","content":"time is up"}"#);

        let value: Value = serde_json::from_str(&WsMessage::init(42).encode().unwrap()).unwrap();
        assert_eq!(value["type"], "init");
        assert_eq!(value["content"]["quota"], 42);
    }

    #[test]
    fn test_rejection_payload() {
        let msg = WsMessage::rejection(WsMessageType::QuotaError, 403, "no quota left");
        let value: Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(value["type"], "quota_error");
        assert_eq!(value["content"]["code"], 403);
        assert_eq!(value["content"]["message"], "no quota left");
    }
}
