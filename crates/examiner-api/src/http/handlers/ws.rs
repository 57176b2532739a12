//! WebSocket handler for AI interviews.
//!
//! `GET /api/v1/ws/ai-interview?token=...&point_title=...` authenticates the
//! caller before upgrading. After the upgrade the handler checks the LLM
//! gateway and the caller's quota; a connection that cannot be served gets
//! one rejection frame and is closed. Otherwise an [`InterviewSession`]
//! takes over the socket until it ends.
//!
//! [`InterviewSession`]: examiner_core::interview::session::InterviewSession

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, Stream, StreamExt};
use serde::Deserialize;

use examiner_core::interview::session::InterviewSession;
use examiner_core::interview::transport::{FrameSink, InboundFrame};
use examiner_core::repository::quota::QuotaRepository;
use examiner_types::error::TransportError;
use examiner_types::identity::UserIdentity;
use examiner_types::ws::{WsMessage, WsMessageType};

use crate::http::extractors::auth::AuthenticatedUser;
use crate::state::{AppState, ConcreteSession, SessionEntry};

/// Query parameters of the interview endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct InterviewQuery {
    /// Question the client opened the interview on; triggers a welcome.
    pub point_title: Option<String>,
}

/// Write half of an axum WebSocket.
pub struct WsSink {
    inner: SplitSink<WebSocket, Message>,
}

impl WsSink {
    pub fn new(inner: SplitSink<WebSocket, Message>) -> Self {
        Self { inner }
    }
}

impl FrameSink for WsSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.inner
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(err) = self.inner.close().await {
            tracing::trace!(error = %err, "WebSocket close failed");
        }
    }
}

/// Map a raw WebSocket message to a session frame. Ping and pong frames
/// are answered by axum and never reach the session.
fn map_ws_message(msg: Result<Message, axum::Error>) -> Option<Result<InboundFrame, TransportError>> {
    match msg {
        Ok(Message::Text(text)) => Some(Ok(InboundFrame::Data(text.as_str().as_bytes().to_vec()))),
        Ok(Message::Binary(bytes)) => Some(Ok(InboundFrame::Data(bytes.to_vec()))),
        Ok(Message::Close(_)) => Some(Ok(InboundFrame::Close)),
        Ok(Message::Ping(_) | Message::Pong(_)) => None,
        Err(err) => Some(Err(TransportError::Read(err.to_string()))),
    }
}

fn inbound_frames(
    receiver: SplitStream<WebSocket>,
) -> impl Stream<Item = Result<InboundFrame, TransportError>> + Send + Unpin {
    receiver.filter_map(|msg| std::future::ready(map_ws_message(msg)))
}

/// Authenticate, then upgrade to an interview socket.
pub async fn ai_interview(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Query(query): Query<InterviewQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_interview(socket, state, identity, query.point_title))
}

/// Send one rejection frame and close.
async fn reject(sink: &mut WsSink, kind: WsMessageType, code: u16, message: &str) {
    match WsMessage::rejection(kind, code, message).encode() {
        Ok(text) => {
            if let Err(err) = sink.send_text(text).await {
                tracing::debug!(error = %err, "Failed to send rejection");
            }
        }
        Err(err) => tracing::warn!(error = %err, "Failed to encode rejection"),
    }
    sink.close().await;
}

async fn handle_interview(
    socket: WebSocket,
    state: AppState,
    identity: UserIdentity,
    point_title: Option<String>,
) {
    let (sender, receiver) = socket.split();
    let mut sink = WsSink::new(sender);

    let status = state.gateway.status().await;
    if !status.ready {
        let reason = status.last_error.unwrap_or_default();
        tracing::warn!(user_id = identity.user_id, %reason, "Rejecting interview: LLM not ready");
        reject(
            &mut sink,
            WsMessageType::Error,
            503,
            &format!("AI service is not ready: {reason}"),
        )
        .await;
        return;
    }

    let quota = match state.quotas.load_quota(identity.user_id).await {
        Ok(quota) => quota,
        Err(err) => {
            tracing::error!(user_id = identity.user_id, error = %err, "Failed to load interview quota");
            reject(&mut sink, WsMessageType::Error, 500, "Failed to load AI interview quota").await;
            return;
        }
    };
    if quota <= 0 {
        tracing::info!(user_id = identity.user_id, "Rejecting interview: no quota left");
        reject(
            &mut sink,
            WsMessageType::QuotaError,
            403,
            "Your AI interview time has run out, please top up",
        )
        .await;
        return;
    }

    let session: Arc<ConcreteSession> = InterviewSession::new(
        identity.clone(),
        quota,
        sink,
        state.session_services(),
        state.session_settings,
        state.shutdown.child_token(),
    );
    let session_id = session.id();
    state.sessions.insert(
        session_id,
        SessionEntry {
            identity: identity.clone(),
            started_at: chrono::Utc::now(),
        },
    );
    tracing::info!(
        %session_id,
        user_id = identity.user_id,
        username = %identity.username,
        quota,
        "Interview session started"
    );

    session.start(point_title.as_deref()).await;
    Arc::clone(&session).run(inbound_frames(receiver)).await;

    state.sessions.remove(&session_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_binary_become_data() {
        let text = map_ws_message(Ok(Message::Text(String::from("{\"type\":\"chat\"}").into())));
        assert!(matches!(
            text,
            Some(Ok(InboundFrame::Data(bytes))) if bytes == b"{\"type\":\"chat\"}"
        ));

        let binary = map_ws_message(Ok(Message::Binary(vec![1u8, 2, 3].into())));
        assert!(matches!(binary, Some(Ok(InboundFrame::Data(bytes))) if bytes == [1, 2, 3]));
    }

    #[test]
    fn test_control_frames() {
        assert!(matches!(
            map_ws_message(Ok(Message::Close(None))),
            Some(Ok(InboundFrame::Close))
        ));
        assert!(map_ws_message(Ok(Message::Ping(Vec::<u8>::new().into()))).is_none());
        assert!(map_ws_message(Ok(Message::Pong(Vec::<u8>::new().into()))).is_none());
    }

    #[test]
    fn test_read_error_is_transport_error() {
        let err = axum::Error::new(std::io::Error::other("reset by peer"));
        assert!(matches!(
            map_ws_message(Err(err)),
            Some(Err(TransportError::Read(msg))) if msg.contains("reset by peer")
        ));
    }
}
