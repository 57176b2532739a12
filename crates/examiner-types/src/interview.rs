//! Session lifecycle types shared by the session manager and its host.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of an interview session. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Open,
    Closing,
    Closed,
}

/// What ended a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The client sent a close frame or the stream ended.
    ClientClosed,
    /// Reading from or writing to the connection failed.
    TransportError,
    /// The quota clock reached the purchased limit.
    QuotaExhausted,
    /// The host asked the session to stop (server shutdown, admin action).
    Shutdown,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::ClientClosed => write!(f, "client_closed"),
            CloseReason::TransportError => write!(f, "transport_error"),
            CloseReason::QuotaExhausted => write!(f, "quota_exhausted"),
            CloseReason::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Outcome of a session teardown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub reason: CloseReason,
    pub used_seconds: i64,
    /// Quota left after this session, floored at zero.
    pub remaining_seconds: i64,
    /// Whether the remaining quota was written back successfully.
    pub settled: bool,
}
