//! Health probe.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// `ok` when interviews can be served, `degraded` otherwise.
    pub status: &'static str,
    pub version: &'static str,
    pub llm_ready: bool,
    pub llm_error: Option<String>,
    pub active_sessions: usize,
}

/// GET /health - readiness of the LLM gateway and live session count (no auth).
pub async fn health_check(State(state): State<AppState>) -> Json<HealthReport> {
    let gateway = state.gateway.status().await;
    Json(HealthReport {
        status: if gateway.ready { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        llm_ready: gateway.ready,
        llm_error: gateway.last_error,
        active_sessions: state.sessions.len(),
    })
}
