//! HTTP layer for Examiner.
//!
//! Axum server exposing the interview WebSocket at `/api/v1/ws/ai-interview`
//! and a `/health` probe, with CORS and request tracing.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
