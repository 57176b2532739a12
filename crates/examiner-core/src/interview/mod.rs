//! Real-time interview sessions.
//!
//! - `context`: per-topic histories and the truncation window
//! - `clock`: quota meter and the periodic ticker
//! - `transport`: the connection ports a session writes to and reads from
//! - `session`: the session manager tying them to the LLM gateway

pub mod clock;
pub mod context;
pub mod session;
pub mod transport;
