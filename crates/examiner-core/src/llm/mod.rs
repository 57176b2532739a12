//! LLM provider abstractions for Examiner.
//!
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `BoxLlmProvider`: Object-safe wrapper for dynamic dispatch
//! - `LlmGateway`: process-wide, readiness-aware handle that performs one
//!   deadline-bounded completion per call

pub mod box_provider;
pub mod gateway;
pub mod provider;
