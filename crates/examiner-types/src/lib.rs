//! Shared domain types for Examiner.
//!
//! This crate contains the types exchanged between the interview session
//! manager, its collaborators and the wire: chat messages, the WebSocket
//! envelope, user identity, configuration, and the error enums.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, thiserror.

pub mod config;
pub mod error;
pub mod identity;
pub mod interview;
pub mod llm;
pub mod ws;
