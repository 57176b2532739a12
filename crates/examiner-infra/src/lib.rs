//! Infrastructure layer for Examiner.
//!
//! Contains implementations of the ports defined in `examiner-core`:
//! SQLite quota and access-token storage, the OpenAI-compatible LLM
//! provider, the file-backed prompt template and the configuration loader.

pub mod config;
pub mod filesystem;
pub mod llm;
pub mod prompt;
pub mod sqlite;
