//! Interview session logic and collaborator trait definitions for Examiner.
//!
//! This crate defines the "ports" (quota, access token, prompt template and
//! LLM provider traits) that the infrastructure layer implements, plus the
//! session manager that drives one live interview over them. It depends
//! only on `examiner-types` -- never on `examiner-infra` or any database/IO crate.

pub mod interview;
pub mod llm;
pub mod prompt;
pub mod repository;

#[cfg(test)]
pub(crate) mod testing;
