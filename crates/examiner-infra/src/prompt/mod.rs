//! Prompt template sources.

pub mod file;
