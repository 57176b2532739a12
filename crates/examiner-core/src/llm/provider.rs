//! LlmProvider trait definition.
//!
//! This is the core abstraction that the chat-completion backend implements.

use examiner_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for LLM provider backends (DeepSeek, OpenAI, any OpenAI-compatible API).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// Implementations live in examiner-infra (e.g., `OpenAiCompatibleProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "deepseek", "openai").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
