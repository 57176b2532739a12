//! Configuration and defaults for OpenAI-compatible providers.

use std::time::Duration;

use secrecy::SecretString;

use examiner_types::config::LlmConfig;

/// Configuration for an [`super::OpenAiCompatibleProvider`].
///
/// Does NOT derive Debug; the API key must never reach a log line.
pub struct OpenAiCompatConfig {
    /// Human-readable provider name (e.g., "deepseek").
    pub provider_name: String,
    /// Base URL for the API (e.g., "https://api.deepseek.com/v1").
    pub base_url: String,
    pub api_key: SecretString,
    /// Model used when a request does not name one.
    pub model: String,
    /// HTTP-level timeout. Matches the per-call deadline so the socket is
    /// not left open after the gateway has given up.
    pub request_timeout: Duration,
}

/// Build the provider configuration from `[llm]` settings.
pub fn from_llm_config(config: &LlmConfig, api_key: SecretString) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: config.provider_name.clone(),
        base_url: config.base_url.clone(),
        api_key,
        model: config.model.clone(),
        request_timeout: Duration::from_secs(config.request_timeout_secs),
    }
}
