//! Global configuration types for Examiner.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls the
//! listening address, the chat-completion endpoint and the interview
//! session tuning knobs. Every field has a default so a partial (or
//! missing) file is always usable.

use serde::{Deserialize, Serialize};

/// Top-level configuration, loaded from `~/.examiner/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub interview: InterviewConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Chat-completion endpoint settings.
///
/// The API key is not part of the file; it comes from `EXAMINER_LLM_API_KEY`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider_name")]
    pub provider_name: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-call deadline. Reasoning models can think for minutes.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Deadline for the connectivity probe at startup.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

fn default_provider_name() -> String {
    "deepseek".to_string()
}

fn default_base_url() -> String {
    "https://api.deepseek.com/v1".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_temperature() -> f64 {
    0.6
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_request_timeout_secs() -> u64 {
    180
}

fn default_probe_timeout_secs() -> u64 {
    10
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider_name: default_provider_name(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

/// Interview session tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewConfig {
    /// Maximum number of messages sent to the model per call (system pinned).
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Quota clock period in milliseconds; each tick meters one second.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Prompt template file, relative to the data directory unless absolute.
    #[serde(default = "default_prompt_template_path")]
    pub prompt_template_path: String,
}

pub const DEFAULT_HISTORY_WINDOW: usize = 20;

fn default_history_window() -> usize {
    DEFAULT_HISTORY_WINDOW
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_prompt_template_path() -> String {
    "prompt.txt".to_string()
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            tick_interval_ms: default_tick_interval_ms(),
            prompt_template_path: default_prompt_template_path(),
        }
    }
}
