//! Global configuration loader for Examiner.
//!
//! Reads `config.toml` from the data directory (`~/.examiner/` in production)
//! and deserializes it into [`GlobalConfig`]. Falls back to defaults when the
//! file is missing or malformed. The LLM API key never lives in the file; it
//! is read from the environment and kept wrapped in a [`SecretString`].

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};

use examiner_types::config::GlobalConfig;

/// Environment variable holding the chat-completion API key.
pub const API_KEY_ENV: &str = "EXAMINER_LLM_API_KEY";

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GlobalConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

/// Read the API key from [`API_KEY_ENV`]. Blank values count as missing.
pub fn api_key_from_env() -> Option<SecretString> {
    api_key_from(std::env::var(API_KEY_ENV).ok())
}

fn api_key_from(raw: Option<String>) -> Option<SecretString> {
    raw.map(SecretString::from)
        .filter(|key| !key.expose_secret().trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_global_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.llm.model, "deepseek-chat");
    }

    #[tokio::test]
    async fn load_global_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[server]
port = 9090

[llm]
base_url = "http://localhost:11434/v1"
request_timeout_secs = 60

[interview]
history_window = 8
"#,
        )
        .await
        .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.llm.base_url, "http://localhost:11434/v1");
        assert_eq!(config.llm.request_timeout_secs, 60);
        assert_eq!(config.llm.model, "deepseek-chat");
        assert_eq!(config.interview.history_window, 8);
    }

    #[tokio::test]
    async fn load_global_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.interview.history_window, 20);
    }

    #[test]
    fn api_key_blank_is_missing() {
        assert!(api_key_from(None).is_none());
        assert!(api_key_from(Some("   ".to_string())).is_none());
        let key = api_key_from(Some("sk-test".to_string())).unwrap();
        assert_eq!(key.expose_secret(), "sk-test");
    }
}
