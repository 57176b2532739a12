//! LLM provider implementations and gateway start-up.
//!
//! [`init_gateway`] builds the configured provider, verifies it with a
//! minimal completion and installs it into the shared [`LlmGateway`]. Any
//! failure leaves the gateway not ready with the reason recorded, so the
//! server still starts and reports the problem on `/health` and to each
//! connecting client.

pub mod openai_compat;

use std::time::Duration;

use secrecy::SecretString;

use examiner_core::llm::box_provider::BoxLlmProvider;
use examiner_core::llm::gateway::LlmGateway;
use examiner_types::config::LlmConfig;
use examiner_types::llm::{CompletionRequest, GatewayError, LlmError, Message};

use self::openai_compat::OpenAiCompatibleProvider;

/// Reason recorded when no API key is configured.
pub const EMPTY_API_KEY: &str = "api key is empty";

/// Create a [`BoxLlmProvider`] from `[llm]` settings and the API key.
pub fn create_provider(config: &LlmConfig, api_key: SecretString) -> Result<BoxLlmProvider, LlmError> {
    let provider =
        OpenAiCompatibleProvider::new(openai_compat::config::from_llm_config(config, api_key))?;
    Ok(BoxLlmProvider::new(provider))
}

/// Verify provider connectivity with a tiny completion under `timeout`.
pub async fn probe_provider(
    provider: &BoxLlmProvider,
    model: &str,
    timeout: Duration,
) -> Result<(), GatewayError> {
    let request = CompletionRequest {
        model: model.to_string(),
        messages: vec![Message::user("Hello")],
        max_tokens: 10,
        temperature: Some(0.0),
    };
    match tokio::time::timeout(timeout, provider.complete(&request)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(err)) => Err(GatewayError::Upstream(err)),
        Err(_) => Err(GatewayError::Timeout(timeout)),
    }
}

/// Probe `provider` and install it into `gateway` on success.
pub async fn install_verified(
    gateway: &LlmGateway,
    provider: BoxLlmProvider,
    model: &str,
    timeout: Duration,
) {
    match probe_provider(&provider, model, timeout).await {
        Ok(()) => gateway.install(provider).await,
        Err(err) => {
            gateway
                .mark_unavailable(format!("{} probe failed: {err}", provider.name()))
                .await
        }
    }
}

/// Bring the gateway up from configuration.
pub async fn init_gateway(gateway: &LlmGateway, config: &LlmConfig, api_key: Option<SecretString>) {
    let Some(api_key) = api_key else {
        gateway.mark_unavailable(EMPTY_API_KEY).await;
        return;
    };

    let provider = match create_provider(config, api_key) {
        Ok(provider) => provider,
        Err(err) => {
            gateway.mark_unavailable(err.to_string()).await;
            return;
        }
    };

    tracing::info!(
        provider = provider.name(),
        base_url = %config.base_url,
        model = %config.model,
        "Probing LLM provider"
    );
    install_verified(
        gateway,
        provider,
        &config.model,
        Duration::from_secs(config.probe_timeout_secs),
    )
    .await;
}
