//! Process-wide LLM gateway.
//!
//! The gateway owns the single provider handle created at startup and
//! performs exactly one chat-completion round trip per call, bounded by a
//! caller-supplied deadline. Readiness is explicit: a provider is either
//! installed (ready) or absent together with the reason it is absent.
//!
//! There is no retry here. Reasoning-model calls are slow and expensive,
//! so a failure is surfaced immediately and the caller decides what the
//! user sees.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use examiner_types::config::LlmConfig;
use examiner_types::llm::{CompletionRequest, GatewayError, Message};

use super::box_provider::BoxLlmProvider;

const NOT_INITIALIZED: &str = "llm provider not initialized";

/// Request parameters applied to every completion.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: u32,
}

impl From<&LlmConfig> for GatewaySettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: Some(config.temperature),
            max_tokens: config.max_tokens,
        }
    }
}

/// Snapshot of the gateway's readiness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayStatus {
    pub ready: bool,
    pub last_error: Option<String>,
}

struct GatewayInner {
    provider: Option<Arc<BoxLlmProvider>>,
    last_error: Option<String>,
}

/// Shared handle to the chat-completion backend.
pub struct LlmGateway {
    inner: RwLock<GatewayInner>,
    settings: GatewaySettings,
}

impl LlmGateway {
    /// Create a gateway with no provider installed (not ready).
    pub fn new(settings: GatewaySettings) -> Self {
        Self {
            inner: RwLock::new(GatewayInner {
                provider: None,
                last_error: Some(NOT_INITIALIZED.to_string()),
            }),
            settings,
        }
    }

    /// Install a verified provider and mark the gateway ready.
    pub async fn install(&self, provider: BoxLlmProvider) {
        let mut inner = self.inner.write().await;
        tracing::info!(
            provider = provider.name(),
            model = %self.settings.model,
            "LLM gateway ready"
        );
        inner.provider = Some(Arc::new(provider));
        inner.last_error = None;
    }

    /// Drop any installed provider and record why the gateway is unavailable.
    pub async fn mark_unavailable(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let mut inner = self.inner.write().await;
        tracing::error!(%reason, "LLM gateway unavailable");
        inner.provider = None;
        inner.last_error = Some(reason);
    }

    pub async fn status(&self) -> GatewayStatus {
        let inner = self.inner.read().await;
        GatewayStatus {
            ready: inner.provider.is_some(),
            last_error: inner.last_error.clone(),
        }
    }

    /// Run one completion over `messages`, failing with `Timeout` once
    /// `deadline` elapses.
    ///
    /// Replies that are empty or whitespace-only are reported as
    /// `EmptyResponse` so callers never store a blank assistant turn.
    pub async fn complete(
        &self,
        messages: Vec<Message>,
        deadline: Duration,
    ) -> Result<String, GatewayError> {
        let provider = {
            let inner = self.inner.read().await;
            match &inner.provider {
                Some(provider) => Arc::clone(provider),
                None => {
                    let reason = inner
                        .last_error
                        .clone()
                        .unwrap_or_else(|| NOT_INITIALIZED.to_string());
                    return Err(GatewayError::NotReady(reason));
                }
            }
        };

        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let started = Instant::now();
        let response = match tokio::time::timeout(deadline, provider.complete(&request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(GatewayError::Upstream(err)),
            Err(_) => return Err(GatewayError::Timeout(deadline)),
        };

        tracing::debug!(
            provider = provider.name(),
            messages = request.messages.len(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            latency_ms = started.elapsed().as_millis() as u64,
            "LLM completion finished"
        );

        if response.content.trim().is_empty() {
            return Err(GatewayError::EmptyResponse);
        }
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;
    use examiner_types::llm::LlmError;

    fn settings() -> GatewaySettings {
        GatewaySettings {
            model: "deepseek-chat".to_string(),
            temperature: Some(0.6),
            max_tokens: 8192,
        }
    }

    #[tokio::test]
    async fn test_new_gateway_is_not_ready() {
        let gateway = LlmGateway::new(settings());
        let status = gateway.status().await;
        assert!(!status.ready);
        assert_eq!(status.last_error.as_deref(), Some(NOT_INITIALIZED));

        let err = gateway
            .complete(vec![Message::user("hi")], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotReady(_)));
    }

    #[tokio::test]
    async fn test_mark_unavailable_reports_reason() {
        let gateway = LlmGateway::new(settings());
        gateway.install(BoxLlmProvider::new(ScriptedProvider::replying("ok"))).await;
        assert!(gateway.status().await.ready);

        gateway.mark_unavailable("api key is empty").await;
        let status = gateway.status().await;
        assert!(!status.ready);
        assert_eq!(status.last_error.as_deref(), Some("api key is empty"));

        match gateway
            .complete(vec![Message::user("hi")], Duration::from_secs(1))
            .await
        {
            Err(GatewayError::NotReady(reason)) => assert_eq!(reason, "api key is empty"),
            other => panic!("expected NotReady, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_returns_reply_and_applies_settings() {
        let provider = ScriptedProvider::replying("Good answer. Why?");
        let requests = provider.requests();
        let gateway = LlmGateway::new(settings());
        gateway.install(BoxLlmProvider::new(provider)).await;

        let reply = gateway
            .complete(
                vec![Message::system("interviewer"), Message::user("answer")],
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert_eq!(reply, "Good answer. Why?");

        let seen = requests.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "deepseek-chat");
        assert_eq!(seen[0].max_tokens, 8192);
        assert_eq!(seen[0].temperature, Some(0.6));
        assert_eq!(seen[0].messages.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_times_out() {
        let gateway = LlmGateway::new(settings());
        gateway
            .install(BoxLlmProvider::new(
                ScriptedProvider::replying("late").with_delay(Duration::from_secs(300)),
            ))
            .await;

        let err = gateway
            .complete(vec![Message::user("answer")], Duration::from_secs(180))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Timeout(d) if d == Duration::from_secs(180)));
    }

    #[tokio::test]
    async fn test_blank_reply_is_empty_response() {
        let gateway = LlmGateway::new(settings());
        gateway.install(BoxLlmProvider::new(ScriptedProvider::replying("  \n"))).await;

        let err = gateway
            .complete(vec![Message::user("answer")], Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_provider_error_is_upstream() {
        let gateway = LlmGateway::new(settings());
        gateway
            .install(BoxLlmProvider::new(ScriptedProvider::failing(|| {
                LlmError::Overloaded("busy".to_string())
            })))
            .await;

        let err = gateway
            .complete(vec![Message::user("answer")], Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Upstream(LlmError::Overloaded(_))));
    }
}
