//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use examiner_types::error::{RepositoryError, TransportError};
use examiner_types::identity::UserId;
use examiner_types::llm::{CompletionRequest, CompletionResponse, LlmError, Usage};
use examiner_types::ws::WsMessage;

use crate::interview::transport::FrameSink;
use crate::llm::provider::LlmProvider;
use crate::prompt::{PromptTemplate, PromptTemplateSource};
use crate::repository::quota::QuotaRepository;

enum Script {
    Reply(String),
    Fail(Box<dyn Fn() -> LlmError + Send + Sync>),
}

/// Provider that answers every request the same way, optionally after a delay.
pub struct ScriptedProvider {
    script: Script,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedProvider {
    pub fn replying(reply: &str) -> Self {
        Self {
            script: Script::Reply(reply.to_string()),
            delay: None,
            requests: Arc::default(),
        }
    }

    pub fn failing(error: impl Fn() -> LlmError + Send + Sync + 'static) -> Self {
        Self {
            script: Script::Fail(Box::new(error)),
            delay: None,
            requests: Arc::default(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every request seen so far, shared with the provider.
    pub fn requests(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        Arc::clone(&self.requests)
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.script {
            Script::Reply(reply) => Ok(CompletionResponse {
                id: "resp-scripted".to_string(),
                content: reply.clone(),
                model: request.model.clone(),
                usage: Usage {
                    input_tokens: 10,
                    output_tokens: 20,
                },
            }),
            Script::Fail(error) => Err(error()),
        }
    }
}

#[derive(Default)]
struct SinkLog {
    frames: Mutex<Vec<String>>,
    fail_writes: AtomicBool,
    chunked: AtomicBool,
    closes: AtomicUsize,
}

/// Sink that records every frame; clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingSink {
    log: Arc<SinkLog>,
}

impl RecordingSink {
    /// Recorded frames exactly as written.
    pub fn raw_frames(&self) -> Vec<String> {
        self.log.frames.lock().unwrap().clone()
    }

    /// Recorded frames, decoded.
    pub fn frames(&self) -> Vec<WsMessage> {
        self.log
            .frames
            .lock()
            .unwrap()
            .iter()
            .map(|text| WsMessage::decode(text.as_bytes()).unwrap())
            .collect()
    }

    /// Write each frame in two halves with a yield in between, so
    /// unserialized writers would corrupt each other's frames.
    pub fn write_in_chunks(&self) {
        self.log.chunked.store(true, Ordering::SeqCst);
    }

    /// Make every later write fail.
    pub fn fail_writes(&self) {
        self.log.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.close_count() > 0
    }

    pub fn close_count(&self) -> usize {
        self.log.closes.load(Ordering::SeqCst)
    }
}

impl FrameSink for RecordingSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if self.log.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::Write("broken pipe".to_string()));
        }
        if !self.log.chunked.load(Ordering::SeqCst) {
            self.log.frames.lock().unwrap().push(text);
            return Ok(());
        }
        let mid = (0..=text.len() / 2)
            .rev()
            .find(|&i| text.is_char_boundary(i))
            .unwrap_or(0);
        let (head, tail) = text.split_at(mid);
        self.log.frames.lock().unwrap().push(head.to_string());
        tokio::task::yield_now().await;
        if let Some(last) = self.log.frames.lock().unwrap().last_mut() {
            last.push_str(tail);
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Quota store that records every commit.
#[derive(Default)]
pub struct MemoryQuotaRepository {
    quotas: Mutex<HashMap<UserId, i64>>,
    commits: Mutex<Vec<(UserId, i64)>>,
}

impl MemoryQuotaRepository {
    pub fn with_user(user_id: UserId, quota: i64) -> Self {
        let repo = Self::default();
        repo.quotas.lock().unwrap().insert(user_id, quota);
        repo
    }

    pub fn commits(&self) -> Vec<(UserId, i64)> {
        self.commits.lock().unwrap().clone()
    }
}

impl QuotaRepository for MemoryQuotaRepository {
    async fn load_quota(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        Ok(self
            .quotas
            .lock()
            .unwrap()
            .get(&user_id)
            .copied()
            .unwrap_or(0))
    }

    async fn commit_remaining_quota(
        &self,
        user_id: UserId,
        remaining_seconds: i64,
    ) -> Result<(), RepositoryError> {
        self.quotas.lock().unwrap().insert(user_id, remaining_seconds);
        self.commits.lock().unwrap().push((user_id, remaining_seconds));
        Ok(())
    }
}

/// Prompt source that always returns the same template.
pub struct StaticPrompts(PromptTemplate);

impl StaticPrompts {
    pub fn new(template: &str) -> Self {
        Self(PromptTemplate::new(template))
    }
}

impl PromptTemplateSource for StaticPrompts {
    async fn load(&self) -> PromptTemplate {
        self.0.clone()
    }
}
