//! Interview session manager.
//!
//! One [`InterviewSession`] owns one live client connection. It runs two
//! independently scheduled units of work: the inbound read loop and the
//! quota clock. Both keep running while a slow LLM call is in flight: the
//! read loop drives the current answer next to the inbound stream, and the
//! session state lock is never held across the gateway call:
//!
//! 1. snapshot: record the answer and cut the model input (locked)
//! 2. call: ask the gateway under a fresh deadline (unlocked)
//! 3. commit: re-check the phase, append the reply (locked), then send it
//!
//! Teardown happens exactly once, whichever of read failure, quota
//! exhaustion or cancellation gets there first: the clock is stopped, the
//! connection closed, and the remaining quota settled.
//!
//! Lock order is `sink` before `state`; no path takes them the other way.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{Stream, StreamExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use examiner_types::config::{InterviewConfig, LlmConfig};
use examiner_types::error::TransportError;
use examiner_types::identity::UserIdentity;
use examiner_types::interview::{CloseReason, SessionPhase, SessionSummary};
use examiner_types::llm::Message;
use examiner_types::ws::WsMessage;

use super::clock::{ClockTarget, QuotaClock, QuotaMeter, TickOutcome};
use super::context::{truncate, ContextManager, HistoryWindow};
use super::transport::{FrameSink, InboundFrame};
use crate::llm::gateway::LlmGateway;
use crate::prompt::PromptTemplateSource;
use crate::repository::quota::QuotaRepository;

/// Sent when the gateway call fails for any reason.
pub const SERVICE_BUSY_NOTICE: &str =
    "AI is thinking too long or the service is busy, please retry.";

/// Sent right before the session closes on quota exhaustion.
pub const QUOTA_EXHAUSTED_NOTICE: &str = "Your AI interview time has run out.";

/// Greeting sent when the client opens the socket on a specific question.
pub fn welcome_message(topic: &str) -> String {
    format!(
        "Hello, I'm your AI interviewer.\n\nBased on the question **\"{topic}\"**, \
         please briefly describe your understanding."
    )
}

/// Tuning for a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub window: HistoryWindow,
    pub tick_interval: Duration,
    pub llm_deadline: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            window: HistoryWindow::default(),
            tick_interval: Duration::from_secs(1),
            llm_deadline: Duration::from_secs(180),
        }
    }
}

impl SessionSettings {
    /// Derive settings from configuration. An invalid window falls back to
    /// the default with a warning.
    pub fn from_config(interview: &InterviewConfig, llm: &LlmConfig) -> Self {
        let window = HistoryWindow::new(interview.history_window).unwrap_or_else(|err| {
            tracing::warn!("{err}, using {}", HistoryWindow::default().get());
            HistoryWindow::default()
        });
        Self {
            window,
            tick_interval: Duration::from_millis(interview.tick_interval_ms.max(1)),
            llm_deadline: Duration::from_secs(llm.request_timeout_secs),
        }
    }
}

/// Collaborators shared by every session of a process.
pub struct SessionServices<Q, P> {
    pub gateway: Arc<LlmGateway>,
    pub quotas: Arc<Q>,
    pub prompts: Arc<P>,
}

impl<Q, P> Clone for SessionServices<Q, P> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            quotas: Arc::clone(&self.quotas),
            prompts: Arc::clone(&self.prompts),
        }
    }
}

struct SessionState {
    phase: SessionPhase,
    meter: QuotaMeter,
    context: ContextManager,
    summary: Option<SessionSummary>,
}

/// One live interview over one client connection.
pub struct InterviewSession<S, Q, P> {
    id: Uuid,
    identity: UserIdentity,
    state: Mutex<SessionState>,
    sink: Mutex<S>,
    /// Serializes `process_answer` so only one gateway call is in flight.
    turn: Mutex<()>,
    cancel: CancellationToken,
    services: SessionServices<Q, P>,
    clock: QuotaClock,
    llm_deadline: Duration,
}

impl<S, Q, P> InterviewSession<S, Q, P>
where
    S: FrameSink,
    Q: QuotaRepository + 'static,
    P: PromptTemplateSource + 'static,
{
    /// Create an open session for `identity` with `quota` prepaid seconds.
    ///
    /// `cancel` fires once at teardown; pass a child of the server's
    /// shutdown token so a shutdown closes (and settles) every session.
    pub fn new(
        identity: UserIdentity,
        quota: i64,
        sink: S,
        services: SessionServices<Q, P>,
        settings: SessionSettings,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::now_v7(),
            identity,
            state: Mutex::new(SessionState {
                phase: SessionPhase::Open,
                meter: QuotaMeter::new(quota),
                context: ContextManager::new(settings.window),
                summary: None,
            }),
            sink: Mutex::new(sink),
            turn: Mutex::new(()),
            cancel,
            services,
            clock: QuotaClock::new(settings.tick_interval),
            llm_deadline: settings.llm_deadline,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    /// Token that ends the session when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.state.lock().await.phase
    }

    pub async fn used_seconds(&self) -> i64 {
        self.state.lock().await.meter.used()
    }

    /// Copy of the full stored history for `topic`.
    pub async fn history(&self, topic: &str) -> Option<Vec<Message>> {
        self.state
            .lock()
            .await
            .context
            .history(topic)
            .map(<[Message]>::to_vec)
    }

    /// Teardown outcome, once the session is closed.
    pub async fn summary(&self) -> Option<SessionSummary> {
        self.state.lock().await.summary.clone()
    }

    /// Greet the client: report the quota and, if the connection named a
    /// question, send the static welcome for it.
    pub async fn start(&self, initial_topic: Option<&str>) {
        let quota = self.state.lock().await.meter.quota();
        self.send_event(WsMessage::init(quota)).await;
        if let Some(topic) = initial_topic.filter(|t| !t.is_empty()) {
            self.send_event(WsMessage::chat(welcome_message(topic))).await;
        }
    }

    /// Drive the session until it closes: spawn the quota clock, read
    /// frames until the client goes away or the session is cancelled, then
    /// tear down and wait for the clock to stop.
    ///
    /// Frames are handled one at a time in arrival order, but reading never
    /// waits for a handled frame: a close or read failure during a slow
    /// model call ends the session at once and abandons the call.
    pub async fn run<I>(self: Arc<Self>, mut inbound: I) -> Option<SessionSummary>
    where
        I: Stream<Item = Result<InboundFrame, TransportError>> + Send + Unpin,
    {
        let clock = {
            let session = Arc::clone(&self);
            let cancel = self.cancel.clone();
            tokio::spawn(async move { session.clock.run(session.as_ref(), cancel).await })
        };

        let mut queued: VecDeque<Vec<u8>> = VecDeque::new();
        let mut in_flight: Option<BoxFuture<'static, ()>> = None;

        let reason = loop {
            if in_flight.is_none() {
                in_flight = queued.pop_front().map(|raw| {
                    let session = Arc::clone(&self);
                    let handling: BoxFuture<'static, ()> = Box::pin(async move {
                        session.handle_inbound_frame(&raw).await;
                    });
                    handling
                });
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break CloseReason::Shutdown,
                () = async {
                    if let Some(handling) = in_flight.as_mut() {
                        handling.await;
                    }
                }, if in_flight.is_some() => in_flight = None,
                frame = inbound.next() => match frame {
                    Some(Ok(InboundFrame::Data(raw))) => queued.push_back(raw),
                    Some(Ok(InboundFrame::Close)) | None => break CloseReason::ClientClosed,
                    Some(Err(err)) => {
                        tracing::debug!(session_id = %self.id, error = %err, "Interview read failed");
                        break CloseReason::TransportError;
                    }
                },
            }
        };

        // The abandoned frame may hold the sink lock that teardown needs.
        drop(in_flight);
        if !queued.is_empty() {
            tracing::debug!(session_id = %self.id, dropped = queued.len(), "Dropping unhandled frames");
        }
        self.close(reason).await;
        if let Err(err) = clock.await {
            tracing::warn!(session_id = %self.id, error = %err, "Quota clock task failed");
        }
        self.summary().await
    }

    /// Send one envelope to the client.
    ///
    /// Dropped silently once the session is no longer open. A failed write
    /// is terminal and tears the session down.
    pub async fn send_event(&self, message: WsMessage) {
        let text = match message.encode() {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(session_id = %self.id, error = %err, "Failed to encode envelope");
                return;
            }
        };

        let write_result = {
            let mut sink = self.sink.lock().await;
            if self.state.lock().await.phase != SessionPhase::Open {
                return;
            }
            sink.send_text(text).await
        };

        if let Err(err) = write_result {
            tracing::debug!(session_id = %self.id, error = %err, "Interview write failed");
            self.close(CloseReason::TransportError).await;
        }
    }

    /// Decode a raw client frame and act on it.
    ///
    /// Malformed frames and anything other than a complete `chat` answer
    /// are discarded; the session stays open.
    pub async fn handle_inbound_frame(&self, raw: &[u8]) {
        let Some(message) = WsMessage::decode(raw) else {
            tracing::debug!(session_id = %self.id, bytes = raw.len(), "Discarding malformed frame");
            return;
        };
        let Some(input) = message.chat_input() else {
            tracing::trace!(session_id = %self.id, kind = ?message.kind, "Ignoring frame");
            return;
        };
        self.process_answer(&input.topic, &input.answer).await;
    }

    /// Evaluate the candidate's `answer` for `topic` and send the model's reply.
    ///
    /// A gateway failure produces one `error` event and leaves the history
    /// without an assistant reply; the session stays open. A reply that
    /// arrives after the session closed is discarded.
    pub async fn process_answer(&self, topic: &str, answer: &str) {
        let _turn = self.turn.lock().await;

        let is_new_topic = {
            let state = self.state.lock().await;
            if state.phase != SessionPhase::Open {
                return;
            }
            !state.context.contains(topic)
        };
        let mut template = if is_new_topic {
            Some(self.services.prompts.load().await)
        } else {
            None
        };

        let input = {
            let mut state = self.state.lock().await;
            if state.phase != SessionPhase::Open {
                return;
            }
            let window = state.context.window();
            let history =
                state
                    .context
                    .get_or_init(topic, answer, || template.take().unwrap_or_default());
            truncate(history, window)
        };

        tracing::debug!(
            session_id = %self.id,
            user_id = self.identity.user_id,
            %topic,
            messages = input.len(),
            "Asking LLM"
        );

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                tracing::debug!(session_id = %self.id, %topic, "Session closed while waiting for LLM");
                return;
            }
            outcome = self.services.gateway.complete(input, self.llm_deadline) => outcome,
        };

        match outcome {
            Ok(reply) => {
                {
                    let mut state = self.state.lock().await;
                    if state.phase != SessionPhase::Open {
                        tracing::debug!(session_id = %self.id, %topic, "Discarding reply for closed session");
                        return;
                    }
                    state.context.append_reply(topic, reply.clone());
                }
                self.send_event(WsMessage::chat(reply)).await;
            }
            Err(err) => {
                tracing::error!(
                    session_id = %self.id,
                    user_id = self.identity.user_id,
                    %topic,
                    error = %err,
                    "AI interview chat failed"
                );
                self.send_event(WsMessage::error(SERVICE_BUSY_NOTICE)).await;
            }
        }
    }

    /// Tear the session down. Only the first call does anything; later or
    /// concurrent calls return `None`.
    pub async fn close(&self, reason: CloseReason) -> Option<SessionSummary> {
        let meter = {
            let mut state = self.state.lock().await;
            if state.phase != SessionPhase::Open {
                return None;
            }
            state.phase = SessionPhase::Closing;
            state.meter
        };

        self.cancel.cancel();
        self.sink.lock().await.close().await;

        let settled = match meter.settlement() {
            Some(remaining) => match self
                .services
                .quotas
                .commit_remaining_quota(self.identity.user_id, remaining)
                .await
            {
                Ok(()) => true,
                Err(err) => {
                    tracing::error!(
                        session_id = %self.id,
                        user_id = self.identity.user_id,
                        remaining,
                        error = %err,
                        "Failed to settle interview quota"
                    );
                    false
                }
            },
            None => false,
        };

        let summary = SessionSummary {
            reason,
            used_seconds: meter.used(),
            remaining_seconds: meter.remaining(),
            settled,
        };
        tracing::info!(
            session_id = %self.id,
            user_id = self.identity.user_id,
            username = %self.identity.username,
            %reason,
            used_seconds = summary.used_seconds,
            remaining_seconds = summary.remaining_seconds,
            "Interview session ended"
        );

        let mut state = self.state.lock().await;
        state.phase = SessionPhase::Closed;
        state.summary = Some(summary.clone());
        Some(summary)
    }
}

impl<S, Q, P> ClockTarget for InterviewSession<S, Q, P>
where
    S: FrameSink,
    Q: QuotaRepository + 'static,
    P: PromptTemplateSource + 'static,
{
    async fn meter_tick(&self, period: Duration) -> TickOutcome {
        let mut state = self.state.lock().await;
        if state.phase != SessionPhase::Open {
            return TickOutcome::Closed;
        }
        state.meter.tick(period)
    }

    async fn quota_exhausted(&self) {
        self.send_event(WsMessage::quota_exhausted(QUOTA_EXHAUSTED_NOTICE))
            .await;
        self.close(CloseReason::QuotaExhausted).await;
    }
}
