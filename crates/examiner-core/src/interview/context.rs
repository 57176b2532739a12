//! Per-topic conversational memory for one interview session.
//!
//! Each topic owns an ordered history that always starts with the system
//! persona. The stored history is never shortened; only the slice sent to
//! the model is bounded by the [`HistoryWindow`], with the system message
//! pinned at the front and older turns ageing out oldest-first.

use std::collections::HashMap;

use examiner_types::config::DEFAULT_HISTORY_WINDOW;
use examiner_types::error::InterviewError;
use examiner_types::llm::Message;

use crate::prompt::PromptTemplate;

/// Maximum number of messages sent to the model per call. Always >= 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow(usize);

impl HistoryWindow {
    pub fn new(max_messages: usize) -> Result<Self, InterviewError> {
        if max_messages < 2 {
            return Err(InterviewError::InvalidWindow(max_messages));
        }
        Ok(Self(max_messages))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self(DEFAULT_HISTORY_WINDOW)
    }
}

/// The question the model is told it asked when a topic starts.
pub fn opening_question(topic: &str) -> String {
    format!(
        "Hello, I'm your AI interviewer. Based on the question \"{topic}\", \
         please briefly describe your understanding."
    )
}

/// Select the messages to send for `history`.
///
/// Histories within the window are sent whole. Longer ones are cut to the
/// system message followed by the most recent `window - 1` messages.
pub fn truncate(history: &[Message], window: HistoryWindow) -> Vec<Message> {
    let max = window.get();
    if history.len() <= max {
        return history.to_vec();
    }

    let cutoff = (history.len() - (max - 1)).max(1);
    let mut input = Vec::with_capacity(max);
    input.push(history[0].clone());
    input.extend_from_slice(&history[cutoff..]);
    input
}

/// Topic histories owned by a single session.
#[derive(Debug, Clone, Default)]
pub struct ContextManager {
    histories: HashMap<String, Vec<Message>>,
    window: HistoryWindow,
}

impl ContextManager {
    pub fn new(window: HistoryWindow) -> Self {
        Self {
            histories: HashMap::new(),
            window,
        }
    }

    pub fn window(&self) -> HistoryWindow {
        self.window
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.histories.contains_key(topic)
    }

    pub fn history(&self, topic: &str) -> Option<&[Message]> {
        self.histories.get(topic).map(Vec::as_slice)
    }

    /// Record the candidate's answer for `topic` and return the stored history.
    ///
    /// A new topic is seeded with the rendered persona, the synthetic
    /// opening question and the answer. `template` is only invoked for new
    /// topics.
    pub fn get_or_init(
        &mut self,
        topic: &str,
        answer: &str,
        template: impl FnOnce() -> PromptTemplate,
    ) -> &[Message] {
        let history = self
            .histories
            .entry(topic.to_string())
            .or_insert_with(|| {
                vec![
                    Message::system(template().render(topic)),
                    Message::assistant(opening_question(topic)),
                ]
            });
        history.push(Message::user(answer));
        history
    }

    /// Append the model's reply to the full stored history of `topic`.
    ///
    /// Returns `false` (and stores nothing) if the topic has no history.
    pub fn append_reply(&mut self, topic: &str, reply: impl Into<String>) -> bool {
        match self.histories.get_mut(topic) {
            Some(history) => {
                history.push(Message::assistant(reply));
                true
            }
            None => false,
        }
    }
}
