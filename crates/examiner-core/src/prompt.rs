//! Interviewer persona prompt templates.
//!
//! A template is a format string with one topic placeholder. Both the
//! `{topic}` form and the older `%s` form are substituted, so existing
//! `prompt.txt` files keep working.

/// Built-in persona used when no template file is available.
pub const FALLBACK_TEMPLATE: &str = "You are a professional technical interviewer. \
The current interview question is: \"{topic}\".
Please note:
1. I will send you the candidate's answer.
2. Judge whether the answer is correct. If it is, dig deeper with a follow-up question; \
if it is not, point out the mistakes.";

/// A loaded system prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate(String);

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn fallback() -> Self {
        Self(FALLBACK_TEMPLATE.to_string())
    }

    /// Produce the system prompt for `topic`.
    ///
    /// A template without any placeholder still gets the topic, appended
    /// on its own line, so the model always knows the question.
    pub fn render(&self, topic: &str) -> String {
        if self.0.contains("{topic}") || self.0.contains("%s") {
            self.0.replace("{topic}", topic).replace("%s", topic)
        } else {
            format!("{}\n\nInterview question: {topic}", self.0.trim_end())
        }
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Source of the persona template.
///
/// Loaded each time a session starts a new topic so edits to the template
/// take effect without a restart. Implementations never fail: they fall
/// back to [`PromptTemplate::fallback`].
pub trait PromptTemplateSource: Send + Sync {
    fn load(&self) -> impl std::future::Future<Output = PromptTemplate> + Send;
}
