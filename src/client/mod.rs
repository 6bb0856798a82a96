pub mod decoder;
pub mod session;
pub mod terminal;
pub mod transport;

use log::{ info, warn };

use crate::models::api::ErrorReply;
use crate::models::chat::ChatMessage;
use self::transport::ClientError;

pub const GENERIC_ERROR: &str = "Something went wrong. Please try again.";

/// Ordered transcript. Messages are only ever appended, and only the content
/// of an existing message can change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn with_greeting(greeting: &str) -> Self {
        Self { messages: vec![ChatMessage::assistant(greeting)] }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Appends `fragment` to the message with `id`. Returns `false` if there
    /// is no such message.
    pub fn append_content(&mut self, id: &str, fragment: &str) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.content.push_str(fragment);
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    pub remaining_seconds: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    pub transcript: Transcript,
    pub input: String,
    pub loading: bool,
    pub error: Option<String>,
    pub rate_limit: Option<RateLimitState>,
}

/// Owns the state of one conversation and applies every transition to it.
/// It performs no I/O; `session::Session` feeds it network events.
#[derive(Debug, Clone)]
pub struct TranscriptController {
    state: ChatState,
}

impl TranscriptController {
    pub fn new(greeting: &str) -> Self {
        Self {
            state: ChatState {
                transcript: Transcript::with_greeting(greeting),
                ..ChatState::default()
            },
        }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn set_input(&mut self, text: &str) {
        self.state.input = text.to_string();
    }

    pub fn countdown_active(&self) -> bool {
        self.state.rate_limit.is_some()
    }

    pub fn can_submit(&self) -> bool {
        !self.state.loading && !self.countdown_active()
    }

    /// Records a user turn and returns the transcript to send, or `None` when
    /// the text is blank or submission is currently disabled.
    pub fn submit(&mut self, text: &str) -> Option<Vec<ChatMessage>> {
        if text.trim().is_empty() || !self.can_submit() {
            return None;
        }

        self.state.transcript.push(ChatMessage::user(text));
        self.state.input.clear();
        self.state.loading = true;
        self.state.error = None;
        Some(self.state.transcript.messages().to_vec())
    }

    /// Adds the empty assistant message that streamed fragments grow into.
    pub fn begin_reply(&mut self) -> String {
        let message = ChatMessage::assistant("");
        let id = message.id.clone();
        self.state.transcript.push(message);
        id
    }

    pub fn append_fragment(&mut self, id: &str, fragment: &str) {
        if !self.state.transcript.append_content(id, fragment) {
            warn!("Dropping fragment for unknown message {}", id);
        }
    }

    pub fn finish_reply(&mut self) {
        self.state.loading = false;
    }

    pub fn fail(&mut self, err: &ClientError) {
        warn!("Chat request failed: {}", err);
        self.state.loading = false;
        self.state.error = Some(format!("{} {}", GENERIC_ERROR, err));
    }

    /// Applies a non-success reply. A 429 carrying `retryAfter` also starts
    /// the countdown that keeps submission disabled.
    pub fn apply_error_response(&mut self, status: u16, body: &[u8]) {
        let reply: ErrorReply = serde_json::from_slice(body).unwrap_or_default();
        self.state.loading = false;

        match (status, reply.retry_after) {
            (429, Some(retry_after)) => {
                info!("Rate limited by server; input disabled for {}s", retry_after);
                self.state.error = Some(
                    reply.message.or(reply.error).unwrap_or_else(|| "Rate limit exceeded".to_string())
                );
                if retry_after > 0 {
                    self.state.rate_limit = Some(RateLimitState { remaining_seconds: retry_after });
                }
            }
            _ => {
                self.state.error = Some(reply.error.unwrap_or_else(|| GENERIC_ERROR.to_string()));
            }
        }
    }

    /// One second of countdown. Returns `true` if the state changed.
    pub fn tick(&mut self) -> bool {
        let Some(limit) = self.state.rate_limit.as_mut() else {
            return false;
        };
        limit.remaining_seconds = limit.remaining_seconds.saturating_sub(1);
        if limit.remaining_seconds == 0 {
            self.state.rate_limit = None;
            self.state.error = None;
        }
        true
    }
}
