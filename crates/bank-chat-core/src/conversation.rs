//! Client-side conversation state
//!
//! `Conversation` owns the message log, the loading flag and the backend session
//! id. It is the only state a front-end reads to render the chat, and the only
//! place that state changes.
//!
//! Sending is split in two so an event loop can keep ownership of the state while
//! the HTTP call runs elsewhere:
//!
//! ```text
//! begin_send(text) -> PendingSend   (user message appended, loading = true)
//! backend.send_message(...)         (no access to the conversation needed)
//! complete(pending, result)         (assistant reply appended, loading = false)
//! ```
//!
//! `send_message` does all three in one `await` for callers that can block.

use crate::api::{ChatBackend, ChatResponse};
use crate::error::{BackendError, ConversationError};
use crate::state::ChatMessage;

#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    loading: bool,
    session_id: Option<String>,
    next_id: u64,
    epoch: u64,
}

/// A request that has been recorded in the log but not answered yet.
#[derive(Debug, Clone)]
pub struct PendingSend {
    message: String,
    session_id: Option<String>,
    epoch: u64,
}

impl PendingSend {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation that continues an existing backend session.
    pub fn with_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Record the user's message and mark the conversation as waiting.
    ///
    /// Only one request may be outstanding at a time; a second call before
    /// `complete` is rejected and leaves the log untouched.
    pub fn begin_send(&mut self, text: &str) -> Result<PendingSend, ConversationError> {
        if self.loading {
            return Err(ConversationError::RequestInFlight);
        }

        let id = self.allocate_id();
        self.messages.push(ChatMessage::user(id, text));
        self.loading = true;

        Ok(PendingSend {
            message: text.to_string(),
            session_id: self.session_id.clone(),
            epoch: self.epoch,
        })
    }

    /// Apply the backend's answer (or failure) for a pending send.
    ///
    /// Returns false when the pending send belongs to a conversation that has
    /// since been cleared; such results are dropped.
    pub fn complete(
        &mut self,
        pending: PendingSend,
        result: Result<ChatResponse, BackendError>,
    ) -> bool {
        if pending.epoch != self.epoch {
            tracing::debug!(
                stale_epoch = pending.epoch,
                epoch = self.epoch,
                ok = result.is_ok(),
                "dropping reply for a cleared conversation"
            );
            return false;
        }

        let id = self.allocate_id();
        match result {
            Ok(response) => {
                if self.session_id.is_none() {
                    if let Some(session_id) = response.session_id {
                        tracing::info!(%session_id, "backend session started");
                        self.session_id = Some(session_id);
                    }
                }

                self.messages.push(ChatMessage::assistant(
                    id,
                    response.answer,
                    response.sources.unwrap_or_default(),
                    response.method,
                    response.escalate.unwrap_or(false),
                ));
            }
            Err(err) => {
                tracing::error!(error = %err, timeout = err.is_timeout(), "error sending message");
                self.messages.push(ChatMessage::failure(id));
            }
        }

        self.loading = false;
        true
    }

    /// Send a message and wait for the answer.
    pub async fn send_message<B>(&mut self, backend: &B, text: &str) -> Result<(), ConversationError>
    where
        B: ChatBackend + ?Sized,
    {
        let pending = self.begin_send(text)?;
        let result = backend
            .send_message(pending.message(), pending.session_id())
            .await;
        self.complete(pending, result);
        Ok(())
    }

    /// Empty the log and forget the session.
    ///
    /// A request still in flight is abandoned: its reply will be dropped by
    /// `complete`, and the conversation is immediately ready for a new message.
    pub fn clear_chat(&mut self) {
        self.messages.clear();
        self.session_id = None;
        self.loading = false;
        self.epoch += 1;
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}
