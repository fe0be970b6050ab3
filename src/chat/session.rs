use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chat::responder::{tokenize, CannedResponder, Responder};
use crate::chat::types::{
    now_millis, Attachment, ChatError, ChatEvent, ChatSnapshot, Message, StreamOutcome,
};

/// Configuration for a chat session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Pause before each token is appended to the streaming message.
    pub token_delay: Duration,
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_delay: Duration::from_millis(100),
            event_capacity: 256,
        }
    }
}

/// In-memory message log with a single-flight, cancellable streaming send.
///
/// The session is owned by whoever renders it. Observers call [`subscribe`]
/// and re-read [`snapshot`] (or apply the event deltas) after each
/// notification. Nothing here is persisted.
///
/// [`subscribe`]: ChatSession::subscribe
/// [`snapshot`]: ChatSession::snapshot
pub struct ChatSession {
    id: String,
    state: RwLock<ChatSnapshot>,
    busy: AtomicBool,
    events: broadcast::Sender<ChatEvent>,
    cancel: CancellationToken,
    responder: Arc<dyn Responder>,
    config: SessionConfig,
}

impl ChatSession {
    pub fn new(config: SessionConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let id = Uuid::new_v4().to_string();
        debug!("Created chat session {}", id);

        Self {
            id,
            state: RwLock::new(ChatSnapshot::default()),
            busy: AtomicBool::new(false),
            events,
            cancel: CancellationToken::new(),
            responder: Arc::new(CannedResponder),
            config,
        }
    }

    pub fn with_responder(mut self, responder: Arc<dyn Responder>) -> Self {
        self.responder = responder;
        self
    }

    /// Ties the session's lifetime to an owner: cancelling `parent` disposes it.
    pub fn with_cancellation(mut self, parent: &CancellationToken) -> Self {
        self.cancel = parent.child_token();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        self.state.read().clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.read().messages.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().is_loading
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Append a user message and stream the assistant's reply into the log.
    ///
    /// Rejects empty input, overlapping sends and disposed sessions without
    /// touching the log. Dropping the returned future mid-stream leaves the
    /// partial reply in place and settles the streaming and loading flags.
    pub async fn send_message(
        &self,
        content: impl Into<String>,
        attachment: Option<Attachment>,
    ) -> Result<StreamOutcome, ChatError> {
        let content = content.into();

        if self.is_disposed() {
            return Err(ChatError::Disposed);
        }
        if content.trim().is_empty() && attachment.is_none() {
            return Err(ChatError::EmptyMessage);
        }

        let _busy = BusyGuard::acquire(&self.busy)?;

        let timestamp = now_millis();
        let user_message = Message::user(content.clone(), attachment.clone(), timestamp);
        let assistant_message = Message::assistant_placeholder(timestamp + 1);
        let assistant_id = assistant_message.id.clone();

        {
            let mut state = self.state.write();
            state.messages.push(user_message.clone());
            self.emit(ChatEvent::MessageAppended(user_message));

            state.is_loading = true;
            self.emit(ChatEvent::LoadingChanged(true));

            state.messages.push(assistant_message.clone());
            self.emit(ChatEvent::MessageAppended(assistant_message));
        }

        let _stream = StreamGuard {
            session: self,
            message_id: assistant_id.clone(),
        };

        let reply = self.responder.respond(&content, attachment.as_ref());
        let tokens = tokenize(&reply);
        debug!("Session {} streaming {} tokens into {}", self.id, tokens.len(), assistant_id);

        let outcome = self.stream_tokens(&assistant_id, tokens).await;
        match outcome {
            StreamOutcome::Completed => debug!("Session {} finished streaming {}", self.id, assistant_id),
            StreamOutcome::Cancelled => info!("Session {} disposed mid-stream", self.id),
            StreamOutcome::Cleared => info!("Session {} cleared mid-stream", self.id),
        }

        Ok(outcome)
    }

    /// Drop every message. Emits nothing when the log is already empty.
    pub fn clear_chat(&self) {
        let mut state = self.state.write();
        if state.messages.is_empty() {
            return;
        }

        let removed = state.messages.len();
        state.messages.clear();
        self.emit(ChatEvent::Cleared);
        debug!("Cleared {} messages from session {}", removed, self.id);
    }

    /// Stop any in-flight stream and refuse further sends.
    pub fn dispose(&self) {
        if !self.cancel.is_cancelled() {
            info!("Disposing chat session {}", self.id);
            self.cancel.cancel();
        }
    }

    async fn stream_tokens(&self, message_id: &str, tokens: Vec<String>) -> StreamOutcome {
        for token in tokens {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return StreamOutcome::Cancelled,
                _ = tokio::time::sleep(self.config.token_delay) => {}
            }

            if let Err(outcome) = self.append_token(message_id, &token) {
                return outcome;
            }
        }

        StreamOutcome::Completed
    }

    fn append_token(&self, message_id: &str, token: &str) -> Result<(), StreamOutcome> {
        let mut state = self.state.write();

        // A dispose can land between the timer firing and this lock.
        if self.cancel.is_cancelled() {
            return Err(StreamOutcome::Cancelled);
        }

        let message = state
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(StreamOutcome::Cleared)?;

        let delta = format!("{} ", token);
        message.content.push_str(&delta);
        self.emit(ChatEvent::ContentAppended {
            message_id: message_id.to_string(),
            delta,
        });

        Ok(())
    }

    fn complete_stream(&self, message_id: &str) {
        let mut state = self.state.write();

        if let Some(message) = state
            .messages
            .iter_mut()
            .find(|m| m.id == message_id && m.is_streaming)
        {
            message.is_streaming = false;
            self.emit(ChatEvent::StreamingFinished {
                message_id: message_id.to_string(),
            });
        }

        if state.is_loading {
            state.is_loading = false;
            self.emit(ChatEvent::LoadingChanged(false));
        }
    }

    fn emit(&self, event: ChatEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Clears the `busy` flag on drop so a cancelled send never wedges the session.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ChatError> {
        if flag
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            warn!("Rejected send while another response is streaming");
            return Err(ChatError::SendInFlight);
        }
        Ok(Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Moves the assistant message to `complete` and ends loading, however the send exits.
struct StreamGuard<'a> {
    session: &'a ChatSession,
    message_id: String,
}

impl Drop for StreamGuard<'_> {
    fn drop(&mut self) {
        self.session.complete_stream(&self.message_id);
    }
}
