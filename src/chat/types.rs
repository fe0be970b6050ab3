use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Represents a single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default)]
    pub is_streaming: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

impl Message {
    pub fn user(content: impl Into<String>, attachment: Option<Attachment>, timestamp: i64) -> Self {
        Self {
            id: format!("user-{}", Uuid::new_v4()),
            role: MessageRole::User,
            content: content.into(),
            timestamp,
            is_streaming: false,
            attachment,
        }
    }

    /// Empty assistant message that content will be streamed into.
    pub fn assistant_placeholder(timestamp: i64) -> Self {
        Self {
            id: format!("ai-{}", Uuid::new_v4()),
            role: MessageRole::Assistant,
            content: String::new(),
            timestamp,
            is_streaming: true,
            attachment: None,
        }
    }
}

/// Role of the message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Attachment carried by a user message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Attachment {
    Image { uri: String },
}

impl Attachment {
    pub fn image(uri: impl Into<String>) -> Self {
        Self::Image { uri: uri.into() }
    }

    pub fn uri(&self) -> &str {
        match self {
            Self::Image { uri } => uri,
        }
    }
}

/// Point-in-time copy of a session's observable state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSnapshot {
    pub messages: Vec<Message>,
    pub is_loading: bool,
}

impl ChatSnapshot {
    pub fn streaming_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_streaming).count()
    }
}

/// Change notifications, emitted in the order mutations are applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    MessageAppended(Message),
    LoadingChanged(bool),
    ContentAppended { message_id: String, delta: String },
    StreamingFinished { message_id: String },
    Cleared,
}

/// How a send's token stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed,
    /// The session was disposed before every token was appended.
    Cancelled,
    /// The assistant message was removed by a clear mid-stream.
    Cleared,
}

/// Errors specific to chat operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("Message has neither text nor an attachment")]
    EmptyMessage,

    #[error("A response is still streaming")]
    SendInFlight,

    #[error("Chat session has been disposed")]
    Disposed,
}

impl From<ChatError> for Error {
    fn from(err: ChatError) -> Self {
        Error::Chat(err.to_string())
    }
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
