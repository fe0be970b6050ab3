pub mod responder;
pub mod session;
pub mod types;

pub use responder::{tokenize, CannedResponder, Responder};
pub use session::{ChatSession, SessionConfig};
pub use types::{
    Attachment, ChatError, ChatEvent, ChatSnapshot, Message, MessageRole, StreamOutcome,
};
