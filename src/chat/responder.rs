use crate::chat::types::Attachment;

/// Produces the reply text that a send streams into the assistant message.
pub trait Responder: Send + Sync {
    fn respond(&self, content: &str, attachment: Option<&Attachment>) -> String;
}

/// Fixed templates echoing the user's text back.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedResponder;

impl Responder for CannedResponder {
    fn respond(&self, content: &str, attachment: Option<&Attachment>) -> String {
        match attachment {
            Some(_) => format!("I see you've shared an image. Here's my response about: \"{}\"", content),
            None => format!("This is a streaming response to: \"{}\"", content),
        }
    }
}

/// Splits a reply into the units appended one per tick.
pub fn tokenize(response: &str) -> Vec<String> {
    response.split_whitespace().map(str::to_string).collect()
}
