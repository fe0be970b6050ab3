use pocketchat::auth::UserProfile;
use pocketchat::chat::{ChatEvent, Message, MessageRole};

/// Terminal text for a change event, written without a trailing newline so
/// streamed deltas land on the same line.
pub fn render_event(event: &ChatEvent) -> Option<String> {
    match event {
        ChatEvent::MessageAppended(message) => match message.role {
            MessageRole::User => message
                .attachment
                .as_ref()
                .map(|a| format!("  [attached {}]\n", a.uri())),
            MessageRole::Assistant => Some("assistant: ".to_string()),
        },
        ChatEvent::ContentAppended { delta, .. } => Some(delta.clone()),
        ChatEvent::StreamingFinished { .. } => Some("\n".to_string()),
        ChatEvent::Cleared => Some("(conversation cleared)\n".to_string()),
        ChatEvent::LoadingChanged(_) => None,
    }
}

pub fn render_message(message: &Message) -> String {
    let speaker = match message.role {
        MessageRole::User => "you",
        MessageRole::Assistant => "assistant",
    };

    let mut line = format!("{}: {}", speaker, message.content.trim_end());
    if let Some(attachment) = &message.attachment {
        line.push_str(&format!(" [image {}]", attachment.uri()));
    }
    if message.is_streaming {
        line.push_str(" …");
    }
    line
}

pub fn render_profile(profile: &UserProfile) -> String {
    let avatar = match &profile.avatar_uri {
        Some(uri) => uri.clone(),
        None => format!("({})", profile.initials()),
    };
    format!("Name:   {}\nEmail:  {}\nAvatar: {}", profile.name, profile.email, avatar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pocketchat::chat::Attachment;

    #[test]
    fn test_stream_renders_inline() {
        let assistant = Message::assistant_placeholder(1);
        let events = vec![
            ChatEvent::LoadingChanged(true),
            ChatEvent::MessageAppended(assistant.clone()),
            ChatEvent::ContentAppended { message_id: assistant.id.clone(), delta: "Hello ".to_string() },
            ChatEvent::ContentAppended { message_id: assistant.id.clone(), delta: "there ".to_string() },
            ChatEvent::StreamingFinished { message_id: assistant.id.clone() },
        ];

        let out: String = events.iter().filter_map(render_event).collect();
        assert_eq!(out, "assistant: Hello there \n");
    }

    #[test]
    fn test_user_echo_only_for_attachments() {
        let plain = Message::user("hi", None, 1);
        assert_eq!(render_event(&ChatEvent::MessageAppended(plain)), None);

        let with_image = Message::user("", Some(Attachment::image("file:///a.png")), 1);
        assert_eq!(
            render_event(&ChatEvent::MessageAppended(with_image)),
            Some("  [attached file:///a.png]\n".to_string())
        );
    }

    #[test]
    fn test_render_message() {
        let message = Message::user("look", Some(Attachment::image("file:///a.png")), 1);
        assert_eq!(render_message(&message), "you: look [image file:///a.png]");

        let streaming = Message::assistant_placeholder(2);
        assert_eq!(render_message(&streaming), "assistant:  …");
    }

    #[test]
    fn test_render_profile_without_avatar() {
        let profile = UserProfile::new("Test User", "test@example.com");
        assert_eq!(
            render_profile(&profile),
            "Name:   Test User\nEmail:  test@example.com\nAvatar: (TU)"
        );
    }
}
