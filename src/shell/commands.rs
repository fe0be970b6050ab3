use std::path::PathBuf;

use pocketchat::app::{Route, Tab};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { email: String, password: String },
    Send(String),
    AttachImage(PathBuf),
    DetachImage,
    Clear,
    History,
    Go(Tab),
    ShowProfile,
    SetName(String),
    SetEmail(String),
    SetAvatar(PathBuf),
    Logout,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

/// Interpret one input line for the screen the user is looking at.
pub fn parse_command(route: Route, line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head {
        "/quit" | "/exit" => return Command::Quit,
        "/help" => return Command::Help,
        _ => {}
    }

    match route {
        Route::Login => match head {
            "login" => {
                let mut parts = rest.split_whitespace();
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(email), Some(password), None) => Command::Login {
                        email: email.to_string(),
                        password: password.to_string(),
                    },
                    _ => Command::Unknown(line.to_string()),
                }
            }
            _ => Command::Unknown(line.to_string()),
        },
        Route::Tabs(Tab::Chat) => match head {
            "/image" if rest == "clear" => Command::DetachImage,
            "/image" if !rest.is_empty() => Command::AttachImage(PathBuf::from(rest)),
            "/send" => Command::Send(rest.to_string()),
            "/clear" => Command::Clear,
            "/history" => Command::History,
            "/profile" => Command::Go(Tab::Profile),
            "/logout" => Command::Logout,
            _ if head.starts_with('/') => Command::Unknown(line.to_string()),
            _ => Command::Send(line.to_string()),
        },
        Route::Tabs(Tab::Profile) => match head {
            "show" => Command::ShowProfile,
            "name" if !rest.is_empty() => Command::SetName(rest.to_string()),
            "email" if !rest.is_empty() => Command::SetEmail(rest.to_string()),
            "avatar" if !rest.is_empty() => Command::SetAvatar(PathBuf::from(rest)),
            "/chat" => Command::Go(Tab::Chat),
            "/logout" => Command::Logout,
            _ => Command::Unknown(line.to_string()),
        },
    }
}

pub fn help_text(route: Route) -> &'static str {
    match route {
        Route::Login => "login <email> <password>   sign in\n/quit                      exit",
        Route::Tabs(Tab::Chat) => {
            "<text>          send a message\n\
             /image <path>   attach an image to the next message\n\
             /image clear    remove the attached image\n\
             /send [text]    send, with the attached image even if text is empty\n\
             /clear          clear the conversation\n\
             /history        reprint the conversation\n\
             /profile        open the profile tab\n\
             /logout         sign out\n\
             /quit           exit"
        }
        Route::Tabs(Tab::Profile) => {
            "show            print the profile\n\
             name <name>     change the display name\n\
             email <email>   change the email address\n\
             avatar <path>   pick an avatar image\n\
             /chat           back to the chat tab\n\
             /logout         sign out\n\
             /quit           exit"
        }
    }
}
