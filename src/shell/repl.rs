use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use pocketchat::app::{AppState, Navigator, Route, Tab};
use pocketchat::auth::ProfilePatch;
use pocketchat::chat::{Attachment, ChatError, ChatSession, StreamOutcome};
use pocketchat::error::{Error, Result};
use pocketchat::platform::{pick_image, FileImagePicker};

use crate::shell::commands::{help_text, parse_command, Command};
use crate::shell::render::{render_event, render_message, render_profile};

/// Live chat screen: the session plus the task printing its events.
struct ChatScreen {
    session: Arc<ChatSession>,
    renderer: JoinHandle<()>,
}

impl ChatScreen {
    fn open(state: &AppState) -> Self {
        let session = state.new_chat_session();
        let mut events = session.subscribe();

        let renderer = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if let Some(text) = render_event(&event) {
                            let mut stdout = std::io::stdout().lock();
                            let _ = stdout.write_all(text.as_bytes());
                            let _ = stdout.flush();
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => warn!("Renderer skipped {} chat events", skipped),
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self { session, renderer }
    }

    fn close(self) {
        self.session.dispose();
        self.renderer.abort();
    }
}

/// Image staged for the next message. Shared with in-flight sends so a
/// rejected send can put its image back.
#[derive(Clone, Default)]
struct PendingImage(Arc<Mutex<Option<Attachment>>>);

impl PendingImage {
    fn stage(&self, attachment: Attachment) {
        *self.0.lock() = Some(attachment);
    }

    fn take(&self) -> Option<Attachment> {
        self.0.lock().take()
    }

    fn is_staged(&self) -> bool {
        self.0.lock().is_some()
    }

    /// Put a rejected image back unless another one was staged meanwhile.
    fn restore(&self, attachment: Option<Attachment>) {
        if let Some(attachment) = attachment {
            self.0.lock().get_or_insert(attachment);
        }
    }
}

/// Send `text` with `attachment`, restaging the image if the session was
/// still busy with the previous reply.
async fn deliver(
    session: &ChatSession,
    text: String,
    attachment: Option<Attachment>,
    pending: &PendingImage,
) -> std::result::Result<StreamOutcome, ChatError> {
    let result = session.send_message(text, attachment.clone()).await;
    if matches!(result, Err(ChatError::SendInFlight)) {
        pending.restore(attachment);
    }
    result
}

pub struct Shell {
    state: Arc<AppState>,
    nav: Navigator,
    chat: Option<ChatScreen>,
    pending_image: PendingImage,
}

impl Shell {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            nav: Navigator::new(),
            chat: None,
            pending_image: PendingImage::default(),
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let mut auth_rx = self.state.auth().subscribe();
        let restored = self.state.auth().restore().await;
        auth_rx.borrow_and_update();
        self.on_auth_changed(restored.is_authenticated());

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            prompt(self.nav.current());

            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if !self.handle_line(&line).await {
                        break;
                    }
                }
                changed = auth_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let authenticated = auth_rx.borrow_and_update().is_authenticated();
                    println!();
                    self.on_auth_changed(authenticated);
                }
            }
        }

        if let Some(chat) = self.chat.take() {
            chat.close();
        }
        info!("Shell closed");
        Ok(())
    }

    fn on_auth_changed(&mut self, authenticated: bool) {
        let route = self.nav.on_auth_changed(authenticated);

        if authenticated {
            if self.chat.is_none() {
                self.chat = Some(ChatScreen::open(&self.state));
            }
        } else if let Some(chat) = self.chat.take() {
            chat.close();
            self.pending_image.take();
        }

        banner(route);
    }

    /// Returns `false` when the user asked to quit.
    async fn handle_line(&mut self, line: &str) -> bool {
        let command = parse_command(self.nav.current(), line);
        debug!("Shell command on {}: {:?}", self.nav.current(), command);

        match command {
            Command::Quit => return false,
            Command::Empty => {}
            Command::Help => println!("{}", help_text(self.nav.current())),
            Command::Unknown(input) => println!("Unknown command: {} (try /help)", input),
            Command::Login { email, password } => match self.state.auth().login(&email, &password).await {
                Ok(true) => {}
                Ok(false) => alert("Invalid credentials"),
                Err(e) => failure("Could not sign in", &e),
            },
            Command::Logout => {
                if let Err(e) = self.state.auth().logout().await {
                    failure("Could not sign out", &e);
                }
            }
            Command::Go(tab) => {
                let authenticated = self.state.auth().is_authenticated();
                banner(self.nav.navigate(Route::Tabs(tab), authenticated));
            }
            Command::Send(text) => self.send(text),
            Command::AttachImage(path) => self.attach(&path).await,
            Command::DetachImage => match self.pending_image.take() {
                Some(_) => println!("Attached image removed."),
                None => println!("No image attached."),
            },
            Command::Clear => {
                if let Some(chat) = &self.chat {
                    chat.session.clear_chat();
                }
            }
            Command::History => {
                if let Some(chat) = &self.chat {
                    for message in chat.session.messages() {
                        println!("{}", render_message(&message));
                    }
                }
            }
            Command::ShowProfile => match self.state.auth().profile() {
                Some(profile) => println!("{}", render_profile(&profile)),
                None => println!("Not signed in."),
            },
            Command::SetName(name) => self.update_profile(ProfilePatch::name(name)).await,
            Command::SetEmail(email) => self.update_profile(ProfilePatch::email(email)).await,
            Command::SetAvatar(path) => match pick_image(&FileImagePicker::new(path)).await {
                Some(uri) => self.update_profile(ProfilePatch::avatar(uri)).await,
                None => println!("No image selected."),
            },
        }

        true
    }

    fn send(&mut self, text: String) {
        let Some(chat) = &self.chat else { return };

        if chat.session.is_loading() {
            alert("Still responding, wait for the reply to finish");
            return;
        }
        if text.trim().is_empty() && !self.pending_image.is_staged() {
            println!("Nothing to send. Type a message or attach an image first.");
            return;
        }

        let session = chat.session.clone();
        let pending = self.pending_image.clone();
        let attachment = pending.take();
        tokio::spawn(async move {
            match deliver(&session, text, attachment, &pending).await {
                Ok(outcome) => debug!("Send finished: {:?}", outcome),
                Err(ChatError::SendInFlight) => alert("Still responding, wait for the reply to finish"),
                Err(ChatError::Disposed) => {}
                Err(e) => failure("Could not send message", &Error::from(e)),
            }
        });
    }

    async fn attach(&mut self, path: &Path) {
        match pick_image(&FileImagePicker::new(path)).await {
            Some(uri) => {
                println!("Image attached to your next message.");
                self.pending_image.stage(Attachment::image(uri));
            }
            None => println!("No image selected."),
        }
    }

    async fn update_profile(&self, patch: ProfilePatch) {
        match self.state.auth().update_profile(patch).await {
            Ok(Some(profile)) => println!("{}", render_profile(&profile)),
            Ok(None) => println!("Not signed in."),
            Err(Error::Validation(reason)) => alert(&reason),
            Err(e) => failure("Could not save your profile", &e),
        }
    }
}

fn prompt(route: Route) {
    print!("{}> ", route);
    let _ = std::io::stdout().flush();
}

fn banner(route: Route) {
    match route {
        Route::Login => println!("== Login ==  (login <email> <password>, /help)"),
        Route::Tabs(Tab::Chat) => println!("== Chat ==  (type a message, /help)"),
        Route::Tabs(Tab::Profile) => println!("== Profile ==  (show, /help)"),
    }
}

fn alert(message: &str) {
    println!("[!] {}", message);
}

/// Generic user-facing alert; the detail only goes to the log.
fn failure(context: &str, err: &Error) {
    error!("{}: {}", context, err);
    alert("Something went wrong. Please try again.");
}
