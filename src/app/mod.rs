pub mod config;
pub mod navigation;
pub mod state;

pub use config::{AppConfig, AuthConfig, ChatConfig, LoggingConfig};
pub use navigation::{Navigator, Route, Tab};
pub use state::AppState;
