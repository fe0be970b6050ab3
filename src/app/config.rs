use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::info;

use crate::auth::Credentials;
use crate::chat::SessionConfig;
use crate::error::{Error, Result};
use crate::platform::AppPaths;

/// Prefix for environment overrides, e.g. `POCKETCHAT__CHAT__TOKEN_DELAY_MS=20`.
pub const ENV_PREFIX: &str = "POCKETCHAT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub chat: ChatConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub token_delay_ms: u64,
    pub event_buffer: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub demo_email: String,
    pub demo_password: String,
    pub display_name: String,
    pub profile_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub log_to_file: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            token_delay_ms: 100,
            event_buffer: 256,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        let credentials = Credentials::default();
        Self {
            demo_email: credentials.email,
            demo_password: credentials.password,
            display_name: credentials.display_name,
            profile_key: crate::storage::DEFAULT_PROFILE_KEY.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: true,
        }
    }
}

impl AppConfig {
    pub async fn load(paths: &AppPaths) -> Result<Self> {
        Self::load_from(&paths.config_file()).await
    }

    /// Read `config_file` (writing defaults first if it is missing) and layer
    /// environment overrides on top.
    pub async fn load_from(config_file: &Path) -> Result<Self> {
        if !config_file.exists() {
            info!("Config file not found, creating default configuration");
            Self::default().save_to(config_file).await?;
        }

        info!("Loading configuration from: {:?}", config_file);

        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from(config_file))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    pub async fn save(&self, paths: &AppPaths) -> Result<()> {
        self.save_to(&paths.config_file()).await
    }

    pub async fn save_to(&self, config_file: &Path) -> Result<()> {
        info!("Saving configuration to: {:?}", config_file);

        let config_content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(config::ConfigError::Message(e.to_string())))?;

        if let Some(parent) = config_file.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(config_file, config_content).await?;

        info!("Configuration saved successfully");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.chat.token_delay_ms > 10_000 {
            return Err(Error::validation("Token delay must be at most 10000ms"));
        }
        if self.chat.event_buffer == 0 {
            return Err(Error::validation("Event buffer must hold at least one event"));
        }

        if self.auth.demo_email.is_empty() || self.auth.demo_password.is_empty() {
            return Err(Error::validation("Demo credentials must not be empty"));
        }
        if self.auth.profile_key.is_empty() {
            return Err(Error::validation("Profile key must not be empty"));
        }

        if !matches!(
            self.logging.level.to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(Error::validation(format!("Unknown log level: {}", self.logging.level)));
        }

        Ok(())
    }

    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            token_delay: Duration::from_millis(self.chat.token_delay_ms),
            event_capacity: self.chat.event_buffer,
        }
    }

    pub fn to_credentials(&self) -> Credentials {
        Credentials {
            email: self.auth.demo_email.clone(),
            password: self.auth.demo_password.clone(),
            display_name: self.auth.display_name.clone(),
        }
    }
}

/// Serializes tests that load config, since environment overrides are
/// process-wide.
#[cfg(test)]
pub(crate) static ENV_LOCK: parking_lot::Mutex<()> = parking_lot::const_mutex(());

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.chat.event_buffer = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.chat.token_delay_ms, 100);
        assert_eq!(config.auth.demo_email, "test@example.com");
        assert_eq!(config.auth.profile_key, "userProfile");
        assert!(config.logging.log_to_file);
    }

    #[test]
    fn test_config_conversion() {
        let config = AppConfig::default();

        let session = config.to_session_config();
        assert_eq!(session.token_delay, Duration::from_millis(100));
        assert_eq!(session.event_capacity, 256);

        assert_eq!(config.to_credentials(), Credentials::default());
    }

    #[tokio::test]
    async fn test_load_creates_default_file() {
        let _env = ENV_LOCK.lock();
        let temp_dir = TempDir::new().unwrap();
        let paths = AppPaths::with_root(temp_dir.path());

        let config = AppConfig::load(&paths).await.unwrap();
        assert!(paths.config_file().exists());
        assert_eq!(config.chat, ChatConfig::default());
        assert_eq!(config.auth, AuthConfig::default());
    }

    #[tokio::test]
    async fn test_partial_file_falls_back_to_defaults() {
        let _env = ENV_LOCK.lock();
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("config.toml");
        std::fs::write(&file, "[chat]\ntoken_delay_ms = 5\n").unwrap();

        let config = AppConfig::load_from(&file).await.unwrap();
        assert_eq!(config.chat.token_delay_ms, 5);
        assert_eq!(config.chat.event_buffer, 256);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[tokio::test]
    async fn test_invalid_file_is_rejected() {
        let _env = ENV_LOCK.lock();
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("config.toml");
        std::fs::write(&file, "[chat]\nevent_buffer = 0\n").unwrap();

        assert!(matches!(AppConfig::load_from(&file).await, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_environment_overrides_file() {
        let _env = ENV_LOCK.lock();
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("config.toml");
        std::fs::write(&file, "[chat]\ntoken_delay_ms = 5\n").unwrap();

        std::env::set_var("POCKETCHAT__CHAT__TOKEN_DELAY_MS", "7");
        let loaded = AppConfig::load_from(&file).await;
        std::env::remove_var("POCKETCHAT__CHAT__TOKEN_DELAY_MS");

        let config = loaded.unwrap();
        assert_eq!(config.chat.token_delay_ms, 7);
        assert_eq!(config.chat.event_buffer, 256);
        assert_eq!(config.auth, AuthConfig::default());
    }
}
