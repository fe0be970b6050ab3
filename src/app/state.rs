use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::app::config::AppConfig;
use crate::auth::AuthService;
use crate::chat::ChatSession;
use crate::error::Result;
use crate::platform::AppPaths;
use crate::storage::{JsonFileStore, KeyValueStore, ProfileStore};

pub struct AppState {
    config: Arc<RwLock<AppConfig>>,
    paths: AppPaths,
    auth: AuthService,
    shutdown: CancellationToken,
}

impl AppState {
    pub async fn new(config: AppConfig, paths: AppPaths) -> Result<Self> {
        info!("Initializing application state");

        let store = JsonFileStore::open(paths.store_dir()).await?;
        Ok(Self::with_store(config, paths, Arc::new(store)))
    }

    pub fn with_store(config: AppConfig, paths: AppPaths, backend: Arc<dyn KeyValueStore>) -> Self {
        let profiles = ProfileStore::with_key(backend, config.auth.profile_key.clone());
        let auth = AuthService::new(profiles, config.to_credentials());

        Self {
            config: Arc::new(RwLock::new(config)),
            paths,
            auth,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn get_config(&self) -> AppConfig {
        self.config.read().clone()
    }

    pub async fn update_config<F>(&self, updater: F) -> Result<()>
    where
        F: FnOnce(&mut AppConfig),
    {
        debug!("Updating application configuration");

        let config = {
            let mut config = self.config.write();
            let mut candidate = config.clone();
            updater(&mut candidate);
            candidate.validate()?;
            *config = candidate.clone();
            candidate
        };

        config.save(&self.paths).await?;

        info!("Configuration updated and saved");
        Ok(())
    }

    pub fn get_paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    /// A fresh, empty chat session that is disposed on [`AppState::shutdown`].
    pub fn new_chat_session(&self) -> Arc<ChatSession> {
        let session = ChatSession::new(self.config.read().to_session_config())
            .with_cancellation(&self.shutdown);
        debug!("Opened chat session {}", session.id());
        Arc::new(session)
    }

    pub fn shutdown(&self) {
        info!("Shutting down application state");
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use tempfile::TempDir;

    fn state(temp_dir: &TempDir) -> AppState {
        AppState::with_store(
            AppConfig::default(),
            AppPaths::with_root(temp_dir.path()),
            Arc::new(MemoryStore::new()),
        )
    }

    #[tokio::test]
    async fn test_update_config_persists() {
        let _env = crate::app::config::ENV_LOCK.lock();
        let temp_dir = TempDir::new().unwrap();
        let state = state(&temp_dir);

        state.update_config(|c| c.chat.token_delay_ms = 10).await.unwrap();
        assert_eq!(state.get_config().chat.token_delay_ms, 10);

        let reloaded = AppConfig::load(state.get_paths()).await.unwrap();
        assert_eq!(reloaded.chat.token_delay_ms, 10);
    }

    #[tokio::test]
    async fn test_invalid_update_is_discarded() {
        let temp_dir = TempDir::new().unwrap();
        let state = state(&temp_dir);

        assert!(state.update_config(|c| c.chat.event_buffer = 0).await.is_err());
        assert_eq!(state.get_config().chat.event_buffer, 256);
    }

    #[tokio::test]
    async fn test_shutdown_disposes_sessions() {
        let temp_dir = TempDir::new().unwrap();
        let state = state(&temp_dir);

        let first = state.new_chat_session();
        let second = state.new_chat_session();
        assert_ne!(first.id(), second.id());

        state.shutdown();
        assert!(first.is_disposed());
        assert!(second.is_disposed());
    }

    #[tokio::test]
    async fn test_login_goes_through_configured_store() {
        let temp_dir = TempDir::new().unwrap();
        let state = state(&temp_dir);

        assert!(state.auth().login("test@example.com", "password123").await.unwrap());
        assert!(state.auth().is_authenticated());
    }
}
