use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use validator::Validate;

use crate::auth::profile::{Credentials, ProfilePatch, UserProfile};
use crate::error::Result;
use crate::storage::ProfileStore;

/// Whether someone is signed in, and as whom
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    SignedIn(UserProfile),
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::SignedIn(_))
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            AuthState::SignedIn(profile) => Some(profile),
            AuthState::SignedOut => None,
        }
    }
}

/// Login, logout and profile edits, with the profile mirrored to the store.
pub struct AuthService {
    store: ProfileStore,
    credentials: Credentials,
    state: watch::Sender<AuthState>,
}

impl AuthService {
    pub fn new(store: ProfileStore, credentials: Credentials) -> Self {
        let (state, _) = watch::channel(AuthState::SignedOut);
        Self {
            store,
            credentials,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.state.borrow().profile().cloned()
    }

    /// Sign back in from the saved profile. An unreadable profile is logged
    /// and treated as signed out.
    pub async fn restore(&self) -> AuthState {
        match self.store.load().await {
            Ok(Some(profile)) => {
                info!("Restored saved session for {}", profile.email);
                self.state.send_replace(AuthState::SignedIn(profile));
            }
            Ok(None) => debug!("No saved profile found"),
            Err(e) => error!("Error loading saved user: {}", e),
        }
        self.current()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<bool> {
        if !self.credentials.matches(email, password) {
            warn!("Login rejected for {}", email);
            return Ok(false);
        }

        let profile = UserProfile::new(self.credentials.display_name.clone(), email);
        self.store.save(&profile).await?;
        self.state.send_replace(AuthState::SignedIn(profile));

        info!("Signed in as {}", email);
        Ok(true)
    }

    pub async fn logout(&self) -> Result<()> {
        self.state.send_replace(AuthState::SignedOut);
        self.store.clear().await?;
        info!("Signed out");
        Ok(())
    }

    /// Merge `patch` into the signed-in profile and persist it. Returns `None`
    /// without touching the store when nobody is signed in. An empty patch
    /// returns the current profile without writing.
    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<Option<UserProfile>> {
        patch.validate()?;

        let Some(mut profile) = self.profile() else {
            debug!("Ignoring profile update while signed out");
            return Ok(None);
        };

        if patch.is_empty() {
            return Ok(Some(profile));
        }

        profile.apply(patch);
        self.store.save(&profile).await?;
        self.state.send_replace(AuthState::SignedIn(profile.clone()));

        debug!("Profile updated for {}", profile.email);
        Ok(Some(profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::storage::{KeyValueStore, MemoryStore, DEFAULT_PROFILE_KEY};
    use serde_json::json;
    use std::sync::Arc;

    fn service() -> (AuthService, Arc<MemoryStore>) {
        let backend = Arc::new(MemoryStore::new());
        let store = ProfileStore::new(backend.clone());
        (AuthService::new(store, Credentials::default()), backend)
    }

    #[tokio::test]
    async fn test_login_with_demo_credentials() {
        let (auth, backend) = service();
        let mut rx = auth.subscribe();

        assert!(auth.login("test@example.com", "password123").await.unwrap());
        assert!(auth.is_authenticated());
        assert!(rx.has_changed().unwrap());

        let profile = auth.profile().unwrap();
        assert_eq!(profile.name, "Test User");
        assert_eq!(profile.email, "test@example.com");
        assert!(profile.avatar_uri.is_none());

        let saved = backend.get(DEFAULT_PROFILE_KEY).await.unwrap();
        assert_eq!(saved, Some(json!({"name": "Test User", "email": "test@example.com"})));
        assert!(rx.borrow_and_update().is_authenticated());
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() {
        let (auth, backend) = service();

        assert!(!auth.login("test@example.com", "nope").await.unwrap());
        assert!(!auth.is_authenticated());
        assert_eq!(backend.get(DEFAULT_PROFILE_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_restore_signs_in_saved_user() {
        let (auth, backend) = service();
        backend
            .set(DEFAULT_PROFILE_KEY, json!({"name": "Ada", "email": "ada@example.com"}))
            .await
            .unwrap();

        let state = auth.restore().await;
        assert_eq!(state, AuthState::SignedIn(UserProfile::new("Ada", "ada@example.com")));
    }

    #[tokio::test]
    async fn test_restore_treats_corrupt_profile_as_signed_out() {
        let (auth, backend) = service();
        backend.set(DEFAULT_PROFILE_KEY, json!("garbage")).await.unwrap();

        assert_eq!(auth.restore().await, AuthState::SignedOut);
    }

    #[tokio::test]
    async fn test_logout_clears_store() {
        let (auth, backend) = service();
        auth.login("test@example.com", "password123").await.unwrap();

        auth.logout().await.unwrap();
        assert!(!auth.is_authenticated());
        assert!(auth.profile().is_none());
        assert_eq!(backend.get(DEFAULT_PROFILE_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_profile_merges_and_persists() {
        let (auth, _backend) = service();
        auth.login("test@example.com", "password123").await.unwrap();

        let updated = auth
            .update_profile(ProfilePatch {
                name: Some("Ada".to_string()),
                avatar_uri: Some("file:///ada.png".to_string()),
                ..ProfilePatch::default()
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.name, "Ada");
        assert_eq!(updated.email, "test@example.com");
        assert_eq!(auth.profile(), Some(updated.clone()));

        // Persisted copy matches what observers see
        let reloaded = auth.store.load().await.unwrap();
        assert_eq!(reloaded, Some(updated));
    }

    #[tokio::test]
    async fn test_empty_patch_skips_store() {
        let (auth, backend) = service();
        auth.login("test@example.com", "password123").await.unwrap();
        backend.remove(DEFAULT_PROFILE_KEY).await.unwrap();
        let mut rx = auth.subscribe();
        rx.borrow_and_update();

        let unchanged = auth.update_profile(ProfilePatch::default()).await.unwrap();
        assert_eq!(unchanged, auth.profile());
        assert!(!rx.has_changed().unwrap());
        assert_eq!(backend.get(DEFAULT_PROFILE_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_profile_while_signed_out_is_noop() {
        let (auth, backend) = service();

        let result = auth.update_profile(ProfilePatch::name("Ada")).await.unwrap();
        assert!(result.is_none());
        assert_eq!(backend.get(DEFAULT_PROFILE_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_profile_rejects_invalid_email() {
        let (auth, _backend) = service();
        auth.login("test@example.com", "password123").await.unwrap();

        let result = auth.update_profile(ProfilePatch::email("nope")).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(auth.profile().unwrap().email, "test@example.com");
    }
}
