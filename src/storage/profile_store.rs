use std::sync::Arc;

use tracing::debug;

use crate::auth::UserProfile;
use crate::error::Result;
use crate::storage::KeyValueStore;

pub const DEFAULT_PROFILE_KEY: &str = "userProfile";

/// Typed access to the single saved user profile.
#[derive(Clone)]
pub struct ProfileStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
}

impl ProfileStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(backend, DEFAULT_PROFILE_KEY)
    }

    pub fn with_key(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub async fn load(&self) -> Result<Option<UserProfile>> {
        match self.backend.get(&self.key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn save(&self, profile: &UserProfile) -> Result<()> {
        debug!("Saving profile for {}", profile.email);
        self.backend.set(&self.key, serde_json::to_value(profile)?).await
    }

    pub async fn clear(&self) -> Result<()> {
        debug!("Removing saved profile");
        self.backend.remove(&self.key).await
    }
}
