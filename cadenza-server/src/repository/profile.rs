//! Profile Store
//!
//! Persists the single local user profile under its own storage key.

use cadenza_core::domain::profile::UserProfile;
use cadenza_core::dto::profile::UpsertProfile;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use super::kv::{KeyValueStore, StoreError};

/// Storage key of the profile
pub const PROFILE_KEY: &str = "user_profile";

pub struct ProfileStore {
    kv: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl ProfileStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    /// The stored profile, if one has been created
    pub async fn current(&self) -> Result<Option<UserProfile>, StoreError> {
        let Some(raw) = self.kv.get(PROFILE_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                warn!("Stored profile is unreadable, ignoring it: {}", e);
                Ok(None)
            }
        }
    }

    /// Creates the profile on first call, merges the given fields afterwards
    ///
    /// Fields left out of `req` keep their value; an empty string clears one.
    pub async fn upsert(&self, req: UpsertProfile) -> Result<UserProfile, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut profile = match self.current().await? {
            Some(profile) => profile,
            None => {
                let profile = UserProfile {
                    id: Uuid::new_v4().to_string(),
                    name: None,
                    email: None,
                    created_at: chrono::Utc::now(),
                };
                info!("Created profile {}", profile.id);
                profile
            }
        };

        if let Some(name) = req.name {
            profile.name = non_empty(name);
        }
        if let Some(email) = req.email {
            profile.email = non_empty(email);
        }

        self.kv
            .put(PROFILE_KEY, &serde_json::to_string(&profile)?)
            .await?;
        Ok(profile)
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.kv.remove(PROFILE_KEY).await
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
