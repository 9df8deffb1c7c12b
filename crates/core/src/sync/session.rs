use log::info;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::storage::LocalStore;

const CURRENT_USER_KEY: &str = "current_user";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub username: String,
    pub signed_in_at: i64,
}

/// The signed-in user, persisted next to the caches.
///
/// Replay without an explicit user runs for whoever is stored here.
#[derive(Clone)]
pub struct Session {
    store: LocalStore,
}

impl Session {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn sign_in(&self, username: &str) -> Result<SessionUser> {
        let user = SessionUser {
            username: username.trim().to_string(),
            signed_in_at: LocalStore::now_ms(),
        };
        self.store.store(CURRENT_USER_KEY, &user)?;
        info!("[Session] Signed in as {}", user.username);
        Ok(user)
    }

    /// Forgets the current user. Their pending operations stay queued.
    pub fn sign_out(&self) -> Result<Option<SessionUser>> {
        let user = self.user()?;
        self.store.remove(CURRENT_USER_KEY)?;
        if let Some(user) = &user {
            info!("[Session] Signed out {}", user.username);
        }
        Ok(user)
    }

    pub fn user(&self) -> Result<Option<SessionUser>> {
        self.store.retrieve(CURRENT_USER_KEY)
    }

    pub fn current_user(&self) -> Result<Option<String>> {
        Ok(self.user()?.map(|user| user.username))
    }
}
