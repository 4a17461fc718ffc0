//! Holder of the validated remote credential
//!
//! A [`Session`] is created once per process and handed to every
//! [`ApiClient`](crate::api::ApiClient) that needs it. The credential is
//! read from storage on first use and cached in memory afterwards. Clearing
//! the session removes it from both places, so a rejected key is never sent
//! twice.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::api::types::RemoteAuth;
use crate::storage::{keys, StorageManager};

#[derive(Debug, Default)]
struct CachedAuth {
    loaded: bool,
    auth: Option<RemoteAuth>,
}

/// Shared credential state
#[derive(Debug, Clone)]
pub struct Session {
    storage: StorageManager,
    state: Arc<Mutex<CachedAuth>>,
}

impl Session {
    /// Create a session backed by `storage`
    pub fn new(storage: StorageManager) -> Self {
        Self {
            storage,
            state: Arc::new(Mutex::new(CachedAuth::default())),
        }
    }

    /// Current credential, loading it from storage on first call
    ///
    /// A failed read is not remembered; the next call reads storage again.
    pub async fn credential(&self) -> Option<RemoteAuth> {
        let mut state = self.state.lock().await;
        if !state.loaded {
            match self.storage.try_get::<RemoteAuth>(keys::REMOTE_AUTH).await {
                Ok(auth) => {
                    state.auth = auth;
                    state.loaded = true;
                    tracing::debug!(
                        "Loaded stored credential: {}",
                        if state.auth.is_some() { "present" } else { "absent" }
                    );
                }
                Err(e) => {
                    tracing::warn!("Stored credential unreadable: {:#}", e);
                    return None;
                }
            }
        }
        state.auth.clone()
    }

    /// Whether a credential is available
    pub async fn is_authenticated(&self) -> bool {
        self.credential().await.is_some()
    }

    /// Remember `auth` in memory and persist it
    ///
    /// Returns `false` if persisting failed; the in-memory copy is kept
    /// either way.
    pub async fn store(&self, auth: RemoteAuth) -> bool {
        let mut state = self.state.lock().await;
        let persisted = self.storage.set(keys::REMOTE_AUTH, &auth).await;
        state.auth = Some(auth);
        state.loaded = true;
        persisted
    }

    /// Forget the credential in memory and storage
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.auth = None;
        state.loaded = true;
        if !self.storage.remove(keys::REMOTE_AUTH).await {
            tracing::warn!("Stored credential could not be removed");
        }
        tracing::info!("Session cleared");
    }

    /// Storage the session persists to
    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }
}
