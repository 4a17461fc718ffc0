/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `auth`    - API key validation and logout
- `folders` - Remote folder management
- `content` - Page capture, conversation parsing, ingest, upload and search
- `queue`   - Sync retry queue inspection and processing
- `local`   - Locally stored conversations, folders and domain settings

Every handler receives an [`AppContext`] wired from the loaded configuration.
*/

use std::sync::Arc;

use crate::api::{ApiClient, Session};
use crate::config::{Config, StorageBackend};
use crate::error::Result;
use crate::storage::{KeyValueStore, MemoryStore, SledStore, StorageManager};
use crate::sync::{RetryPolicy, SyncQueue};

pub mod content;
pub mod folders;
pub mod local;
pub mod queue;

/// Shared services used by every command
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Config,
    pub storage: StorageManager,
    pub client: ApiClient,
    pub queue: SyncQueue,
}

impl AppContext {
    /// Open the configured store and build the API client and sync queue on top of it
    pub fn build(config: Config) -> Result<Self> {
        let store = open_store(&config)?;
        Self::with_store(config, store)
    }

    /// Build a context around an already opened store
    pub fn with_store(config: Config, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let storage = StorageManager::new(store);
        let session = Session::new(storage.clone());
        let client = ApiClient::new(&config.api, session)?;
        let queue = SyncQueue::new(storage.clone(), RetryPolicy::from(&config.sync));
        Ok(Self {
            config,
            storage,
            client,
            queue,
        })
    }
}

fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::debug!("Using in-memory storage");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Sled => {
            let store = match &config.storage.path {
                Some(path) => SledStore::open(path)?,
                None => SledStore::open_default()?,
            };
            tracing::debug!("Using sled storage at {}", store.path().display());
            Ok(Arc::new(store))
        }
    }
}

// Authentication command handler
pub mod auth {
    //! API key validation and logout.
    //!
    //! When no key is passed on the command line the user is prompted for
    //! one with rustyline.

    use super::*;
    use colored::Colorize;
    use rustyline::DefaultEditor;

    /// Validate `key` (prompting when absent) and store the credential
    ///
    /// # Arguments
    ///
    /// * `ctx` - Command context
    /// * `key` - API key, read interactively when `None`
    /// * `user_id` - Optional user id sent with the validation request
    pub async fn authenticate(
        ctx: &AppContext,
        key: Option<String>,
        user_id: Option<String>,
    ) -> Result<()> {
        let key = match key {
            Some(key) => key,
            None => {
                let mut rl = DefaultEditor::new()?;
                rl.readline("API key: ")?
            }
        };

        let auth = ctx
            .client
            .validate_api_key(key.trim(), user_id.as_deref())
            .await?;

        println!(
            "{} {}",
            "Authenticated with key".green(),
            auth.masked_key().cyan()
        );
        if let Some(name) = &auth.key_name {
            println!("Key name: {}", name);
        }
        if let Some(user) = &auth.user_id {
            println!("User: {}", user);
        }
        Ok(())
    }

    /// Forget the stored credential and cached folders
    pub async fn logout(ctx: &AppContext) -> Result<()> {
        let was_authenticated = ctx.client.session().is_authenticated().await;
        ctx.client.logout().await;
        if was_authenticated {
            println!("{}", "Logged out.".green());
        } else {
            println!("{}", "No stored API key.".yellow());
        }
        Ok(())
    }
}
