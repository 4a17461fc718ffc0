//! Typed, failure-tolerant accessors over the key-value port
//!
//! Every method catches errors from the underlying store, logs them and
//! returns an empty or `false` default. The extension must stay usable even
//! when storage is transiently unavailable, so nothing here propagates a
//! storage error to the caller.
//!
//! Mutating accessors read the stored collection first and skip the write
//! when that read fails, so an unreadable value is never replaced.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, ZyphError};
use crate::models::{Conversation, Folder, FolderSpec, LocalContentItem, Message, Summary};
use crate::storage::{keys, KeyValueStore};

/// Typed storage facade shared by every component
///
/// Cloning is cheap; clones share the same backend.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use zyph::models::FolderSpec;
/// use zyph::storage::{MemoryStore, StorageManager};
///
/// # #[tokio::main]
/// # async fn main() {
/// let storage = StorageManager::new(Arc::new(MemoryStore::new()));
/// let folder = storage
///     .create_folder(FolderSpec { name: "Research".into(), ..Default::default() })
///     .await
///     .unwrap();
/// assert_eq!(storage.get_folders().await.len(), 1);
/// assert!(storage.delete_folder(&folder.id).await);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct StorageManager {
    store: Arc<dyn KeyValueStore>,
}

impl StorageManager {
    /// Wrap a key-value backend
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The underlying backend
    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.store)
    }

    // -----------------------------------------------------------------------
    // Generic accessors
    // -----------------------------------------------------------------------

    /// Read and deserialize `key`
    ///
    /// `Ok(None)` when the key is absent; an error when the store fails or
    /// the value does not deserialize.
    pub async fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(value) = self.store.get(key).await? else {
            return Ok(None);
        };
        let parsed = serde_json::from_value(value)
            .map_err(|e| ZyphError::Storage(format!("Malformed value under {}: {}", key, e)))?;
        Ok(Some(parsed))
    }

    /// Read and deserialize `key`; `None` when absent, unreadable or malformed
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Storage read failed for {}: {:#}", key, e);
                None
            }
        }
    }

    /// Current value of `key` for a read-modify-write
    ///
    /// An absent key yields the default. `None` means the stored value could
    /// not be read and the caller must not write.
    pub(crate) async fn load_for_update<T: DeserializeOwned + Default>(
        &self,
        key: &str,
    ) -> Option<T> {
        match self.try_get(key).await {
            Ok(value) => Some(value.unwrap_or_default()),
            Err(e) => {
                tracing::warn!("Not updating {}: {:#}", key, e);
                None
            }
        }
    }

    /// Serialize and store `value` under `key`; `false` on failure
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Failed to serialize value for {}: {}", key, e);
                return false;
            }
        };
        match self.store.set(key, value).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Storage write failed for {}: {}", key, e);
                false
            }
        }
    }

    /// Remove `key`; `false` on failure
    pub async fn remove(&self, key: &str) -> bool {
        match self.store.remove(key).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Storage remove failed for {}: {}", key, e);
                false
            }
        }
    }

    /// Remove every key; `false` on failure
    pub async fn clear(&self) -> bool {
        match self.store.clear().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Storage clear failed: {}", e);
                false
            }
        }
    }

    /// User-initiated "clear all data": the only path that deletes
    /// conversations.
    pub async fn clear_all_data(&self) -> bool {
        tracing::info!("Clearing all local data");
        self.clear().await
    }

    // -----------------------------------------------------------------------
    // Conversations
    // -----------------------------------------------------------------------

    /// All stored conversations keyed by id
    pub async fn get_conversations(&self) -> HashMap<String, Conversation> {
        self.get(keys::CONVERSATIONS).await.unwrap_or_default()
    }

    /// Conversations ordered by start time, oldest first
    pub async fn list_conversations(&self) -> Vec<Conversation> {
        let mut conversations: Vec<Conversation> =
            self.get_conversations().await.into_values().collect();
        conversations.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        conversations
    }

    /// A single conversation
    pub async fn get_conversation(&self, id: &str) -> Option<Conversation> {
        self.get_conversations().await.remove(id)
    }

    /// Insert or replace a conversation
    pub async fn save_conversation(&self, conversation: &Conversation) -> bool {
        let Some(mut conversations) = self.load_conversations().await else {
            return false;
        };
        conversations.insert(conversation.id.clone(), conversation.clone());
        self.set(keys::CONVERSATIONS, &conversations).await
    }

    /// Append turns to a stored conversation
    ///
    /// Returns the updated conversation, or `None` when it does not exist or
    /// the write failed.
    pub async fn append_messages(&self, id: &str, messages: &[Message]) -> Option<Conversation> {
        let mut conversations = self.load_conversations().await?;
        let conversation = match conversations.get_mut(id) {
            Some(conversation) => conversation,
            None => {
                tracing::warn!("Cannot append to unknown conversation {}", id);
                return None;
            }
        };
        conversation.messages.extend_from_slice(messages);
        conversation.updated_at = Utc::now();
        let updated = conversation.clone();
        if self.set(keys::CONVERSATIONS, &conversations).await {
            Some(updated)
        } else {
            None
        }
    }

    /// Assign a conversation to a folder, or detach it with `None`
    pub async fn assign_conversation_folder(&self, id: &str, folder_id: Option<&str>) -> bool {
        let Some(mut conversations) = self.load_conversations().await else {
            return false;
        };
        match conversations.get_mut(id) {
            Some(conversation) => {
                conversation.folder_id = folder_id.map(str::to_string);
                self.set(keys::CONVERSATIONS, &conversations).await
            }
            None => false,
        }
    }

    async fn load_conversations(&self) -> Option<HashMap<String, Conversation>> {
        self.load_for_update(keys::CONVERSATIONS).await
    }

    // -----------------------------------------------------------------------
    // Summaries
    // -----------------------------------------------------------------------

    /// All summaries keyed by `<conversation id>@<domain>`
    pub async fn get_summaries(&self) -> BTreeMap<String, Summary> {
        self.get(keys::SUMMARIES).await.unwrap_or_default()
    }

    /// Insert or replace a summary
    pub async fn save_summary(&self, summary: &Summary) -> bool {
        let Some(mut summaries) = self
            .load_for_update::<BTreeMap<String, Summary>>(keys::SUMMARIES)
            .await
        else {
            return false;
        };
        summaries.insert(
            Summary::key(&summary.conversation_id, &summary.domain),
            summary.clone(),
        );
        self.set(keys::SUMMARIES, &summaries).await
    }

    /// Summary for a conversation on a domain
    pub async fn get_summary(&self, conversation_id: &str, domain: &str) -> Option<Summary> {
        self.get_summaries()
            .await
            .remove(&Summary::key(conversation_id, domain))
    }

    // -----------------------------------------------------------------------
    // Conversation folders
    // -----------------------------------------------------------------------

    /// Conversation folders in creation order
    pub async fn get_folders(&self) -> Vec<Folder> {
        self.get(keys::FOLDERS).await.unwrap_or_default()
    }

    /// Create a conversation folder
    ///
    /// Returns `None` for a blank name, an unknown parent, or a failed write.
    pub async fn create_folder(&self, spec: FolderSpec) -> Option<Folder> {
        create_in(self, keys::FOLDERS, spec).await
    }

    /// Rename or restyle a folder; `parent_id` is left untouched when `None`
    pub async fn update_folder(&self, id: &str, spec: FolderSpec) -> Option<Folder> {
        update_in(self, keys::FOLDERS, id, spec).await
    }

    /// Delete a conversation folder
    ///
    /// Conversations assigned to it are detached, not deleted, and child
    /// folders move up to the deleted folder's parent.
    pub async fn delete_folder(&self, id: &str) -> bool {
        let Some(mut conversations) = self.load_conversations().await else {
            return false;
        };
        let Some(parent) = remove_folder_in(self, keys::FOLDERS, id).await else {
            return false;
        };

        let mut detached = 0usize;
        for conversation in conversations.values_mut() {
            if conversation.folder_id.as_deref() == Some(id) {
                conversation.folder_id = None;
                detached += 1;
            }
        }
        if detached > 0 {
            tracing::debug!(
                "Detached {} conversations from deleted folder {}",
                detached,
                id
            );
            if !self.set(keys::CONVERSATIONS, &conversations).await {
                return false;
            }
        }
        tracing::info!("Deleted folder {} (children moved to {:?})", id, parent);
        true
    }

    // -----------------------------------------------------------------------
    // Enabled domains
    // -----------------------------------------------------------------------

    /// Domains the monitor may run on
    pub async fn get_enabled_domains(&self) -> Vec<String> {
        self.get(keys::ENABLED_DOMAINS).await.unwrap_or_default()
    }

    /// Whether `domain` is enabled
    pub async fn is_domain_enabled(&self, domain: &str) -> bool {
        let domain = domain.to_ascii_lowercase();
        self.get_enabled_domains()
            .await
            .iter()
            .any(|d| d.eq_ignore_ascii_case(&domain))
    }

    /// Enable or disable a domain
    pub async fn set_domain_enabled(&self, domain: &str, enabled: bool) -> bool {
        let domain = domain.trim().to_ascii_lowercase();
        if domain.is_empty() {
            return false;
        }
        let Some(mut domains) = self
            .load_for_update::<Vec<String>>(keys::ENABLED_DOMAINS)
            .await
        else {
            return false;
        };
        domains.retain(|d| !d.eq_ignore_ascii_case(&domain));
        if enabled {
            domains.push(domain);
        }
        self.set(keys::ENABLED_DOMAINS, &domains).await
    }

    // -----------------------------------------------------------------------
    // Captured content
    // -----------------------------------------------------------------------

    /// Folders for captured content
    pub async fn get_content_folders(&self) -> Vec<Folder> {
        self.get(keys::ZYPH_FOLDERS).await.unwrap_or_default()
    }

    /// Create a folder for captured content
    pub async fn create_content_folder(&self, spec: FolderSpec) -> Option<Folder> {
        create_in(self, keys::ZYPH_FOLDERS, spec).await
    }

    /// Delete a content folder, detaching its items
    pub async fn delete_content_folder(&self, id: &str) -> bool {
        let Some(mut items) = self.load_content_items().await else {
            return false;
        };
        if remove_folder_in(self, keys::ZYPH_FOLDERS, id)
            .await
            .is_none()
        {
            return false;
        }
        let mut changed = false;
        for item in items.iter_mut() {
            if item.folder_id.as_deref() == Some(id) {
                item.folder_id = None;
                changed = true;
            }
        }
        !changed || self.set(keys::ZYPH_CONTENT, &items).await
    }

    /// Captured content items in capture order
    pub async fn get_content_items(&self) -> Vec<LocalContentItem> {
        self.get(keys::ZYPH_CONTENT).await.unwrap_or_default()
    }

    /// Insert or replace a captured item
    pub async fn save_content_item(&self, item: &LocalContentItem) -> bool {
        let Some(mut items) = self.load_content_items().await else {
            return false;
        };
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item.clone(),
            None => items.push(item.clone()),
        }
        self.set(keys::ZYPH_CONTENT, &items).await
    }

    /// Record the remote id of a delivered item
    pub async fn mark_content_synced(&self, id: &str, remote_id: &str) -> bool {
        let Some(mut items) = self.load_content_items().await else {
            return false;
        };
        match items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.remote_id = Some(remote_id.to_string());
                self.set(keys::ZYPH_CONTENT, &items).await
            }
            None => false,
        }
    }

    async fn load_content_items(&self) -> Option<Vec<LocalContentItem>> {
        self.load_for_update(keys::ZYPH_CONTENT).await
    }
}

async fn create_in(storage: &StorageManager, key: &str, spec: FolderSpec) -> Option<Folder> {
    if spec.name.trim().is_empty() {
        tracing::warn!("Refusing to create a folder with a blank name");
        return None;
    }
    let mut folders: Vec<Folder> = storage.load_for_update(key).await?;
    if let Some(parent) = spec.parent_id.as_deref() {
        if !folders.iter().any(|f| f.id == parent) {
            tracing::warn!("Parent folder {} does not exist", parent);
            return None;
        }
    }
    let folder = Folder::from_spec(spec);
    folders.push(folder.clone());
    if storage.set(key, &folders).await {
        Some(folder)
    } else {
        None
    }
}

async fn update_in(
    storage: &StorageManager,
    key: &str,
    id: &str,
    spec: FolderSpec,
) -> Option<Folder> {
    let mut folders: Vec<Folder> = storage.load_for_update(key).await?;
    if let Some(parent) = spec.parent_id.as_deref() {
        if !folders.iter().any(|f| f.id == parent) || is_within(&folders, parent, id) {
            tracing::warn!("Invalid parent {} for folder {}", parent, id);
            return None;
        }
    }
    let folder = folders.iter_mut().find(|f| f.id == id)?;
    if !spec.name.trim().is_empty() {
        folder.name = spec.name.trim().to_string();
    }
    if let Some(color) = spec.color {
        folder.color = color;
    }
    if let Some(icon) = spec.icon {
        folder.icon = icon;
    }
    if spec.parent_id.is_some() {
        folder.parent_id = spec.parent_id;
    }
    let updated = folder.clone();
    if storage.set(key, &folders).await {
        Some(updated)
    } else {
        None
    }
}

/// Whether `folder` is `ancestor` or one of its descendants
fn is_within(folders: &[Folder], folder: &str, ancestor: &str) -> bool {
    let mut current = Some(folder);
    // bounded so a tree that is already cyclic cannot loop forever
    for _ in 0..=folders.len() {
        let Some(id) = current else {
            return false;
        };
        if id == ancestor {
            return true;
        }
        current = folders
            .iter()
            .find(|f| f.id == id)
            .and_then(|f| f.parent_id.as_deref());
    }
    true
}

/// Remove a folder and re-parent its children.
///
/// Returns the removed folder's parent (`Some(None)` for a top-level
/// folder), or `None` when the folder did not exist or the write failed.
async fn remove_folder_in(
    storage: &StorageManager,
    key: &str,
    id: &str,
) -> Option<Option<String>> {
    let mut folders: Vec<Folder> = storage.load_for_update(key).await?;
    let position = folders.iter().position(|f| f.id == id)?;
    let removed = folders.remove(position);
    for child in folders.iter_mut() {
        if child.parent_id.as_deref() == Some(id) {
            child.parent_id = removed.parent_id.clone();
        }
    }
    if storage.set(key, &folders).await {
        Some(removed.parent_id)
    } else {
        None
    }
}
