//! In-memory key-value store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::storage::KeyValueStore;

/// Volatile store backed by a `HashMap`.
///
/// Used by tests and by the CLI when `storage.backend` is `memory`. Clones
/// share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the store holds no keys
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.lock().await.clear();
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.entries.lock().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStore::new();
        store.set("a", json!({"x": 1})).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(json!({"x": 1})));

        store.remove("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        store.remove("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set("k", json!(true)).await.unwrap();
        assert_eq!(other.get("k").await.unwrap(), Some(json!(true)));
        assert_eq!(other.len().await, 1);
    }

    #[tokio::test]
    async fn test_clear_and_keys() {
        let store = MemoryStore::new();
        store.set("b", json!(2)).await.unwrap();
        store.set("a", json!(1)).await.unwrap();
        assert_eq!(store.keys().await.unwrap(), vec!["a", "b"]);

        store.clear().await.unwrap();
        assert!(store.is_empty().await);
    }
}
