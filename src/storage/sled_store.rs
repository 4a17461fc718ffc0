//! Durable key-value store backed by sled
//!
//! Values are stored as JSON bytes, one sled key per storage key, so the
//! on-disk layout matches the extension's flat key space.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use directories::ProjectDirs;
use serde_json::Value;
use sled::Db;

use crate::error::{Result, ZyphError};
use crate::storage::KeyValueStore;

/// Persistent store in an embedded `sled` database
#[derive(Debug, Clone)]
pub struct SledStore {
    db: Db,
    path: PathBuf,
}

impl SledStore {
    /// Open or create a store at `path`
    ///
    /// # Errors
    ///
    /// Returns `ZyphError::Storage` if the database cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use zyph::storage::SledStore;
    ///
    /// # fn main() -> zyph::error::Result<()> {
    /// let store = SledStore::open("/tmp/zyph-store")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ZyphError::Storage(format!("Failed to create parent directory: {}", e))
            })?;
        }
        let db = sled::open(&path)
            .map_err(|e| ZyphError::Storage(format!("Failed to open database: {}", e)))?;
        tracing::debug!("Opened sled store at {}", path.display());
        Ok(Self { db, path })
    }

    /// Open the store at the default location
    ///
    /// `ZYPH_STORE_PATH` overrides the platform data directory.
    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    /// Default database location in the user's data directory
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(override_path) = std::env::var("ZYPH_STORE_PATH") {
            return Ok(PathBuf::from(override_path));
        }
        let proj_dirs = ProjectDirs::from("com", "zyph", "zyph")
            .ok_or_else(|| ZyphError::Storage("Could not determine data directory".into()))?;
        Ok(proj_dirs.data_dir().join("store"))
    }

    /// Path of the open database
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| ZyphError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SledStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        match self
            .db
            .get(key.as_bytes())
            .map_err(|e| ZyphError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes).map_err(|e| {
                    ZyphError::Storage(format!("Deserialization failed for {}: {}", key, e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let bytes = serde_json::to_vec(&value)
            .map_err(|e| ZyphError::Storage(format!("Serialization failed: {}", e)))?;
        self.db
            .insert(key.as_bytes(), bytes)
            .map_err(|e| ZyphError::Storage(format!("Insert failed: {}", e)))?;
        self.flush()
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| ZyphError::Storage(format!("Remove failed: {}", e)))?;
        self.flush()
    }

    async fn clear(&self) -> Result<()> {
        self.db
            .clear()
            .map_err(|e| ZyphError::Storage(format!("Clear failed: {}", e)))?;
        self.flush()
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in self.db.iter() {
            let (key, _) = entry.map_err(|e| ZyphError::Storage(format!("Scan failed: {}", e)))?;
            keys.push(String::from_utf8_lossy(&key).to_string());
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store");
        {
            let store = SledStore::open(&path).unwrap();
            store
                .set("enabledDomains", json!(["claude.ai"]))
                .await
                .unwrap();
        }
        let store = SledStore::open(&path).unwrap();
        assert_eq!(
            store.get("enabledDomains").await.unwrap(),
            Some(json!(["claude.ai"]))
        );
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let tmp = TempDir::new().unwrap();
        let store = SledStore::open(tmp.path().join("store")).unwrap();
        store.set("a", json!(1)).await.unwrap();
        store.set("b", json!(2)).await.unwrap();

        store.remove("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.keys().await.unwrap(), vec!["b".to_string()]);

        store.clear().await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
    }
}
