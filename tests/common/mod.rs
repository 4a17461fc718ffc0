use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tempfile::TempDir;
use zyph::api::{ApiClient, RemoteAuth, Session};
use zyph::config::ApiConfig;
use zyph::error::{Result, ZyphError};
use zyph::storage::{KeyValueStore, MemoryStore, StorageManager};

pub const TEST_KEY: &str = "zyph_test_key_0123456789";

#[allow(dead_code)]
pub fn memory_storage() -> StorageManager {
    StorageManager::new(Arc::new(MemoryStore::new()))
}

/// Memory store that can be told to fail its next reads
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing_reads: AtomicUsize,
}

#[allow(dead_code)]
impl FlakyStore {
    pub fn fail_next_reads(&self, n: usize) {
        self.failing_reads.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let failing = self
            .failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ZyphError::Storage("transient read failure".into()).into());
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key).await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.inner.keys().await
    }
}

/// Client for `base_url` with a folder cache of `ttl`
#[allow(dead_code)]
pub fn client_with_ttl(base_url: &str, storage: StorageManager, ttl: Duration) -> ApiClient {
    let config = ApiConfig {
        base_url: base_url.to_string(),
        timeout_seconds: 5,
        folder_cache_ttl_seconds: ttl.as_secs(),
        ..ApiConfig::default()
    };
    ApiClient::new(&config, Session::new(storage)).expect("failed to build client")
}

#[allow(dead_code)]
pub fn client(base_url: &str, storage: StorageManager) -> ApiClient {
    client_with_ttl(base_url, storage, Duration::from_secs(300))
}

/// Client whose session already holds a validated credential
#[allow(dead_code)]
pub async fn authed_client(base_url: &str, storage: StorageManager) -> ApiClient {
    let client = client(base_url, storage);
    assert!(client.session().store(test_auth()).await);
    client
}

#[allow(dead_code)]
pub fn test_auth() -> RemoteAuth {
    RemoteAuth {
        api_key: TEST_KEY.to_string(),
        user_id: Some("user-1".to_string()),
        validated_at: Utc::now(),
        key_name: Some("tests".to_string()),
    }
}

#[allow(dead_code)]
pub fn folder_json(id: &str, name: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "user_id": "user-1",
        "description": null,
        "parent_id": null,
        "path": format!("/{}", name),
        "depth": 0,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

#[allow(dead_code)]
pub fn item_json(id: &str, title: &str) -> serde_json::Value {
    serde_json::json!({
        "success": true,
        "item": {
            "id": id,
            "folder_id": "f1",
            "title": title,
            "content_type": "text",
            "processing_status": "completed"
        }
    })
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
