//! Key-value persistence port and typed storage manager
//!
//! The extension persists everything through a single asynchronous
//! key-value store shared by all of its contexts. [`KeyValueStore`] is the
//! port over that store; [`MemoryStore`] and [`SledStore`] are the two
//! backends shipped with the crate. [`StorageManager`] layers typed,
//! failure-tolerant accessors on top of any backend.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub mod keys;
pub mod manager;
pub mod memory;
pub mod sled_store;

pub use manager::StorageManager;
pub use memory::MemoryStore;
pub use sled_store::SledStore;

/// Asynchronous key-value store holding JSON values.
///
/// Implementations must be safe to share across tasks behind an `Arc`.
/// There is no locking across keys: read-modify-write sequences performed
/// by callers are not atomic.
///
/// # Examples
///
/// ```
/// use zyph::storage::{KeyValueStore, MemoryStore};
///
/// # #[tokio::main]
/// # async fn main() -> zyph::error::Result<()> {
/// let store = MemoryStore::new();
/// store.set("enabledDomains", serde_json::json!(["chatgpt.com"])).await?;
/// assert!(store.get("enabledDomains").await?.is_some());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Read the value stored under `key`, `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Remove every key.
    async fn clear(&self) -> Result<()>;

    /// List the keys currently stored.
    async fn keys(&self) -> Result<Vec<String>>;
}
