//! Time-bounded cache of the remote folder listing

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::api::types::RemoteFolder;

/// Default lifetime of a cached listing (5 minutes)
pub const DEFAULT_FOLDER_CACHE_TTL: Duration = Duration::from_secs(300);

/// In-memory folder listing with a fixed time-to-live
#[derive(Debug, Clone)]
pub struct FolderCache {
    ttl: Duration,
    entry: Arc<RwLock<Option<(Vec<RemoteFolder>, Instant)>>>,
}

impl Default for FolderCache {
    fn default() -> Self {
        Self::new(DEFAULT_FOLDER_CACHE_TTL)
    }
}

impl FolderCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Arc::new(RwLock::new(None)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached folders if the entry has not expired
    pub fn get(&self) -> Option<Vec<RemoteFolder>> {
        let cache = self.entry.read().ok()?;
        match cache.as_ref() {
            Some((folders, cached_at)) if self.is_valid(*cached_at) => Some(folders.clone()),
            _ => None,
        }
    }

    pub fn put(&self, folders: Vec<RemoteFolder>) {
        if let Ok(mut cache) = self.entry.write() {
            *cache = Some((folders, Instant::now()));
        }
    }

    pub fn invalidate(&self) {
        if let Ok(mut cache) = self.entry.write() {
            *cache = None;
            tracing::debug!("Folder cache invalidated");
        }
    }

    fn is_valid(&self, cached_at: Instant) -> bool {
        cached_at.elapsed() < self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(id: &str) -> RemoteFolder {
        RemoteFolder {
            id: id.to_string(),
            name: id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_hit_within_ttl() {
        let cache = FolderCache::default();
        assert!(cache.get().is_none());
        cache.put(vec![folder("a")]);
        assert_eq!(cache.get().unwrap().len(), 1);
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = FolderCache::new(Duration::from_millis(0));
        cache.put(vec![folder("a")]);
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_invalidate() {
        let cache = FolderCache::default();
        cache.put(vec![folder("a")]);
        cache.invalidate();
        assert!(cache.get().is_none());
    }
}
