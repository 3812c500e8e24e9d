use crate::Cache;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A simple in-memory `Cache` adapter.
///
/// - Entries are stored as raw bytes in a `HashMap`.
/// - Clones share the same map, so a clone can be handed to a
///   [`FallbackCache`](crate::FallbackCache) while the original is kept for
///   inspection.
/// - Intended for tests, local development, and as a fast first tier.
#[derive(Clone, Default)]
pub struct MemoryCache {
    inner: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryCache {
    /// Create a new empty in-memory cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new in-memory cache from an existing map.
    pub fn from_map(map: HashMap<String, Vec<u8>>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if there are no stored entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Sorted list of stored keys.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    // Every critical section is a single map call, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<u8>>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<u8>>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Avoid dumping potentially large in-memory contents.
        f.debug_struct("MemoryCache")
            .field("len", &self.len())
            .finish()
    }
}

impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.read().get(key).cloned()
    }

    async fn set(&self, key: &str, value: &[u8]) {
        self.write().insert(key.to_string(), value.to_vec());
    }

    async fn delete(&self, key: &str) {
        self.write().remove(key);
    }
}
