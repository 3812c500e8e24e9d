use crate::{Cache, Error, Result};
use bytes::Bytes;
use std::fmt::Debug;
use std::sync::Arc;

/// What `get` does with the backends that missed before a hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backfill {
    /// Leave earlier backends untouched. This is the default.
    #[default]
    Disabled,

    /// Write the hit value into every earlier backend that missed, in order,
    /// before `get` returns. Backends after the hit are still not touched.
    Missed,
}

/// Reads from an ordered list of caches until one hits; writes and deletes
/// go to all of them.
///
/// The first `sync_writes` backends are written in list order and awaited
/// before [`set`](Cache::set) returns. Each remaining backend is written by
/// its own detached Tokio task, which the cache neither tracks nor joins.
/// Deletes are always sequential and awaited.
///
/// Outside a Tokio runtime no task can be spawned, so `set` writes the
/// remaining backends inline after the first `sync_writes` and only returns
/// once every backend has been written.
///
/// Backends are held as `Arc` handles. `C` may be `dyn DynCache` to mix
/// adapter types, and `FallbackCache` is itself a [`Cache`], so instances
/// nest.
///
/// ```
/// # #[cfg(feature = "memory")]
/// # async fn example() -> multicache::Result<()> {
/// use std::sync::Arc;
/// use multicache::{Cache, FallbackCache, MemoryCache};
///
/// let l1 = MemoryCache::new();
/// let l2 = MemoryCache::new();
/// let cache = FallbackCache::with_sync_writes(
///     vec![Arc::new(l1.clone()), Arc::new(l2.clone())],
///     1,
/// )?;
///
/// cache.set("user:1", b"alice").await;
/// // l1 was written before `set` returned; l2 is written in the background.
/// assert_eq!(l1.get("user:1").await, Some(b"alice".to_vec()));
/// # Ok(())
/// # }
/// ```
pub struct FallbackCache<C: Cache + ?Sized + 'static> {
    backends: Vec<Arc<C>>,
    sync_writes: usize,
    backfill: Backfill,
}

impl<C: Cache + ?Sized + 'static> FallbackCache<C> {
    /// Create a fallback cache that writes every backend synchronously.
    ///
    /// An empty list is allowed: `get` always misses and writes are no-ops.
    pub fn new(backends: Vec<Arc<C>>) -> Self {
        Self {
            sync_writes: backends.len(),
            backends,
            backfill: Backfill::Disabled,
        }
    }

    /// Create a fallback cache that awaits only the first `sync_writes`
    /// backends on `set`.
    ///
    /// Fails with [`Error::InvalidConfig`] if `sync_writes` exceeds the
    /// number of backends.
    pub fn with_sync_writes(backends: Vec<Arc<C>>, sync_writes: usize) -> Result<Self> {
        validate(backends.len(), sync_writes)?;
        Ok(Self {
            backends,
            sync_writes,
            backfill: Backfill::Disabled,
        })
    }

    /// Create a builder for configuring a fallback cache.
    pub fn builder() -> FallbackCacheBuilder<C> {
        FallbackCacheBuilder::new()
    }

    /// Get the number of backends.
    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    /// Number of backends awaited by `set`.
    pub fn sync_writes(&self) -> usize {
        self.sync_writes
    }

    /// Number of backends written by detached tasks on `set`.
    pub fn async_writes(&self) -> usize {
        self.backends.len() - self.sync_writes
    }

    /// Get the backfill policy.
    pub fn backfill(&self) -> Backfill {
        self.backfill
    }

    /// Get a reference to a specific backend by index.
    pub fn backend(&self, index: usize) -> Option<&C> {
        self.backends.get(index).map(|arc| arc.as_ref())
    }

    /// All backend handles, in read order.
    pub fn backends(&self) -> &[Arc<C>] {
        &self.backends
    }

    async fn backfill_missed(&self, key: &str, value: &[u8], hit_index: usize) {
        for (idx, backend) in self.backends[..hit_index].iter().enumerate() {
            backend.set(key, value).await;
            tracing::debug!(key, backend_index = idx, hit_index, "Backfilled missed backend");
        }
    }
}

impl<C: Cache + ?Sized + 'static> Cache for FallbackCache<C> {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        for (idx, backend) in self.backends.iter().enumerate() {
            let Some(value) = backend.get(key).await else {
                tracing::trace!(key, backend_index = idx, "Backend miss");
                continue;
            };

            if idx == 0 {
                tracing::trace!(key, "Hit on first backend");
            } else {
                tracing::debug!(key, backend_index = idx, "Fallback hit");
                if self.backfill == Backfill::Missed {
                    self.backfill_missed(key, &value, idx).await;
                }
            }
            return Some(value);
        }

        tracing::trace!(key, backend_count = self.backends.len(), "Miss on all backends");
        None
    }

    async fn set(&self, key: &str, value: &[u8]) {
        let (sync, tail) = self.backends.split_at(self.sync_writes);

        for backend in sync {
            backend.set(key, value).await;
        }

        if tail.is_empty() {
            return;
        }

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            // One copy of the value, shared by every background task.
            let shared = Bytes::copy_from_slice(value);
            for (offset, backend) in tail.iter().enumerate() {
                let backend_index = self.sync_writes + offset;
                let backend = Arc::clone(backend);
                let key = key.to_string();
                let value = shared.clone();
                handle.spawn(async move {
                    backend.set(&key, &value).await;
                    tracing::trace!(%key, backend_index, "Background write finished");
                });
            }
            tracing::debug!(
                key,
                sync_writes = self.sync_writes,
                async_writes = tail.len(),
                "Spawned background writes"
            );
            return;
        }

        tracing::warn!(
            key,
            async_writes = tail.len(),
            "No Tokio runtime available, writing remaining backends inline"
        );
        for backend in tail {
            backend.set(key, value).await;
        }
    }

    async fn delete(&self, key: &str) {
        for backend in &self.backends {
            backend.delete(key).await;
        }
    }
}

impl<C: Cache + ?Sized + 'static> Debug for FallbackCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackCache")
            .field("backends", &self.backends)
            .field("sync_writes", &self.sync_writes)
            .field("backfill", &self.backfill)
            .finish()
    }
}

fn validate(backend_count: usize, sync_writes: usize) -> Result<()> {
    if sync_writes > backend_count {
        tracing::error!(sync_writes, backend_count, "Synchronous write count out of range");
        return Err(Error::InvalidConfig(format!(
            "sync_writes {sync_writes} exceeds backend count {backend_count}"
        )));
    }
    Ok(())
}

/// Builder for [`FallbackCache`].
pub struct FallbackCacheBuilder<C: Cache + ?Sized + 'static> {
    backends: Vec<Arc<C>>,
    sync_writes: Option<usize>,
    backfill: Backfill,
}

impl<C: Cache + ?Sized + 'static> FallbackCacheBuilder<C> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
            sync_writes: None,
            backfill: Backfill::Disabled,
        }
    }

    /// Append a backend, taking ownership of it.
    pub fn add_backend(self, backend: C) -> Self
    where
        C: Sized,
    {
        self.add_shared(Arc::new(backend))
    }

    /// Append a backend handle that is shared with other owners.
    pub fn add_shared(mut self, backend: Arc<C>) -> Self {
        self.backends.push(backend);
        self
    }

    /// Set how many leading backends `set` awaits (default: all of them).
    pub fn sync_writes(mut self, count: usize) -> Self {
        self.sync_writes = Some(count);
        self
    }

    /// Set the backfill policy (default: [`Backfill::Disabled`]).
    pub fn backfill(mut self, policy: Backfill) -> Self {
        self.backfill = policy;
        self
    }

    /// Build the fallback cache.
    pub fn build(self) -> Result<FallbackCache<C>> {
        let sync_writes = self.sync_writes.unwrap_or(self.backends.len());
        validate(self.backends.len(), sync_writes)?;

        Ok(FallbackCache {
            backends: self.backends,
            sync_writes,
            backfill: self.backfill,
        })
    }
}

impl<C: Cache + ?Sized + 'static> Default for FallbackCacheBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Cache + ?Sized + 'static> Debug for FallbackCacheBuilder<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackCacheBuilder")
            .field("backend_count", &self.backends.len())
            .field("sync_writes", &self.sync_writes)
            .field("backfill", &self.backfill)
            .finish()
    }
}
