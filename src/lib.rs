use std::fmt::Debug;
use std::future::Future;
use std::string::FromUtf8Error;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt as _;

#[cfg(feature = "memory")]
pub use adapters::memory::MemoryCache;

#[cfg(feature = "disk")]
pub use adapters::disk::DiskCache;

pub use adapters::multi;
pub use adapters::multi::{Backfill, FallbackCache, FallbackCacheBuilder};

/// A specialized Result type for cache construction and helper operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A unified Error type for the crate.
///
/// Cache operations themselves never fail (see [`Cache`]); errors only come
/// from configuration, adapter setup, and decoding helpers.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cached value for key {key:?} is not valid UTF-8")]
    InvalidUtf8 {
        key: String,
        #[source]
        source: FromUtf8Error,
    },

    #[error("IO Error")]
    Io(#[from] std::io::Error),
}

/// Adapter modules, gated behind Cargo features.
pub mod adapters {
    #[cfg(feature = "disk")]
    pub mod disk;
    #[cfg(feature = "memory")]
    pub mod memory;
    pub mod multi;
}

/// The core cache trait.
///
/// A cache maps string keys to byte values. The contract is infallible:
/// `get` reports a miss as `None`, and `set`/`delete` return nothing. An
/// adapter that can fail internally is expected to log and swallow its own
/// errors (a failed read is a miss).
///
/// Implementations must be safe to call concurrently, including overlapping
/// writes to the same key.
pub trait Cache: Send + Sync + Debug {
    /// Look up `key`. Returns `None` on a miss.
    fn get(&self, key: &str) -> impl Future<Output = Option<Vec<u8>>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &[u8]) -> impl Future<Output = ()> + Send;

    /// Remove `key`. Deleting a missing key is a no-op.
    fn delete(&self, key: &str) -> impl Future<Output = ()> + Send;
}

/// Object-safe form of [`Cache`].
///
/// Every `Cache` implements this automatically, and `dyn DynCache` implements
/// `Cache` in turn, so backends of different concrete types can share one
/// list:
///
/// ```
/// # #[cfg(feature = "memory")]
/// # async fn example() -> multicache::Result<()> {
/// use std::sync::Arc;
/// use multicache::{Cache, CacheExt, DynCache, FallbackCache, MemoryCache};
///
/// let fast: Arc<dyn DynCache> = MemoryCache::new().into_dyn();
/// let nested: Arc<dyn DynCache> =
///     FallbackCache::new(vec![Arc::new(MemoryCache::new())]).into_dyn();
///
/// let cache = FallbackCache::new(vec![fast, nested]);
/// cache.set("k", b"v").await;
/// assert_eq!(cache.get("k").await, Some(b"v".to_vec()));
/// # Ok(())
/// # }
/// ```
pub trait DynCache: Send + Sync + Debug {
    fn dyn_get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<Vec<u8>>>;

    fn dyn_set<'a>(&'a self, key: &'a str, value: &'a [u8]) -> BoxFuture<'a, ()>;

    fn dyn_delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ()>;
}

impl<T: Cache> DynCache for T {
    fn dyn_get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<Vec<u8>>> {
        self.get(key).boxed()
    }

    fn dyn_set<'a>(&'a self, key: &'a str, value: &'a [u8]) -> BoxFuture<'a, ()> {
        self.set(key, value).boxed()
    }

    fn dyn_delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ()> {
        self.delete(key).boxed()
    }
}

impl Cache for dyn DynCache {
    fn get(&self, key: &str) -> impl Future<Output = Option<Vec<u8>>> + Send {
        async move { self.dyn_get(key).await }
    }

    fn set(&self, key: &str, value: &[u8]) -> impl Future<Output = ()> + Send {
        async move { self.dyn_set(key, value).await }
    }

    fn delete(&self, key: &str) -> impl Future<Output = ()> + Send {
        async move { self.dyn_delete(key).await }
    }
}

/// Convenience methods built on [`Cache`].
pub trait CacheExt: Cache {
    /// Returns true if `get` would hit.
    fn contains(&self, key: &str) -> impl Future<Output = bool> + Send {
        async move { self.get(key).await.is_some() }
    }

    /// Look up `key` and decode the value as UTF-8.
    fn get_string(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send {
        async move {
            match self.get(key).await {
                Some(bytes) => String::from_utf8(bytes)
                    .map(Some)
                    .map_err(|source| Error::InvalidUtf8 {
                        key: key.to_string(),
                        source,
                    }),
                None => Ok(None),
            }
        }
    }

    /// Store a string value.
    fn set_string(&self, key: &str, value: &str) -> impl Future<Output = ()> + Send {
        self.set(key, value.as_bytes())
    }

    /// Move this cache behind a shared, type-erased handle.
    fn into_dyn(self) -> Arc<dyn DynCache>
    where
        Self: Sized + 'static,
    {
        Arc::new(self)
    }
}

impl<T: Cache + ?Sized> CacheExt for T {}
