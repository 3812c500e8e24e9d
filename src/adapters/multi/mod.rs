//! Composite caches built from other caches.
//!
//! [`FallbackCache`] implements the [`Cache`](crate::Cache) trait by
//! coordinating an ordered list of underlying caches. Because it is a `Cache`
//! itself, instances can be nested.
//!
//! # Examples
//!
//! ## Two tiers, second written in the background
//!
//! ```
//! # #[cfg(feature = "memory")]
//! # async fn example() -> multicache::Result<()> {
//! use multicache::{Cache, FallbackCache, MemoryCache};
//!
//! let hot = MemoryCache::new();
//! let cold = MemoryCache::new();
//!
//! let cache = FallbackCache::builder()
//!     .add_backend(hot.clone())
//!     .add_backend(cold.clone())
//!     .sync_writes(1)
//!     .build()?;
//!
//! cache.set("page:/index", b"<html>").await;
//! assert!(hot.get("page:/index").await.is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Mixing adapter types
//!
//! ```no_run
//! # #[cfg(all(feature = "memory", feature = "disk"))]
//! # async fn example() -> multicache::Result<()> {
//! use multicache::{Backfill, Cache, CacheExt, DiskCache, DynCache, FallbackCache, MemoryCache};
//!
//! let cache: FallbackCache<dyn DynCache> = FallbackCache::builder()
//!     .add_shared(MemoryCache::new().into_dyn())
//!     .add_shared(DiskCache::open("/var/cache/app").await?.into_dyn())
//!     .sync_writes(1)
//!     .backfill(Backfill::Missed)
//!     .build()?;
//!
//! // Disk hits are copied into memory before `get` returns.
//! let hit = cache.get("page:/index").await;
//! # Ok(())
//! # }
//! ```

mod fallback;

pub use fallback::{Backfill, FallbackCache, FallbackCacheBuilder};
