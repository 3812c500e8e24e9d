//! Common test utilities and reusable test suite for cache adapters
//!
//! This module provides a macro `cache_test_suite!` that generates the
//! contract tests every `Cache` implementation must pass, plus instrumented
//! caches for observing how a `FallbackCache` drives its backends.
#![allow(dead_code)]

use multicache::{Cache, CacheExt, MemoryCache};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Macro to generate the cache contract test suite for a `Cache` implementation.
///
/// # Usage
///
/// ```ignore
/// cache_test_suite!(
///     setup = || async {
///         // Your cache setup code here
///         MyCache::new()
///     },
///     cleanup = |cache| async move {
///         // Optional cleanup code
///     }
/// );
/// ```
#[macro_export]
macro_rules! cache_test_suite {
    (
        setup = $setup:expr
        $(, cleanup = $cleanup:expr)?
    ) => {
        mod cache_test_suite {
            use super::*;
            use $crate::test_common::*;

            #[tokio::test]
            async fn test_set_and_get() {
                let cache = ($setup)().await;
                run_test_set_and_get(&cache).await;
                $( ($cleanup)(cache).await; )?
            }

            #[tokio::test]
            async fn test_get_missing() {
                let cache = ($setup)().await;
                run_test_get_missing(&cache).await;
                $( ($cleanup)(cache).await; )?
            }

            #[tokio::test]
            async fn test_delete_existing() {
                let cache = ($setup)().await;
                run_test_delete_existing(&cache).await;
                $( ($cleanup)(cache).await; )?
            }

            #[tokio::test]
            async fn test_delete_idempotent() {
                let cache = ($setup)().await;
                run_test_delete_idempotent(&cache).await;
                $( ($cleanup)(cache).await; )?
            }

            #[tokio::test]
            async fn test_overwrite() {
                let cache = ($setup)().await;
                run_test_overwrite(&cache).await;
                $( ($cleanup)(cache).await; )?
            }

            #[tokio::test]
            async fn test_empty_value() {
                let cache = ($setup)().await;
                run_test_empty_value(&cache).await;
                $( ($cleanup)(cache).await; )?
            }

            #[tokio::test]
            async fn test_large_value() {
                let cache = ($setup)().await;
                run_test_large_value(&cache).await;
                $( ($cleanup)(cache).await; )?
            }

            #[tokio::test]
            async fn test_binary_value() {
                let cache = ($setup)().await;
                run_test_binary_value(&cache).await;
                $( ($cleanup)(cache).await; )?
            }

            #[tokio::test]
            async fn test_special_characters_in_key() {
                let cache = ($setup)().await;
                run_test_special_characters(&cache).await;
                $( ($cleanup)(cache).await; )?
            }
        }
    };
}

// Individual test implementations that can be reused

pub async fn run_test_set_and_get<C: Cache>(cache: &C) {
    assert_eq!(cache.get("key").await, None);

    cache.set("key", b"hello world").await;

    assert_eq!(cache.get("key").await, Some(b"hello world".to_vec()));
    assert!(cache.contains("key").await);
}

pub async fn run_test_get_missing<C: Cache>(cache: &C) {
    assert_eq!(cache.get("nonexistent").await, None);
    assert!(!cache.contains("nonexistent").await);
}

pub async fn run_test_delete_existing<C: Cache>(cache: &C) {
    cache.set("key", b"data").await;
    cache.delete("key").await;
    assert_eq!(cache.get("key").await, None);
}

pub async fn run_test_delete_idempotent<C: Cache>(cache: &C) {
    cache.delete("never-set").await;
    cache.delete("never-set").await;
    assert_eq!(cache.get("never-set").await, None);
}

pub async fn run_test_overwrite<C: Cache>(cache: &C) {
    cache.set("key", b"first").await;
    cache.set("key", b"second").await;
    assert_eq!(cache.get("key").await, Some(b"second".to_vec()));
}

pub async fn run_test_empty_value<C: Cache>(cache: &C) {
    cache.set("empty", b"").await;
    // An empty value is still a hit.
    assert_eq!(cache.get("empty").await, Some(Vec::new()));
}

pub async fn run_test_large_value<C: Cache>(cache: &C) {
    let data: Vec<u8> = (0..1024 * 1024).map(|i| (i % 251) as u8).collect();
    cache.set("large", &data).await;
    assert_eq!(cache.get("large").await, Some(data));
}

pub async fn run_test_binary_value<C: Cache>(cache: &C) {
    let data: Vec<u8> = (0..=255).collect();
    cache.set("binary", &data).await;
    assert_eq!(cache.get("binary").await, Some(data));
}

pub async fn run_test_special_characters<C: Cache>(cache: &C) {
    let keys = [
        "key-with-dashes",
        "key/with/slashes",
        "../not-a-traversal",
        "key with spaces",
        "ключ",
    ];

    for key in keys {
        cache.set(key, key.as_bytes()).await;
        assert_eq!(cache.get_string(key).await.unwrap().as_deref(), Some(key));
    }
}

/// The calls a backend has received, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get(String),
    Set(String, Vec<u8>),
    Delete(String),
}

/// Shared, ordered log of calls across several backends, tagged by name.
pub type CallLog = Arc<Mutex<Vec<(&'static str, Call)>>>;

/// A `MemoryCache` that records every call it receives.
#[derive(Clone)]
pub struct CountingCache {
    name: &'static str,
    inner: MemoryCache,
    gets: Arc<AtomicUsize>,
    sets: Arc<AtomicUsize>,
    deletes: Arc<AtomicUsize>,
    log: CallLog,
}

impl CountingCache {
    pub fn new(name: &'static str, log: &CallLog) -> Self {
        Self {
            name,
            inner: MemoryCache::new(),
            gets: Arc::default(),
            sets: Arc::default(),
            deletes: Arc::default(),
            log: Arc::clone(log),
        }
    }

    /// Seed a value without recording a call.
    pub async fn seed(&self, key: &str, value: &[u8]) {
        self.inner.set(key, value).await;
    }

    /// Read the underlying store without recording a call.
    pub async fn peek(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.get(key).await
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.log.lock().unwrap().push((self.name, call));
    }
}

impl fmt::Debug for CountingCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountingCache")
            .field("name", &self.name)
            .finish()
    }
}

impl Cache for CountingCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.record(Call::Get(key.to_string()));
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8]) {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.record(Call::Set(key.to_string(), value.to_vec()));
        self.inner.set(key, value).await;
    }

    async fn delete(&self, key: &str) {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.record(Call::Delete(key.to_string()));
        self.inner.delete(key).await;
    }
}

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Names of the backends in the log, in call order.
pub fn call_order(log: &CallLog) -> Vec<&'static str> {
    log.lock().unwrap().iter().map(|(name, _)| *name).collect()
}

/// A `MemoryCache` whose writes block until [`GatedCache::open`] is called.
///
/// Reads and deletes pass straight through.
#[derive(Clone)]
pub struct GatedCache {
    inner: MemoryCache,
    gate: Arc<Semaphore>,
}

impl GatedCache {
    pub fn new() -> Self {
        Self {
            inner: MemoryCache::new(),
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    /// Release pending writes and let later ones through.
    pub fn open(&self) {
        self.gate.add_permits(1024);
    }

    pub async fn peek(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.get(key).await
    }
}

impl fmt::Debug for GatedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatedCache")
            .field("available", &self.gate.available_permits())
            .finish()
    }
}

impl Cache for GatedCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8]) {
        let _permit = self.gate.acquire().await.unwrap();
        self.inner.set(key, value).await;
    }

    async fn delete(&self, key: &str) {
        self.inner.delete(key).await;
    }
}

/// Poll `check` until it returns true, failing the test after two seconds.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let polled = tokio::time::timeout(Duration::from_secs(2), async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "condition not reached within timeout");
}

/// Install a `tracing` subscriber honouring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Unique, not-yet-created directory under the system temp dir.
pub fn temp_root(base: &str) -> std::path::PathBuf {
    use std::time::{SystemTime, UNIX_EPOCH};
    static SEQ: AtomicUsize = AtomicUsize::new(0);
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let seq = SEQ.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!("multicache-{base}-{timestamp}-{seq}"))
}
