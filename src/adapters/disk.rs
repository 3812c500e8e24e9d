use crate::{Cache, Result};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

// Temp file names stay short and unique regardless of key length.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// A local filesystem cache adapter.
///
/// - Each entry is one file directly under the configured root directory.
/// - The file name is the lower-case hex encoding of the key, so any key is
///   a valid, flat file name and can be recovered with [`DiskCache::keys`].
///   Keys over 127 bytes encode to more than the usual 255-byte file name
///   limit and are never stored.
/// - Writes go to a short `.tmp-<n>` file in the root and are renamed into place,
///   so a concurrent `get` sees either the old value or the new one.
///
/// Filesystem errors are logged and swallowed: a failed read is a miss, a
/// failed write or delete leaves the entry as it was.
#[derive(Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl fmt::Debug for DiskCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiskCache")
            .field("root", &self.root)
            .finish()
    }
}

impl DiskCache {
    /// Create a disk cache rooted at `root`. The directory is created on the
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a disk cache rooted at `root`, creating the directory now.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let cache = Self::new(root);
        tokio::fs::create_dir_all(&cache.root).await?;
        Ok(cache)
    }

    /// Return the configured root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `key`.
    pub fn path_for_key(&self, key: &str) -> PathBuf {
        self.root.join(hex::encode(key))
    }

    /// Sorted list of keys currently stored under the root.
    pub async fn keys(&self) -> Result<Vec<String>> {
        let mut rd = match tokio::fs::read_dir(&self.root).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut out = Vec::new();
        while let Some(entry) = rd.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            // Skips in-flight temp files and anything not written by us.
            let name = entry.file_name();
            let Some(key) = name
                .to_str()
                .and_then(|n| hex::decode(n).ok())
                .and_then(|raw| String::from_utf8(raw).ok())
            else {
                continue;
            };
            out.push(key);
        }

        out.sort();
        Ok(out)
    }

    async fn write_file(&self, path: &Path, value: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;

        let tmp = self
            .root
            .join(format!(".tmp-{}", TMP_SEQ.fetch_add(1, Ordering::Relaxed)));

        tokio::fs::write(&tmp, value).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(())
    }
}

impl Cache for DiskCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.path_for_key(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(key, path = %path.display(), error = ?e, "Disk read failed, treating as miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &[u8]) {
        let path = self.path_for_key(key);
        if let Err(e) = self.write_file(&path, value).await {
            tracing::warn!(key, path = %path.display(), error = ?e, "Disk write failed");
        }
    }

    async fn delete(&self, key: &str) {
        let path = self.path_for_key(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(key, path = %path.display(), error = ?e, "Disk delete failed");
            }
        }
    }
}
