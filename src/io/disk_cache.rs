//! Write-once tile cache on the local filesystem.
//!
//! Entries are plain files laid out by [`cache_path`](crate::tile::cache_path).
//! An entry is created once and never rewritten or expired: existence of the
//! file is the cache hit, its content is never compared.
//!
//! # Atomicity
//!
//! Writes go to a uniquely named temporary file in the destination directory
//! and are then published with a hard link, which fails if the destination
//! already exists. A reader therefore sees either no file or a complete one,
//! and when two builders race for the same tile the first to publish wins.
//! Filesystems that refuse hard links fall back to `rename`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

use crate::error::CacheError;
use crate::tile::{cache_path, CacheKind, TileAddress};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Result of a [`DiskCache::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// This call created the entry
    Written,
    /// An entry already existed and was left untouched
    AlreadyPresent,
}

/// Filesystem-backed write-once cache rooted at a base directory.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the entry for `kind` and `tile` under this cache.
    pub fn path_for(&self, kind: CacheKind, tile: &TileAddress) -> PathBuf {
        cache_path(&self.root, kind, tile)
    }

    /// Check whether an entry exists.
    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    /// Read a complete entry.
    pub async fn read(&self, path: &Path) -> Result<Bytes, CacheError> {
        match tokio::fs::read(path).await {
            Ok(data) => {
                trace!(path = %path.display(), bytes = data.len(), "cache read");
                Ok(Bytes::from(data))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CacheError::NotFound(path.to_path_buf()))
            }
            Err(e) => Err(CacheError::io(path, e)),
        }
    }

    /// Store `data` at `path` unless an entry is already there.
    ///
    /// Missing parent directories are created.
    pub async fn write(&self, path: &Path, data: &[u8]) -> Result<WriteOutcome, CacheError> {
        if self.exists(path).await {
            return Ok(WriteOutcome::AlreadyPresent);
        }

        let parent = path
            .parent()
            .ok_or_else(|| CacheError::io(path, std::io::ErrorKind::InvalidInput.into()))?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CacheError::io(parent, e))?;

        let temp = TempFile::new(path);
        write_fully(temp.path(), data)
            .await
            .map_err(|e| CacheError::io(temp.path(), e))?;

        let outcome = publish(temp.path(), path).await?;
        match outcome {
            WriteOutcome::Written => {
                debug!(path = %path.display(), bytes = data.len(), "cache entry written")
            }
            WriteOutcome::AlreadyPresent => {
                debug!(path = %path.display(), "cache entry written concurrently, keeping existing")
            }
        }
        Ok(outcome)
    }
}

async fn write_fully(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

async fn publish(temp: &Path, path: &Path) -> Result<WriteOutcome, CacheError> {
    match tokio::fs::hard_link(temp, path).await {
        Ok(()) => Ok(WriteOutcome::Written),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Ok(WriteOutcome::AlreadyPresent)
        }
        Err(e) => {
            trace!(path = %path.display(), error = %e, "hard link refused, falling back to rename");
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                return Ok(WriteOutcome::AlreadyPresent);
            }
            tokio::fs::rename(temp, path)
                .await
                .map_err(|e| CacheError::io(path, e))?;
            Ok(WriteOutcome::Written)
        }
    }
}

/// Temporary sibling of a cache entry, removed on drop.
///
/// Dropping also covers a write abandoned mid-way when the request is
/// cancelled.
struct TempFile {
    path: PathBuf,
}

impl TempFile {
    fn new(target: &Path) -> Self {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = target.with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), seq));
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
