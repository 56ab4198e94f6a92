//! Per-resource lock files.
//!
//! Locking is opt-in. When a lock directory is configured, each invocation
//! holds `<dir>/<kind>-<name>.lock` for the duration of its reconciliation so
//! that two concurrent invocations never drive the same resource at once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{LockError, Result};
use crate::resource::Resource;

/// Lock expiry duration in seconds.
pub const LOCK_EXPIRY_SECS: i64 = 300; // 5 minutes

/// Directory name used under the runtime/cache directory.
const LOCK_DIR_NAME: &str = "resource-reconciler";

/// Information stored in a lock file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Unique lock identifier.
    pub lock_id: String,
    /// Who holds the lock.
    pub holder: String,
    /// Locked resource, e.g. `container web01`.
    pub resource: String,
    /// When the lock was acquired.
    pub acquired_at: DateTime<Utc>,
    /// When the lock expires.
    pub expires_at: DateTime<Utc>,
}

/// A held lock. Release it with [`LockManager::release`].
#[derive(Debug)]
pub struct ResourceLock {
    /// Lock file path.
    path: PathBuf,
    /// Lock information written to the file.
    info: LockInfo,
}

/// Creates and releases lock files in one directory.
#[derive(Debug, Clone)]
pub struct LockManager {
    /// Directory holding lock files.
    dir: PathBuf,
    /// Holder identifier written into new locks.
    holder: String,
}

impl LockInfo {
    /// Creates a new lock info.
    #[must_use]
    pub fn new(holder: &str, resource: &Resource) -> Self {
        let now = Utc::now();
        Self {
            lock_id: Uuid::new_v4().to_string(),
            holder: holder.to_string(),
            resource: resource.to_string(),
            acquired_at: now,
            expires_at: now + chrono::Duration::seconds(LOCK_EXPIRY_SECS),
        }
    }

    /// Checks if the lock has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Returns the remaining time until expiry in seconds.
    #[must_use]
    pub fn remaining_secs(&self) -> i64 {
        let remaining = self.expires_at - Utc::now();
        remaining.num_seconds().max(0)
    }
}

impl ResourceLock {
    /// Gets the lock info.
    #[must_use]
    pub const fn info(&self) -> &LockInfo {
        &self.info
    }

    /// Gets the lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LockManager {
    /// Creates a lock manager for a directory with a generated holder id.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            holder: generate_holder_id(),
        }
    }

    /// Overrides the holder identifier.
    #[must_use]
    pub fn with_holder(mut self, holder: impl Into<String>) -> Self {
        self.holder = holder.into();
        self
    }

    /// Returns the default lock directory: the user runtime directory, else the cache directory.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::runtime_dir()
            .or_else(dirs::cache_dir)
            .map(|d| d.join(LOCK_DIR_NAME))
    }

    /// Returns the lock file path for a resource.
    #[must_use]
    pub fn lock_path(&self, resource: &Resource) -> PathBuf {
        self.dir
            .join(format!("{}-{}.lock", resource.kind.label(), resource.name))
    }

    /// Acquires the lock for a resource.
    ///
    /// An expired lock left behind by a dead invocation is taken over.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Held`] if another live holder owns the lock.
    pub async fn acquire(&self, resource: &Resource, action: &str) -> Result<ResourceLock> {
        let path = self.lock_path(resource);
        fs::create_dir_all(&self.dir).await.map_err(|source| LockError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let info = LockInfo::new(&self.holder, resource);

        if let Err(e) = Self::write_new(&path, &info).await {
            if e.kind() != std::io::ErrorKind::AlreadyExists {
                return Err(LockError::Io { path, source: e }.into());
            }

            let existing = Self::read(&path).await?;
            if !existing.is_expired() {
                return Err(LockError::Held {
                    resource: resource.to_string(),
                    action: action.to_string(),
                    holder: existing.holder,
                    expires_at: existing.expires_at.to_rfc3339(),
                }
                .into());
            }

            warn!(
                "Taking over expired lock {} held by {}",
                existing.lock_id, existing.holder
            );
            fs::remove_file(&path)
                .await
                .map_err(|source| LockError::Io {
                    path: path.clone(),
                    source,
                })?;
            Self::write_new(&path, &info)
                .await
                .map_err(|source| LockError::Io {
                    path: path.clone(),
                    source,
                })?;
        }

        info!(
            "Acquired lock for {resource}: {} (expires in {}s)",
            info.lock_id, LOCK_EXPIRY_SECS
        );
        Ok(ResourceLock { path, info })
    }

    /// Releases a held lock.
    ///
    /// The file is only removed if it still carries this lock's id.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be read or removed.
    pub async fn release(&self, lock: ResourceLock) -> Result<()> {
        if !lock.path.exists() {
            debug!("Lock file already gone: {}", lock.path.display());
            return Ok(());
        }

        let current = Self::read(&lock.path).await?;
        if current.lock_id != lock.info.lock_id {
            debug!(
                "Lock ID mismatch: expected {}, found {}",
                lock.info.lock_id, current.lock_id
            );
            return Ok(());
        }

        fs::remove_file(&lock.path)
            .await
            .map_err(|source| LockError::Io {
                path: lock.path.clone(),
                source,
            })?;
        info!("Released lock: {}", lock.info.lock_id);
        Ok(())
    }

    /// Returns the current lock on a resource, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing lock file cannot be decoded.
    pub async fn inspect(&self, resource: &Resource) -> Result<Option<LockInfo>> {
        let path = self.lock_path(resource);
        if !path.exists() {
            return Ok(None);
        }
        Self::read(&path).await.map(Some)
    }

    /// Creates the lock file, failing if it already exists.
    async fn write_new(path: &Path, info: &LockInfo) -> std::io::Result<()> {
        let content = serde_json::to_string_pretty(info)?;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await
    }

    /// Reads and decodes a lock file.
    async fn read(path: &Path) -> Result<LockInfo> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| LockError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        serde_json::from_str(&content).map_err(|e| {
            LockError::Corrupted {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()
        })
    }
}

/// Generates a unique holder identifier for the current process.
#[must_use]
pub fn generate_holder_id() -> String {
    let hostname = hostname::get()
        .map_or_else(|_| String::from("unknown"), |h| h.to_string_lossy().to_string());

    let pid = std::process::id();
    let uuid = &Uuid::new_v4().to_string()[..8];

    format!("{hostname}-{pid}-{uuid}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::error::ReconcilerError;

    fn manager(dir: &TempDir, holder: &str) -> LockManager {
        LockManager::new(dir.path()).with_holder(holder)
    }

    #[test]
    fn test_lock_info_creation() {
        let info = LockInfo::new("test-holder", &Resource::container("web01"));
        assert_eq!(info.holder, "test-holder");
        assert_eq!(info.resource, "container web01");
        assert!(!info.is_expired());
        assert!(info.remaining_secs() > 0);
    }

    #[test]
    fn test_lock_path_per_kind() {
        let m = LockManager::new("/run/locks");
        assert_eq!(
            m.lock_path(&Resource::site("default")),
            PathBuf::from("/run/locks/site-default.lock")
        );
        assert_ne!(
            m.lock_path(&Resource::site("ssl")),
            m.lock_path(&Resource::module("ssl"))
        );
    }

    #[test]
    fn test_holder_id_generation() {
        let id1 = generate_holder_id();
        let id2 = generate_holder_id();
        assert_ne!(id1, id2);
        assert!(id1.contains(&std::process::id().to_string()));
    }

    #[tokio::test]
    async fn test_acquire_release() {
        let dir = TempDir::new().unwrap();
        let m = manager(&dir, "holder-1");
        let resource = Resource::container("web01");

        let lock = m.acquire(&resource, "start").await.unwrap();
        assert!(lock.path().exists());
        let seen = m.inspect(&resource).await.unwrap().unwrap();
        assert_eq!(seen.lock_id, lock.info().lock_id);

        m.release(lock).await.unwrap();
        assert!(m.inspect(&resource).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lock_conflict() {
        let dir = TempDir::new().unwrap();
        let resource = Resource::container("web01");

        let _held = manager(&dir, "holder-1").acquire(&resource, "start").await.unwrap();
        let err = manager(&dir, "holder-2").acquire(&resource, "start").await.unwrap_err();
        assert!(matches!(err, ReconcilerError::Lock(LockError::Held { .. })));
        assert!(err.to_string().contains("holder-1"));
        assert!(err.to_string().starts_with("Lock error: Cannot start container web01"));

        // Other resources are unaffected.
        manager(&dir, "holder-2")
            .acquire(&Resource::container("web02"), "start")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_expired_lock_is_taken_over() {
        let dir = TempDir::new().unwrap();
        let resource = Resource::module("wsgi");
        let m = manager(&dir, "holder-2");

        let mut stale = LockInfo::new("dead-holder", &resource);
        stale.expires_at = Utc::now() - chrono::Duration::seconds(1);
        std::fs::write(
            m.lock_path(&resource),
            serde_json::to_string(&stale).unwrap(),
        )
        .unwrap();

        let lock = m.acquire(&resource, "start").await.unwrap();
        assert_eq!(lock.info().holder, "holder-2");
    }

    #[tokio::test]
    async fn test_release_leaves_foreign_lock() {
        let dir = TempDir::new().unwrap();
        let resource = Resource::container("web01");
        let m = manager(&dir, "holder-1");

        let lock = m.acquire(&resource, "start").await.unwrap();
        let replacement = LockInfo::new("holder-2", &resource);
        std::fs::write(lock.path(), serde_json::to_string(&replacement).unwrap()).unwrap();

        m.release(lock).await.unwrap();
        let current = m.inspect(&resource).await.unwrap().unwrap();
        assert_eq!(current.holder, "holder-2");
    }

    #[tokio::test]
    async fn test_corrupted_lock_file() {
        let dir = TempDir::new().unwrap();
        let resource = Resource::container("web01");
        let m = manager(&dir, "holder-1");
        std::fs::write(m.lock_path(&resource), "not json").unwrap();

        let err = m.acquire(&resource, "start").await.unwrap_err();
        assert!(matches!(err, ReconcilerError::Lock(LockError::Corrupted { .. })));
    }
}
