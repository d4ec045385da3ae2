//! Advisory per-path locking.
//!
//! Locks are cooperative: a sentinel file `<path>.lock` created with
//! create-if-absent semantics marks the holder. Nothing stops a process that
//! ignores sentinels from writing concurrently.
//!
//! Call sites go through the [`PathLocker`] trait so a kernel-level lock can
//! replace the sentinel scheme without touching them.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::FsConfig;
use crate::error::{ErrorKind, FsError, FsResult};

/// Exclusive access to a single path.
#[async_trait]
pub trait PathLocker: Send + Sync {
    /// Wait until `path` is held by the caller, `timeout` elapses or `cancel`
    /// fires.
    async fn acquire(
        &self,
        path: &Path,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> FsResult<LockHandle>;
}

/// A held lock. Dropping the handle releases it.
#[must_use = "the lock is released as soon as the handle is dropped"]
pub struct LockHandle {
    path: PathBuf,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl LockHandle {
    /// Build a handle that runs `release` exactly once.
    pub fn new(path: impl Into<PathBuf>, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            path: path.into(),
            release: Some(Box::new(release)),
        }
    }

    /// The locked path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release explicitly.
    pub fn release(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        self.run_release();
    }
}

impl std::fmt::Debug for LockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockHandle")
            .field("path", &self.path)
            .field("held", &self.release.is_some())
            .finish()
    }
}

/// Sentinel path guarding `path`.
pub fn sentinel_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

/// Sentinel-file locker with stale eviction and capped exponential backoff.
#[derive(Debug, Clone)]
pub struct SentinelLocker {
    stale_after: Duration,
    backoff_initial: Duration,
    backoff_max: Duration,
}

impl SentinelLocker {
    pub fn new(stale_after: Duration, backoff_initial: Duration, backoff_max: Duration) -> Self {
        Self {
            stale_after,
            backoff_initial,
            backoff_max,
        }
    }

    pub fn from_config(config: &FsConfig) -> Self {
        Self::new(
            config.stale_lock_age(),
            Duration::from_millis(config.lock_backoff_initial_ms),
            Duration::from_millis(config.lock_backoff_max_ms),
        )
    }

    async fn try_create(&self, sentinel: &Path) -> io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(sentinel)
            .await?;
        let owner = format!(
            "{}\n{}\n",
            std::process::id(),
            chrono::Utc::now().timestamp()
        );
        // Ownership details are informational; the file's existence is the lock.
        if let Err(e) = file.write_all(owner.as_bytes()).await {
            debug!(sentinel = %sentinel.display(), error = %e, "could not record lock owner");
        }
        Ok(())
    }

    async fn is_stale(&self, sentinel: &Path) -> bool {
        let Ok(meta) = tokio::fs::metadata(sentinel).await else {
            return false;
        };
        meta.modified()
            .ok()
            .and_then(|m| SystemTime::now().duration_since(m).ok())
            .is_some_and(|age| age > self.stale_after)
    }
}

impl Default for SentinelLocker {
    fn default() -> Self {
        Self::from_config(&FsConfig::default())
    }
}

#[async_trait]
impl PathLocker for SentinelLocker {
    #[tracing::instrument(skip(self, path, cancel), fields(path = %path.display()), name = "lock.acquire")]
    async fn acquire(
        &self,
        path: &Path,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> FsResult<LockHandle> {
        let display = path.display().to_string();
        let sentinel = sentinel_path(path);
        let deadline = Instant::now() + timeout;
        let mut delay = self.backoff_initial;

        loop {
            if cancel.is_cancelled() {
                return Err(FsError::new("lock", display, ErrorKind::Cancelled));
            }

            match self.try_create(&sentinel).await {
                Ok(()) => {
                    debug!("lock acquired");
                    let held = sentinel.clone();
                    return Ok(LockHandle::new(path, move || {
                        if let Err(e) = std::fs::remove_file(&held) {
                            if e.kind() != io::ErrorKind::NotFound {
                                warn!(sentinel = %held.display(), error = %e, "failed to remove lock sentinel");
                            }
                        }
                    }));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    if self.is_stale(&sentinel).await {
                        warn!(sentinel = %sentinel.display(), "evicting stale lock");
                        match tokio::fs::remove_file(&sentinel).await {
                            Ok(()) => continue,
                            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                            Err(e) => return Err(FsError::io("lock", display, e)),
                        }
                    }
                }
                Err(e) => return Err(FsError::io("lock", display, e)),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(FsError::new("lock", display, ErrorKind::LockTimeout(timeout)));
            }
            let wait = delay.min(deadline - now);
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(FsError::new("lock", display, ErrorKind::Cancelled));
                }
                _ = tokio::time::sleep(wait) => {}
            }
            delay = (delay * 2).min(self.backoff_max);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confine_types::ErrorCode;
    use tempfile::TempDir;

    fn locker() -> SentinelLocker {
        SentinelLocker::new(
            Duration::from_secs(300),
            Duration::from_millis(10),
            Duration::from_millis(50),
        )
    }

    #[test]
    fn test_sentinel_path() {
        assert_eq!(
            sentinel_path(Path::new("/tmp/a.txt")),
            PathBuf::from("/tmp/a.txt.lock")
        );
    }

    #[tokio::test]
    async fn test_mutual_exclusion() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a.txt");
        let locker = locker();
        let cancel = CancellationToken::new();

        let held = locker
            .acquire(&target, Duration::from_secs(1), &cancel)
            .await
            .unwrap();
        assert!(sentinel_path(&target).exists());

        let started = std::time::Instant::now();
        let err = locker
            .acquire(&target, Duration::from_millis(300), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::LockTimeout);
        assert!(started.elapsed() >= Duration::from_millis(300));

        held.release();
        assert!(!sentinel_path(&target).exists());

        let started = std::time::Instant::now();
        let again = locker
            .acquire(&target, Duration::from_millis(300), &cancel)
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_millis(100));
        drop(again);
        assert!(!sentinel_path(&target).exists());
    }

    #[tokio::test]
    async fn test_stale_sentinel_evicted() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("b.txt");
        let sentinel = sentinel_path(&target);
        let file = std::fs::File::create(&sentinel).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(600))
            .unwrap();
        drop(file);

        let started = std::time::Instant::now();
        let handle = locker()
            .acquire(&target, Duration::from_secs(2), &CancellationToken::new())
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(handle.path(), target.as_path());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_wait() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("c.txt");
        let locker = locker();
        let _held = locker
            .acquire(&target, Duration::from_secs(1), &CancellationToken::new())
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = locker
            .acquire(&target, Duration::from_secs(10), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_concurrent_holders_never_overlap() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let dir = TempDir::new().unwrap();
        let target = Arc::new(dir.path().join("shared.txt"));
        let locker = Arc::new(locker());
        let inside = Arc::new(AtomicUsize::new(0));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let (target, locker, inside) = (target.clone(), locker.clone(), inside.clone());
            tasks.spawn(async move {
                let handle = locker
                    .acquire(&target, Duration::from_secs(5), &CancellationToken::new())
                    .await
                    .unwrap();
                assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
                handle.release();
            });
        }
        while let Some(res) = tasks.join_next().await {
            res.unwrap();
        }
    }
}
