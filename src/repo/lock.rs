//! Advisory lock on the repositories file
//!
//! The lock is an exclusive OS file lock on a sibling `<basename>.lock`
//! file. The kernel drops it when the holder exits, however it exits, so a
//! leftover lock file on disk never blocks anyone.

use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::paths;
use crate::constants::{REPO_LOCK_POLL, REPO_LOCK_TIMEOUT};
use crate::error::{Error, Result};

/// Held lock; released on drop or process exit
#[derive(Debug)]
pub struct RepoLock {
    path: PathBuf,
    file: File,
}

impl RepoLock {
    /// Lock the file that guards `target`, with the standard wait
    pub async fn acquire_for(target: &Path) -> Result<Self> {
        Self::acquire(&paths::lock_path_for(target), REPO_LOCK_TIMEOUT, REPO_LOCK_POLL).await
    }

    /// Take an exclusive lock on `path`, polling until `timeout`
    pub async fn acquire(path: &Path, timeout: Duration, poll: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            paths::ensure_dir(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let deadline = Instant::now() + timeout;
        loop {
            match file.try_lock() {
                Ok(()) => {
                    tracing::debug!("Acquired lock {}", path.display());
                    return Ok(Self {
                        path: path.to_path_buf(),
                        file,
                    });
                }
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() + poll > deadline {
                        return Err(Error::Timeout(format!(
                            "acquiring lock {} after {}s",
                            path.display(),
                            timeout.as_secs()
                        )));
                    }
                    tracing::debug!("Lock {} is held, waiting", path.display());
                    tokio::time::sleep(poll).await;
                }
                Err(TryLockError::Error(e)) => return Err(e.into()),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        // the file stays; removing it would race a waiter that already opened it
        match self.file.unlock() {
            Ok(()) => tracing::debug!("Released lock {}", self.path.display()),
            Err(e) => tracing::warn!("Failed to unlock {}: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(path: &Path) -> impl std::future::Future<Output = Result<RepoLock>> + '_ {
        RepoLock::acquire(path, Duration::ZERO, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repositories.lock");
        {
            let lock = quick(&path).await.unwrap();
            assert!(lock.path().exists());
            assert!(matches!(quick(&path).await.unwrap_err(), Error::Timeout(_)));
        }
        quick(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_leftover_lock_file_is_not_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repositories.lock");
        // what an interrupted run leaves behind: the file without a live lock
        std::fs::write(&path, b"12345\n").unwrap();

        let lock = quick(&path).await.unwrap();
        assert_eq!(lock.path(), path.as_path());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_holder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repositories.lock");
        let held = RepoLock::acquire(&path, REPO_LOCK_TIMEOUT, REPO_LOCK_POLL)
            .await
            .unwrap();

        let releaser = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(held);
        });

        let start = Instant::now();
        let lock = RepoLock::acquire(&path, REPO_LOCK_TIMEOUT, REPO_LOCK_POLL)
            .await
            .unwrap();
        assert!(start.elapsed() < REPO_LOCK_TIMEOUT);
        drop(lock);
        releaser.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repositories.lock");
        let _held = RepoLock::acquire(&path, REPO_LOCK_TIMEOUT, REPO_LOCK_POLL)
            .await
            .unwrap();

        let err = RepoLock::acquire(&path, REPO_LOCK_TIMEOUT, REPO_LOCK_POLL)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }
}
