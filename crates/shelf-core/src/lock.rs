//! Advisory file locks serializing access to the local catalog files.
//!
//! Writers hold an exclusive lock for a whole load-validate-persist cycle;
//! readers share. Locks are released on drop.

use crate::error::ErrorCode;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Failure to take a catalog lock.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("{}: lock timed out after {waited:?} at {}", ErrorCode::LockContention.code(), path.display())]
    Timeout { path: PathBuf, waited: Duration },
    #[error("{}: {0}", ErrorCode::StorageWriteFailed.code())]
    IoError(#[from] io::Error),
}

impl LockError {
    /// Machine-readable code associated with this lock error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Timeout { .. } => ErrorCode::LockContention,
            Self::IoError(_) => ErrorCode::StorageWriteFailed,
        }
    }
}

#[derive(Debug)]
struct AdvisoryLock {
    file: File,
    path: PathBuf,
}

impl AdvisoryLock {
    fn take(path: &Path, timeout: Duration, exclusive: bool) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        let deadline = Instant::now() + timeout;
        let started = Instant::now();
        loop {
            let attempt = if exclusive {
                FileExt::try_lock_exclusive(&file)
            } else {
                FileExt::try_lock_shared(&file)
            };
            match attempt {
                Ok(()) => {
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(err) if err.kind() != io::ErrorKind::WouldBlock && !is_contended(&err) => {
                    return Err(err.into());
                }
                Err(_) if Instant::now() >= deadline => {
                    return Err(LockError::Timeout {
                        path: path.to_path_buf(),
                        waited: started.elapsed(),
                    });
                }
                Err(_) => thread::sleep(POLL_INTERVAL),
            }
        }
    }
}

// fs2 reports contention as the platform's lock error, not always WouldBlock.
fn is_contended(err: &io::Error) -> bool {
    err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

impl Drop for AdvisoryLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Exclusive lock held for one read-modify-write cycle over the catalog.
#[derive(Debug)]
pub struct CatalogWriteLock(AdvisoryLock);

impl CatalogWriteLock {
    /// Take the exclusive lock, polling until `timeout` elapses.
    ///
    /// # Errors
    ///
    /// [`LockError::Timeout`] while another holder keeps the lock, or an I/O
    /// error if the lock file cannot be opened.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self, LockError> {
        AdvisoryLock::take(path, timeout, true).map(Self)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0.path
    }
}

/// Shared lock for consistent reads across both collections.
#[derive(Debug)]
pub struct CatalogReadLock(AdvisoryLock);

impl CatalogReadLock {
    /// Take a shared lock; compatible with other readers, blocked by a writer.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogWriteLock::acquire`].
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self, LockError> {
        AdvisoryLock::take(path, timeout, false).map(Self)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0.path
    }
}
