//! Exclusive ownership of a base directory.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;
use tracing::{info, warn};

use crate::PROCESS_TARGET;

const LOCK_FILE_NAME: &str = "lockfile";

/// Errors raised while locking a base directory.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("cannot acquire exclusive lock on '{path}'")]
    Contended {
        /// Lock file path.
        path: PathBuf,
    },
    /// The lock file could not be opened or locked.
    #[error("failed to lock '{path}': {source}")]
    Io {
        /// Lock file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl LockError {
    /// Lock file involved in the failure.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Contended { path } | Self::Io { path, .. } => path.as_path(),
        }
    }
}

/// Non-blocking exclusive advisory lock on `<basedir>/lockfile`.
///
/// The lock is released when the guard drops.
#[derive(Debug)]
pub struct BaseDirLock {
    file: File,
    path: PathBuf,
}

impl BaseDirLock {
    /// Opens the lock file inside `basedir` and locks it without blocking.
    pub fn acquire(basedir: &Path) -> Result<Self, LockError> {
        let path = basedir.join(LOCK_FILE_NAME);
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(false);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(&path).map_err(|source| LockError::Io {
            path: path.clone(),
            source,
        })?;
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                info!(
                    target: PROCESS_TARGET,
                    file = %path.display(),
                    "acquired base directory lock"
                );
                Ok(Self { file, path })
            }
            Err(error) if error.kind() == fs2::lock_contended_error().kind() => {
                Err(LockError::Contended { path })
            }
            Err(source) => Err(LockError::Io { path, source }),
        }
    }

    /// Lock file path.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }
}

impl Drop for BaseDirLock {
    fn drop(&mut self) {
        if let Err(error) = FileExt::unlock(&self.file) {
            warn!(
                target: PROCESS_TARGET,
                file = %self.path.display(),
                error = %error,
                "failed to release base directory lock"
            );
        }
    }
}
