//! Well-known files and directories inside a session base directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::PROCESS_TARGET;

/// Errors raised while preparing the base directory layout.
#[derive(Debug, Error)]
pub enum PathsError {
    /// An entry exists where a directory is expected.
    #[error("not a directory: '{path}'")]
    NotADirectory {
        /// Offending path.
        path: PathBuf,
    },
    /// Creating or inspecting a directory failed.
    #[error("failed to prepare directory '{path}': {source}")]
    Directory {
        /// Directory being prepared.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Moving the previous server log aside failed.
    #[error("failed to rotate log file '{path}': {source}")]
    Rotate {
        /// Log file being rotated.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Layout of a session base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    basedir: PathBuf,
    ini: PathBuf,
    package_ini: PathBuf,
    databases: PathBuf,
    views: PathBuf,
    dump: PathBuf,
    ssl: PathBuf,
    log: PathBuf,
    logfile: PathBuf,
}

impl Paths {
    /// Creates any missing directories under `basedir` and rotates the
    /// previous server log.
    pub fn prepare(basedir: &Path) -> Result<Self, PathsError> {
        let databases = ensure_dir(basedir, "databases")?;
        let views = ensure_dir(basedir, "views")?;
        let dump = ensure_dir(basedir, "dump")?;
        let ssl = ensure_dir(basedir, "ssl")?;
        let log = ensure_dir(basedir, "log")?;
        // Rotate only once the whole layout is in place.
        let logfile = rotate_log(&log, "couchdb")?;
        Ok(Self {
            basedir: basedir.to_path_buf(),
            ini: basedir.join("session.ini"),
            package_ini: basedir.join("usercouch.ini"),
            databases,
            views,
            dump,
            ssl,
            log,
            logfile,
        })
    }

    /// Base directory.
    pub fn basedir(&self) -> &Path {
        self.basedir.as_path()
    }

    /// One-time session configuration written at bootstrap.
    pub fn ini(&self) -> &Path {
        self.ini.as_path()
    }

    /// Package defaults loaded before the session file.
    pub fn package_ini(&self) -> &Path {
        self.package_ini.as_path()
    }

    /// Database files.
    pub fn databases(&self) -> &Path {
        self.databases.as_path()
    }

    /// View index files.
    pub fn views(&self) -> &Path {
        self.views.as_path()
    }

    /// Scratch space for database dumps.
    pub fn dump(&self) -> &Path {
        self.dump.as_path()
    }

    /// Certificates and keys.
    pub fn ssl(&self) -> &Path {
        self.ssl.as_path()
    }

    /// Log directory.
    pub fn log(&self) -> &Path {
        self.log.as_path()
    }

    /// Server log file.
    pub fn logfile(&self) -> &Path {
        self.logfile.as_path()
    }
}

fn ensure_dir(basedir: &Path, name: &str) -> Result<PathBuf, PathsError> {
    let path = basedir.join(name);
    match fs::create_dir(&path) {
        Ok(()) => {
            debug!(target: PROCESS_TARGET, dir = %path.display(), "created directory");
            Ok(path)
        }
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
            let metadata =
                fs::symlink_metadata(&path).map_err(|source| PathsError::Directory {
                    path: path.clone(),
                    source,
                })?;
            if metadata.is_dir() {
                Ok(path)
            } else {
                Err(PathsError::NotADirectory { path })
            }
        }
        Err(source) => Err(PathsError::Directory { path, source }),
    }
}

fn rotate_log(logdir: &Path, name: &str) -> Result<PathBuf, PathsError> {
    let path = logdir.join(format!("{name}.log"));
    if path.is_file() {
        let previous = logdir.join(format!("{name}.log.previous"));
        fs::rename(&path, &previous).map_err(|source| PathsError::Rotate {
            path: path.clone(),
            source,
        })?;
        debug!(
            target: PROCESS_TARGET,
            file = %previous.display(),
            "rotated previous server log"
        );
    }
    Ok(path)
}
