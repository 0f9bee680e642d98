//! Defines the unified error surface for session supervision.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use nix::errno::Errno;
use thiserror::Error;

use crate::lock::LockError;
use crate::options::OptionsError;
use crate::paths::PathsError;
use crate::ports::PortError;
use crate::probe::ProbeError;
use crate::random::CredentialError;

/// Errors surfaced while bootstrapping or supervising a session.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The base directory does not exist or is not a directory.
    #[error("basedir not a directory: '{path}'")]
    NotADirectory {
        /// Absolute base directory.
        path: PathBuf,
    },
    /// Resolving the base directory against the working directory failed.
    #[error("failed to resolve basedir '{path}': {source}")]
    Basedir {
        /// Path as supplied.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Creating a temporary base directory failed.
    #[error("failed to create temporary basedir: {source}")]
    TempDir {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Another owner holds the base directory.
    #[error(transparent)]
    Lock(#[from] LockError),
    /// Preparing the directory layout failed.
    #[error(transparent)]
    Paths(#[from] PathsError),
    /// An operation required a bootstrapped session.
    #[error("must call bootstrap() before {operation}()")]
    NotBootstrapped {
        /// Operation that was attempted.
        operation: &'static str,
    },
    /// `bootstrap()` was called more than once.
    #[error("bootstrap() already called")]
    AlreadyBootstrapped,
    /// Session options were invalid.
    #[error(transparent)]
    Options(#[from] OptionsError),
    /// Reserving listening ports failed.
    #[error(transparent)]
    Ports(#[from] PortError),
    /// Building the client URL failed.
    #[error("failed to build session url: {source}")]
    Url {
        /// Underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// Hashing the admin password failed.
    #[error(transparent)]
    Credential(#[from] CredentialError),
    /// Writing a session file failed.
    #[error("failed to write '{path}': {source}")]
    WriteFile {
        /// File being written.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The server executable could not be spawned.
    #[error("failed to spawn '{binary}': {source}")]
    Spawn {
        /// Executable path.
        binary: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Signalling the server failed.
    #[error("failed to signal server {pid}: {source}")]
    Signal {
        /// Server PID.
        pid: u32,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// Waiting on the server failed.
    #[error("failed to wait on server {pid}: {source}")]
    Wait {
        /// Server PID.
        pid: u32,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The server exited before it answered a probe.
    #[error("server {pid} exited during startup with {status}")]
    ExitedEarly {
        /// Server PID.
        pid: u32,
        /// Exit status reported by the OS.
        status: ExitStatus,
    },
    /// The server never answered within the start schedule.
    #[error("could not start server: no answer after {attempts} probes over {elapsed:?}")]
    StartTimeout {
        /// Probes attempted.
        attempts: u32,
        /// Time spent waiting.
        elapsed: Duration,
    },
    /// A liveness probe failed outright.
    #[error(transparent)]
    Probe(#[from] ProbeError),
}

impl From<url::ParseError> for SupervisorError {
    fn from(source: url::ParseError) -> Self {
        Self::Url { source }
    }
}
