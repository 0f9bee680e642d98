//! Throwaway sessions for test suites.

use std::ops::{Deref, DerefMut};
use std::path::Path;

use tempfile::TempDir;

use usercouch_config::AuthMode;

use crate::env::Env;
use crate::options::Options;
use crate::process::{Collaborators, SupervisorError, UserCouch};

const TEMP_PREFIX: &str = "tmpcouch.";

/// A [`UserCouch`] in a fresh temporary directory.
///
/// Dropping it stops the server, releases the lock, then deletes the
/// directory.
#[derive(Debug)]
pub struct TempCouch {
    // Drops before `dir`.
    couch: UserCouch,
    dir: TempDir,
}

impl TempCouch {
    /// Creates the directory and locks it using production collaborators.
    pub fn new() -> Result<Self, SupervisorError> {
        Self::with_collaborators(Collaborators::system()?)
    }

    /// Creates the directory and locks it.
    pub fn with_collaborators(collaborators: Collaborators) -> Result<Self, SupervisorError> {
        let dir = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir()
            .map_err(|source| SupervisorError::TempDir { source })?;
        let couch = UserCouch::with_collaborators(dir.path(), collaborators)?;
        Ok(Self { couch, dir })
    }

    /// Creates and bootstraps a session with default options.
    pub fn bootstrapped(auth: AuthMode) -> Result<(Self, Env), SupervisorError> {
        let mut couch = Self::new()?;
        let env = couch.bootstrap(auth, Options::default(), None)?;
        Ok((couch, env))
    }

    /// Temporary directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Deref for TempCouch {
    type Target = UserCouch;

    fn deref(&self) -> &Self::Target {
        &self.couch
    }
}

impl DerefMut for TempCouch {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.couch
    }
}
