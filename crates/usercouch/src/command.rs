//! Server command line.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use usercouch_config::{DEFAULT_COUCHDB_BINARY, DEFAULT_DEFAULT_INI};

use crate::paths::Paths;

/// `couchdb -n -a <default.ini> -a <usercouch.ini> -a <session.ini>`.
///
/// `-n` resets the configuration chain so only the listed files apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouchCommand {
    binary: PathBuf,
    default_ini: PathBuf,
    package_ini: PathBuf,
    session_ini: PathBuf,
}

impl CouchCommand {
    /// Builds the command for the session files in `paths`.
    #[must_use]
    pub fn new(paths: &Paths) -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_COUCHDB_BINARY),
            default_ini: PathBuf::from(DEFAULT_DEFAULT_INI),
            package_ini: paths.package_ini().to_path_buf(),
            session_ini: paths.ini().to_path_buf(),
        }
    }

    /// Overrides the server executable.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Overrides the system defaults file.
    #[must_use]
    pub fn with_default_ini(mut self, default_ini: impl Into<PathBuf>) -> Self {
        self.default_ini = default_ini.into();
        self
    }

    /// Server executable.
    pub fn binary(&self) -> &Path {
        self.binary.as_path()
    }

    /// Arguments passed to the executable.
    #[must_use]
    pub fn args(&self) -> Vec<OsString> {
        vec![
            OsString::from("-n"),
            OsString::from("-a"),
            self.default_ini.clone().into_os_string(),
            OsString::from("-a"),
            self.package_ini.clone().into_os_string(),
            OsString::from("-a"),
            self.session_ini.clone().into_os_string(),
        ]
    }

    /// A ready-to-spawn [`Command`].
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        command.args(self.args());
        command
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn command_chains_ini_files_in_order() {
        let dir = TempDir::new().expect("temp dir");
        let paths = Paths::prepare(dir.path()).expect("paths");
        let command = CouchCommand::new(&paths);
        assert_eq!(command.binary(), Path::new("/usr/bin/couchdb"));
        let expected: Vec<OsString> = vec![
            "-n".into(),
            "-a".into(),
            "/etc/couchdb/default.ini".into(),
            "-a".into(),
            dir.path().join("usercouch.ini").into_os_string(),
            "-a".into(),
            dir.path().join("session.ini").into_os_string(),
        ];
        assert_eq!(command.args(), expected);
    }

    #[test]
    fn overrides_replace_binary_and_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let paths = Paths::prepare(dir.path()).expect("paths");
        let command = CouchCommand::new(&paths)
            .with_binary("/opt/couchdb/bin/couchdb")
            .with_default_ini("/opt/couchdb/etc/default.ini");
        let std_command = command.to_command();
        assert_eq!(std_command.get_program(), "/opt/couchdb/bin/couchdb");
        let args: Vec<_> = std_command.get_args().collect();
        assert_eq!(args[2], "/opt/couchdb/etc/default.ini");
    }
}
