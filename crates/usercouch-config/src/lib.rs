//! Shared configuration for the usercouch library and command-line tool.
//!
//! The crate defines the vocabulary used to describe a per-user CouchDB
//! session (authentication mode, bind address, file compression and server
//! log level) together with the layered [`Config`] consumed by the
//! `usercouch` binary. Layers are merged by `ortho_config` in increasing
//! precedence: built-in defaults, configuration file, `USERCOUCH_*`
//! environment variables, then command-line flags.

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod session;

pub use defaults::{
    DEFAULT_COUCHDB_BINARY, DEFAULT_DEFAULT_INI, DEFAULT_LOG_FILTER, default_base_dir,
    default_couchdb_binary, default_default_ini, default_log_filter, default_log_filter_string,
    default_log_format,
};
pub use session::{
    AuthMode, BindAddress, CouchLogLevel, FileCompression, LogFormat, SessionParseError,
};

/// Layered runtime configuration for the `usercouch` binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "USERCOUCH")]
pub struct Config {
    /// Directory owned by the supervised CouchDB instance.
    #[ortho_config(default = defaults::default_base_dir())]
    pub base_dir: Utf8PathBuf,
    /// Authentication mode rendered into the session configuration.
    #[ortho_config(default = AuthMode::Basic)]
    pub auth: AuthMode,
    /// Address the server listens on.
    #[ortho_config(default = BindAddress::Loopback)]
    pub bind_address: BindAddress,
    /// Compression applied to database and view files.
    #[ortho_config(default = FileCompression::Snappy)]
    pub file_compression: FileCompression,
    /// Log level written into the server's `[log]` section.
    #[ortho_config(default = CouchLogLevel::Notice)]
    pub couch_log_level: CouchLogLevel,
    /// CouchDB executable to launch.
    #[ortho_config(default = defaults::default_couchdb_binary())]
    pub couchdb_binary: Utf8PathBuf,
    /// System-wide CouchDB defaults loaded before the package and session files.
    #[ortho_config(default = defaults::default_default_ini())]
    pub default_ini: Utf8PathBuf,
    /// Tracing filter expression for the binary's own logs.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for the binary's own logs.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            auth: AuthMode::default(),
            bind_address: BindAddress::default(),
            file_compression: FileCompression::default(),
            couch_log_level: CouchLogLevel::default(),
            couchdb_binary: default_couchdb_binary(),
            default_ini: default_default_ini(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Directory owned by the supervised instance.
    #[must_use]
    pub fn base_dir(&self) -> &Utf8Path {
        self.base_dir.as_path()
    }

    /// Authentication mode for new sessions.
    #[must_use]
    pub fn auth(&self) -> AuthMode {
        self.auth
    }

    /// Address the server binds to.
    #[must_use]
    pub fn bind_address(&self) -> BindAddress {
        self.bind_address
    }

    /// Compression used for database files.
    #[must_use]
    pub fn file_compression(&self) -> FileCompression {
        self.file_compression
    }

    /// Server log level.
    #[must_use]
    pub fn couch_log_level(&self) -> CouchLogLevel {
        self.couch_log_level
    }

    /// CouchDB executable path.
    #[must_use]
    pub fn couchdb_binary(&self) -> &Utf8Path {
        self.couchdb_binary.as_path()
    }

    /// System default ini path.
    #[must_use]
    pub fn default_ini(&self) -> &Utf8Path {
        self.default_ini.as_path()
    }

    /// Tracing filter for the binary.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format for the binary.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
