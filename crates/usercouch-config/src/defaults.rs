//! Built-in configuration defaults.

use camino::Utf8PathBuf;
use std::env;

#[cfg(unix)]
use libc::geteuid;

#[cfg(unix)]
use dirs::data_dir;

/// Executable launched when no override is configured.
pub const DEFAULT_COUCHDB_BINARY: &str = "/usr/bin/couchdb";

/// System defaults file loaded at the head of the ini chain.
pub const DEFAULT_DEFAULT_INI: &str = "/etc/couchdb/default.ini";

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binary.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Default logging format for the binary.
pub fn default_log_format() -> crate::session::LogFormat {
    crate::session::LogFormat::Json
}

/// Default CouchDB executable.
pub fn default_couchdb_binary() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_COUCHDB_BINARY)
}

/// Default system ini file.
pub fn default_default_ini() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_DEFAULT_INI)
}

/// Computes the default per-user base directory.
///
/// Prefers `$XDG_DATA_HOME/usercouch`; without a data directory the path
/// falls back to the temporary directory, namespaced by effective uid.
pub fn default_base_dir() -> Utf8PathBuf {
    default_base_dir_inner()
}

#[cfg(unix)]
fn default_base_dir_inner() -> Utf8PathBuf {
    if let Some(mut dir) = data_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok()) {
        dir.push("usercouch");
        return dir;
    }
    let mut dir = fallback_base_directory();
    dir.push("usercouch");
    dir.push(user_namespace());
    dir
}

#[cfg(not(unix))]
fn default_base_dir_inner() -> Utf8PathBuf {
    let mut dir = fallback_base_directory();
    dir.push("usercouch");
    dir
}

fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> String {
    // SAFETY: `geteuid(2)` has no preconditions and cannot fail.
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}
