//! Starts and supervises per-user CouchDB instances.
//!
//! A [`UserCouch`] takes exclusive ownership of a base directory, writes a
//! one-time `session.ini` with random credentials and freshly allocated
//! ports, launches the server as a child process, and keeps it alive by
//! probing it over HTTP. The clear-text admin password only ever lives in
//! the returned [`Env`]; the session file stores a salted hash.
//!
//! ```no_run
//! use usercouch::{AuthMode, Options, UserCouch};
//!
//! # fn main() -> Result<(), usercouch::SupervisorError> {
//! let mut couch = UserCouch::new("/home/me/.local/share/usercouch")?;
//! let env = couch.bootstrap(AuthMode::Basic, Options::default(), None)?;
//! println!("{}", env.url);
//! couch.check()?;
//! # Ok(())
//! # }
//! ```
//!
//! [`TempCouch`] wraps the same machinery around a temporary directory for
//! test suites, and [`sslhelpers`] drives `openssl` to mint certificates
//! for TLS and replication setups.

mod command;
mod env;
mod files;
mod ini;
mod lock;
mod options;
mod paths;
mod ports;
mod probe;
mod process;
mod random;
mod reporter;
pub mod sslhelpers;
mod tempcouch;

pub use command::CouchCommand;
pub use env::{BasicAuth, Env, Scheme, build_url};
pub use ini::{ListenPorts, PACKAGE_INI, render_session_ini};
pub use lock::{BaseDirLock, LockError};
pub use options::{
    Credentials, DEFAULT_REPLICATOR_MAX_DEPTH, Options, OptionsError, ReplicatorOptions,
    SessionConfig, SslOptions,
};
pub use paths::{Paths, PathsError};
pub use ports::{PortError, Ports};
pub use probe::{DEFAULT_PROBE_TIMEOUT, HttpProbe, LivenessProbe, ProbeError};
pub use process::{
    Collaborators, Launcher, StartSchedule, SupervisorError, SystemLauncher, UserCouch, terminate,
};
pub use random::{
    CredentialError, OAuthTokens, RANDOM_ID_BYTES, SALT_LEN, couch_hashed, db32_encode,
    random_id, random_salt,
};
pub use reporter::{LIFECYCLE_TARGET, LifecycleReporter, StructuredReporter};
pub use tempcouch::TempCouch;
pub use usercouch_config::{AuthMode, BindAddress, CouchLogLevel, FileCompression};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

#[cfg(test)]
mod tests;
