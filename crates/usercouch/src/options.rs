//! Structured session options and their validation.
//!
//! [`Options`] is what callers hand to [`UserCouch::bootstrap`]; every field
//! is optional. [`Options::resolve`] validates file references and fills in
//! random credentials, producing the [`SessionConfig`] that the ini writer
//! and env builder consume.
//!
//! [`UserCouch::bootstrap`]: crate::UserCouch::bootstrap

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use usercouch_config::{AuthMode, BindAddress, Config, CouchLogLevel, FileCompression};

use crate::random::{CredentialError, OAuthTokens, SALT_LEN, couch_hashed, random_id, random_salt};

/// Default `ssl_certificate_max_depth` for the replicator.
pub const DEFAULT_REPLICATOR_MAX_DEPTH: u32 = 1;

/// Server-side TLS material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SslOptions {
    /// PEM certificate presented by the server.
    pub cert_file: PathBuf,
    /// PEM private key for `cert_file`.
    pub key_file: PathBuf,
    /// Optional CA used to verify clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<PathBuf>,
}

impl SslOptions {
    /// Builds options from a certificate and key.
    pub fn new(cert_file: impl Into<PathBuf>, key_file: impl Into<PathBuf>) -> Self {
        Self {
            cert_file: cert_file.into(),
            key_file: key_file.into(),
            ca_file: None,
        }
    }
}

/// Trust settings for outgoing replication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicatorOptions {
    /// CA bundle remote peers must chain to.
    pub ca_file: PathBuf,
    /// Maximum certificate chain depth.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    /// Client certificate presented to remote peers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_file: Option<PathBuf>,
    /// Private key for `cert_file`; required whenever `cert_file` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,
}

fn default_max_depth() -> u32 {
    DEFAULT_REPLICATOR_MAX_DEPTH
}

impl ReplicatorOptions {
    /// Trusts peers signed by `ca_file` with the default chain depth.
    pub fn new(ca_file: impl Into<PathBuf>) -> Self {
        Self {
            ca_file: ca_file.into(),
            max_depth: DEFAULT_REPLICATOR_MAX_DEPTH,
            cert_file: None,
            key_file: None,
        }
    }

    /// Presents a client certificate to remote peers.
    #[must_use]
    pub fn with_client_cert(
        mut self,
        cert_file: impl Into<PathBuf>,
        key_file: impl Into<PathBuf>,
    ) -> Self {
        self.cert_file = Some(cert_file.into());
        self.key_file = Some(key_file.into());
        self
    }

    /// Client certificate and key when both are configured.
    #[must_use]
    pub fn client_cert(&self) -> Option<(&Path, &Path)> {
        match (&self.cert_file, &self.key_file) {
            (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
            _ => None,
        }
    }
}

/// Caller-supplied session options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Listening address.
    pub bind_address: BindAddress,
    /// Server log level.
    pub loglevel: CouchLogLevel,
    /// Database file compression.
    pub file_compression: FileCompression,
    /// Admin user name; random when absent.
    pub username: Option<String>,
    /// Admin password; random when absent.
    pub password: Option<String>,
    /// Salt for the admin password hash; random when absent.
    pub salt: Option<String>,
    /// OAuth tokens; random when absent and the mode is `oauth`.
    pub oauth: Option<OAuthTokens>,
    /// Enables an HTTPS listener.
    pub ssl: Option<SslOptions>,
    /// Configures replicator certificate checks.
    pub replicator: Option<ReplicatorOptions>,
}

impl Options {
    /// Seeds options from the binary's layered configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            bind_address: config.bind_address(),
            loglevel: config.couch_log_level(),
            file_compression: config.file_compression(),
            ..Self::default()
        }
    }

    /// Validates the options and fills in missing credentials for `auth`.
    pub fn resolve(self, auth: AuthMode) -> Result<SessionConfig, OptionsError> {
        if let Some(ssl) = &self.ssl {
            check_ssl(ssl)?;
        }
        if let Some(replicator) = &self.replicator {
            check_replicator(replicator)?;
        }
        let credentials = if auth.requires_credentials() {
            let salt = match self.salt {
                Some(salt) if salt.len() != SALT_LEN => {
                    return Err(CredentialError::SaltLength { len: salt.len() }.into());
                }
                Some(salt) => salt,
                None => random_salt(),
            };
            Some(Credentials {
                username: self.username.unwrap_or_else(random_id),
                password: self.password.unwrap_or_else(random_id),
                salt,
            })
        } else {
            None
        };
        let oauth = match auth {
            AuthMode::Oauth => Some(self.oauth.unwrap_or_else(OAuthTokens::random)),
            AuthMode::Open | AuthMode::Basic => None,
        };
        Ok(SessionConfig {
            auth,
            bind_address: self.bind_address,
            loglevel: self.loglevel,
            file_compression: self.file_compression,
            credentials,
            oauth,
            ssl: self.ssl,
            replicator: self.replicator,
        })
    }
}

/// Admin account for `basic` and `oauth` sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Admin user name.
    pub username: String,
    /// Clear-text password; never written to disk.
    pub password: String,
    /// Salt used for the stored hash.
    pub salt: String,
}

impl Credentials {
    /// CouchDB-style salted hash of the password.
    pub fn hashed(&self) -> Result<String, CredentialError> {
        couch_hashed(&self.password, &self.salt)
    }
}

/// Fully resolved session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Authentication template.
    pub auth: AuthMode,
    /// Listening address.
    pub bind_address: BindAddress,
    /// Server log level.
    pub loglevel: CouchLogLevel,
    /// Database file compression.
    pub file_compression: FileCompression,
    /// Admin account, present unless the mode is `open`.
    pub credentials: Option<Credentials>,
    /// OAuth tokens, present only in `oauth` mode.
    pub oauth: Option<OAuthTokens>,
    /// HTTPS listener settings.
    pub ssl: Option<SslOptions>,
    /// Replicator trust settings.
    pub replicator: Option<ReplicatorOptions>,
}

/// Errors raised while validating [`Options`].
#[derive(Debug, Error)]
pub enum OptionsError {
    /// A referenced file does not exist or is not a regular file.
    #[error("{section}.{key} not a file: '{path}'")]
    NotAFile {
        /// Options section (`ssl` or `replicator`).
        section: &'static str,
        /// Field naming the file.
        key: &'static str,
        /// Offending path.
        path: PathBuf,
    },
    /// `replicator.cert_file` was set without `replicator.key_file`.
    #[error("replicator.key_file is required when replicator.cert_file is set")]
    MissingReplicatorKey,
    /// Supplied credential material was malformed.
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

fn check_file(section: &'static str, key: &'static str, path: &Path) -> Result<(), OptionsError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(OptionsError::NotAFile {
            section,
            key,
            path: path.to_path_buf(),
        })
    }
}

fn check_ssl(ssl: &SslOptions) -> Result<(), OptionsError> {
    check_file("ssl", "cert_file", &ssl.cert_file)?;
    check_file("ssl", "key_file", &ssl.key_file)?;
    if let Some(ca_file) = &ssl.ca_file {
        check_file("ssl", "ca_file", ca_file)?;
    }
    Ok(())
}

fn check_replicator(replicator: &ReplicatorOptions) -> Result<(), OptionsError> {
    check_file("replicator", "ca_file", &replicator.ca_file)?;
    if let Some(cert_file) = &replicator.cert_file {
        let key_file = replicator
            .key_file
            .as_ref()
            .ok_or(OptionsError::MissingReplicatorKey)?;
        check_file("replicator", "cert_file", cert_file)?;
        check_file("replicator", "key_file", key_file)?;
    }
    Ok(())
}
