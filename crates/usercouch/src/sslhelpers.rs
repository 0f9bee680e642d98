//! Non-interactive certificate generation through the `openssl` command.
//!
//! A [`User`] owns a self-signed certificate authority; a [`Machine`] owns
//! a key and a certificate signed by that authority. Every file lives in a
//! single ssl directory and is named after the identity that owns it.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::PROCESS_TARGET;
use crate::options::{ReplicatorOptions, SslOptions};

const OPENSSL: &str = "openssl";
const VALID_DAYS: &str = "3650";

/// Default RSA modulus size for [`gen_key`].
pub const DEFAULT_KEY_BITS: u32 = 2048;

/// Errors raised while running `openssl`.
#[derive(Debug, Error)]
pub enum SslError {
    /// The command could not be started.
    #[error("failed to run openssl {subcommand}: {source}")]
    Spawn {
        /// `openssl` subcommand.
        subcommand: &'static str,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The command exited unsuccessfully.
    #[error("openssl {subcommand} failed with {status}: {stderr}")]
    Failed {
        /// `openssl` subcommand.
        subcommand: &'static str,
        /// Exit status.
        status: std::process::ExitStatus,
        /// Captured standard error.
        stderr: String,
    },
}

fn openssl<I, S>(subcommand: &'static str, args: I) -> Result<(), SslError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(OPENSSL)
        .arg(subcommand)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| SslError::Spawn { subcommand, source })?;
    if !output.status.success() {
        return Err(SslError::Failed {
            subcommand,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }
    debug!(target: PROCESS_TARGET, subcommand, "openssl succeeded");
    Ok(())
}

/// Creates an RSA private key at `dst`.
pub fn gen_key(dst: &Path, bits: u32) -> Result<(), SslError> {
    openssl(
        "genrsa",
        [
            OsStr::new("-out"),
            dst.as_os_str(),
            OsStr::new(&bits.to_string()),
        ],
    )
}

/// Creates a self-signed certificate authority for `subject`
/// (for example `/CN=foo`).
pub fn gen_ca(key: &Path, subject: &str, dst: &Path) -> Result<(), SslError> {
    openssl(
        "req",
        [
            OsStr::new("-new"),
            OsStr::new("-x509"),
            OsStr::new("-days"),
            OsStr::new(VALID_DAYS),
            OsStr::new("-key"),
            key.as_os_str(),
            OsStr::new("-subj"),
            OsStr::new(subject),
            OsStr::new("-out"),
            dst.as_os_str(),
        ],
    )
}

/// Creates a certificate signing request for `subject`.
pub fn gen_csr(key: &Path, subject: &str, dst: &Path) -> Result<(), SslError> {
    openssl(
        "req",
        [
            OsStr::new("-new"),
            OsStr::new("-key"),
            key.as_os_str(),
            OsStr::new("-subj"),
            OsStr::new(subject),
            OsStr::new("-out"),
            dst.as_os_str(),
        ],
    )
}

/// Signs `csr` with the authority `ca`/`ca_key`, writing the certificate
/// to `dst`.
pub fn sign_csr(csr: &Path, ca: &Path, ca_key: &Path, dst: &Path) -> Result<(), SslError> {
    openssl(
        "x509",
        [
            OsStr::new("-req"),
            OsStr::new("-days"),
            OsStr::new(VALID_DAYS),
            OsStr::new("-CAcreateserial"),
            OsStr::new("-in"),
            csr.as_os_str(),
            OsStr::new("-CA"),
            ca.as_os_str(),
            OsStr::new("-CAkey"),
            ca_key.as_os_str(),
            OsStr::new("-out"),
            dst.as_os_str(),
        ],
    )
}

/// Identity with a private key in an ssl directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Helper {
    ssldir: PathBuf,
    id: String,
    subject: String,
    key: PathBuf,
}

impl Helper {
    /// Names the files for `id` inside `ssldir`.
    pub fn new(ssldir: impl Into<PathBuf>, id: impl Into<String>) -> Self {
        let ssldir = ssldir.into();
        let id = id.into();
        Self {
            subject: format!("/CN={id}"),
            key: ssldir.join(format!("{id}-key.pem")),
            ssldir,
            id,
        }
    }

    /// Directory holding the identity's files.
    pub fn ssldir(&self) -> &Path {
        self.ssldir.as_path()
    }

    /// Identity name.
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// X.509 subject, `/CN=<id>`.
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Private key path.
    pub fn key(&self) -> &Path {
        self.key.as_path()
    }

    /// Generates the private key.
    pub fn gen_key(&self) -> Result<(), SslError> {
        gen_key(&self.key, DEFAULT_KEY_BITS)
    }

    fn file(&self, suffix: &str) -> PathBuf {
        self.ssldir.join(format!("{}-{suffix}.pem", self.id))
    }
}

/// A user acting as a certificate authority for their machines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    helper: Helper,
    ca: PathBuf,
}

impl User {
    /// Names the user's key and CA files inside `ssldir`.
    pub fn new(ssldir: impl Into<PathBuf>, id: impl Into<String>) -> Self {
        let helper = Helper::new(ssldir, id);
        let ca = helper.file("ca");
        Self { helper, ca }
    }

    /// Shared identity fields.
    pub fn helper(&self) -> &Helper {
        &self.helper
    }

    /// CA certificate path.
    pub fn ca(&self) -> &Path {
        self.ca.as_path()
    }

    /// Generates the key and self-signed CA.
    pub fn generate(&self) -> Result<(), SslError> {
        self.helper.gen_key()?;
        gen_ca(self.helper.key(), self.helper.subject(), &self.ca)
    }

    /// Signs `machine`'s CSR, producing its certificate.
    pub fn sign(&self, machine: &Machine) -> Result<(), SslError> {
        sign_csr(&machine.csr, &self.ca, self.helper.key(), &machine.cert)
    }
}

/// A machine holding a certificate issued by a [`User`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    helper: Helper,
    csr: PathBuf,
    cert: PathBuf,
}

impl Machine {
    /// Names the machine's key, CSR, and certificate inside `ssldir`.
    pub fn new(ssldir: impl Into<PathBuf>, id: impl Into<String>) -> Self {
        let helper = Helper::new(ssldir, id);
        let csr = helper.file("csr");
        let cert = helper.file("cert");
        Self { helper, csr, cert }
    }

    /// Shared identity fields.
    pub fn helper(&self) -> &Helper {
        &self.helper
    }

    /// Signing request path.
    pub fn csr(&self) -> &Path {
        self.csr.as_path()
    }

    /// Signed certificate path.
    pub fn cert(&self) -> &Path {
        self.cert.as_path()
    }

    /// Generates the key and signing request.
    pub fn generate(&self) -> Result<(), SslError> {
        self.helper.gen_key()?;
        gen_csr(self.helper.key(), self.helper.subject(), &self.csr)
    }

    /// Client TLS settings for talking to peers that trust `user`.
    #[must_use]
    pub fn ssl_env(&self, user: &User) -> SslEnv {
        SslEnv {
            key_file: self.helper.key.clone(),
            cert_file: self.cert.clone(),
            ca_file: user.ca.clone(),
            check_hostname: false,
        }
    }
}

/// TLS client settings produced by [`Machine::ssl_env`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SslEnv {
    /// Machine private key.
    pub key_file: PathBuf,
    /// Machine certificate.
    pub cert_file: PathBuf,
    /// Authority that issued the certificate.
    pub ca_file: PathBuf,
    /// Peers are identified by certificate, not host name.
    pub check_hostname: bool,
}

impl SslEnv {
    /// Server options presenting the machine certificate.
    #[must_use]
    pub fn server_options(&self) -> SslOptions {
        SslOptions {
            cert_file: self.cert_file.clone(),
            key_file: self.key_file.clone(),
            ca_file: Some(self.ca_file.clone()),
        }
    }

    /// Replicator options that trust the issuing authority and present the
    /// machine certificate.
    #[must_use]
    pub fn replicator_options(&self) -> ReplicatorOptions {
        ReplicatorOptions::new(&self.ca_file)
            .with_client_cert(&self.cert_file, &self.key_file)
    }
}
