//! Error types for the CLI runtime.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use usercouch::SupervisorError;
use usercouch::sslhelpers::SslError;

use crate::monitor::ShutdownError;
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to create base directory '{path}': {source}")]
    CreateBaseDir { path: PathBuf, source: io::Error },
    #[error("failed to read extra ini '{path}': {source}")]
    ReadExtraIni { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error(transparent)]
    Ssl(#[from] SslError),
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
    #[error("failed to serialise output: {0}")]
    Serialise(#[from] serde_json::Error),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}
