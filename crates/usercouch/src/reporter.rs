//! Structured reporting for session lifecycle events.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::env::Env;
use crate::process::SupervisorError;

/// Target used for lifecycle events.
pub const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Observer notified as a session moves through its lifecycle.
pub trait LifecycleReporter: Send + Sync {
    /// The base directory lock was taken.
    fn lock_acquired(&self, basedir: &Path);

    /// The session files were written and ports allocated.
    fn bootstrap_completed(&self, env: &Env);

    /// The server process was spawned.
    fn server_starting(&self, pid: u32);

    /// The server answered its first liveness probe.
    fn server_ready(&self, pid: u32, attempts: u32, elapsed: Duration);

    /// The server process was terminated and reaped.
    fn server_stopped(&self, pid: u32);

    /// A failed liveness check triggered a restart.
    fn server_restarting(&self);

    /// Starting the server failed.
    fn start_failed(&self, error: &SupervisorError);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter + ?Sized,
{
    fn lock_acquired(&self, basedir: &Path) {
        (**self).lock_acquired(basedir);
    }

    fn bootstrap_completed(&self, env: &Env) {
        (**self).bootstrap_completed(env);
    }

    fn server_starting(&self, pid: u32) {
        (**self).server_starting(pid);
    }

    fn server_ready(&self, pid: u32, attempts: u32, elapsed: Duration) {
        (**self).server_ready(pid, attempts, elapsed);
    }

    fn server_stopped(&self, pid: u32) {
        (**self).server_stopped(pid);
    }

    fn server_restarting(&self) {
        (**self).server_restarting();
    }

    fn start_failed(&self, error: &SupervisorError) {
        (**self).start_failed(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredReporter;

impl StructuredReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredReporter {
    fn lock_acquired(&self, basedir: &Path) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "lock_acquired",
            basedir = %basedir.display(),
            "base directory locked"
        );
    }

    fn bootstrap_completed(&self, env: &Env) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "bootstrap_completed",
            url = %env.url,
            ssl = env.x_env_ssl.is_some(),
            "session bootstrapped"
        );
    }

    fn server_starting(&self, pid: u32) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "server_starting",
            pid,
            "server spawned"
        );
    }

    fn server_ready(&self, pid: u32, attempts: u32, elapsed: Duration) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "server_ready",
            pid,
            attempts,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "server ready"
        );
    }

    fn server_stopped(&self, pid: u32) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "server_stopped",
            pid,
            "server stopped"
        );
    }

    fn server_restarting(&self) {
        tracing::warn!(
            target: LIFECYCLE_TARGET,
            event = "server_restarting",
            "liveness check failed; restarting server"
        );
    }

    fn start_failed(&self, error: &SupervisorError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "start_failed",
            error = %error,
            "server failed to start"
        );
    }
}
