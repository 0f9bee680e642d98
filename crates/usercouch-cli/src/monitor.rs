//! Keeps a bootstrapped server alive until a termination signal arrives.

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::{info, warn};

use usercouch::{SupervisorError, UserCouch};

use crate::MONITOR_TARGET;

const SIGNAL_POLL: Duration = Duration::from_millis(100);

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub(crate) enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Source of shutdown notifications.
pub(crate) trait ShutdownSignal {
    /// Waits up to `timeout` for a shutdown request, returning the signal
    /// number when one arrived.
    fn wait_timeout(&mut self, timeout: Duration) -> Option<i32>;
}

/// Listens for `SIGTERM`, `SIGINT`, `SIGQUIT` and `SIGHUP`.
pub(crate) struct SystemShutdownSignal {
    signals: Signals,
}

impl SystemShutdownSignal {
    pub(crate) fn install() -> Result<Self, ShutdownError> {
        let signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        Ok(Self { signals })
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait_timeout(&mut self, timeout: Duration) -> Option<i32> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(signal) = self.signals.pending().next() {
                return Some(signal);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            thread::sleep(SIGNAL_POLL.min(deadline - now));
        }
    }
}

/// Operations the monitor loop needs from a server.
pub(crate) trait Supervised {
    fn check(&mut self) -> Result<bool, SupervisorError>;
    fn kill(&mut self) -> Result<bool, SupervisorError>;
}

impl Supervised for UserCouch {
    fn check(&mut self) -> Result<bool, SupervisorError> {
        UserCouch::check(self)
    }

    fn kill(&mut self) -> Result<bool, SupervisorError> {
        UserCouch::kill(self)
    }
}

/// Checks `server` every `interval` until `shutdown` fires, then kills it.
///
/// Failed checks are logged and retried on the next tick.
pub(crate) fn supervise<S, G>(
    server: &mut S,
    shutdown: &mut G,
    interval: Duration,
) -> Result<(), SupervisorError>
where
    S: Supervised + ?Sized,
    G: ShutdownSignal + ?Sized,
{
    loop {
        if let Some(signal) = shutdown.wait_timeout(interval) {
            info!(target: MONITOR_TARGET, signal, "shutdown signal received");
            break;
        }
        match server.check() {
            Ok(true) => info!(target: MONITOR_TARGET, "server restarted"),
            Ok(false) => {}
            Err(error) => warn!(target: MONITOR_TARGET, %error, "liveness check failed"),
        }
    }
    server.kill().map(|_| ())
}
