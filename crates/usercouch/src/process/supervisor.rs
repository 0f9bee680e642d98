//! Owns a base directory and the server process running in it.

use std::path::{Path, PathBuf};
use std::process::Child;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, warn};

use usercouch_config::AuthMode;

use crate::PROCESS_TARGET;
use crate::command::CouchCommand;
use crate::env::Env;
use crate::files::write_private;
use crate::ini::{ListenPorts, PACKAGE_INI, render_session_ini};
use crate::lock::BaseDirLock;
use crate::options::Options;
use crate::paths::Paths;
use crate::ports::Ports;
use crate::probe::{HttpProbe, LivenessProbe};
use crate::reporter::{LifecycleReporter, StructuredReporter};

use super::errors::SupervisorError;
use super::launcher::{Launcher, SystemLauncher, terminate};
use super::schedule::StartSchedule;

/// Seams used by [`UserCouch`] to spawn, probe, and report.
pub struct Collaborators {
    /// Spawns the server process.
    pub launcher: Box<dyn Launcher>,
    /// Answers liveness questions.
    pub probe: Box<dyn LivenessProbe>,
    /// Receives lifecycle events.
    pub reporter: Arc<dyn LifecycleReporter>,
    /// Start-up polling schedule.
    pub schedule: StartSchedule,
}

impl Collaborators {
    /// Production collaborators: real process, HTTP probe, `tracing` events.
    pub fn system() -> Result<Self, SupervisorError> {
        Ok(Self {
            launcher: Box::new(SystemLauncher),
            probe: Box::new(HttpProbe::new()?),
            reporter: Arc::new(StructuredReporter::new()),
            schedule: StartSchedule::default(),
        })
    }
}

/// A per-user server instance rooted in a locked base directory.
///
/// Dropping the value terminates the server, then releases the lock.
pub struct UserCouch {
    basedir: PathBuf,
    paths: Paths,
    command: CouchCommand,
    launcher: Box<dyn Launcher>,
    probe: Box<dyn LivenessProbe>,
    reporter: Arc<dyn LifecycleReporter>,
    schedule: StartSchedule,
    bootstrap_called: bool,
    env: Option<Env>,
    welcome: Option<Value>,
    child: Option<Child>,
    lock: BaseDirLock,
}

impl std::fmt::Debug for UserCouch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCouch")
            .field("basedir", &self.basedir)
            .field("pid", &self.pid())
            .finish_non_exhaustive()
    }
}

impl UserCouch {
    /// Locks `basedir` and prepares its layout using production
    /// collaborators.
    pub fn new(basedir: impl AsRef<Path>) -> Result<Self, SupervisorError> {
        Self::with_collaborators(basedir, Collaborators::system()?)
    }

    /// Locks `basedir` and prepares its layout.
    pub fn with_collaborators(
        basedir: impl AsRef<Path>,
        collaborators: Collaborators,
    ) -> Result<Self, SupervisorError> {
        let supplied = basedir.as_ref();
        let basedir = std::path::absolute(supplied).map_err(|source| SupervisorError::Basedir {
            path: supplied.to_path_buf(),
            source,
        })?;
        if !basedir.is_dir() {
            return Err(SupervisorError::NotADirectory { path: basedir });
        }
        let lock = BaseDirLock::acquire(&basedir)?;
        collaborators.reporter.lock_acquired(&basedir);
        let paths = Paths::prepare(&basedir)?;
        let command = CouchCommand::new(&paths);
        let Collaborators {
            launcher,
            probe,
            reporter,
            schedule,
        } = collaborators;
        Ok(Self {
            basedir,
            paths,
            command,
            launcher,
            probe,
            reporter,
            schedule,
            bootstrap_called: false,
            env: None,
            welcome: None,
            child: None,
            lock,
        })
    }

    /// Absolute base directory.
    pub fn basedir(&self) -> &Path {
        self.basedir.as_path()
    }

    /// Files and directories inside the base directory.
    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// Lock file held for the lifetime of this value.
    pub fn lockfile(&self) -> &Path {
        self.lock.path()
    }

    /// Command used to start the server.
    pub fn command(&self) -> &CouchCommand {
        &self.command
    }

    /// Replaces the command used by subsequent starts.
    pub fn set_command(&mut self, command: CouchCommand) {
        self.command = command;
    }

    /// Client environment, once bootstrapped.
    pub fn env(&self) -> Option<&Env> {
        self.env.as_ref()
    }

    /// Welcome document from the most recent successful probe.
    pub fn welcome(&self) -> Option<&Value> {
        self.welcome.as_ref()
    }

    /// PID of the tracked server process.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Writes the session files and starts the server.
    ///
    /// May only be called once per instance, even if it fails.
    pub fn bootstrap(
        &mut self,
        auth: AuthMode,
        options: Options,
        extra: Option<&str>,
    ) -> Result<Env, SupervisorError> {
        if self.bootstrap_called {
            return Err(SupervisorError::AlreadyBootstrapped);
        }
        self.bootstrap_called = true;

        let session = options.resolve(auth)?;
        let ports = Ports::allocate(session.bind_address, session.ssl.is_some())?;
        let listen = ListenPorts {
            http: ports.http_port()?,
            ssl: ports.ssl_port()?,
        };
        let env = Env::build(&session, listen.http, listen.ssl)?;
        let ini = render_session_ini(&session, &self.paths, listen, extra)?;
        write_file(self.paths.package_ini(), PACKAGE_INI.as_bytes())?;
        write_file(self.paths.ini(), ini.as_bytes())?;
        ports.release();
        info!(
            target: PROCESS_TARGET,
            %auth,
            port = listen.http,
            ssl_port = ?listen.ssl,
            file = %self.paths.ini().display(),
            "session configuration written"
        );

        self.env = Some(env.clone());
        self.reporter.bootstrap_completed(&env);
        self.start()?;
        Ok(env)
    }

    /// Starts the server unless it is already running.
    ///
    /// Returns `Ok(false)` when a server is already tracked. On failure the
    /// spawned process is terminated and reaped before the error returns.
    pub fn start(&mut self) -> Result<bool, SupervisorError> {
        let env = require_env(self.env.as_ref(), "start")?.clone();
        if self.child.is_some() {
            return Ok(false);
        }
        match self.spawn_and_wait(&env) {
            Ok(child) => {
                self.child = Some(child);
                Ok(true)
            }
            Err(error) => {
                self.reporter.start_failed(&error);
                Err(error)
            }
        }
    }

    fn spawn_and_wait(&mut self, env: &Env) -> Result<Child, SupervisorError> {
        let mut child =
            self.launcher
                .spawn(&self.command)
                .map_err(|source| SupervisorError::Spawn {
                    binary: self.command.binary().to_path_buf(),
                    source,
                })?;
        let pid = child.id();
        self.reporter.server_starting(pid);
        let started = Instant::now();
        let mut attempts = 0;
        for delay in self.schedule.delays() {
            thread::sleep(delay);
            attempts += 1;
            if let Some(status) = child
                .try_wait()
                .map_err(|source| SupervisorError::Wait { pid, source })?
            {
                return Err(SupervisorError::ExitedEarly { pid, status });
            }
            match self.probe.welcome(env) {
                Ok(Some(welcome)) => {
                    self.welcome = Some(welcome);
                    self.reporter
                        .server_ready(pid, attempts, started.elapsed());
                    return Ok(child);
                }
                Ok(None) => {
                    debug!(target: PROCESS_TARGET, pid, attempts, "server not answering yet");
                }
                Err(error) => {
                    stop_child(&mut child)?;
                    return Err(error.into());
                }
            }
        }
        stop_child(&mut child)?;
        Err(SupervisorError::StartTimeout {
            attempts,
            elapsed: started.elapsed(),
        })
    }

    /// Probes the server once, recording the welcome document on success.
    pub fn isalive(&mut self) -> Result<bool, SupervisorError> {
        let env = require_env(self.env.as_ref(), "isalive")?;
        match self.probe.welcome(env)? {
            Some(welcome) => {
                self.welcome = Some(welcome);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Restarts the server when it fails a liveness probe.
    ///
    /// Returns `Ok(true)` when a restart happened.
    pub fn check(&mut self) -> Result<bool, SupervisorError> {
        require_env(self.env.as_ref(), "check")?;
        if self.isalive()? {
            return Ok(false);
        }
        self.reporter.server_restarting();
        self.kill()?;
        self.start()
    }

    /// Terminates and reaps the server.
    ///
    /// Returns `Ok(false)` when no server is tracked.
    pub fn kill(&mut self) -> Result<bool, SupervisorError> {
        let Some(mut child) = self.child.take() else {
            return Ok(false);
        };
        let pid = child.id();
        stop_child(&mut child)?;
        self.reporter.server_stopped(pid);
        Ok(true)
    }

    /// Sends `SIGTERM` without waiting or forgetting the process, leaving
    /// the supervisor to discover the failure on its next check.
    ///
    /// Returns `Ok(false)` when no server is tracked.
    pub fn crash(&mut self) -> Result<bool, SupervisorError> {
        let Some(child) = self.child.as_ref() else {
            return Ok(false);
        };
        let pid = child.id();
        terminate(child).map_err(|source| SupervisorError::Signal { pid, source })?;
        warn!(target: PROCESS_TARGET, pid, "server crash simulated");
        Ok(true)
    }
}

impl Drop for UserCouch {
    fn drop(&mut self) {
        if let Err(error) = self.kill() {
            warn!(
                target: PROCESS_TARGET,
                basedir = %self.basedir.display(),
                error = %error,
                "failed to stop server"
            );
        }
    }
}

fn require_env<'a>(
    env: Option<&'a Env>,
    operation: &'static str,
) -> Result<&'a Env, SupervisorError> {
    env.ok_or(SupervisorError::NotBootstrapped { operation })
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), SupervisorError> {
    write_private(path, contents).map_err(|source| SupervisorError::WriteFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Terminates `child` unless it already exited, then reaps it.
fn stop_child(child: &mut Child) -> Result<(), SupervisorError> {
    let pid = child.id();
    let exited = child
        .try_wait()
        .map_err(|source| SupervisorError::Wait { pid, source })?;
    if exited.is_none() {
        terminate(child).map_err(|source| SupervisorError::Signal { pid, source })?;
        child
            .wait()
            .map_err(|source| SupervisorError::Wait { pid, source })?;
    }
    Ok(())
}
