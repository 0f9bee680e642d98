//! Spawning and signalling the server process.

use std::io;
use std::process::{Child, Stdio};

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use crate::command::CouchCommand;

/// Spawns the server for a session.
pub trait Launcher: Send + Sync {
    /// Starts `command` as a child process.
    fn spawn(&self, command: &CouchCommand) -> io::Result<Child>;
}

/// Launcher that runs the command as given.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn spawn(&self, command: &CouchCommand) -> io::Result<Child> {
        command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
    }
}

/// Sends `SIGTERM` to `child`; a process that already exited is not an
/// error.
pub fn terminate(child: &Child) -> Result<(), Errno> {
    let raw = i32::try_from(child.id()).map_err(|_| Errno::EINVAL)?;
    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(errno),
    }
}
