//! CLI entrypoint for usercouch.
//!
//! The binary delegates to [`usercouch_cli::run`], which loads layered
//! configuration, parses the subcommand, and drives the library.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    usercouch_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
