//! Command-line runtime for usercouch.
//!
//! The runtime splits leading configuration flags from the subcommand, loads
//! layered configuration, installs telemetry, and dispatches to the `run`,
//! `bench` or `ssl` command. IO streams and the configuration loader are
//! injectable so the runtime can be driven from tests.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;

mod cli;
mod commands;
mod config;
mod errors;
mod monitor;
mod telemetry;

use cli::{Cli, CliCommand};
use config::{ConfigLoader, OrthoConfigLoader, split_config_arguments};
use errors::AppError;

/// Tracing target for the binary's own events.
pub(crate) const MONITOR_TARGET: &str = "usercouch::monitor";

/// CLI flags recognised by the configuration loader.
///
/// Keep in sync with the fields of `usercouch_config::Config`.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--base-dir",
    "--auth",
    "--bind-address",
    "--file-compression",
    "--couch-log-level",
    "--couchdb-binary",
    "--default-ini",
    "--log-filter",
    "--log-format",
];

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    match dispatch(&args, stdout, loader) {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::CliUsage(error)) if !error.use_stderr() => match write!(stdout, "{error}") {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        },
        Err(error) => {
            if let Err(write_error) = writeln!(stderr, "{error}") {
                tracing::error!(
                    target: MONITOR_TARGET,
                    %error,
                    %write_error,
                    "failed to report error"
                );
            }
            ExitCode::FAILURE
        }
    }
}

fn dispatch<W, L>(args: &[OsString], stdout: &mut W, loader: &L) -> Result<(), AppError>
where
    W: Write,
    L: ConfigLoader,
{
    let split = split_config_arguments(args);
    let cli = Cli::try_parse_from(&split.command_arguments).map_err(AppError::CliUsage)?;
    let config = loader.load(&split.config_arguments)?;
    telemetry::initialise(&config)?;

    match &cli.command {
        CliCommand::Run(run_args) => commands::run_session(&config, run_args, stdout),
        CliCommand::Bench(bench_args) => commands::bench(&config, bench_args, stdout),
        CliCommand::Ssl(ssl_args) => commands::ssl(&config, ssl_args, stdout),
    }
}
