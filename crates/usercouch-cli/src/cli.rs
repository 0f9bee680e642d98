//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Starts and supervises per-user CouchDB instances.
#[derive(Parser, Debug)]
#[command(name = "usercouch", disable_help_subcommand = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Bootstraps the base directory, prints the env, and keeps the server
    /// alive until signalled.
    Run(RunArgs),
    /// Measures server start-up time across fresh temporary instances.
    Bench(BenchArgs),
    /// Mints a user CA and a machine certificate signed by it.
    Ssl(SslArgs),
}

#[derive(Args, Debug, Clone)]
pub(crate) struct RunArgs {
    /// Extra ini text appended to the session file.
    #[arg(long, value_name = "FILE")]
    pub(crate) extra_ini: Option<PathBuf>,
    /// Seconds between liveness checks.
    #[arg(long, value_name = "SECS", default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub(crate) check_interval: u64,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct BenchArgs {
    /// Instances to start.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    pub(crate) count: u32,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct SslArgs {
    /// Identity of the certificate authority.
    #[arg(long)]
    pub(crate) user_id: String,
    /// Identity of the machine certificate.
    #[arg(long)]
    pub(crate) machine_id: String,
}
