//! Subcommand implementations.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::info;

use usercouch::sslhelpers::{Machine, User};
use usercouch::{CouchCommand, Options, TempCouch, UserCouch};
use usercouch_config::Config;

use crate::MONITOR_TARGET;
use crate::cli::{BenchArgs, RunArgs, SslArgs};
use crate::errors::AppError;
use crate::monitor::{ShutdownSignal, SystemShutdownSignal, supervise};

/// Bootstraps the configured base directory and supervises the server.
pub(crate) fn run_session<W: Write>(
    config: &Config,
    args: &RunArgs,
    stdout: &mut W,
) -> Result<(), AppError> {
    let mut shutdown = SystemShutdownSignal::install()?;
    run_session_with(config, args, stdout, &mut shutdown)
}

fn run_session_with<W, G>(
    config: &Config,
    args: &RunArgs,
    stdout: &mut W,
    shutdown: &mut G,
) -> Result<(), AppError>
where
    W: Write,
    G: ShutdownSignal,
{
    let base_dir = config.base_dir().as_std_path();
    fs::create_dir_all(base_dir).map_err(|source| AppError::CreateBaseDir {
        path: base_dir.to_path_buf(),
        source,
    })?;
    let extra = args.extra_ini.as_deref().map(read_extra_ini).transpose()?;

    let mut couch = UserCouch::new(base_dir)?;
    let command = CouchCommand::new(couch.paths())
        .with_binary(config.couchdb_binary().as_std_path())
        .with_default_ini(config.default_ini().as_std_path());
    couch.set_command(command);

    let env = couch.bootstrap(config.auth(), Options::from_config(config), extra.as_deref())?;
    writeln!(stdout, "{}", env.to_json()?)?;
    stdout.flush()?;

    supervise(
        &mut couch,
        shutdown,
        Duration::from_secs(args.check_interval),
    )?;
    Ok(())
}

fn read_extra_ini(path: &Path) -> Result<String, AppError> {
    fs::read_to_string(path).map_err(|source| AppError::ReadExtraIni {
        path: path.to_path_buf(),
        source,
    })
}

/// Start-up timings collected by [`bench`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BenchSummary {
    pub(crate) average: f64,
    pub(crate) max: f64,
    pub(crate) min: f64,
}

impl BenchSummary {
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_precision_loss,
        reason = "timings are reported as fractional seconds"
    )]
    pub(crate) fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let total: f64 = samples.iter().sum();
        let max = samples.iter().copied().fold(f64::MIN, f64::max);
        let min = samples.iter().copied().fold(f64::MAX, f64::min);
        Some(Self {
            average: total / samples.len() as f64,
            max,
            min,
        })
    }

    fn write_to<W: Write>(&self, stdout: &mut W) -> std::io::Result<()> {
        writeln!(stdout, "Average: {:.3}", self.average)?;
        writeln!(stdout, "Max: {:.3}", self.max)?;
        writeln!(stdout, "Min: {:.3}", self.min)
    }
}

/// Times `count` bootstraps of fresh temporary instances.
pub(crate) fn bench<W: Write>(
    config: &Config,
    args: &BenchArgs,
    stdout: &mut W,
) -> Result<(), AppError> {
    let mut samples = Vec::with_capacity(args.count as usize);
    for round in 1..=args.count {
        let mut couch = TempCouch::new()?;
        let command = CouchCommand::new(couch.paths())
            .with_binary(config.couchdb_binary().as_std_path())
            .with_default_ini(config.default_ini().as_std_path());
        couch.set_command(command);

        let started = Instant::now();
        couch.bootstrap(config.auth(), Options::from_config(config), None)?;
        let elapsed = started.elapsed().as_secs_f64();
        info!(target: MONITOR_TARGET, round, elapsed, "bench round finished");
        samples.push(elapsed);
    }
    if let Some(summary) = BenchSummary::from_samples(&samples) {
        summary.write_to(stdout)?;
    }
    Ok(())
}

/// Creates a CA for `user_id`, signs a certificate for `machine_id`, and
/// prints the resulting SSL environment.
pub(crate) fn ssl<W: Write>(
    config: &Config,
    args: &SslArgs,
    stdout: &mut W,
) -> Result<(), AppError> {
    let ssldir = config.base_dir().as_std_path().join("ssl");
    fs::create_dir_all(&ssldir).map_err(|source| AppError::CreateBaseDir {
        path: ssldir.clone(),
        source,
    })?;
    let user = User::new(&ssldir, args.user_id.as_str());
    user.generate()?;
    let machine = Machine::new(&ssldir, args.machine_id.as_str());
    machine.generate()?;
    user.sign(&machine)?;
    let ssl_env = machine.ssl_env(&user);
    writeln!(stdout, "{}", serde_json::to_string_pretty(&ssl_env)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    #[rstest]
    fn bench_summary_reports_spread() {
        let summary = BenchSummary::from_samples(&[1.5, 0.5, 1.0]).expect("samples present");
        assert_eq!(summary.max, 1.5);
        assert_eq!(summary.min, 0.5);
        assert!((summary.average - 1.0).abs() < f64::EPSILON);

        let mut out = Vec::new();
        summary.write_to(&mut out).expect("write to vec");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "Average: 1.000\nMax: 1.500\nMin: 0.500\n"
        );
    }

    #[rstest]
    fn bench_summary_needs_samples() {
        assert_eq!(BenchSummary::from_samples(&[]), None);
    }

    struct ImmediateShutdown;

    impl ShutdownSignal for ImmediateShutdown {
        fn wait_timeout(&mut self, _timeout: Duration) -> Option<i32> {
            Some(15)
        }
    }

    #[rstest]
    fn missing_extra_ini_is_reported_before_locking() {
        let dir = TempDir::new().expect("temp dir");
        let base = dir.path().join("couch");
        let config = Config {
            base_dir: base.clone().try_into().expect("utf8 temp path"),
            ..Config::default()
        };
        let args = RunArgs {
            extra_ini: Some(dir.path().join("missing.ini")),
            check_interval: 1,
        };

        let mut out = Vec::new();
        let error = run_session_with(&config, &args, &mut out, &mut ImmediateShutdown)
            .expect_err("missing extra ini must fail");

        assert!(matches!(error, AppError::ReadExtraIni { .. }));
        assert!(base.is_dir(), "base directory should still be created");
        assert!(!base.join("lockfile").exists());
        assert!(out.is_empty());
    }
}
