//! Configuration loading helpers for the CLI.
//!
//! Leading configuration flags are routed to `ortho_config`; everything from
//! the first other token onwards is parsed as the subcommand.

use std::ffi::{OsStr, OsString};

use ortho_config::OrthoConfig;
use usercouch_config::Config;

use crate::AppError;

pub(crate) trait ConfigLoader {
    /// Loads configuration from the filtered configuration arguments.
    ///
    /// Configuration flags must precede the subcommand; flags after it are
    /// parsed as subcommand arguments.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Stop,
}

fn classify(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    if !text.starts_with("--") {
        return FlagAction::Stop;
    }
    let (flag, has_inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (text.as_ref(), false),
    };
    if super::CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !has_inline_value,
        }
    } else {
        FlagAction::Stop
    }
}

pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_arguments: Vec<OsString>,
}

/// Splits `args` (including the program name) into loader and subcommand
/// arguments; both halves keep the program name first.
pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let mut arguments = args.iter();
    let Some(program) = arguments.next() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_arguments: Vec::new(),
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut remaining = arguments.peekable();
    while let Some(argument) = remaining.peek() {
        let FlagAction::Include { needs_value } = classify(argument) else {
            break;
        };
        config_arguments.push((*argument).clone());
        remaining.next();
        if needs_value && let Some(value) = remaining.next() {
            config_arguments.push(value.clone());
        }
    }

    let mut command_arguments = vec![program.clone()];
    command_arguments.extend(remaining.cloned());
    ConfigArgumentSplit {
        config_arguments,
        command_arguments,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case("--log-filter=debug", FlagAction::Include { needs_value: false })]
    #[case("--base-dir", FlagAction::Include { needs_value: true })]
    #[case("run", FlagAction::Stop)]
    #[case("--extra-ini", FlagAction::Stop)]
    fn flags_are_classified(#[case] argument: &str, #[case] expected: FlagAction) {
        assert_eq!(classify(OsStr::new(argument)), expected);
    }

    #[rstest]
    fn config_flags_precede_subcommand() {
        let split = split_config_arguments(&os(&[
            "usercouch",
            "--auth",
            "open",
            "--log-format=compact",
            "run",
            "--check-interval",
            "2",
        ]));
        assert_eq!(
            split.config_arguments,
            os(&["usercouch", "--auth", "open", "--log-format=compact"])
        );
        assert_eq!(
            split.command_arguments,
            os(&["usercouch", "run", "--check-interval", "2"])
        );
    }

    #[rstest]
    fn config_flags_after_subcommand_stay_with_it() {
        let split = split_config_arguments(&os(&["usercouch", "bench", "--auth", "open"]));
        assert_eq!(split.config_arguments, os(&["usercouch"]));
        assert_eq!(
            split.command_arguments,
            os(&["usercouch", "bench", "--auth", "open"])
        );
    }

    #[rstest]
    fn empty_arguments_split_to_nothing() {
        let split = split_config_arguments(&[]);
        assert!(split.config_arguments.is_empty());
        assert!(split.command_arguments.is_empty());
    }
}
