//! CLI configuration

use crate::commands::Cli;
use crate::error::{CliError, CliResult};
use holdfast::HoldfastConfig;

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Warnings and errors only
    Quiet,
    /// Default output
    #[default]
    Normal,
    /// Every resolution and verdict
    Verbose,
    /// Every poll attempt and collaborator call
    Debug,
}

impl Verbosity {
    /// Derive from `-q` and the `-v` count; quiet wins
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Default `tracing` filter for this level
    #[must_use]
    pub const fn filter_directive(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Normal => "holdfast=info,holdfast_cli=info",
            Self::Verbose => "holdfast=debug,holdfast_cli=debug",
            Self::Debug => "holdfast=trace,holdfast_cli=trace",
        }
    }
}

/// Load the library configuration named by `--config`, with environment
/// overrides applied.
pub fn load_config(cli: &Cli) -> CliResult<HoldfastConfig> {
    HoldfastConfig::load(cli.config.as_deref()).map_err(|e| match e {
        holdfast::HoldfastError::Config { message } => CliError::config(message),
        other => CliError::config(other.to_string()),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    mod verbosity_tests {
        use super::*;

        #[test]
        fn test_quiet_wins_over_verbose() {
            assert_eq!(Verbosity::from_flags(true, 3), Verbosity::Quiet);
        }

        #[test]
        fn test_verbose_count() {
            assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
            assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Verbose);
            assert_eq!(Verbosity::from_flags(false, 5), Verbosity::Debug);
        }

        #[test]
        fn test_filter_directive() {
            assert_eq!(Verbosity::Quiet.filter_directive(), "warn");
            assert!(Verbosity::Verbose.filter_directive().contains("holdfast=debug"));
            assert!(Verbosity::Quiet.is_quiet());
            assert!(!Verbosity::Normal.is_quiet());
        }
    }

    mod load_config_tests {
        use super::*;

        #[test]
        fn test_load_from_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "timeoutSeconds: 7\npollIntervalMillis: 100").unwrap();
            let path = file.path().to_string_lossy().to_string();
            let cli = Cli::try_parse_from(["holdfast", "--config", &path, "config"]).unwrap();

            let config = load_config(&cli).unwrap();
            assert_eq!(config.poll_interval_millis, 100);
        }

        #[test]
        fn test_invalid_file_is_config_error() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "pollIntervalMillis: 0").unwrap();
            let path = file.path().to_string_lossy().to_string();
            let cli = Cli::try_parse_from(["holdfast", "--config", &path, "config"]).unwrap();

            let err = load_config(&cli).unwrap_err();
            assert!(matches!(err, CliError::Config { .. }));
        }

        #[test]
        fn test_missing_file_is_config_error() {
            let cli = Cli::try_parse_from([
                "holdfast",
                "--config",
                "/nonexistent/holdfast.yaml",
                "config",
            ])
            .unwrap();
            assert!(matches!(load_config(&cli), Err(CliError::Config { .. })));
        }
    }
}
