//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Holdfast: resilient element resolution and state verification for browser tests
#[derive(Parser, Debug)]
#[command(name = "holdfast")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only warnings and errors are logged)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (YAML)
    #[arg(short, long, global = true, env = "HOLDFAST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a control on a live page and report its state
    ///
    /// Locators are tried in the order given; the first that matches wins.
    /// Each takes the form `strategy:selector`, for example `id:editBtn`,
    /// `test-id:edit`, `css:[data-action=edit]` or `text:Edit`.
    Inspect(InspectArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Arguments for the inspect command
#[derive(Parser, Debug, Clone)]
pub struct InspectArgs {
    /// Page to open before resolving
    pub url: String,

    /// Locator to try, in fallback order (repeatable)
    #[arg(short, long = "locator", required = true)]
    pub locators: Vec<String>,

    /// Click the control and report whether the page changed
    #[arg(long)]
    pub probe: bool,

    /// Status text locator observed around the probe (repeatable)
    #[arg(long = "status")]
    pub status: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    /// Show built-in defaults instead of the effective configuration
    #[arg(long)]
    pub defaults: bool,
}

/// Output format for reports
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// JSON document
    Json,
}
