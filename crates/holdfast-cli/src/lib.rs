//! Holdfast CLI Library
//!
//! Command-line front end for the Holdfast library: `holdfast inspect`
//! resolves a control on a live page and reports its state, `holdfast config`
//! prints the effective configuration.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;

pub use commands::{Cli, Commands, ConfigArgs, InspectArgs, OutputFormat};
pub use config::{load_config, Verbosity};
pub use error::{CliError, CliResult};
pub use handlers::{execute_config, inspect, InspectReport};
