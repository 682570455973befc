//! Holdfast CLI: inspect controls on live pages
//!
//! ## Usage
//!
//! ```bash
//! holdfast inspect https://app.test/releases/42 -l id:editBtn -l css:[data-action=edit]
//! holdfast inspect https://app.test/releases/42 -l id:deleteLink --probe --format json
//! holdfast config                  # effective configuration as YAML
//! ```

use clap::Parser;
use holdfast::HoldfastConfig;
use holdfast_cli::{
    execute_config, load_config, logging, Cli, CliError, CliResult, Commands, InspectArgs,
    Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    logging::init_tracing(Verbosity::from_flags(cli.quiet, cli.verbose));
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Inspect(args) => run_inspect(&config, args),
        Commands::Config(args) => {
            print!("{}", execute_config(&config, args)?);
            Ok(())
        }
    }
}

#[cfg(feature = "browser")]
fn run_inspect(config: &HoldfastConfig, args: &InspectArgs) -> CliResult<()> {
    use holdfast::{ChromiumBrowser, Engine};
    use holdfast_cli::handlers::parse_chain;
    use holdfast_cli::OutputFormat;

    // Reject malformed locators before paying for a browser launch
    let _ = parse_chain(&args.locators)?;
    if !args.status.is_empty() {
        let _ = parse_chain(&args.status)?;
    }

    let browser = ChromiumBrowser::launch(config)?;
    let engine = Engine::system(browser, config);
    let result = holdfast_cli::inspect(&engine, args);
    if let Err(e) = engine.into_browser().close() {
        tracing::warn!(error = %e, "browser did not close cleanly");
    }
    let report = result?;

    match args.format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    if report.is_found() {
        Ok(())
    } else {
        Err(CliError::inspection(format!("no locator matched in {}", report.chain)))
    }
}

#[cfg(not(feature = "browser"))]
fn run_inspect(_config: &HoldfastConfig, _args: &InspectArgs) -> CliResult<()> {
    Err(CliError::config(
        "browser support not enabled. Rebuild with --features browser",
    ))
}
