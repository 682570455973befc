//! Config command handler

use crate::commands::ConfigArgs;
use crate::error::CliResult;
use holdfast::HoldfastConfig;

/// Render the configuration `holdfast config` prints
pub fn execute_config(config: &HoldfastConfig, args: &ConfigArgs) -> CliResult<String> {
    let shown = if args.defaults {
        HoldfastConfig::default()
    } else {
        config.clone()
    };
    Ok(shown.to_yaml()?)
}
