//! Subcommand implementations

mod fix;
mod lint;
mod rules;

pub use fix::run_fix;
pub use lint::run_lint;
pub use rules::run_rules;

use mdmend_core::Config;
use miette::{IntoDiagnostic, Result};
use tracing::info;

use crate::cli::Cli;

/// Loads the configuration and applies the global flag overrides.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).into_diagnostic()?;
    if config.source.is_none() {
        info!("No config file found, using defaults");
    }

    config.disable_rules(&cli.disable);
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    Ok(config)
}
