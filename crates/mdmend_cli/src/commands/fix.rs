//! Fix command implementation

use std::path::PathBuf;

use mdmend_core::{Runner, WriteMode};
use miette::{IntoDiagnostic, Result};
use tracing::info;

use super::load_config;
use crate::cli::{Cli, OutputFormat};
use crate::discovery::FileFinder;
use crate::output::output_fix;

pub fn run_fix(
    cli: &Cli,
    paths: &[PathBuf],
    dry_run: bool,
    aggressive: bool,
    passes: Option<usize>,
    format: OutputFormat,
) -> Result<bool> {
    let mut config = load_config(cli)?;
    if aggressive {
        config.aggressive = true;
    }
    if let Some(passes) = passes {
        config.fix_passes = passes;
    }

    let files = FileFinder::new(&config.ignore)?.discover(paths);
    let runner = Runner::new(&config).into_diagnostic()?;

    let mode = if dry_run {
        info!("Dry run: no files will be written");
        WriteMode::DryRun
    } else {
        WriteMode::Write
    };
    let reports = runner.fix_files(&files, mode);
    output_fix(&reports, format, dry_run)
}
