//! Lint command implementation

use std::path::PathBuf;

use mdmend_core::Runner;
use miette::{IntoDiagnostic, Result};

use super::load_config;
use crate::cli::{Cli, OutputFormat};
use crate::discovery::FileFinder;
use crate::output::output_lint;

pub fn run_lint(cli: &Cli, paths: &[PathBuf], format: OutputFormat) -> Result<bool> {
    let config = load_config(cli)?;
    let files = FileFinder::new(&config.ignore)?.discover(paths);
    let runner = Runner::new(&config).into_diagnostic()?;

    let reports = runner.lint_files(&files);
    output_lint(&reports, format)
}
