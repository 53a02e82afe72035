//! mdmend CLI
//!
//! Markdown linter and auto-fixer.

mod cli;
mod commands;
mod discovery;
mod output;

use std::process::ExitCode;

use clap::Parser;
use miette::Result;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::{run_fix, run_lint, run_rules};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(has_errors) => {
            if has_errors {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<bool> {
    match &cli.command {
        Commands::Lint { paths, format } => run_lint(cli, paths, *format),
        Commands::Fix {
            paths,
            dry_run,
            aggressive,
            passes,
            format,
        } => run_fix(cli, paths, *dry_run, *aggressive, *passes, *format),
        Commands::Rules {
            fixable,
            no_fixable,
            format,
        } => {
            let filter = match (*fixable, *no_fixable) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            run_rules(cli, filter, *format).map(|_| false)
        }
    }
}
