//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// mdmend - Markdown linter and auto-fixer
#[derive(Parser)]
#[command(name = "mdmend")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Rule ids to disable, comma separated
    #[arg(long, global = true, value_delimiter = ',', value_name = "IDS")]
    pub disable: Vec<String>,

    /// Number of worker threads (0 uses all CPUs)
    #[arg(short, long, global = true, value_name = "N")]
    pub workers: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Report violations without changing files
    Lint {
        /// Files or directories to lint
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Apply fixes in place
    Fix {
        /// Files or directories to fix
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,

        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,

        /// Apply low-confidence heuristic fixes
        #[arg(long)]
        aggressive: bool,

        /// Maximum number of fix passes per file
        #[arg(long, value_name = "N")]
        passes: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List the built-in rules
    Rules {
        /// Only fixable rules
        #[arg(long, conflicts_with = "no_fixable")]
        fixable: bool,

        /// Only rules without a fix
        #[arg(long)]
        no_fixable: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
