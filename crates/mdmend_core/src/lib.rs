//! # mdmend_core
//!
//! Rule engine for mdmend, a Markdown linter and fixer.
//!
//! This crate provides:
//! - The [`Rule`] trait and the built-in rule set
//! - A phase-ordered [`Fixer`] and a read-only [`Linter`]
//! - Code block language inference
//! - Parallel multi-file runs through [`Runner`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use mdmend_core::{Config, Runner, WriteMode};
//!
//! let config = Config::load(None)?;
//! let runner = Runner::new(&config)?;
//!
//! for report in runner.fix_files(&paths, WriteMode::DryRun) {
//!     println!("{}: {} fixes", report.path.display(), report.fixes);
//! }
//! ```

mod config;
mod distance;
mod error;
mod fixer;
mod infer;
mod linter;
mod pool;
mod registry;
mod rule;
pub mod rules;
mod runner;
mod slug;
mod text;
mod violation;
mod writer;

pub use config::{CONFIG_FILES, Config, RuleSettings};
pub use distance::{closest, levenshtein};
pub use error::{MdmendError, Result};
pub use fixer::{Convergence, FixReport, Fixer};
pub use infer::{InferResult, InferSource, infer_language};
pub use linter::{LintReport, Linter};
pub use pool::{Job, Keyed, WorkerPool};
pub use registry::{Registry, RegistryBuilder};
pub use rule::{Phase, Rule, RuleDescriptor};
pub use runner::{FileReport, Runner, Summary, WriteMode};
pub use slug::slugify;
pub use violation::{FixOutcome, Violation};
pub use writer::atomic_write;

#[cfg(test)]
pub mod test_utils;
