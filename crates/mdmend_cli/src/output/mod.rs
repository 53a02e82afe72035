//! Output formatting module

mod json;
mod text;

use mdmend_core::{FileReport, RuleDescriptor};
use miette::Result;

use crate::cli::OutputFormat;

/// A rule as listed by `mdmend rules`.
#[derive(Debug, serde::Serialize)]
pub struct RuleRow {
    #[serde(flatten)]
    pub descriptor: RuleDescriptor,
    pub enabled: bool,
}

/// Prints lint results. Returns whether anything was reported or failed.
pub fn output_lint(reports: &[FileReport], format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Json => json::output_reports(reports)?,
        OutputFormat::Text => text::output_lint(reports),
    }
    Ok(reports
        .iter()
        .any(|r| !r.violations.is_empty() || !r.is_ok()))
}

/// Prints fix results. Returns whether any file failed.
pub fn output_fix(reports: &[FileReport], format: OutputFormat, dry_run: bool) -> Result<bool> {
    match format {
        OutputFormat::Json => json::output_reports(reports)?,
        OutputFormat::Text => text::output_fix(reports, dry_run),
    }
    Ok(reports.iter().any(|r| !r.is_ok()))
}

pub fn output_rules(rules: &[RuleRow], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => json::output_rules(rules),
        OutputFormat::Text => {
            text::output_rules(rules);
            Ok(())
        }
    }
}
