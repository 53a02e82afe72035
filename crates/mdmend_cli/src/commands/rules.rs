//! Rules command implementation

use mdmend_core::Registry;
use miette::{IntoDiagnostic, Result};

use super::load_config;
use crate::cli::{Cli, OutputFormat};
use crate::output::{RuleRow, output_rules};

/// Lists built-in rules, optionally only those whose fixability matches.
pub fn run_rules(cli: &Cli, fixable: Option<bool>, format: OutputFormat) -> Result<()> {
    let config = load_config(cli)?;
    let registry = Registry::builtin(&config).into_diagnostic()?;

    let rules = match fixable {
        Some(fixable) => registry.filter_by_fixable(fixable),
        None => registry.all().iter().collect(),
    };

    let mut rows: Vec<RuleRow> = rules
        .into_iter()
        .map(|rule| RuleRow {
            descriptor: rule.descriptor(),
            enabled: !config.is_disabled(rule.id()),
        })
        .collect();
    rows.sort_by_key(|row| row.descriptor.id);

    output_rules(&rows, format)
}
