//! JSON output formatter

use mdmend_core::FileReport;
use miette::{IntoDiagnostic, Result};

use super::RuleRow;

pub fn output_reports(reports: &[FileReport]) -> Result<()> {
    let output: Vec<_> = reports
        .iter()
        .map(|r| {
            serde_json::json!({
                "path": r.path.display().to_string(),
                "violations": r.violations,
                "fixable": r.fixable,
                "unfixable": r.unfixable,
                "changed": r.changed,
                "fixes": r.fixes,
                "error": r.error.as_ref().map(|e| e.to_string()),
            })
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&output).into_diagnostic()?
    );
    Ok(())
}

pub fn output_rules(rules: &[RuleRow]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(rules).into_diagnostic()?);
    Ok(())
}
