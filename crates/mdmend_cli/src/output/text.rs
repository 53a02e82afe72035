//! Text output formatter

use mdmend_core::{FileReport, Summary};

use super::RuleRow;

pub fn output_lint(reports: &[FileReport]) {
    for report in reports {
        print_errors(report);
        if report.violations.is_empty() {
            continue;
        }

        println!("\n{}:", report.path.display());
        for v in &report.violations {
            let marker = if v.fixable { " (fixable)" } else { "" };
            println!(
                "  {}:{} [{}] {}{}",
                v.line, v.column, v.rule_id, v.message, marker
            );
            if let Some(suggested) = &v.suggested {
                println!("      suggestion: {}", suggested);
            }
        }
    }

    let summary = Summary::from_reports(reports);
    println!();
    println!(
        "Checked {} files, found {} issues ({} fixable)",
        summary.files, summary.violations, summary.fixable
    );
    print_failures(&summary);
}

pub fn output_fix(reports: &[FileReport], dry_run: bool) {
    let summary = Summary::from_reports(reports);
    for report in reports {
        print_errors(report);
    }

    if summary.changed == 0 {
        println!("No fixable issues found.");
    } else {
        let action = if dry_run { "Would fix" } else { "Fixed" };
        println!(
            "\n{} {} issues in {} files:",
            action, summary.fixes, summary.changed
        );
        for report in reports.iter().filter(|r| r.changed) {
            println!("  {}: {} fixes", report.path.display(), report.fixes);
        }
        if dry_run {
            println!("\nRun without --dry-run to apply fixes.");
        }
    }

    if summary.violations > 0 {
        println!("\n{} issues need manual attention", summary.violations);
    }
    print_failures(&summary);
}

pub fn output_rules(rules: &[RuleRow]) {
    println!(
        "{:<6} {:<10} {:<8} {:<34} Description",
        "Id", "Phase", "Fix", "Name"
    );
    for row in rules {
        let d = &row.descriptor;
        let phase = d.phase.map_or("-", |p| p.as_str());
        let fix = match (d.fixable, d.heuristic) {
            (true, true) => "heur",
            (true, false) => "yes",
            (false, _) => "no",
        };
        let disabled = if row.enabled { "" } else { " (disabled)" };
        println!(
            "{:<6} {:<10} {:<8} {:<34} {}{}",
            d.id, phase, fix, d.name, d.description, disabled
        );
    }
}

fn print_errors(report: &FileReport) {
    if let Some(error) = &report.error {
        eprintln!("{}: {}", report.path.display(), error);
    }
}

fn print_failures(summary: &Summary) {
    if summary.errors > 0 {
        eprintln!("\n{} file(s) failed", summary.errors);
    }
}
