//! Multi-file runs against real files.

use std::fs;
use std::path::PathBuf;

use mdmend_core::{Config, Runner, Summary, WriteMode};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn runner() -> Runner {
    let config = Config {
        workers: 3,
        ..Config::default()
    };
    Runner::new(&config).expect("Failed to create runner")
}

fn write_docs(dir: &TempDir) -> Vec<PathBuf> {
    let docs = [
        ("c.md", "# C\n\ntext  \n"),
        ("a.md", "# A\n\nclean\n"),
        ("b.md", "#B\n"),
    ];
    docs.iter()
        .map(|(name, content)| {
            let path = dir.path().join(name);
            fs::write(&path, content).unwrap();
            path
        })
        .collect()
}

#[test]
fn test_fix_writes_changed_files() {
    let dir = TempDir::new().unwrap();
    let paths = write_docs(&dir);

    let reports = runner().fix_files(&paths, WriteMode::Write);
    let names: Vec<_> = reports
        .iter()
        .map(|r| r.path.file_name().unwrap().to_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a.md", "b.md", "c.md"]);
    assert!(reports.iter().all(|r| r.is_ok()));

    assert_eq!(fs::read_to_string(dir.path().join("a.md")).unwrap(), "# A\n\nclean\n");
    assert_eq!(fs::read_to_string(dir.path().join("b.md")).unwrap(), "# B\n");
    assert_eq!(fs::read_to_string(dir.path().join("c.md")).unwrap(), "# C\n\ntext\n");

    let summary = Summary::from_reports(&reports);
    assert_eq!(summary.files, 3);
    assert_eq!(summary.changed, 2);
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.violations, 0);
}

#[test]
fn test_dry_run_leaves_files_untouched() {
    let dir = TempDir::new().unwrap();
    let paths = write_docs(&dir);

    let reports = runner().fix_files(&paths, WriteMode::DryRun);
    assert_eq!(reports.iter().filter(|r| r.changed).count(), 2);
    assert_eq!(reports[2].content.as_deref(), Some("# C\n\ntext\n"));
    assert_eq!(
        fs::read_to_string(dir.path().join("c.md")).unwrap(),
        "# C\n\ntext  \n"
    );
}

#[test]
fn test_lint_counts_per_file() {
    let dir = TempDir::new().unwrap();
    let paths = write_docs(&dir);

    let reports = runner().lint_files(&paths);
    let counts: Vec<_> = reports.iter().map(|r| r.violations.len()).collect();
    assert_eq!(counts, vec![0, 1, 1]);
    assert_eq!(reports[1].violations[0].rule_id, "MD018");
    assert_eq!(reports[2].violations[0].rule_id, "MD009");
}

#[test]
fn test_unreadable_file_does_not_stop_the_run() {
    let dir = TempDir::new().unwrap();
    let mut paths = write_docs(&dir);
    paths.push(dir.path().join("missing.md"));

    let reports = runner().lint_files(&paths);
    assert_eq!(reports.len(), 4);
    let failed: Vec<_> = reports.iter().filter(|r| !r.is_ok()).collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].path.ends_with("missing.md"));
}
