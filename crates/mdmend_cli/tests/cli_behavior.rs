//! Integration tests for CLI behavior
//!
//! These tests run the `mdmend` binary against temporary directories and
//! check its output, exit codes and the files it leaves behind.

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;

/// Helper to create a command for the mdmend CLI running in `dir`
fn mdmend_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mdmend"));
    cmd.current_dir(dir.path());
    cmd
}

mod help_command {
    use super::*;

    #[test]
    fn shows_help_with_flag() {
        let dir = TempDir::new().unwrap();
        mdmend_cmd(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Usage:"));
    }

    #[test]
    fn shows_version_with_flag() {
        let dir = TempDir::new().unwrap();
        mdmend_cmd(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }
}

mod lint_command {
    use super::*;

    #[test]
    fn clean_file_succeeds() {
        let dir = TempDir::new().unwrap();
        dir.child("clean.md").write_str("# Clean\n\nText.\n").unwrap();

        mdmend_cmd(&dir)
            .args(["lint", "clean.md"])
            .assert()
            .success()
            .stdout(predicate::str::contains("found 0 issues"));
    }

    #[test]
    fn violations_exit_with_one() {
        let dir = TempDir::new().unwrap();
        dir.child("dirty.md").write_str("#Dirty\n").unwrap();

        mdmend_cmd(&dir)
            .args(["lint", "dirty.md"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("[MD018]"))
            .stdout(predicate::str::contains("(fixable)"));

        dir.child("dirty.md").assert("#Dirty\n");
    }

    #[test]
    fn disabled_rules_are_not_reported() {
        let dir = TempDir::new().unwrap();
        dir.child("dirty.md").write_str("#Dirty\n").unwrap();

        mdmend_cmd(&dir)
            .args(["lint", "dirty.md", "--disable", "MD018,MD047"])
            .assert()
            .success();
    }

    #[test]
    fn json_output_lists_every_file() {
        let dir = TempDir::new().unwrap();
        dir.child("b.md").write_str("# B\n").unwrap();
        dir.child("a.md").write_str("# A  \n").unwrap();

        let output = mdmend_cmd(&dir)
            .args(["lint", "--format", "json", "a.md", "b.md"])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(1));

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let files = json.as_array().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0]["path"], "a.md");
        assert_eq!(files[0]["violations"][0]["rule_id"], "MD009");
        assert_eq!(files[1]["violations"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn directories_skip_ignored_files() {
        let dir = TempDir::new().unwrap();
        dir.child("docs/guide.md").write_str("# Guide\n").unwrap();
        dir.child("CHANGELOG.md").write_str("#Changes\n").unwrap();
        dir.child("notes.txt").write_str("#not markdown\n").unwrap();

        mdmend_cmd(&dir)
            .arg("lint")
            .assert()
            .success()
            .stdout(predicate::str::contains("Checked 1 files"));
    }

    #[test]
    fn missing_file_fails() {
        let dir = TempDir::new().unwrap();

        mdmend_cmd(&dir)
            .args(["lint", "missing.md"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("missing.md"));
    }

    #[test]
    fn malformed_config_is_fatal() {
        let dir = TempDir::new().unwrap();
        dir.child(".mdmend.json").write_str("{ \"tab_size\": \"four\" }").unwrap();
        dir.child("doc.md").write_str("# Doc\n").unwrap();

        mdmend_cmd(&dir)
            .args(["lint", "doc.md"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Invalid config"));
    }

    #[test]
    fn config_file_disables_rules() {
        let dir = TempDir::new().unwrap();
        dir.child(".mdmend.jsonc")
            .write_str("{\n  // headings are checked elsewhere\n  \"disable\": [\"MD018\"]\n}\n")
            .unwrap();
        dir.child("doc.md").write_str("#Doc\n").unwrap();

        mdmend_cmd(&dir).args(["lint", "doc.md"]).assert().success();
    }
}

mod fix_command {
    use super::*;

    #[test]
    fn writes_fixed_files() {
        let dir = TempDir::new().unwrap();
        dir.child("doc.md")
            .write_str("#Heading\n\ntext  \n\n\nmore")
            .unwrap();

        mdmend_cmd(&dir)
            .args(["fix", "doc.md"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Fixed"));

        dir.child("doc.md").assert("# Heading\n\ntext\n\nmore\n");
    }

    #[test]
    fn dry_run_leaves_files_untouched() {
        let dir = TempDir::new().unwrap();
        dir.child("doc.md").write_str("# Doc\n\ntext  \n").unwrap();

        mdmend_cmd(&dir)
            .args(["fix", "--dry-run", "doc.md"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Would fix"));

        dir.child("doc.md").assert("# Doc\n\ntext  \n");
    }

    #[test]
    fn aggressive_repairs_link_fragments() {
        let dir = TempDir::new().unwrap();
        let doc = dir.child("doc.md");
        doc.write_str("# Installation\n\nSee [setup](#instalation).\n")
            .unwrap();

        mdmend_cmd(&dir).args(["fix", "doc.md"]).assert().success();
        doc.assert("# Installation\n\nSee [setup](#instalation).\n");

        mdmend_cmd(&dir)
            .args(["fix", "--aggressive", "doc.md"])
            .assert()
            .success();
        doc.assert("# Installation\n\nSee [setup](#installation).\n");
    }

    #[test]
    fn passes_reach_a_fixed_point() {
        let dir = TempDir::new().unwrap();
        dir.child("doc.md").write_str("#Heading\ntext\n").unwrap();

        mdmend_cmd(&dir)
            .args(["fix", "--passes", "3", "doc.md"])
            .assert()
            .success();

        dir.child("doc.md").assert("# Heading\n\ntext\n");
    }
}

mod rules_command {
    use super::*;

    #[test]
    fn lists_all_rules() {
        let dir = TempDir::new().unwrap();
        mdmend_cmd(&dir)
            .arg("rules")
            .assert()
            .success()
            .stdout(predicate::str::contains("MD003"))
            .stdout(predicate::str::contains("MD053"))
            .stdout(predicate::str::contains("(disabled)"));
    }

    #[test]
    fn filters_by_fixability() {
        let dir = TempDir::new().unwrap();
        mdmend_cmd(&dir)
            .args(["rules", "--fixable"])
            .assert()
            .success()
            .stdout(predicate::str::contains("MD009"))
            .stdout(predicate::str::contains("MD024").not());

        mdmend_cmd(&dir)
            .args(["rules", "--no-fixable"])
            .assert()
            .success()
            .stdout(predicate::str::contains("MD024"))
            .stdout(predicate::str::contains("MD009").not());
    }

    #[test]
    fn json_includes_phase() {
        let dir = TempDir::new().unwrap();
        let output = mdmend_cmd(&dir)
            .args(["rules", "--format", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let rules = json.as_array().unwrap();
        assert_eq!(rules.len(), 48);
        let md040 = rules.iter().find(|r| r["id"] == "MD040").unwrap();
        assert_eq!(md040["phase"], "heuristic");
        assert_eq!(md040["heuristic"], true);
        let md013 = rules.iter().find(|r| r["id"] == "MD013").unwrap();
        assert_eq!(md013["enabled"], false);
    }
}
