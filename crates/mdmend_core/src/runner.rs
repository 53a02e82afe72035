//! File-level lint and fix runs over the worker pool.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{MdmendError, Result};
use crate::fixer::{Convergence, Fixer};
use crate::linter::{LintReport, Linter};
use crate::pool::{Job, Keyed, WorkerPool};
use crate::registry::Registry;
use crate::violation::Violation;
use crate::writer::atomic_write;

/// Whether fixed text is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Write,
    DryRun,
}

/// Outcome for one file.
#[derive(Debug, Default)]
pub struct FileReport {
    pub path: PathBuf,
    /// In fix runs, the violations left after fixing.
    pub violations: Vec<Violation>,
    pub fixable: usize,
    pub unfixable: usize,
    pub changed: bool,
    pub fixes: usize,
    /// Fixed text; `None` for lint runs and failed files.
    pub content: Option<String>,
    pub duration: Duration,
    pub error: Option<MdmendError>,
}

impl FileReport {
    fn failed(path: PathBuf, error: MdmendError, duration: Duration) -> Self {
        Self {
            path,
            duration,
            error: Some(error),
            ..Self::default()
        }
    }

    fn with_lint(mut self, lint: LintReport) -> Self {
        self.fixable = lint.fixable;
        self.unfixable = lint.unfixable;
        self.violations = lint.violations;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl Keyed for FileReport {
    fn key(&self) -> &Path {
        &self.path
    }
}

/// Totals over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub files: usize,
    pub violations: usize,
    pub fixable: usize,
    pub changed: usize,
    pub fixes: usize,
    pub errors: usize,
}

impl Summary {
    pub fn from_reports(reports: &[FileReport]) -> Self {
        reports.iter().fold(Self::default(), |mut sum, r| {
            sum.files += 1;
            sum.violations += r.violations.len();
            sum.fixable += r.fixable;
            sum.changed += usize::from(r.changed);
            sum.fixes += r.fixes;
            sum.errors += usize::from(r.error.is_some());
            sum
        })
    }
}

/// Binds the registry, linter, fixer and pool for multi-file runs.
pub struct Runner {
    registry: Arc<Registry>,
    linter: Linter,
    fixer: Fixer,
    pool: WorkerPool,
}

impl Runner {
    /// Builds a runner over the built-in rules.
    pub fn new(config: &Config) -> Result<Self> {
        let registry = Arc::new(Registry::builtin(config)?);
        Ok(Self::with_registry(registry, config))
    }

    pub fn with_registry(registry: Arc<Registry>, config: &Config) -> Self {
        Self {
            linter: Linter::new(&registry, config),
            fixer: Fixer::new(&registry, config),
            pool: WorkerPool::from_setting(config.workers),
            registry,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn lint_files(&self, paths: &[PathBuf]) -> Vec<FileReport> {
        self.lint_jobs(paths.iter().cloned().map(Job::file).collect())
    }

    pub fn fix_files(&self, paths: &[PathBuf], mode: WriteMode) -> Vec<FileReport> {
        self.fix_jobs(paths.iter().cloned().map(Job::file).collect(), mode)
    }

    pub fn lint_jobs(&self, jobs: Vec<Job>) -> Vec<FileReport> {
        let reports = self.pool.run(jobs, |job| self.lint_one(job));
        log_run("Linted", &reports);
        reports
    }

    pub fn fix_jobs(&self, jobs: Vec<Job>, mode: WriteMode) -> Vec<FileReport> {
        let reports = self.pool.run(jobs, |job| self.fix_one(job, mode));
        log_run("Fixed", &reports);
        reports
    }

    fn lint_one(&self, job: Job) -> FileReport {
        let start = Instant::now();
        let content = match load(&job) {
            Ok(content) => content,
            Err(e) => return FileReport::failed(job.path, e, start.elapsed()),
        };
        let lint = self.linter.lint(&content, &job.path);
        debug!("{}: {} violations", job.path.display(), lint.total());
        FileReport {
            duration: start.elapsed(),
            path: job.path,
            ..FileReport::default()
        }
        .with_lint(lint)
    }

    fn fix_one(&self, job: Job, mode: WriteMode) -> FileReport {
        let start = Instant::now();
        let content = match load(&job) {
            Ok(content) => content,
            Err(e) => return FileReport::failed(job.path, e, start.elapsed()),
        };
        let fixed = self.fixer.fix(&content, &job.path);
        if !matches!(fixed.convergence, Convergence::Converged { .. }) {
            warn!(
                "{}: fixing stopped before a fixed point ({:?})",
                job.path.display(),
                fixed.convergence
            );
        }
        // A pass whose edits cancel out leaves nothing to write.
        if fixed.changed
            && fixed.content != content
            && mode == WriteMode::Write
            && let Err(e) = atomic_write(&job.path, fixed.content.as_bytes())
        {
            return FileReport::failed(job.path, e, start.elapsed());
        }
        let remaining = self.linter.lint(&fixed.content, &job.path);
        FileReport {
            changed: fixed.changed,
            fixes: fixed.fixes,
            content: Some(fixed.content),
            duration: start.elapsed(),
            path: job.path,
            ..FileReport::default()
        }
        .with_lint(remaining)
    }
}

fn load(job: &Job) -> Result<String> {
    match &job.content {
        Some(content) => Ok(content.clone()),
        None => fs::read_to_string(&job.path).map_err(|e| MdmendError::read(&job.path, e)),
    }
}

fn log_run(verb: &str, reports: &[FileReport]) {
    for report in reports {
        if let Some(error) = &report.error {
            warn!("{}", error);
        }
    }
    let summary = Summary::from_reports(reports);
    info!(
        "{} {} files: {} violations, {} fixes, {} errors",
        verb, summary.files, summary.violations, summary.fixes, summary.errors
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn runner() -> Runner {
        let config = Config {
            workers: 2,
            ..Config::default()
        };
        Runner::new(&config).unwrap()
    }

    #[test]
    fn test_lint_jobs_in_memory() {
        let reports = runner().lint_jobs(vec![
            Job::text("b.md", "# Clean\n"),
            Job::text("a.md", "#Dirty  \n"),
        ]);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].path, PathBuf::from("a.md"));
        assert!(reports[0].violations.len() >= 2);
        assert!(reports[1].violations.is_empty());
        assert!(reports.iter().all(|r| r.content.is_none()));
    }

    #[test]
    fn test_fix_jobs_dry_run_reports_remaining() {
        let reports = runner().fix_jobs(
            vec![Job::text("doc.md", "#Title\n\n![](https://example.com/logo.png)\n")],
            WriteMode::DryRun,
        );
        let report = &reports[0];
        assert!(report.changed);
        assert_eq!(report.content.as_deref(), Some("# Title\n\n![](https://example.com/logo.png)\n"));
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].rule_id, "MD045");
        assert_eq!(report.unfixable, 1);
    }

    #[test]
    fn test_missing_file_is_reported_not_fatal() {
        let reports = runner().lint_files(&[PathBuf::from("does/not/exist.md")]);
        assert_eq!(reports.len(), 1);
        assert!(matches!(reports[0].error, Some(MdmendError::Read { .. })));
    }

    #[test]
    fn test_summary() {
        let reports = vec![
            FileReport {
                path: "a.md".into(),
                changed: true,
                fixes: 3,
                ..FileReport::default()
            },
            FileReport::failed("b.md".into(), MdmendError::config("x"), Duration::ZERO),
        ];
        let summary = Summary::from_reports(&reports);
        assert_eq!(
            summary,
            Summary {
                files: 2,
                changed: 1,
                fixes: 3,
                errors: 1,
                ..Summary::default()
            }
        );
    }
}
