//! Bounded worker pool for per-file jobs.
//!
//! Every job is queued before the workers start. Workers pull from a shared
//! `crossbeam_channel` queue and push results to a second channel; the
//! collected results are sorted by path so the output does not depend on
//! completion order.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread;

use tracing::{debug, warn};

/// One unit of work: a path and, optionally, its already-loaded text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub path: PathBuf,
    /// `None` means the text is read from `path` by the worker.
    pub content: Option<String>,
}

impl Job {
    /// A job whose text is read from disk.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            content: None,
        }
    }

    /// A job over in-memory text.
    pub fn text(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: Some(content.into()),
        }
    }
}

/// Results are ordered by the path they were produced for.
pub trait Keyed {
    fn key(&self) -> &Path;
}

/// Runs a function over many jobs on a fixed number of threads.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// A pool of `workers` threads, at least one.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// A pool sized to the machine's available parallelism.
    pub fn with_available_parallelism() -> Self {
        Self::new(thread::available_parallelism().map_or(1, NonZeroUsize::get))
    }

    /// `0` selects the available parallelism.
    pub fn from_setting(workers: usize) -> Self {
        if workers == 0 {
            Self::with_available_parallelism()
        } else {
            Self::new(workers)
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `f` once per job and returns the results sorted by key.
    ///
    /// Uses `min(workers, jobs)` threads. A panic in `f` propagates to the
    /// caller once every worker has stopped.
    pub fn run<J, R, F>(&self, jobs: Vec<J>, f: F) -> Vec<R>
    where
        J: Send,
        R: Keyed + Send,
        F: Fn(J) -> R + Sync,
    {
        let total = jobs.len();
        if total == 0 {
            return Vec::new();
        }
        let workers = self.workers.min(total);

        let (job_tx, job_rx) = crossbeam_channel::bounded::<J>(total);
        let (result_tx, result_rx) = crossbeam_channel::bounded::<R>(total);
        for job in jobs {
            // The queue holds every job and its receiver is alive.
            if job_tx.send(job).is_err() {
                warn!("Job queue closed early");
                break;
            }
        }
        drop(job_tx);

        debug!("Running {} jobs on {} workers", total, workers);
        thread::scope(|scope| {
            for worker in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let f = &f;
                scope.spawn(move || {
                    let mut done = 0;
                    for job in job_rx.iter() {
                        if result_tx.send(f(job)).is_err() {
                            break;
                        }
                        done += 1;
                    }
                    debug!("Worker {} finished {} jobs", worker, done);
                });
            }
        });
        drop(result_tx);

        let mut results: Vec<R> = result_rx.iter().collect();
        results.sort_by(|a, b| a.key().cmp(b.key()));
        results
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::with_available_parallelism()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[derive(Debug)]
    struct Done {
        path: PathBuf,
        thread: thread::ThreadId,
    }

    impl Keyed for Done {
        fn key(&self) -> &Path {
            &self.path
        }
    }

    fn run(pool: WorkerPool, names: &[&str]) -> Vec<Done> {
        let jobs: Vec<Job> = names.iter().map(|n| Job::file(*n)).collect();
        pool.run(jobs, |job| {
            // Earlier names finish later.
            let delay = 5 * (names.len() - names.iter().position(|n| Path::new(n) == job.path).unwrap_or(0));
            thread::sleep(Duration::from_millis(delay as u64));
            Done {
                path: job.path,
                thread: thread::current().id(),
            }
        })
    }

    #[test]
    fn test_five_jobs_two_workers_sorted() {
        let results = run(WorkerPool::new(2), &["e.md", "c.md", "a.md", "d.md", "b.md"]);
        let paths: Vec<_> = results.iter().map(|r| r.path.to_str().unwrap()).collect();
        assert_eq!(paths, vec!["a.md", "b.md", "c.md", "d.md", "e.md"]);

        let threads: HashSet<_> = results.iter().map(|r| r.thread).collect();
        assert!(threads.len() <= 2);
    }

    #[rstest]
    #[case::zero(0, 1)]
    #[case::one(1, 1)]
    #[case::many(8, 8)]
    fn test_worker_count_is_at_least_one(#[case] requested: usize, #[case] expected: usize) {
        assert_eq!(WorkerPool::new(requested).workers(), expected);
    }

    #[test]
    fn test_available_parallelism() {
        assert!(WorkerPool::from_setting(0).workers() >= 1);
        assert_eq!(WorkerPool::from_setting(3).workers(), 3);
    }

    #[test]
    fn test_no_jobs() {
        assert!(run(WorkerPool::new(4), &[]).is_empty());
    }

    #[test]
    fn test_workers_clamped_to_job_count() {
        let seen = Mutex::new(HashSet::new());
        let jobs = vec![Job::text("only.md", "text")];
        let results = WorkerPool::new(16).run(jobs, |job| {
            seen.lock().unwrap().insert(thread::current().id());
            Done {
                path: job.path,
                thread: thread::current().id(),
            }
        });
        assert_eq!(results.len(), 1);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
